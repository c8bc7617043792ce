//! Discovery API endpoint wrappers.
//!
//! Each method builds the parameters for one endpoint, picks its pagination
//! style and unwraps the records from under the endpoint's result key.
//! Records are returned as raw JSON; turning them into typed entities is the
//! fetchers' job.

use crate::client::{ApiClient, Paginate};
use crate::error::{ApiError, Result};
use crate::request::{HttpMethod, Params};
use serde_json::Value;

/// Title given to tombstoned files.
pub const FILE_TOMBSTONE_TITLE: &str = "File Removed";

/// Which conversations `discovery.conversations.list` should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationFilter {
    /// Public channels only
    pub only_public: bool,
    /// Private channels only
    pub only_private: bool,
    /// Direct messages only
    pub only_im: bool,
    /// Multi-party direct messages only
    pub only_mpim: bool,
    /// Externally shared conversations only
    pub only_ext_shared: bool,
    /// Include conversations users have left
    pub include_historical: bool,
}

impl ConversationFilter {
    fn apply(self, params: Params) -> Params {
        [
            ("only_public", self.only_public),
            ("only_private", self.only_private),
            ("only_im", self.only_im),
            ("only_mpim", self.only_mpim),
            ("only_ext_shared", self.only_ext_shared),
            ("include_historical", self.include_historical),
        ]
        .into_iter()
        .fold(params, |params, (key, enabled)| {
            params.with_opt(key, enabled.then_some(true))
        })
    }
}

/// Typed access to the discovery endpoints.
#[derive(Clone)]
pub struct SlackApi {
    client: ApiClient,
}

impl SlackApi {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Enterprise metadata, including its list of teams.
    pub async fn enterprise_info(&self) -> Result<Value> {
        self.single("discovery.enterprise.info", Params::new(), "enterprise")
            .await
    }

    /// Metadata for one team (workspace or enterprise).
    pub async fn team_info(&self, team_id: &str) -> Result<Value> {
        self.single("team.info", Params::new().with("team", team_id), "team")
            .await
    }

    /// Every user in the enterprise.
    pub async fn all_users(&self) -> Result<Vec<Value>> {
        self.list(
            "discovery.users.list",
            Params::new(),
            Paginate::Offset,
            "users",
        )
        .await
    }

    /// Every conversation matching `filter`.
    pub async fn all_conversations(&self, filter: ConversationFilter) -> Result<Vec<Value>> {
        self.list(
            "discovery.conversations.list",
            filter.apply(Params::new()),
            Paginate::Offset,
            "channels",
        )
        .await
    }

    /// Conversations with activity since `latest`.
    pub async fn recent_conversations(&self, latest: i64) -> Result<Vec<Value>> {
        self.list(
            "discovery.conversations.recent",
            Params::new().with("latest", latest),
            Paginate::Latest,
            "channels",
        )
        .await
    }

    /// Metadata for one conversation.
    pub async fn conversation_info(&self, channel_id: &str, team_id: Option<&str>) -> Result<Value> {
        let params = Params::new()
            .with("channel", channel_id)
            .with_opt("team", team_id);
        let info = self
            .single("discovery.conversations.info", params, "info")
            .await?;

        let info = match info {
            Value::Array(entries) => entries.into_iter().next(),
            object @ Value::Object(_) => Some(object),
            _ => None,
        };

        info.ok_or_else(|| ApiError::MalformedResponse {
            endpoint: "discovery.conversations.info".to_string(),
            message: format!("no info returned for {channel_id}"),
        })
    }

    /// Messages of one conversation posted at or after `oldest`.
    pub async fn conversation_history(
        &self,
        channel_id: &str,
        team_id: Option<&str>,
        oldest: i64,
    ) -> Result<Vec<Value>> {
        let params = Params::new()
            .with("channel", channel_id)
            .with_opt("team", team_id)
            .with("oldest", oldest);
        self.list(
            "discovery.conversations.history",
            params,
            Paginate::Latest,
            "messages",
        )
        .await
    }

    /// Files uploaded at or after `oldest`.
    pub async fn list_files(&self, oldest: i64) -> Result<Vec<Value>> {
        self.list(
            "discovery.files.list",
            Params::new().with("oldest", oldest),
            Paginate::Offset,
            "files",
        )
        .await
    }

    /// Full metadata for one file, including its shares.
    pub async fn file_info(&self, file_id: &str) -> Result<Value> {
        self.single(
            "discovery.file.info",
            Params::new().with("file", file_id),
            "file",
        )
        .await
    }

    /// Drafts of one workspace created at or after `oldest`.
    pub async fn list_drafts(&self, team_id: &str, oldest: i64) -> Result<Vec<Value>> {
        self.list(
            "discovery.drafts.list",
            Params::new().with("team", team_id).with("oldest", oldest),
            Paginate::Offset,
            "drafts",
        )
        .await
    }

    /// Replace a message's content with a tombstone.
    pub async fn tombstone_message(
        &self,
        ts: &str,
        channel_id: &str,
        team_id: &str,
        content: Option<&str>,
    ) -> Result<()> {
        let params = Params::new()
            .with("ts", ts)
            .with("channel", channel_id)
            .with("team", team_id)
            .with_opt("content", content);
        self.client
            .call("discovery.chat.tombstone", params, HttpMethod::Post, Paginate::None)
            .await
            .map(|_| ())
    }

    /// Replace a file with a tombstone.
    pub async fn tombstone_file(&self, file_id: &str, content: Option<&str>) -> Result<()> {
        let params = Params::new()
            .with("file", file_id)
            .with("title", FILE_TOMBSTONE_TITLE)
            .with_opt("content", content);
        self.client
            .call("discovery.file.tombstone", params, HttpMethod::Post, Paginate::None)
            .await
            .map(|_| ())
    }

    /// Single-page GET returning the value under `key`.
    async fn single(&self, endpoint: &str, params: Params, key: &str) -> Result<Value> {
        let mut pages = self
            .client
            .call(endpoint, params, HttpMethod::Get, Paginate::None)
            .await?;

        pages
            .first_mut()
            .and_then(|page| page.get_mut(key))
            .map(Value::take)
            .ok_or_else(|| ApiError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: format!("response has no {key:?} field"),
            })
    }

    /// Paginated GET returning the records under `key` of every page.
    async fn list(
        &self,
        endpoint: &str,
        params: Params,
        paginate: Paginate,
        key: &str,
    ) -> Result<Vec<Value>> {
        let pages = self
            .client
            .call(endpoint, params, HttpMethod::Get, paginate)
            .await?;
        Ok(flatten_pages(pages, key))
    }
}

/// Concatenate the arrays found under `key` in each page.
///
/// Pages without the key, or with a non-array value there, contribute nothing.
#[must_use]
pub fn flatten_pages(pages: Vec<Value>, key: &str) -> Vec<Value> {
    pages
        .into_iter()
        .filter_map(|mut page| match page.get_mut(key).map(Value::take) {
            Some(Value::Array(records)) => Some(records),
            _ => None,
        })
        .flatten()
        .collect()
}
