//! Entity fetchers.
//!
//! Identifier lists are fetched serially, then the per-item lookups are
//! spread over the worker pool. Each worker owns a clone of the fetcher and
//! applies the run's time window itself rather than trusting the endpoint to.
//! A failed lookup skips its item; only fatal API errors end the fetch.

use crate::error::{FetchError, Result};
use crate::models::{
    parse_record, parse_records, share_refs, Conversation, Draft, Enterprise, File,
    ListedConversation, Message, RawUser, User, Workspace,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use watchman_api::{ConversationFilter, SlackApi};
use watchman_core::pool::{run_partitioned, PoolOutcome, WorkerFailure};

/// Fetches the entity graph for one run window.
#[derive(Clone)]
pub struct Fetcher {
    api: SlackApi,
    oldest: i64,
    workers: usize,
}

impl Fetcher {
    /// Create a fetcher for content at or after `oldest` (epoch seconds).
    #[must_use]
    pub fn new(api: SlackApi, oldest: i64, workers: usize) -> Self {
        Self {
            api,
            oldest,
            workers: workers.max(1),
        }
    }

    /// The endpoint wrappers.
    #[must_use]
    pub fn api(&self) -> &SlackApi {
        &self.api
    }

    /// Start of the run window, epoch seconds.
    #[must_use]
    pub fn oldest(&self) -> i64 {
        self.oldest
    }

    /// Number of pool workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The enterprise, read through `team.info` of its own id.
    pub async fn enterprise(&self) -> Result<Enterprise> {
        let info = self.api.enterprise_info().await?;
        let id = info
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Malformed {
                kind: "enterprise",
                id: "<unknown>".to_string(),
                reason: "enterprise info has no id".to_string(),
            })?;

        parse_record(self.api.team_info(id).await?, "enterprise")
    }

    /// Every workspace of the enterprise.
    pub async fn workspaces(&self) -> Result<Vec<Workspace>> {
        let mut info = self.api.enterprise_info().await?;
        let teams = match info.get_mut("teams").map(Value::take) {
            Some(Value::Array(teams)) => teams,
            _ => Vec::new(),
        };
        Ok(parse_records(teams, "workspace"))
    }

    /// One workspace by team id.
    pub async fn workspace(&self, team_id: &str) -> Result<Workspace> {
        parse_record(self.api.team_info(team_id).await?, "workspace")
    }

    /// Every user, with the workspaces named by its `teams` field.
    pub async fn users(&self, workspaces: &[Workspace]) -> Result<Vec<User>> {
        let raw = self.api.all_users().await?;
        Ok(parse_records::<RawUser>(raw, "user")
            .into_iter()
            .map(|user| User::from_raw(user, workspaces))
            .collect())
    }

    /// Full conversation info, with shared workspaces resolved.
    pub async fn resolve_conversation(
        &self,
        channel_id: &str,
        team_id: Option<&str>,
    ) -> Result<Conversation> {
        let info = self.api.conversation_info(channel_id, team_id).await?;
        let mut conversation: Conversation = parse_record(info, "conversation")?;

        let mut shared = Vec::with_capacity(conversation.shared.shared_team_ids.len());
        for team in &conversation.shared.shared_team_ids {
            if let Some(workspace) = tolerate(self.workspace(team).await, "workspace", team)? {
                shared.push(workspace);
            }
        }
        conversation.shared_workspaces = shared;
        Ok(conversation)
    }

    /// Conversations created inside the window.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let listed: Vec<ListedConversation> = parse_records(
            self.api
                .all_conversations(ConversationFilter::default())
                .await?,
            "conversation",
        );
        let oldest = self.oldest;
        let listed: Vec<ListedConversation> = listed
            .into_iter()
            .filter(|conversation| conversation.created >= oldest)
            .collect();

        let fetcher = self.clone();
        let outcome = run_partitioned(listed, self.workers, move |_, chunk| {
            fetcher.clone().resolve_chunk(chunk)
        })
        .await;
        gather(outcome, "conversations")
    }

    /// Plain messages posted inside the window.
    pub async fn messages(&self) -> Result<Vec<Message>> {
        let recent: Vec<ListedConversation> = parse_records(
            self.api.recent_conversations(self.oldest).await?,
            "conversation",
        );
        info!(count = recent.len(), "conversations with recent activity");

        let fetcher = self.clone();
        let outcome = run_partitioned(recent, self.workers, move |_, chunk| {
            fetcher.clone().history_chunk(chunk)
        })
        .await;
        gather(outcome, "messages")
    }

    /// Files uploaded inside the window, with their shares resolved.
    ///
    /// Shares into direct messages are looked up under `enterprise_id`.
    pub async fn files(&self, enterprise_id: &str) -> Result<Vec<File>> {
        let listed = self.api.list_files(self.oldest).await?;
        let ids: Vec<String> = listed
            .iter()
            .filter_map(|file| file.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let fetcher = self.clone();
        let enterprise_id = enterprise_id.to_string();
        let outcome = run_partitioned(ids, self.workers, move |_, chunk| {
            fetcher.clone().file_chunk(chunk, enterprise_id.clone())
        })
        .await;
        gather(outcome, "files")
    }

    /// Drafts created inside the window, across `workspaces`.
    pub async fn drafts(&self, workspaces: &[Workspace]) -> Result<Vec<Draft>> {
        let team_ids: Vec<String> = workspaces.iter().map(|w| w.id.clone()).collect();

        let fetcher = self.clone();
        let outcome = run_partitioned(team_ids, self.workers, move |_, chunk| {
            fetcher.clone().draft_chunk(chunk)
        })
        .await;
        gather(outcome, "drafts")
    }

    async fn resolve_chunk(self, chunk: Vec<ListedConversation>) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::with_capacity(chunk.len());
        for listed in chunk {
            let resolved = self
                .resolve_conversation(&listed.id, listed.team.as_deref())
                .await;
            if let Some(conversation) = tolerate(resolved, "conversation", &listed.id)? {
                conversations.push(conversation);
            }
        }
        Ok(conversations)
    }

    async fn history_chunk(self, chunk: Vec<ListedConversation>) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for conversation in chunk {
            let history = self
                .api
                .conversation_history(&conversation.id, conversation.team.as_deref(), self.oldest)
                .await;
            let Some(records) = tolerate(history, "conversation", &conversation.id)? else {
                continue;
            };

            let plain = records.into_iter().filter(Message::is_plain).collect();
            for mut message in parse_records::<Message>(plain, "message") {
                if message.created() < self.oldest {
                    continue;
                }
                message.channel_id.clone_from(&conversation.id);
                message.channel_team.clone_from(&conversation.team);
                messages.push(message);
            }
        }
        Ok(messages)
    }

    async fn file_chunk(self, chunk: Vec<String>, enterprise_id: String) -> Result<Vec<File>> {
        let mut files = Vec::new();
        for id in chunk {
            let Some(raw) = tolerate(self.api.file_info(&id).await, "file", &id)? else {
                continue;
            };
            let refs = share_refs(&raw);
            if refs.is_empty() {
                debug!(file = %id, "file is not shared anywhere");
                continue;
            }
            let Some(mut file) = tolerate(parse_record::<File>(raw, "file"), "file", &id)? else {
                continue;
            };
            if file.created < self.oldest {
                continue;
            }

            for share in refs {
                let team = if Conversation::is_direct_message_id(&share.channel) {
                    Some(enterprise_id.as_str())
                } else {
                    share.team.as_deref()
                };
                let resolved = self.resolve_conversation(&share.channel, team).await;
                if let Some(conversation) = tolerate(resolved, "conversation", &share.channel)? {
                    file.shares.push(conversation);
                }
            }

            if !file.shares.is_empty() {
                files.push(file);
            }
        }
        Ok(files)
    }

    async fn draft_chunk(self, team_ids: Vec<String>) -> Result<Vec<Draft>> {
        let mut drafts = Vec::new();
        for team in team_ids {
            let listed = self.api.list_drafts(&team, self.oldest).await;
            let Some(records) = tolerate(listed, "workspace", &team)? else {
                continue;
            };
            drafts.extend(
                parse_records::<Draft>(records, "draft")
                    .into_iter()
                    .filter(|draft| draft.created >= self.oldest),
            );
        }
        Ok(drafts)
    }
}

/// Turn a non-fatal failure into a skipped item.
fn tolerate<T, E: Into<FetchError>>(
    result: std::result::Result<T, E>,
    kind: &'static str,
    id: &str,
) -> Result<Option<T>> {
    match result.map_err(Into::into) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(kind, id = %id, error = %e, "skipping item after lookup failure");
            Ok(None)
        }
    }
}

/// Merge pool output, propagating the first fatal worker error.
fn gather<R>(outcome: PoolOutcome<R, FetchError>, what: &str) -> Result<Vec<R>> {
    let mut fatal = None;
    for failure in outcome.failures {
        match failure {
            WorkerFailure::Failed { error, .. } if error.is_fatal() => {
                fatal.get_or_insert(error);
            }
            WorkerFailure::Failed { worker, error } => {
                warn!(worker, error = %error, "{what} worker failed");
            }
            WorkerFailure::Panicked { worker, message } => {
                error!(worker, message = %message, "{what} worker panicked");
            }
        }
    }

    match fatal {
        Some(error) => Err(error),
        None => {
            info!(count = outcome.results.len(), "{what} fetched");
            Ok(outcome.results)
        }
    }
}
