//! Match results.

use serde::Serialize;
use watchman_core::types::format_epoch;
use watchman_signatures::{Scope, Signature};
use watchman_slack::{Conversation, Draft, File, Message, User, Workspace};

/// The post a match was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedPost {
    /// A conversation message
    Message(Message),
    /// An uploaded file
    File(File),
    /// An unsent draft
    Draft(Draft),
}

impl MatchedPost {
    /// Identifier of the post: client message id, file id or draft id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Message(message) => &message.id,
            Self::File(file) => &file.id,
            Self::Draft(draft) => &draft.id,
        }
    }

    /// Creation time, epoch seconds.
    #[must_use]
    pub fn created(&self) -> i64 {
        match self {
            Self::Message(message) => message.created(),
            Self::File(file) => file.created,
            Self::Draft(draft) => draft.created,
        }
    }

    /// Scope the post belongs to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Message(_) => Scope::Messages,
            Self::File(_) => Scope::Files,
            Self::Draft(_) => Scope::Drafts,
        }
    }
}

/// A confirmed, location-filtered match of one signature.
///
/// Field order is fixed and no field is a hash map, so the JSON form is
/// canonical and can be compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Name of the signature that matched
    pub signature: String,
    /// Severity of that signature
    pub severity: u32,
    /// Scope the match was found in
    pub scope: Scope,
    /// Matched text
    pub match_string: String,
    /// Creation time of the post, `YYYY-MM-DD HH:MM:SS` UTC
    pub timestamp: String,
    /// The post itself
    #[serde(flatten)]
    pub post: MatchedPost,
    /// Author, without its workspace list
    pub user: Option<User>,
    /// Workspace the post belongs to
    pub workspace: Option<Workspace>,
    /// Conversation the post was found in
    pub conversation: Option<Conversation>,
    /// Permalink for messages, download URL for files
    pub url: Option<String>,
}

impl MatchResult {
    /// Start a result for `post` matched by `signature`.
    #[must_use]
    pub fn new(signature: &Signature, post: MatchedPost, match_string: String) -> Self {
        Self {
            signature: signature.name().to_string(),
            severity: signature.severity(),
            scope: post.scope(),
            match_string,
            timestamp: format_epoch(post.created()),
            post,
            user: None,
            workspace: None,
            conversation: None,
            url: None,
        }
    }

    /// Attach the author.
    #[must_use]
    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    /// Attach the owning workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace: Option<Workspace>) -> Self {
        self.workspace = workspace;
        self
    }

    /// Attach the conversation.
    #[must_use]
    pub fn with_conversation(mut self, conversation: Option<Conversation>) -> Self {
        self.conversation = conversation;
        self
    }

    /// Attach a link to the post.
    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// Permalink of a message.
#[must_use]
pub fn permalink(domain: &str, channel_id: &str, ts: &str) -> String {
    format!(
        "https://{domain}.slack.com/archives/{channel_id}/p{}",
        ts.replace('.', "")
    )
}
