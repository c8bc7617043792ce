use super::de::{epoch, nullable};
use super::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic or purpose of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Text of the topic
    #[serde(default, deserialize_with = "nullable", alias = "value")]
    pub text: String,
    /// Who set it
    #[serde(default, deserialize_with = "nullable", alias = "creator")]
    pub set_by: String,
    /// When it was set, epoch seconds
    #[serde(default, deserialize_with = "epoch", alias = "last_set")]
    pub date_set: i64,
}

/// Team membership of a shared conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shared {
    /// Workspaces of this enterprise the conversation is shared with
    #[serde(default, deserialize_with = "nullable")]
    pub shared_team_ids: Vec<String>,
    /// External teams connected through Slack Connect
    #[serde(default, deserialize_with = "nullable")]
    pub connected_team_ids: Vec<String>,
    /// Internal teams
    #[serde(default, deserialize_with = "nullable")]
    pub internal_team_ids: Vec<String>,
}

/// Display class of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    /// Direct message
    DirectMessage,
    /// Private channel (including group DMs)
    PrivateChannel,
    /// Public channel
    PublicChannel,
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectMessage => "Direct Message",
            Self::PrivateChannel => "Private Channel",
            Self::PublicChannel => "Public Channel",
        })
    }
}

/// A channel, group DM or direct message.
///
/// Deserialized from `discovery.conversations.info`. `shared_workspaces` is
/// not part of the raw record; the fetcher fills it from `shared` by resolving
/// each team id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id (`C…`, `G…` or `D…`)
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Channel name, empty for DMs
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Normalized channel name
    #[serde(default, deserialize_with = "nullable")]
    pub name_normalized: String,
    /// Creation time, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub created: i64,
    /// Creator's user id
    #[serde(default, deserialize_with = "nullable")]
    pub creator: String,
    /// Number of members
    #[serde(default, deserialize_with = "nullable")]
    pub member_count: u64,
    /// Private channel
    #[serde(default, deserialize_with = "nullable")]
    pub is_private: bool,
    /// Direct message
    #[serde(default, deserialize_with = "nullable")]
    pub is_im: bool,
    /// Multi-party direct message
    #[serde(default, deserialize_with = "nullable")]
    pub is_mpim: bool,
    /// Archived
    #[serde(default, deserialize_with = "nullable")]
    pub is_archived: bool,
    /// Deleted
    #[serde(default, deserialize_with = "nullable")]
    pub is_deleted: bool,
    /// The workspace's `#general`
    #[serde(default, deserialize_with = "nullable")]
    pub is_general: bool,
    /// Shared across the whole organization
    #[serde(default, deserialize_with = "nullable")]
    pub is_org_shared: bool,
    /// Shared with every workspace
    #[serde(default, deserialize_with = "nullable")]
    pub is_global_shared: bool,
    /// Shared with an external organization
    #[serde(default, deserialize_with = "nullable")]
    pub is_ext_shared: bool,
    /// Has guest members
    #[serde(default, deserialize_with = "nullable")]
    pub has_guests: bool,
    /// Earlier names of the channel
    #[serde(default, deserialize_with = "nullable")]
    pub previous_names: Vec<String>,
    /// Current topic
    #[serde(default, deserialize_with = "nullable")]
    pub topic: TopicInfo,
    /// Current purpose
    #[serde(default, deserialize_with = "nullable")]
    pub purpose: TopicInfo,
    /// Raw sharing information
    #[serde(default, deserialize_with = "nullable", skip_serializing)]
    pub shared: Shared,
    /// Workspaces the conversation is shared with
    #[serde(default, skip_deserializing)]
    pub shared_workspaces: Vec<Workspace>,
}

impl Conversation {
    /// Display class, with precedence im > private > public.
    #[must_use]
    pub fn kind(&self) -> ConversationKind {
        if self.is_im {
            ConversationKind::DirectMessage
        } else if self.is_private {
            ConversationKind::PrivateChannel
        } else {
            ConversationKind::PublicChannel
        }
    }

    /// Whether `id` names a direct-message channel.
    #[must_use]
    pub fn is_direct_message_id(id: &str) -> bool {
        id.starts_with('D')
    }
}

/// A conversation as returned by the list endpoints: just enough to look up
/// its history or full info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListedConversation {
    /// Conversation id
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Team the conversation was listed under
    #[serde(default, alias = "team_id")]
    pub team: Option<String>,
    /// Creation time, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub created: i64,
}
