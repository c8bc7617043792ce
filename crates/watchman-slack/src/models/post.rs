//! Posts: messages, files and drafts.

use super::conversation::Conversation;
use super::de::{epoch, nullable};
use crate::blocks::{text_leaves, BlockNode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use watchman_core::types::ts_seconds;

/// Text the platform substitutes when a message only renders as blocks.
pub const UNDISPLAYABLE_TEXT: &str = "This content can\u{2019}t be displayed.";

/// A message from a conversation's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Client message id
    #[serde(rename = "client_msg_id", default, deserialize_with = "nullable")]
    pub id: String,
    /// Message timestamp, `seconds.micros`; unique within a conversation
    #[serde(default, deserialize_with = "nullable")]
    pub ts: String,
    /// Team the message was posted in
    #[serde(default, deserialize_with = "nullable")]
    pub team: String,
    /// Author's user id
    #[serde(default, deserialize_with = "nullable")]
    pub user: String,
    /// Bot id when posted by an app
    #[serde(default, deserialize_with = "nullable")]
    pub bot_id: String,
    /// Message type
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    /// Primary text
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    /// Block Kit content
    #[serde(default, deserialize_with = "nullable")]
    pub blocks: Vec<BlockNode>,
    /// Conversation the message was fetched from
    #[serde(default, skip_deserializing)]
    pub channel_id: String,
    /// Team the conversation was listed under; a lookup hint only
    #[serde(skip)]
    pub channel_team: Option<String>,
}

impl Message {
    /// Whether a raw history record is a plain message: no attached files and
    /// no subtype (joins, bot events, thread broadcasts and so on).
    #[must_use]
    pub fn is_plain(raw: &Value) -> bool {
        let has_files = raw
            .get("files")
            .and_then(Value::as_array)
            .is_some_and(|files| !files.is_empty());
        let has_subtype = raw.get("subtype").is_some_and(|subtype| !subtype.is_null());
        !has_files && !has_subtype
    }

    /// Posting time, epoch seconds.
    #[must_use]
    pub fn created(&self) -> i64 {
        ts_seconds(&self.ts).unwrap_or(0)
    }

    /// Text to match against: the primary text, or the block text when the
    /// primary text is empty or the undisplayable placeholder.
    #[must_use]
    pub fn searchable_texts(&self) -> Vec<&str> {
        if self.text.is_empty() || self.text == UNDISPLAYABLE_TEXT {
            text_leaves(&self.blocks)
        } else {
            vec![self.text.as_str()]
        }
    }
}

/// A conversation a file was shared into, as referenced by `file.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRef {
    /// Conversation id
    pub channel: String,
    /// Team the share was made in
    pub team: Option<String>,
}

/// Extract share references from a raw `file.info` record.
///
/// Accepts both the list form (`[{"channel": "C1", "team": "T1"}]`) and the
/// visibility map form (`{"public": {"C1": [{"team_id": "T1"}]}}`).
#[must_use]
pub fn share_refs(raw: &Value) -> Vec<ShareRef> {
    let mut refs: Vec<ShareRef> = Vec::new();
    let mut push = |channel: &str, team: Option<&str>| {
        if !channel.is_empty() && !refs.iter().any(|r| r.channel == channel) {
            refs.push(ShareRef {
                channel: channel.to_string(),
                team: team.map(str::to_string),
            });
        }
    };

    match raw.get("shares") {
        Some(Value::Array(entries)) => {
            for entry in entries {
                let channel = entry
                    .get("channel")
                    .or_else(|| entry.get("channel_id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let team = entry
                    .get("team")
                    .or_else(|| entry.get("team_id"))
                    .and_then(Value::as_str);
                push(channel, team);
            }
        }
        Some(Value::Object(by_visibility)) => {
            for channels in by_visibility.values().filter_map(Value::as_object) {
                for (channel, shares) in channels {
                    let team = shares
                        .as_array()
                        .and_then(|shares| shares.first())
                        .and_then(|share| share.get("team_id"))
                        .and_then(Value::as_str);
                    push(channel, team);
                }
            }
        }
        _ => {}
    }
    refs
}

/// An uploaded file.
///
/// `shares` is filled by the fetcher with resolved conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// File id
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Team the file was uploaded to
    #[serde(default, deserialize_with = "nullable")]
    pub team: String,
    /// Uploader's user id
    #[serde(default, deserialize_with = "nullable")]
    pub user: String,
    /// Upload time, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub created: i64,
    /// File name
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Title shown in the client
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// MIME type
    #[serde(default, deserialize_with = "nullable")]
    pub mimetype: String,
    /// Platform file type, e.g. `pdf`
    #[serde(default, deserialize_with = "nullable")]
    pub filetype: String,
    /// Human-readable type
    #[serde(default, deserialize_with = "nullable")]
    pub pretty_type: String,
    /// Editable in the client
    #[serde(default, deserialize_with = "nullable")]
    pub editable: bool,
    /// Size in bytes
    #[serde(default, deserialize_with = "nullable")]
    pub size: u64,
    /// Storage mode, e.g. `hosted`
    #[serde(default, deserialize_with = "nullable")]
    pub mode: String,
    /// Shared into a public channel
    #[serde(default, deserialize_with = "nullable")]
    pub is_public: bool,
    /// Has a public link
    #[serde(default, deserialize_with = "nullable")]
    pub public_url_shared: bool,
    /// Authenticated URL
    #[serde(default, deserialize_with = "nullable")]
    pub url_private: String,
    /// Authenticated download URL
    #[serde(default, deserialize_with = "nullable")]
    pub url_private_download: String,
    /// Conversations the file is shared into
    #[serde(default, skip_deserializing)]
    pub shares: Vec<Conversation>,
}

/// An unsent or scheduled message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Draft id
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Owning team
    #[serde(rename = "team_id", default, deserialize_with = "nullable")]
    pub team: String,
    /// Author's user id
    #[serde(rename = "user_id", default, deserialize_with = "nullable")]
    pub user: String,
    /// Creation time, epoch seconds
    #[serde(rename = "date_created", default, deserialize_with = "epoch")]
    pub created: i64,
    /// Client message id
    #[serde(default, deserialize_with = "nullable")]
    pub client_msg_id: String,
    /// Last edit time, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub last_updated_ts: i64,
    /// Client that made the last edit
    #[serde(default, deserialize_with = "nullable")]
    pub last_updated_client: String,
    /// Block Kit content
    #[serde(default, deserialize_with = "nullable")]
    pub blocks: Vec<BlockNode>,
    /// Attached file ids
    #[serde(default, deserialize_with = "nullable")]
    pub file_ids: Vec<String>,
    /// Written in the main composer
    #[serde(default, deserialize_with = "nullable")]
    pub is_from_composer: bool,
    /// Deleted by the author
    #[serde(default, deserialize_with = "nullable")]
    pub is_deleted: bool,
    /// Already sent
    #[serde(default, deserialize_with = "nullable")]
    pub is_sent: bool,
    /// Destination conversation ids
    #[serde(default, deserialize_with = "destination_ids")]
    pub destinations: Vec<String>,
    /// Scheduled send time, epoch seconds, 0 when unscheduled
    #[serde(default, deserialize_with = "epoch")]
    pub date_scheduled: i64,
}

impl Draft {
    /// Text to match against.
    #[must_use]
    pub fn searchable_texts(&self) -> Vec<&str> {
        text_leaves(&self.blocks)
    }

    /// First destination conversation, if any.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destinations.first().map(String::as_str)
    }
}

#[derive(Deserialize)]
struct Destination {
    #[serde(default)]
    channel_id: Option<String>,
}

fn destination_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let destinations: Vec<Destination> = nullable(deserializer)?;
    Ok(destinations
        .into_iter()
        .filter_map(|d| d.channel_id.filter(|id| !id.is_empty()))
        .collect())
}
