//! Typed entity models.
//!
//! Raw records are parsed at the fetcher boundary. Fields that are absent or
//! `null` take their empty value; a record of the wrong shape is skipped with
//! a warning by [`parse_records`].

pub(crate) mod de;

mod conversation;
mod enterprise;
mod post;
mod user;
mod workspace;

pub use conversation::{Conversation, ConversationKind, ListedConversation, Shared, TopicInfo};
pub use enterprise::Enterprise;
pub use post::{share_refs, Draft, File, Message, ShareRef, UNDISPLAYABLE_TEXT};
pub use user::{RawUser, User, UserProfile};
pub use workspace::Workspace;

use crate::error::{FetchError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Parse every record, skipping and logging the ones of the wrong shape.
pub fn parse_records<T: DeserializeOwned>(records: Vec<Value>, kind: &'static str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record_id(&record);
            match serde_json::from_value(record) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(kind, id = %id, error = %e, "skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

/// Parse a single record that the caller cannot continue without.
pub fn parse_record<T: DeserializeOwned>(record: Value, kind: &'static str) -> Result<T> {
    let id = record_id(&record);
    serde_json::from_value(record).map_err(|e| FetchError::Malformed {
        kind,
        id,
        reason: e.to_string(),
    })
}

fn record_id(record: &Value) -> String {
    record
        .get("id")
        .or_else(|| record.get("client_msg_id"))
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string()
}
