//! Notification records and the sinks they are delivered to.

use crate::error::{Result, ScanError};
use crate::result::{MatchResult, MatchedPost};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use watchman_core::types::format_epoch;
use watchman_signatures::Scope;
use watchman_slack::{Conversation, Enterprise, User, Workspace};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyType {
    /// The enterprise itself
    Enterprise,
    /// An enumerated workspace
    Workspace,
    /// An enumerated user
    User,
    /// An enumerated conversation
    Conversation,
    /// A signature match
    Result,
}

/// A single record handed to a [`ResultSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// What the record is about
    pub notify_type: NotifyType,
    /// Severity of the matching signature
    pub severity: Option<u32>,
    /// Signature name for results, entity kind otherwise
    pub detection_type: String,
    /// Scope of a result
    pub scope: Option<Scope>,
    /// The entity or result as JSON
    pub payload: Value,
    /// One-line `KEY: value` rendering
    #[serde(skip)]
    pub summary: String,
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "None"
    } else {
        value
    }
}

impl Notification {
    fn entity(notify_type: NotifyType, kind: &str, payload: Value, summary: String) -> Self {
        Self {
            notify_type,
            severity: None,
            detection_type: kind.to_string(),
            scope: None,
            payload,
            summary,
        }
    }

    /// Notification for the enterprise.
    pub fn enterprise(enterprise: &Enterprise) -> Result<Self> {
        let summary = format!(
            "ENTERPRISE: ID: {} NAME: {} DOMAIN: {} URL: {}",
            enterprise.id,
            or_none(&enterprise.name),
            or_none(&enterprise.domain),
            enterprise.url()
        );
        Ok(Self::entity(
            NotifyType::Enterprise,
            "Enterprise",
            serde_json::to_value(enterprise)?,
            summary,
        ))
    }

    /// Notification for a workspace.
    pub fn workspace(workspace: &Workspace) -> Result<Self> {
        let summary = format!(
            "WORKSPACE: ID: {} NAME: {} DOMAIN: {} URL: {}",
            workspace.id,
            or_none(&workspace.name),
            or_none(&workspace.domain),
            workspace.url()
        );
        Ok(Self::entity(
            NotifyType::Workspace,
            "Workspace",
            serde_json::to_value(workspace)?,
            summary,
        ))
    }

    /// Notification for a user.
    pub fn user(user: &User) -> Result<Self> {
        let summary = format!(
            "USER: ID: {} NAME: {} EMAIL: {} TITLE: {} WORKSPACES: {}",
            user.id,
            or_none(&user.real_name),
            or_none(&user.email),
            or_none(&user.title),
            user.workspaces.len()
        );
        Ok(Self::entity(
            NotifyType::User,
            "User",
            serde_json::to_value(user)?,
            summary,
        ))
    }

    /// Notification for a conversation.
    pub fn conversation(conversation: &Conversation) -> Result<Self> {
        let summary = format!(
            "CONVERSATION: ID: {} NAME: {} CONVERSATION_TYPE: {} CREATED: {}",
            conversation.id,
            or_none(&conversation.name),
            conversation.kind(),
            format_epoch(conversation.created)
        );
        Ok(Self::entity(
            NotifyType::Conversation,
            "Conversation",
            serde_json::to_value(conversation)?,
            summary,
        ))
    }

    /// Notification for a match.
    pub fn result(result: &MatchResult) -> Result<Self> {
        let posted_by = result.user.as_ref().map_or("None", |u| or_none(&u.email));
        let conversation = result.conversation.as_ref();
        let conversation_name = conversation.map_or("None", |c| or_none(&c.name));
        let conversation_type =
            conversation.map_or_else(|| "None".to_string(), |c| c.kind().to_string());
        let url = result.url.as_deref().unwrap_or("None");

        let summary = match &result.post {
            MatchedPost::Message(_) => format!(
                "POST_TYPE: Message POTENTIAL_SECRET: {} POSTED_BY: {} POSTED_ON: {} \
                 WORKSPACE: {} CONVERSATION: {} CONVERSATION_TYPE: {} URL: {}",
                result.match_string,
                posted_by,
                result.timestamp,
                result.workspace.as_ref().map_or("None", |w| or_none(&w.name)),
                conversation_name,
                conversation_type,
                url
            ),
            MatchedPost::File(file) => format!(
                "POST_TYPE: File FILE_NAME: {} POSTED_BY: {} CREATED: {} \
                 CONVERSATION: {} CONVERSATION_TYPE: {} URL: {}",
                or_none(&file.name),
                posted_by,
                result.timestamp,
                conversation_name,
                conversation_type,
                url
            ),
            MatchedPost::Draft(_) => format!(
                "POST_TYPE: Draft POTENTIAL_SECRET: {} CREATED_BY: {} CREATED_ON: {}",
                result.match_string, posted_by, result.timestamp
            ),
        };

        Ok(Self {
            notify_type: NotifyType::Result,
            severity: Some(result.severity),
            detection_type: result.signature.clone(),
            scope: Some(result.scope),
            payload: serde_json::to_value(result)?,
            summary,
        })
    }
}

/// Destination for notifications.
pub trait ResultSink: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Emits each notification as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl ResultSink for TerminalSink {
    fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.notify_type {
            NotifyType::Result => warn!(
                target: "watchman::result",
                severity = notification.severity.unwrap_or_default(),
                detection_type = %notification.detection_type,
                scope = notification.scope.map_or("", Scope::as_str),
                "{}",
                notification.summary
            ),
            other => info!(
                target: "watchman::notify",
                notify_type = ?other,
                "{}",
                notification.summary
            ),
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    level: &'static str,
    notify_type: NotifyType,
    scope: Option<Scope>,
    severity: Option<u32>,
    detection_type: &'a str,
    detection_data: &'a Value,
}

/// Writes one JSON object per notification, one per line.
pub struct JsonSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonSink<io::Stdout> {
    /// Sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonSink<W> {
    /// Wrap a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> ResultSink for JsonSink<W> {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let record = JsonRecord {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: "NOTIFY",
            notify_type: notification.notify_type,
            scope: notification.scope,
            severity: notification.severity,
            detection_type: &notification.detection_type,
            detection_data: &notification.payload,
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &record)?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| ScanError::Sink(e.to_string()))
    }
}
