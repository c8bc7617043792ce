//! Tombstoning of matched messages and files.

use crate::error::{Result, ScanError};
use crate::result::{MatchResult, MatchedPost};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};
use watchman_api::SlackApi;
use watchman_signatures::Scope;

/// Read custom tombstone text.
pub fn load_replacement_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ScanError::ReplacementText {
        path: path.to_path_buf(),
        source,
    })
}

/// One tombstone call that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationFailure {
    /// Scope of the post
    pub scope: Scope,
    /// Message ts or file id
    pub target: String,
    /// Failure description
    pub error: String,
}

/// Outcome of a remediation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemediationReport {
    /// Posts replaced with a tombstone
    pub tombstoned: usize,
    /// Results not acted on: drafts and posts already handled
    pub skipped: usize,
    /// Calls that failed
    pub failures: Vec<RemediationFailure>,
}

impl RemediationReport {
    /// Fold another pass into this one.
    pub fn merge(&mut self, other: RemediationReport) {
        self.tombstoned += other.tombstoned;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Replaces matched posts with tombstones.
///
/// A driver remembers every post it has acted on, so a post matched by
/// several signatures in one run is tombstoned once.
pub struct RemediationDriver {
    api: SlackApi,
    content: Option<String>,
    done: Mutex<HashSet<(Scope, String)>>,
}

impl RemediationDriver {
    /// Create a driver. `content` replaces the platform's default tombstone
    /// text when given.
    #[must_use]
    pub fn new(api: SlackApi, content: Option<String>) -> Self {
        Self {
            api,
            content,
            done: Mutex::new(HashSet::new()),
        }
    }

    /// Claim a post for this driver. False when it was claimed before.
    fn claim(&self, scope: Scope, key: String) -> bool {
        self.done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope, key))
    }

    /// Tombstone every message and file result not already handled by this
    /// driver.
    ///
    /// A failed call is recorded and the pass continues, except for a missing
    /// scope, which would fail every following call too and ends the pass.
    pub async fn remediate(&self, results: &[MatchResult]) -> Result<RemediationReport> {
        let mut report = RemediationReport::default();
        let content = self.content.as_deref();

        for result in results {
            let (target, outcome) = match &result.post {
                MatchedPost::Draft(_) => {
                    report.skipped += 1;
                    continue;
                }
                MatchedPost::Message(message) => {
                    if !self.claim(Scope::Messages, format!("{}:{}", message.channel_id, message.ts)) {
                        report.skipped += 1;
                        continue;
                    }
                    let channel_id = result
                        .conversation
                        .as_ref()
                        .map_or(message.channel_id.as_str(), |c| c.id.as_str());
                    let team_id = if message.team.is_empty() {
                        message.channel_team.as_deref().unwrap_or_default()
                    } else {
                        message.team.as_str()
                    };
                    let outcome = self
                        .api
                        .tombstone_message(&message.ts, channel_id, team_id, content)
                        .await;
                    (message.ts.clone(), outcome)
                }
                MatchedPost::File(file) => {
                    if !self.claim(Scope::Files, file.id.clone()) {
                        report.skipped += 1;
                        continue;
                    }
                    let outcome = self.api.tombstone_file(&file.id, content).await;
                    (file.id.clone(), outcome)
                }
            };

            match outcome {
                Ok(()) => {
                    debug!(scope = result.scope.as_str(), target = %target, "tombstoned");
                    report.tombstoned += 1;
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(scope = result.scope.as_str(), target = %target, error = %e, "tombstone failed");
                    report.failures.push(RemediationFailure {
                        scope: result.scope,
                        target,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            tombstoned = report.tombstoned,
            failed = report.failures.len(),
            skipped = report.skipped,
            "remediation pass finished"
        );
        Ok(report)
    }
}
