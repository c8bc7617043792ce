//! Run orchestrator.
//!
//! A run fetches the enterprise graph once, then scans messages and files for
//! every signature, remediating as it goes when asked to, and finally scans
//! drafts. Every notification goes through the injected [`ResultSink`].

use crate::engine::{ScanContext, ScanEngine};
use crate::error::Result;
use crate::remediation::{RemediationDriver, RemediationReport};
use crate::result::MatchResult;
use crate::sink::{Notification, ResultSink};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;
use watchman_signatures::{Scope, SignatureRegistry};
use watchman_slack::Fetcher;

/// What a run does besides scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Notify every user
    pub enumerate_users: bool,
    /// Notify every workspace
    pub enumerate_workspaces: bool,
    /// Notify every conversation created in the window
    pub enumerate_conversations: bool,
    /// Tombstone message and file matches
    pub tombstone: bool,
    /// Custom tombstone text
    pub replacement_text: Option<String>,
}

/// Counts of one finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Id attached to the run's tracing span
    pub run_id: Uuid,
    /// Signatures evaluated
    pub signatures: usize,
    /// Workspaces in the enterprise
    pub workspaces: usize,
    /// Users in the enterprise
    pub users: usize,
    /// Conversations enumerated, zero unless asked for
    pub conversations: usize,
    /// Files in the window
    pub files: usize,
    /// Messages in the window
    pub messages: usize,
    /// Drafts in the window
    pub drafts: usize,
    /// Results delivered to the sink
    pub results: usize,
    /// Remediation outcome when tombstoning was enabled
    pub remediation: Option<RemediationReport>,
}

impl RunSummary {
    fn new(run_id: Uuid, signatures: usize) -> Self {
        Self {
            run_id,
            signatures,
            workspaces: 0,
            users: 0,
            conversations: 0,
            files: 0,
            messages: 0,
            drafts: 0,
            results: 0,
            remediation: None,
        }
    }
}

/// Drives a complete scan of an enterprise.
pub struct Watchman {
    fetcher: Fetcher,
    options: RunOptions,
}

impl Watchman {
    /// Create a runner.
    #[must_use]
    pub fn new(fetcher: Fetcher, options: RunOptions) -> Self {
        Self { fetcher, options }
    }

    /// Run every signature of `registry` and deliver results to `sink`.
    pub async fn run(
        &self,
        registry: &SignatureRegistry,
        sink: &dyn ResultSink,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.execute(run_id, registry, sink).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        registry: &SignatureRegistry,
        sink: &dyn ResultSink,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new(run_id, registry.count());
        info!(
            signatures = summary.signatures,
            oldest = self.fetcher.oldest(),
            workers = self.fetcher.workers(),
            "starting run"
        );

        let enterprise = self.fetcher.enterprise().await?;
        sink.notify(&Notification::enterprise(&enterprise)?)?;

        let workspaces = self.fetcher.workspaces().await?;
        summary.workspaces = workspaces.len();
        info!(count = summary.workspaces, "workspaces discovered");

        let users = self.fetcher.users(&workspaces).await?;
        summary.users = users.len();
        info!(count = summary.users, "users discovered");

        if self.options.enumerate_workspaces {
            for workspace in &workspaces {
                sink.notify(&Notification::workspace(workspace)?)?;
            }
        }
        if self.options.enumerate_users {
            for user in &users {
                sink.notify(&Notification::user(user)?)?;
            }
        }
        if self.options.enumerate_conversations {
            let conversations = self.fetcher.conversations().await?;
            summary.conversations = conversations.len();
            for conversation in &conversations {
                sink.notify(&Notification::conversation(conversation)?)?;
            }
            info!(count = summary.conversations, "conversations enumerated");
        }

        let engine = ScanEngine::new(
            self.fetcher.clone(),
            ScanContext::new(&enterprise.id, &users, &workspaces),
        );
        let driver = self.options.tombstone.then(|| {
            RemediationDriver::new(
                self.fetcher.api().clone(),
                self.options.replacement_text.clone(),
            )
        });
        let mut remediation = RemediationReport::default();

        let files = self.fetcher.files(&enterprise.id).await?;
        summary.files = files.len();
        info!(count = summary.files, "files in window");

        let messages = self.fetcher.messages().await?;
        summary.messages = messages.len();
        info!(count = summary.messages, "messages in window");

        for signature in registry.iter() {
            for scope in &signature.scope {
                let results = match scope {
                    Scope::Messages => engine.scan_messages(signature, &messages).await?,
                    Scope::Files => engine.scan_files(signature, &files).await?,
                    Scope::Drafts => continue,
                };
                summary.results += deliver(&results, sink)?;
                if let Some(driver) = &driver {
                    remediation.merge(driver.remediate(&results).await?);
                }
            }
        }

        let draft_signatures = registry.for_scope(Scope::Drafts);
        if !draft_signatures.is_empty() {
            let drafts = self.fetcher.drafts(&workspaces).await?;
            summary.drafts = drafts.len();
            info!(count = summary.drafts, "drafts in window");

            for signature in &draft_signatures {
                let results = engine.scan_drafts(signature, &drafts).await?;
                summary.results += deliver(&results, sink)?;
            }
        }

        if driver.is_some() {
            summary.remediation = Some(remediation);
        }
        info!(
            results = summary.results,
            files = summary.files,
            messages = summary.messages,
            drafts = summary.drafts,
            "run finished"
        );
        Ok(summary)
    }
}

fn deliver(results: &[MatchResult], sink: &dyn ResultSink) -> Result<usize> {
    for result in results {
        sink.notify(&Notification::result(result)?)?;
    }
    Ok(results.len())
}
