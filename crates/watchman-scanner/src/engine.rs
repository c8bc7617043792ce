//! Parallel scan engine.
//!
//! A collection is split into one contiguous partition per worker. Each
//! worker pre-filters its entries on the signature's search strings, confirms
//! with the pattern, resolves context and applies the location gate before an
//! entry reaches its local result list. Lists are merged after every worker
//! has finished and deduplicated by canonical form.

use crate::dedup::deduplicate;
use crate::error::{Result, ScanError};
use crate::location::allowed;
use crate::result::{permalink, MatchResult, MatchedPost};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use watchman_core::pool::{run_partitioned, PoolOutcome, WorkerFailure};
use watchman_signatures::{CompiledSignature, Signature};
use watchman_slack::{Conversation, Draft, Fetcher, File, Message, User, Workspace};

/// Read-only lookup tables shared by every worker of a run.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    enterprise_id: String,
    users: HashMap<String, User>,
    workspaces: HashMap<String, Workspace>,
}

impl ScanContext {
    /// Index the run's users and workspaces.
    #[must_use]
    pub fn new(enterprise_id: &str, users: &[User], workspaces: &[Workspace]) -> Self {
        Self {
            enterprise_id: enterprise_id.to_string(),
            users: users
                .iter()
                .map(|user| (user.id.clone(), user.without_workspaces()))
                .collect(),
            workspaces: workspaces
                .iter()
                .map(|workspace| (workspace.id.clone(), workspace.clone()))
                .collect(),
        }
    }

    /// Enterprise id, used as the team of direct-message lookups.
    #[must_use]
    pub fn enterprise_id(&self) -> &str {
        &self.enterprise_id
    }

    /// A user by id, with its workspace list cleared.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }

    /// A workspace by team id.
    #[must_use]
    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.get(id)
    }
}

/// Matches collections against one signature at a time.
#[derive(Clone)]
pub struct ScanEngine {
    fetcher: Fetcher,
    context: Arc<ScanContext>,
}

impl ScanEngine {
    /// Create an engine using the fetcher's worker count and window.
    #[must_use]
    pub fn new(fetcher: Fetcher, context: ScanContext) -> Self {
        Self {
            fetcher,
            context: Arc::new(context),
        }
    }

    /// The shared lookup tables.
    #[must_use]
    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    /// Scan messages. Each match is resolved to its conversation.
    pub async fn scan_messages(
        &self,
        signature: &Arc<Signature>,
        messages: &[Message],
    ) -> Result<Vec<MatchResult>> {
        let compiled = Arc::new(CompiledSignature::new(Arc::clone(signature))?);
        let engine = self.clone();
        let outcome = run_partitioned(
            messages.to_vec(),
            self.fetcher.workers(),
            move |_, chunk| engine.clone().match_messages(Arc::clone(&compiled), chunk),
        )
        .await;
        merge(outcome, signature, "messages")
    }

    /// Scan files by title and declared file types. A file yields one result
    /// per sharing conversation that passes the location gate.
    pub async fn scan_files(
        &self,
        signature: &Arc<Signature>,
        files: &[File],
    ) -> Result<Vec<MatchResult>> {
        let compiled = Arc::new(CompiledSignature::new(Arc::clone(signature))?);
        let engine = self.clone();
        let outcome = run_partitioned(
            files.to_vec(),
            self.fetcher.workers(),
            move |_, chunk| engine.clone().match_files(Arc::clone(&compiled), chunk),
        )
        .await;
        merge(outcome, signature, "files")
    }

    /// Scan drafts created inside the window.
    pub async fn scan_drafts(
        &self,
        signature: &Arc<Signature>,
        drafts: &[Draft],
    ) -> Result<Vec<MatchResult>> {
        let compiled = Arc::new(CompiledSignature::new(Arc::clone(signature))?);
        let engine = self.clone();
        let outcome = run_partitioned(
            drafts.to_vec(),
            self.fetcher.workers(),
            move |_, chunk| engine.clone().match_drafts(Arc::clone(&compiled), chunk),
        )
        .await;
        merge(outcome, signature, "drafts")
    }

    async fn match_messages(
        self,
        signature: Arc<CompiledSignature>,
        chunk: Vec<Message>,
    ) -> Result<Vec<MatchResult>> {
        let mut results = Vec::new();
        for message in chunk {
            let Some(match_string) = confirm_texts(&signature, &message.searchable_texts()) else {
                continue;
            };

            let resolved = self
                .fetcher
                .resolve_conversation(&message.channel_id, message.channel_team.as_deref())
                .await;
            let Some(conversation) = tolerate(resolved, &message.channel_id)? else {
                continue;
            };
            if !allowed(&conversation, signature.signature()) {
                debug!(channel = %conversation.id, "match outside signature locations");
                continue;
            }

            let workspace = self.context.workspace(&message.team).cloned();
            let url = workspace
                .as_ref()
                .map(|w| permalink(&w.domain, &conversation.id, &message.ts));
            let user = self.context.user(&message.user);

            results.push(
                MatchResult::new(
                    signature.signature(),
                    MatchedPost::Message(message),
                    match_string,
                )
                .with_user(user)
                .with_workspace(workspace)
                .with_conversation(Some(conversation))
                .with_url(url),
            );
        }
        Ok(results)
    }

    #[allow(clippy::unused_async)]
    async fn match_files(
        self,
        signature: Arc<CompiledSignature>,
        chunk: Vec<File>,
    ) -> Result<Vec<MatchResult>> {
        let declared: Vec<String> = signature
            .signature()
            .file_types
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        let mut results = Vec::new();
        for file in chunk {
            let Some(search_string) = signature.matching_search_string(&file.title) else {
                continue;
            };
            let filetype = file.filetype.to_lowercase();
            if !declared.is_empty() && !declared.iter().any(|t| filetype.contains(t.as_str())) {
                continue;
            }
            let match_string = signature
                .confirm([file.title.as_str()])
                .unwrap_or_else(|| search_string.to_string());

            let user = self.context.user(&file.user);
            let workspace = self.context.workspace(&file.team).cloned();
            let url = (!file.url_private_download.is_empty())
                .then(|| file.url_private_download.clone());

            for conversation in &file.shares {
                if !allowed(conversation, signature.signature()) {
                    continue;
                }
                results.push(
                    MatchResult::new(
                        signature.signature(),
                        MatchedPost::File(file.clone()),
                        match_string.clone(),
                    )
                    .with_user(user.clone())
                    .with_workspace(workspace.clone())
                    .with_conversation(Some(conversation.clone()))
                    .with_url(url.clone()),
                );
            }
        }
        Ok(results)
    }

    async fn match_drafts(
        self,
        signature: Arc<CompiledSignature>,
        chunk: Vec<Draft>,
    ) -> Result<Vec<MatchResult>> {
        let mut results = Vec::new();
        for draft in chunk {
            if draft.created < self.fetcher.oldest() {
                continue;
            }
            let Some(match_string) = confirm_texts(&signature, &draft.searchable_texts()) else {
                continue;
            };

            let conversation = match draft.destination() {
                Some(channel) => {
                    let team = if Conversation::is_direct_message_id(channel) {
                        self.context.enterprise_id()
                    } else {
                        draft.team.as_str()
                    };
                    let resolved = self.fetcher.resolve_conversation(channel, Some(team)).await;
                    let Some(conversation) = tolerate(resolved, channel)? else {
                        continue;
                    };
                    Some(conversation)
                }
                None => None,
            };
            if let Some(conversation) = &conversation {
                if !allowed(conversation, signature.signature()) {
                    continue;
                }
            }

            let workspace = match self.context.workspace(&draft.team) {
                Some(workspace) => Some(workspace.clone()),
                None => tolerate(self.fetcher.workspace(&draft.team).await, &draft.team)?,
            };
            let user = self.context.user(&draft.user);

            results.push(
                MatchResult::new(signature.signature(), MatchedPost::Draft(draft), match_string)
                    .with_user(user)
                    .with_workspace(workspace)
                    .with_conversation(conversation),
            );
        }
        Ok(results)
    }
}

/// Pre-filter on search strings, then return the first pattern match.
fn confirm_texts(signature: &CompiledSignature, texts: &[&str]) -> Option<String> {
    if !signature.prefilter(texts.iter().copied()) {
        return None;
    }
    signature.confirm(texts.iter().copied())
}

/// Turn a non-fatal lookup failure into a skipped entry.
fn tolerate<T, E: Into<ScanError>>(
    result: std::result::Result<T, E>,
    id: &str,
) -> Result<Option<T>> {
    match result.map_err(Into::into) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(id = %id, error = %e, "skipping match after lookup failure");
            Ok(None)
        }
    }
}

/// Merge worker output after the barrier and deduplicate it.
fn merge(
    outcome: PoolOutcome<MatchResult, ScanError>,
    signature: &Signature,
    scope: &str,
) -> Result<Vec<MatchResult>> {
    let mut fatal = None;
    for failure in outcome.failures {
        match failure {
            WorkerFailure::Failed { error, .. } if error.is_fatal() => {
                fatal.get_or_insert(error);
            }
            WorkerFailure::Failed { worker, error } => {
                warn!(worker, signature = %signature.name(), error = %error, "scan worker failed");
            }
            WorkerFailure::Panicked { worker, message } => {
                error!(worker, signature = %signature.name(), message = %message, "scan worker panicked");
            }
        }
    }
    if let Some(error) = fatal {
        return Err(error);
    }

    let results = deduplicate(outcome.results);
    info!(
        signature = %signature.name(),
        scope,
        count = results.len(),
        "matches found after filtering"
    );
    Ok(results)
}
