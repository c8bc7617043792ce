//! Partitioned worker pool.
//!
//! A collection is split into contiguous partitions, one tokio task runs per
//! partition, and every task hands its local results to a single collecting
//! consumer over an `mpsc` channel. Results are only read once every task has
//! finished.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Upper bound on the worker count.
pub const MAX_CORES: usize = 12;

/// Worker count used when the request is unusable and at least this many CPUs exist.
pub const FALLBACK_CORES: usize = 8;

/// Number of logical CPUs on this machine.
#[must_use]
pub fn detected_cores() -> usize {
    num_cpus::get().max(1)
}

/// Pick the worker count for a run.
///
/// A request within `1..=min(detected, 12)` is honored. Otherwise the count
/// is 8 when at least 8 CPUs are detected and the detected count below that.
#[must_use]
pub fn resolve_cores(requested: Option<usize>, detected: usize) -> usize {
    let detected = detected.max(1);
    match requested {
        Some(n) if n >= 1 && n <= detected && n <= MAX_CORES => n,
        _ if detected >= FALLBACK_CORES => FALLBACK_CORES,
        _ => detected,
    }
}

/// Split `items` into exactly `parts` contiguous partitions.
///
/// Partition sizes differ by at most one; the first `len % parts` partitions
/// carry the extra item. Concatenating the partitions reproduces the input.
#[must_use]
pub fn partition<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let extra = items.len() % parts;

    let mut iter = items.into_iter();
    (0..parts)
        .map(|index| {
            let size = base + usize::from(index < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Why a worker contributed no results.
#[derive(Debug)]
pub enum WorkerFailure<E> {
    /// The worker returned an error
    Failed {
        /// Partition index
        worker: usize,
        /// Error returned by the worker
        error: E,
    },
    /// The worker panicked
    Panicked {
        /// Partition index
        worker: usize,
        /// Panic payload rendered as text
        message: String,
    },
}

impl<E> WorkerFailure<E> {
    /// Partition index of the failed worker.
    #[must_use]
    pub fn worker(&self) -> usize {
        match self {
            Self::Failed { worker, .. } | Self::Panicked { worker, .. } => *worker,
        }
    }
}

/// Merged output of a pool run.
#[derive(Debug)]
pub struct PoolOutcome<R, E> {
    /// Results of every successful worker, in partition order
    pub results: Vec<R>,
    /// Workers that contributed nothing
    pub failures: Vec<WorkerFailure<E>>,
}

/// Run `work` over `workers` partitions of `items` and merge the results.
///
/// Each task owns its partition and shares nothing with its siblings except
/// the sending half of the fan-in channel. A failing or panicking task
/// contributes an empty result set and is reported in
/// [`PoolOutcome::failures`]; the other tasks are unaffected.
pub async fn run_partitioned<T, R, E, F, Fut>(
    items: Vec<T>,
    workers: usize,
    work: F,
) -> PoolOutcome<R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(usize, Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<R>, E>> + Send + 'static,
{
    let partitions = partition(items, workers);
    let work = Arc::new(work);
    let (tx, mut rx) = mpsc::channel::<(usize, Vec<R>)>(partitions.len());
    let mut tasks = JoinSet::new();

    for (worker, chunk) in partitions.into_iter().enumerate() {
        let work = Arc::clone(&work);
        let tx = tx.clone();

        tasks.spawn(async move {
            match AssertUnwindSafe((*work)(worker, chunk)).catch_unwind().await {
                Ok(Ok(batch)) => {
                    // The receiver outlives every task, so send only fails if the pool was dropped.
                    let _ = tx.send((worker, batch)).await;
                    None
                }
                Ok(Err(error)) => Some(WorkerFailure::Failed { worker, error }),
                Err(payload) => Some(WorkerFailure::Panicked {
                    worker,
                    message: panic_message(payload.as_ref()),
                }),
            }
        });
    }
    drop(tx);

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(failure)) => failures.push(failure),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "worker task was cancelled"),
        }
    }

    let mut batches = Vec::new();
    while let Some(batch) = rx.recv().await {
        batches.push(batch);
    }
    batches.sort_by_key(|(worker, _)| *worker);
    failures.sort_by_key(WorkerFailure::worker);

    PoolOutcome {
        results: batches.into_iter().flat_map(|(_, batch)| batch).collect(),
        failures,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
