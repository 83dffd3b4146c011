//! Answer Dispatcher
//!
//! Bounded worker pool that drives a set of work items to settlement. Workers
//! are tokio tasks pulling from one shared FIFO queue; each worker owns a key's
//! whole attempt sequence (cache lookup, remote attempts with backoff,
//! validation, commit), so a key is never attempted by two workers at once.

use crate::cache::{AnswerCache, WriteMode};
use crate::error::{AnswerError, CacheError, DispatchError, ErrorKind};
use crate::provider::AnsweringService;
use crate::retry::RetryPolicy;
use crate::types::{AnswerRecord, WorkItem, WorkKey};
use crate::validation::AnswerValidator;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Live counters of a dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Items waiting in the queue
    pub pending: usize,
    /// Items a worker is currently settling
    pub in_flight: usize,
    /// Items settled (hit, success or permanent failure)
    pub settled: usize,
}

/// An item that settled FAILED_PERMANENT in this run.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub key: WorkKey,
    pub kind: ErrorKind,
    pub attempts: u32,
    pub message: String,
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Distinct items after collapsing duplicate keys
    pub total: usize,
    /// Input items dropped as duplicates of an earlier key
    pub deduplicated: usize,
    pub cache_hits: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_items: Vec<FailedItem>,
    /// Items that never settled because a stop was requested
    pub cancelled_keys: Vec<WorkKey>,
    /// Cache hits plus new successes, ordered by key
    pub records: Vec<AnswerRecord>,
}

impl DispatchReport {
    pub fn failed_keys(&self) -> Vec<&WorkKey> {
        self.failed_items.iter().map(|item| &item.key).collect()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.cancelled_keys.is_empty()
    }
}

enum Outcome {
    Hit(AnswerRecord),
    Succeeded(AnswerRecord),
    Failed(FailedItem),
    Cancelled(WorkKey),
    Fatal(CacheError),
}

struct WorkerContext {
    service: Arc<dyn AnsweringService>,
    validator: Arc<dyn AnswerValidator>,
    cache: Arc<dyn AnswerCache>,
    policy: RetryPolicy,
    force: bool,
    stop: CancellationToken,
    queue: Mutex<VecDeque<WorkItem>>,
    stats: Arc<RwLock<DispatchStats>>,
}

/// Bounded-concurrency dispatcher over one answer cache.
pub struct Dispatcher {
    service: Arc<dyn AnsweringService>,
    validator: Arc<dyn AnswerValidator>,
    cache: Arc<dyn AnswerCache>,
    policy: RetryPolicy,
    force: bool,
    cancel: CancellationToken,
    stats: Arc<RwLock<DispatchStats>>,
}

impl Dispatcher {
    pub fn new(
        service: Arc<dyn AnsweringService>,
        validator: Arc<dyn AnswerValidator>,
        cache: Arc<dyn AnswerCache>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            validator,
            cache,
            policy,
            force: false,
            cancel: CancellationToken::new(),
            stats: Arc::new(RwLock::new(DispatchStats::default())),
        }
    }

    /// Skip cache lookups and overwrite existing records.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop token shared with the caller. Cancelling it lets in-flight attempts
    /// finish and starts no new ones.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats.read().clone()
    }

    /// Drive `items` to settlement with at most `max_concurrency` items in flight.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        max_concurrency: usize,
    ) -> Result<DispatchReport, DispatchError> {
        let started = Instant::now();
        let input_len = items.len();

        let mut seen = HashSet::new();
        let queue: VecDeque<WorkItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.key().clone()))
            .collect();

        let mut report = DispatchReport {
            total: queue.len(),
            deduplicated: input_len - queue.len(),
            ..DispatchReport::default()
        };
        if report.deduplicated > 0 {
            debug!(
                deduplicated = report.deduplicated,
                "Collapsed duplicate work item keys"
            );
        }

        let worker_count = max_concurrency.max(1).min(queue.len());
        {
            let mut stats = self.stats.write();
            *stats = DispatchStats {
                pending: queue.len(),
                ..DispatchStats::default()
            };
        }

        let context = Arc::new(WorkerContext {
            service: Arc::clone(&self.service),
            validator: Arc::clone(&self.validator),
            cache: Arc::clone(&self.cache),
            policy: self.policy,
            force: self.force,
            stop: self.cancel.child_token(),
            queue: Mutex::new(queue),
            stats: Arc::clone(&self.stats),
        });

        info!(
            items = report.total,
            workers = worker_count,
            force = self.force,
            "Dispatching work items"
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                let context = Arc::clone(&context);
                tokio::spawn(async move { worker_loop(worker_id, context).await })
            })
            .collect();

        let mut fatal: Option<DispatchError> = None;
        for joined in join_all(handles).await {
            match joined {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            Outcome::Hit(record) => {
                                report.cache_hits += 1;
                                report.records.push(record);
                            }
                            Outcome::Succeeded(record) => {
                                report.succeeded += 1;
                                report.records.push(record);
                            }
                            Outcome::Failed(item) => {
                                report.failed += 1;
                                report.failed_items.push(item);
                            }
                            Outcome::Cancelled(key) => report.cancelled_keys.push(key),
                            Outcome::Fatal(err) => {
                                if fatal.is_none() {
                                    fatal = Some(DispatchError::Cache(err));
                                }
                            }
                        }
                    }
                }
                Err(join_error) => {
                    error!(error = %join_error, "Dispatcher worker aborted");
                    if fatal.is_none() {
                        fatal = Some(DispatchError::WorkerAborted(join_error.to_string()));
                    }
                }
            }
        }

        if let Some(err) = fatal {
            error!(error = %err, "Dispatch stopped");
            return Err(err);
        }

        // Anything still queued was never started.
        let leftover: Vec<WorkKey> = context
            .queue
            .lock()
            .await
            .drain(..)
            .map(|item| item.key().clone())
            .collect();
        report.cancelled_keys.extend(leftover);

        report.records.sort_by(|a, b| a.key.cmp(&b.key));
        report.failed_items.sort_by(|a, b| a.key.cmp(&b.key));
        report.cancelled_keys.sort();

        info!(
            total = report.total,
            cache_hits = report.cache_hits,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled_keys.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Dispatch settled"
        );

        Ok(report)
    }
}

async fn worker_loop(worker_id: usize, context: Arc<WorkerContext>) -> Vec<Outcome> {
    debug!(worker_id, "Worker started");
    let mut outcomes = Vec::new();

    while !context.stop.is_cancelled() {
        let item = {
            let mut queue = context.queue.lock().await;
            queue.pop_front()
        };
        let Some(item) = item else {
            break;
        };

        {
            let mut stats = context.stats.write();
            stats.pending = stats.pending.saturating_sub(1);
            stats.in_flight += 1;
        }

        let outcome = settle(worker_id, &context, item).await;

        {
            let mut stats = context.stats.write();
            stats.in_flight = stats.in_flight.saturating_sub(1);
            if matches!(
                outcome,
                Outcome::Hit(_) | Outcome::Succeeded(_) | Outcome::Failed(_)
            ) {
                stats.settled += 1;
            }
        }

        if let Outcome::Fatal(err) = &outcome {
            error!(worker_id, error = %err, "Cache failure, stopping dispatch");
            context.stop.cancel();
        }
        outcomes.push(outcome);
    }

    debug!(worker_id, "Worker stopped");
    outcomes
}

/// Run one item's attempt sequence to a terminal outcome.
async fn settle(worker_id: usize, context: &WorkerContext, item: WorkItem) -> Outcome {
    let key = item.key().clone();

    if !context.force {
        match context.cache.lookup(&key) {
            Ok(Some(record)) => {
                debug!(worker_id, key = %key, "Cache hit");
                return Outcome::Hit(record);
            }
            Ok(None) => {}
            Err(err) => return Outcome::Fatal(err),
        }
    }

    let mut attempt: u32 = 1;
    loop {
        let delay = context.policy.delay_before_attempt(attempt);
        if attempt > 1 {
            tokio::select! {
                biased;
                _ = context.stop.cancelled() => {
                    info!(worker_id, key = %key, attempt, "Stop requested during backoff");
                    return Outcome::Cancelled(key);
                }
                _ = sleep(delay) => {}
            }
        }

        match attempt_once(context, &item).await {
            Ok(record) => {
                let mode = if context.force {
                    WriteMode::Overwrite
                } else {
                    WriteMode::CreateOnly
                };
                if let Err(err) = context.cache.put(&record, mode) {
                    return Outcome::Fatal(err);
                }
                debug!(worker_id, key = %key, attempt, "Answer committed");
                return Outcome::Succeeded(record);
            }
            Err(err) => {
                let kind = err.kind();
                if context.policy.should_retry(attempt, kind) {
                    let next_delay = context.policy.delay_before_attempt(attempt + 1);
                    warn!(
                        worker_id,
                        key = %key,
                        attempt,
                        kind = %kind,
                        delay_ms = next_delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    attempt += 1;
                    continue;
                }

                error!(
                    worker_id,
                    key = %key,
                    attempt,
                    kind = %kind,
                    error = %err,
                    "Work item failed permanently"
                );
                return Outcome::Failed(FailedItem {
                    key,
                    kind,
                    attempts: attempt,
                    message: err.to_string(),
                });
            }
        }
    }
}

async fn attempt_once(context: &WorkerContext, item: &WorkItem) -> Result<AnswerRecord, AnswerError> {
    let raw = context.service.answer(item.request()).await?;
    let validated = context.validator.validate(item.phase(), &raw)?;
    if validated.payload.phase() != item.phase() {
        return Err(AnswerError::Validation(format!(
            "{} payload returned for a {} item",
            validated.payload.phase(),
            item.phase()
        )));
    }
    Ok(AnswerRecord::success(
        item.key().clone(),
        validated.payload,
        validated.quality,
        raw.citations,
    ))
}
