//! Batch coordinator
//!
//! Runs domains strictly one after another. Each domain gets its own workflow,
//! caches and worker pool; whatever happens inside a domain is folded into
//! exactly one [`BatchSummary`] and the batch moves on.

use crate::error::DomainError;
use crate::types::domain_display_name;
use crate::workflow::{PhaseCounts, UnitWorkflow, WorkflowServices};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Terminal status of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainStatus {
    /// Both phases settled with no permanent item failures
    Completed,
    /// Both phases settled; some items failed permanently
    CompletedWithFailures,
    /// A domain-level error ended the run
    Failed,
    /// A stop request ended the run before every item settled
    Cancelled,
}

impl DomainStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainStatus::Completed => "COMPLETED",
            DomainStatus::CompletedWithFailures => "COMPLETED_WITH_FAILURES",
            DomainStatus::Failed => "FAILED",
            DomainStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(
            self,
            DomainStatus::Completed | DomainStatus::CompletedWithFailures
        )
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the batch summary. Never mutated after its domain completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub domain: String,
    pub status: DomainStatus,
    pub collection: PhaseCounts,
    pub assessment: PhaseCounts,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// Stable label of the domain error, when the domain failed
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

impl BatchSummary {
    fn cancelled_before_start(domain: String) -> Self {
        Self {
            domain,
            status: DomainStatus::Cancelled,
            collection: PhaseCounts::default(),
            assessment: PhaseCounts::default(),
            elapsed: Duration::ZERO,
            error_kind: Some("cancelled"),
            error: None,
        }
    }
}

/// True when every domain completed (failed items allowed, failed or cancelled domains not).
pub fn batch_succeeded(summaries: &[BatchSummary]) -> bool {
    summaries.iter().all(|s| s.status.is_ok())
}

pub struct BatchCoordinator {
    services: WorkflowServices,
    subjects: Arc<Vec<String>>,
}

impl BatchCoordinator {
    pub fn new(services: WorkflowServices, subjects: Vec<String>) -> Self {
        Self {
            services,
            subjects: Arc::new(subjects),
        }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Run every domain in order. Always returns one summary per input domain.
    pub async fn run_batch(
        &self,
        domains: &[String],
        output_root: &Path,
        max_concurrency: usize,
    ) -> Vec<BatchSummary> {
        info!(
            domains = domains.len(),
            subjects = self.subjects.len(),
            workers = max_concurrency,
            output_root = %output_root.display(),
            "Starting batch"
        );

        let mut summaries = Vec::with_capacity(domains.len());
        for (index, domain) in domains.iter().enumerate() {
            if self.services.cancel.is_cancelled() {
                warn!(domain = %domain, "Stop requested, domain not started");
                summaries.push(BatchSummary::cancelled_before_start(
                    domain_display_name(domain),
                ));
                continue;
            }
            info!(
                domain = %domain,
                position = index + 1,
                of = domains.len(),
                "Processing domain"
            );
            summaries.push(
                self.run_single_domain(domain, output_root, max_concurrency)
                    .await,
            );
        }

        let completed = summaries.iter().filter(|s| s.status.is_ok()).count();
        info!(
            domains = summaries.len(),
            completed,
            failed = summaries.len() - completed,
            "Batch finished"
        );
        summaries
    }

    /// Run one domain through both phases and summarise it. Never fails.
    pub async fn run_single_domain(
        &self,
        domain: &str,
        output_root: &Path,
        max_concurrency: usize,
    ) -> BatchSummary {
        let started = Instant::now();

        let mut workflow = match UnitWorkflow::open(
            domain,
            output_root,
            Arc::clone(&self.subjects),
            self.services.clone(),
            max_concurrency,
        ) {
            Ok(workflow) => workflow,
            Err(err) => {
                error!(domain = %domain, kind = err.kind(), error = %err, "Domain failed");
                return BatchSummary {
                    domain: domain_display_name(domain),
                    status: DomainStatus::Failed,
                    collection: PhaseCounts::default(),
                    assessment: PhaseCounts::default(),
                    elapsed: started.elapsed(),
                    error_kind: Some(err.kind()),
                    error: Some(err.to_string()),
                };
            }
        };

        let result = workflow.run_complete().await;
        let run = workflow.into_domain_run();
        let (status, error_kind, error) = match result {
            Ok(()) => {
                let failures = run.collection_counts.failed + run.assessment_counts.failed;
                let status = if failures == 0 {
                    DomainStatus::Completed
                } else {
                    DomainStatus::CompletedWithFailures
                };
                (status, None, None)
            }
            Err(DomainError::Cancelled) => {
                (DomainStatus::Cancelled, Some("cancelled"), None)
            }
            Err(err) => {
                error!(domain = %run.domain, kind = err.kind(), error = %err, "Domain failed");
                (DomainStatus::Failed, Some(err.kind()), Some(err.to_string()))
            }
        };

        let summary = BatchSummary {
            domain: run.domain,
            status,
            collection: run.collection_counts,
            assessment: run.assessment_counts,
            elapsed: started.elapsed(),
            error_kind,
            error,
        };
        info!(
            domain = %summary.domain,
            status = %summary.status,
            organizations = summary.collection.resolved(),
            assessments = summary.assessment.resolved(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Domain finished"
        );
        summary
    }
}
