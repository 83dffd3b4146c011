//! Unit workflow: one domain through collection then assessment.
//!
//! The workflow owns the domain's two answer caches and moves through
//! `Collecting -> Assessing -> Done`. Assessment items are derived only from
//! collection records that settled SUCCESS (cache hits included).

use crate::cache::{AnswerCache, SledAnswerCache};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::DomainError;
use crate::export::PhaseExporter;
use crate::provider::AnsweringService;
use crate::questions::{assessment_items, collection_items};
use crate::retry::RetryPolicy;
use crate::types::{domain_display_name, domain_slug, AnswerRecord, Phase, WorkItem};
use crate::validation::AnswerValidator;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Collaborators shared by every domain of a batch.
#[derive(Clone)]
pub struct WorkflowServices {
    pub service: Arc<dyn AnsweringService>,
    pub validator: Arc<dyn AnswerValidator>,
    pub exporter: Arc<dyn PhaseExporter>,
    pub policy: RetryPolicy,
    /// Re-ask every key and overwrite cached records.
    pub force: bool,
    pub cancel: CancellationToken,
}

impl WorkflowServices {
    pub fn new(
        service: Arc<dyn AnsweringService>,
        validator: Arc<dyn AnswerValidator>,
        exporter: Arc<dyn PhaseExporter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            validator,
            exporter,
            policy,
            force: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Item counts for one phase of one domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    /// Distinct work items
    pub items: usize,
    /// Answered from the cache without a remote call
    pub reused: usize,
    /// Answered successfully in this run
    pub succeeded: usize,
    /// Settled FAILED_PERMANENT in this run
    pub failed: usize,
    /// Left unsettled by a stop request
    pub cancelled: usize,
}

impl PhaseCounts {
    pub fn from_report(report: &DispatchReport) -> Self {
        Self {
            items: report.total,
            reused: report.cache_hits,
            succeeded: report.succeeded,
            failed: report.failed,
            cancelled: report.cancelled_keys.len(),
        }
    }

    /// Records available for export: reused plus newly answered.
    pub fn resolved(&self) -> usize {
        self.reused + self.succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Collecting,
    Assessing,
    Done,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Collecting => "collecting",
            WorkflowState::Assessing => "assessing",
            WorkflowState::Done => "done",
        }
    }
}

/// Lifecycle container for one domain.
#[derive(Debug, Clone)]
pub struct DomainRun {
    pub domain: String,
    pub slug: String,
    pub output_dir: PathBuf,
    pub collection: Vec<AnswerRecord>,
    pub assessment: Vec<AnswerRecord>,
    pub collection_counts: PhaseCounts,
    pub assessment_counts: PhaseCounts,
}

impl DomainRun {
    pub fn new(domain: &str, output_root: &Path) -> Self {
        let slug = domain_slug(domain);
        Self {
            domain: domain_display_name(domain),
            output_dir: output_root.join(&slug),
            slug,
            collection: Vec::new(),
            assessment: Vec::new(),
            collection_counts: PhaseCounts::default(),
            assessment_counts: PhaseCounts::default(),
        }
    }
}

pub struct UnitWorkflow {
    run: DomainRun,
    state: WorkflowState,
    subjects: Arc<Vec<String>>,
    services: WorkflowServices,
    max_concurrency: usize,
    collection_cache: Arc<dyn AnswerCache>,
    assessment_cache: Arc<dyn AnswerCache>,
}

impl UnitWorkflow {
    /// Resolve the domain's output directory and open its caches.
    pub fn open(
        domain: &str,
        output_root: &Path,
        subjects: Arc<Vec<String>>,
        services: WorkflowServices,
        max_concurrency: usize,
    ) -> Result<Self, DomainError> {
        let run = DomainRun::new(domain, output_root);
        if run.slug.is_empty() {
            return Err(DomainError::InvalidDomain(domain.to_string()));
        }
        std::fs::create_dir_all(&run.output_dir).map_err(|source| DomainError::OutputDir {
            path: run.output_dir.clone(),
            source,
        })?;

        let collection_cache: Arc<dyn AnswerCache> = Arc::new(SledAnswerCache::open(
            run.output_dir.join(Phase::Collection.cache_file_name()),
        )?);
        let assessment_cache: Arc<dyn AnswerCache> = Arc::new(SledAnswerCache::open(
            run.output_dir.join(Phase::Assessment.cache_file_name()),
        )?);

        Ok(Self::with_caches(
            run,
            subjects,
            services,
            max_concurrency,
            collection_cache,
            assessment_cache,
        ))
    }

    /// Build a workflow over caches the caller already opened.
    pub fn with_caches(
        run: DomainRun,
        subjects: Arc<Vec<String>>,
        services: WorkflowServices,
        max_concurrency: usize,
        collection_cache: Arc<dyn AnswerCache>,
        assessment_cache: Arc<dyn AnswerCache>,
    ) -> Self {
        Self {
            run,
            state: WorkflowState::Collecting,
            subjects,
            services,
            max_concurrency,
            collection_cache,
            assessment_cache,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn domain_run(&self) -> &DomainRun {
        &self.run
    }

    pub fn into_domain_run(self) -> DomainRun {
        self.run
    }

    /// Phase 1: ask every subject for this domain, then export the results.
    ///
    /// Returns every record the phase resolved, cache hits included.
    pub async fn run_collection(&mut self) -> Result<&[AnswerRecord], DomainError> {
        self.expect_state(WorkflowState::Collecting)?;
        info!(domain = %self.run.domain, subjects = self.subjects.len(), "Collecting organizations");

        let items = collection_items(&self.run.domain, &self.subjects);
        let cache = Arc::clone(&self.collection_cache);
        let report = self.dispatch(cache, items).await?;
        self.run.collection_counts = PhaseCounts::from_report(&report);
        self.run.collection = report.records;

        if report.cancelled_keys.is_empty() {
            self.export(Phase::Collection, &self.run.collection)?;
            self.state = WorkflowState::Assessing;
            Ok(&self.run.collection)
        } else {
            warn!(
                domain = %self.run.domain,
                cancelled = report.cancelled_keys.len(),
                "Collection stopped before all items settled"
            );
            Err(DomainError::Cancelled)
        }
    }

    /// Phase 2: assess every organization found by a successful collection record.
    pub async fn run_assessment(
        &mut self,
        collection: &[AnswerRecord],
    ) -> Result<&[AnswerRecord], DomainError> {
        self.expect_state(WorkflowState::Assessing)?;
        let items = assessment_items(collection);
        info!(domain = %self.run.domain, organizations = items.len(), "Assessing organizations");

        let cache = Arc::clone(&self.assessment_cache);
        let report = self.dispatch(cache, items).await?;
        self.run.assessment_counts = PhaseCounts::from_report(&report);
        self.run.assessment = report.records;

        if report.cancelled_keys.is_empty() {
            self.export(Phase::Assessment, &self.run.assessment)?;
            self.state = WorkflowState::Done;
            Ok(&self.run.assessment)
        } else {
            warn!(
                domain = %self.run.domain,
                cancelled = report.cancelled_keys.len(),
                "Assessment stopped before all items settled"
            );
            Err(DomainError::Cancelled)
        }
    }

    /// Run both phases in order.
    pub async fn run_complete(&mut self) -> Result<(), DomainError> {
        self.run_collection().await?;
        let collection = std::mem::take(&mut self.run.collection);
        let result = self.run_assessment(&collection).await.map(|_| ());
        self.run.collection = collection;
        result?;

        info!(
            domain = %self.run.domain,
            organizations = self.run.collection.len(),
            assessments = self.run.assessment.len(),
            "Completed domain workflow"
        );
        Ok(())
    }

    async fn dispatch(
        &self,
        cache: Arc<dyn AnswerCache>,
        items: Vec<WorkItem>,
    ) -> Result<DispatchReport, DomainError> {
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.services.service),
            Arc::clone(&self.services.validator),
            cache,
            self.services.policy,
        )
        .with_force(self.services.force)
        .with_cancellation(self.services.cancel.clone());
        Ok(dispatcher.run(items, self.max_concurrency).await?)
    }

    fn export(&self, phase: Phase, records: &[AnswerRecord]) -> Result<(), DomainError> {
        self.services
            .exporter
            .export(phase, &self.run.output_dir, &self.run.slug, records)?;
        Ok(())
    }

    fn expect_state(&self, expected: WorkflowState) -> Result<(), DomainError> {
        if self.state != expected {
            return Err(DomainError::InvalidTransition {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }
}
