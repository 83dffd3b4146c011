//! Integration tests for per-domain failure isolation in a batch

use super::test_utils::{instant_retries, services, subjects, MockService};
use canvass::batch::{batch_succeeded, BatchCoordinator, DomainStatus};
use canvass::cache::{AnswerCache, SledAnswerCache, WriteMode};
use canvass::error::CacheError;
use canvass::types::{AnswerRecord, Phase, WorkKey};
use canvass::workflow::{DomainRun, UnitWorkflow};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SUBJECTS: &[&str] = &["Albania", "Andorra", "Angola"];

#[tokio::test]
async fn test_fatal_domain_does_not_stop_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    // A plain file where the second domain's directory should go.
    std::fs::write(temp_dir.path().join("defense"), b"not a directory").unwrap();

    let service = Arc::new(MockService::new());
    let domains = vec![
        "Justice".to_string(),
        "Defense".to_string(),
        "Health".to_string(),
    ];
    let summaries = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()),
        subjects(SUBJECTS),
    )
    .run_batch(&domains, temp_dir.path(), 2)
    .await;

    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].domain, "Justice");
    assert_eq!(summaries[0].status, DomainStatus::Completed);
    assert_eq!(summaries[1].domain, "Defense");
    assert_eq!(summaries[1].status, DomainStatus::Failed);
    assert_eq!(summaries[1].error_kind, Some("output_dir"));
    assert!(summaries[1].error.is_some());
    assert_eq!(summaries[2].domain, "Health");
    assert_eq!(summaries[2].status, DomainStatus::Completed);
    assert!(!batch_succeeded(&summaries));

    // Only the two healthy domains were asked anything.
    assert_eq!(service.calls(), 12);
    for slug in ["justice", "health"] {
        let dir = temp_dir.path().join(slug);
        assert!(dir.join(Phase::Collection.export_file_name(slug)).exists());
        assert!(dir.join(Phase::Assessment.export_file_name(slug)).exists());
    }
}

#[tokio::test]
async fn test_domains_after_stop_are_reported_cancelled() {
    let temp_dir = TempDir::new().unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let service = Arc::new(MockService::new());
    let domains = vec!["Justice".to_string(), "Defense".to_string()];
    let summaries = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()).with_cancellation(token),
        subjects(SUBJECTS),
    )
    .run_batch(&domains, temp_dir.path(), 2)
    .await;

    assert_eq!(summaries.len(), 2);
    assert!(summaries
        .iter()
        .all(|s| s.status == DomainStatus::Cancelled));
    assert_eq!(service.calls(), 0);
    assert!(!temp_dir.path().join("justice").exists());
    assert!(!batch_succeeded(&summaries));
}

#[tokio::test]
async fn test_corrupted_cache_fails_only_its_domain() {
    let temp_dir = TempDir::new().unwrap();
    {
        let db = sled::open(
            temp_dir
                .path()
                .join("justice")
                .join(Phase::Collection.cache_file_name()),
        )
        .unwrap();
        db.insert(b"collection/Justice/Albania", &[0xff_u8; 4][..])
            .unwrap();
        db.flush().unwrap();
    }

    let service = Arc::new(MockService::new());
    let domains = vec!["Justice".to_string(), "Defense".to_string()];
    let summaries = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()),
        subjects(SUBJECTS),
    )
    .run_batch(&domains, temp_dir.path(), 2)
    .await;

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].domain, "Justice");
    assert_eq!(summaries[0].status, DomainStatus::Failed);
    assert_eq!(summaries[0].error_kind, Some("cache_corrupted"));
    assert_eq!(summaries[1].domain, "Defense");
    assert_eq!(summaries[1].status, DomainStatus::Completed);
    assert!(!batch_succeeded(&summaries));

    let justice = temp_dir.path().join("justice");
    assert!(!justice
        .join(Phase::Collection.export_file_name("justice"))
        .exists());
}

#[tokio::test]
async fn test_blank_domain_fails_without_writing_to_output_root() {
    let temp_dir = TempDir::new().unwrap();
    let service = Arc::new(MockService::new());
    let domains = vec!["  ".to_string(), "Justice".to_string()];
    let summaries = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()),
        subjects(SUBJECTS),
    )
    .run_batch(&domains, temp_dir.path(), 2)
    .await;

    assert_eq!(summaries[0].status, DomainStatus::Failed);
    assert_eq!(summaries[0].error_kind, Some("invalid_domain"));
    assert_eq!(summaries[1].status, DomainStatus::Completed);
    assert!(!temp_dir
        .path()
        .join(Phase::Collection.cache_file_name())
        .exists());
}

/// Reports every key as missing so the dispatcher asks it and then commits over a stored record.
struct ForgetfulCache(SledAnswerCache);

impl AnswerCache for ForgetfulCache {
    fn lookup(&self, _key: &WorkKey) -> Result<Option<AnswerRecord>, CacheError> {
        Ok(None)
    }

    fn put(&self, record: &AnswerRecord, mode: WriteMode) -> Result<(), CacheError> {
        self.0.put(record, mode)
    }

    fn count(&self, phase: Phase) -> Result<usize, CacheError> {
        self.0.count(phase)
    }

    fn records(&self, phase: Phase) -> Result<Vec<AnswerRecord>, CacheError> {
        self.0.records(phase)
    }
}

#[tokio::test]
async fn test_create_only_commit_over_existing_record_is_a_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let service = Arc::new(MockService::new());

    // A first run stores every collection record.
    let mut first = UnitWorkflow::open(
        "Justice",
        temp_dir.path(),
        Arc::new(subjects(SUBJECTS)),
        services(Arc::clone(&service), instant_retries()),
        2,
    )
    .unwrap();
    first.run_collection().await.unwrap();
    drop(first);

    let run = DomainRun::new("Justice", temp_dir.path());
    let collection = SledAnswerCache::open(run.output_dir.join(Phase::Collection.cache_file_name()))
        .unwrap();
    let assessment = SledAnswerCache::open(run.output_dir.join(Phase::Assessment.cache_file_name()))
        .unwrap();
    let mut second = UnitWorkflow::with_caches(
        run,
        Arc::new(subjects(SUBJECTS)),
        services(Arc::clone(&service), instant_retries()),
        2,
        Arc::new(ForgetfulCache(collection)),
        Arc::new(assessment),
    );

    let err = second.run_collection().await.unwrap_err();
    assert_eq!(err.kind(), "cache_conflict");
}
