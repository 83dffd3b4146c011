//! Integration tests for collection-to-assessment gating

use super::test_utils::{instant_retries, services, MockService, Script};
use canvass::batch::{BatchCoordinator, DomainStatus};
use canvass::cache::{AnswerCache, SledAnswerCache};
use canvass::data::default_subjects;
use canvass::types::Phase;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_failed_collections_are_not_assessed() {
    let temp_dir = TempDir::new().unwrap();
    let subjects = default_subjects().unwrap();
    assert_eq!(subjects.len(), 193);

    let failing: Vec<String> = subjects.iter().step_by(19).take(10).cloned().collect();
    let mut service = MockService::new();
    for subject in &failing {
        service = service.script(Phase::Collection, subject, Script::Malformed);
    }
    let service = Arc::new(service);

    let summary = BatchCoordinator::new(services(Arc::clone(&service), instant_retries()), subjects)
        .run_single_domain("Health", temp_dir.path(), 16)
        .await;

    assert_eq!(summary.status, DomainStatus::CompletedWithFailures);
    assert_eq!(summary.collection.items, 193);
    assert_eq!(summary.collection.succeeded, 183);
    assert_eq!(summary.collection.failed, 10);
    assert_eq!(summary.assessment.items, 183);
    assert_eq!(summary.assessment.succeeded, 183);

    for subject in &failing {
        assert_eq!(service.calls_for(Phase::Assessment, subject), 0);
    }

    let dir = temp_dir.path().join("health");
    let assessments = SledAnswerCache::open(dir.join(Phase::Assessment.cache_file_name())).unwrap();
    assert_eq!(assessments.count(Phase::Assessment).unwrap(), 183);

    let exported = std::fs::read_to_string(dir.join(Phase::Assessment.export_file_name("health")))
        .unwrap();
    assert_eq!(exported.lines().count(), 184);
}

#[tokio::test]
async fn test_failed_assessment_keeps_collection_export() {
    let temp_dir = TempDir::new().unwrap();
    let service = Arc::new(MockService::new().script(
        Phase::Assessment,
        "Andorra",
        Script::Malformed,
    ));

    let summary = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()),
        vec!["Albania".to_string(), "Andorra".to_string()],
    )
    .run_single_domain("Health", temp_dir.path(), 2)
    .await;

    assert_eq!(summary.status, DomainStatus::CompletedWithFailures);
    assert_eq!(summary.collection.succeeded, 2);
    assert_eq!(summary.assessment.succeeded, 1);
    assert_eq!(summary.assessment.failed, 1);

    let dir = temp_dir.path().join("health");
    let collection = std::fs::read_to_string(dir.join(Phase::Collection.export_file_name("health")))
        .unwrap();
    assert_eq!(collection.lines().count(), 3);
    let assessment = std::fs::read_to_string(dir.join(Phase::Assessment.export_file_name("health")))
        .unwrap();
    assert_eq!(assessment.lines().count(), 2);
}
