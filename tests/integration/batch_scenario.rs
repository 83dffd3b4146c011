//! Integration test for a two-domain batch over a small subject list

use super::test_utils::{instant_retries, services, subjects, MockService};
use canvass::batch::{BatchCoordinator, DomainStatus};
use canvass::cache::{AnswerCache, SledAnswerCache};
use canvass::export::header;
use canvass::types::{AnswerPayload, Phase};
use std::sync::Arc;
use tempfile::TempDir;

const SUBJECTS: &[&str] = &["Albania", "Andorra", "Angola", "Argentina", "Armenia"];

fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|row| row.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_justice_and_defense_batch() {
    let temp_dir = TempDir::new().unwrap();
    let service = Arc::new(MockService::new());
    let domains = vec!["Justice".to_string(), "Defense".to_string()];

    let summaries = BatchCoordinator::new(
        services(Arc::clone(&service), instant_retries()),
        subjects(SUBJECTS),
    )
    .run_batch(&domains, temp_dir.path(), 3)
    .await;

    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert_eq!(summary.status, DomainStatus::Completed);
        assert_eq!(summary.collection.succeeded, 5);
        assert_eq!(summary.assessment.succeeded, 5);
        assert_eq!(summary.collection.failed, 0);
        assert_eq!(summary.assessment.failed, 0);
    }
    assert_eq!(service.calls(), 20);

    for (domain, slug) in [("Justice", "justice"), ("Defense", "defense")] {
        let dir = temp_dir.path().join(slug);

        let organizations =
            SledAnswerCache::open(dir.join(Phase::Collection.cache_file_name())).unwrap();
        let records = organizations.records(Phase::Collection).unwrap();
        assert_eq!(records.len(), 5);
        for record in &records {
            assert_eq!(record.key.domain, domain);
            match &record.payload {
                AnswerPayload::Organization(org) => assert_eq!(
                    org.organization_name,
                    format!(
                        "Ministry of {} of {}",
                        domain.to_uppercase(),
                        record.key.subject.to_uppercase()
                    )
                ),
                other => panic!("unexpected payload {:?}", other),
            }
        }

        let assessments =
            SledAnswerCache::open(dir.join(Phase::Assessment.cache_file_name())).unwrap();
        assert_eq!(assessments.count(Phase::Assessment).unwrap(), 5);

        let (headers, rows) = read_csv(&dir.join(Phase::Collection.export_file_name(slug)));
        assert_eq!(headers, header(Phase::Collection));
        assert_eq!(rows.len(), 5);
        let exported: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(exported, SUBJECTS.to_vec());

        let (headers, rows) = read_csv(&dir.join(Phase::Assessment.export_file_name(slug)));
        assert_eq!(headers, header(Phase::Assessment));
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row[3] == "LOW"));
    }
}
