//! Integration tests for dispatcher concurrency bounds

use super::test_utils::{instant_retries, subjects, MockService, Script};
use canvass::cache::{AnswerCache, SledAnswerCache};
use canvass::dispatch::Dispatcher;
use canvass::questions::collection_items;
use canvass::types::Phase;
use canvass::validation::JsonAnswerValidator;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn twelve_subjects() -> Vec<String> {
    subjects(&[
        "Albania", "Andorra", "Angola", "Argentina", "Armenia", "Australia", "Austria", "Bahamas",
        "Bahrain", "Barbados", "Belarus", "Belgium",
    ])
}

fn dispatcher(service: Arc<MockService>, cache: Arc<SledAnswerCache>) -> Dispatcher {
    Dispatcher::new(service, Arc::new(JsonAnswerValidator), cache, instant_retries())
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_calls_never_exceed_worker_count() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(SledAnswerCache::open(temp_dir.path().join("organization.db")).unwrap());
    let service = Arc::new(MockService::new().with_latency(Duration::from_millis(500)));

    let report = dispatcher(Arc::clone(&service), Arc::clone(&cache))
        .run(collection_items("Justice", &twelve_subjects()), 4)
        .await
        .unwrap();

    assert_eq!(report.total, 12);
    assert_eq!(report.succeeded, 12);
    assert_eq!(service.max_in_flight(), 4);
    assert_eq!(service.max_in_flight_per_key(), 1);
    assert_eq!(cache.count(Phase::Collection).unwrap(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_keys_are_asked_once() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(SledAnswerCache::open(temp_dir.path().join("organization.db")).unwrap());
    let service = Arc::new(MockService::new().with_latency(Duration::from_millis(100)));

    let mut names = twelve_subjects();
    names.extend(twelve_subjects());
    names.push("Albania".to_string());

    let report = dispatcher(Arc::clone(&service), Arc::clone(&cache))
        .run(collection_items("Justice", &names), 8)
        .await
        .unwrap();

    assert_eq!(report.total, 12);
    assert_eq!(report.deduplicated, 13);
    assert_eq!(service.calls(), 12);
    assert_eq!(service.calls_for(Phase::Collection, "Albania"), 1);
    assert_eq!(service.max_in_flight_per_key(), 1);
    assert_eq!(report.records.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_retries_do_not_overlap_for_one_key() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(SledAnswerCache::open(temp_dir.path().join("organization.db")).unwrap());
    let service = Arc::new(
        MockService::new()
            .with_latency(Duration::from_millis(50))
            .script(Phase::Collection, "Angola", Script::TimeoutTimes(3)),
    );

    let report = dispatcher(Arc::clone(&service), Arc::clone(&cache))
        .run(collection_items("Justice", &twelve_subjects()), 6)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 12);
    assert_eq!(service.calls_for(Phase::Collection, "Angola"), 4);
    assert_eq!(service.max_in_flight_per_key(), 1);
    assert!(service.max_in_flight() <= 6);
}

#[tokio::test]
async fn test_stats_settle_after_run() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(SledAnswerCache::open(temp_dir.path().join("organization.db")).unwrap());
    let service = Arc::new(MockService::new());

    let dispatcher = dispatcher(Arc::clone(&service), Arc::clone(&cache));
    dispatcher
        .run(collection_items("Justice", &twelve_subjects()), 3)
        .await
        .unwrap();

    let stats = dispatcher.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.settled, 12);
}

#[tokio::test(start_paused = true)]
async fn test_stop_leaves_unstarted_items_cancelled() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(SledAnswerCache::open(temp_dir.path().join("organization.db")).unwrap());
    let service = Arc::new(MockService::new().with_latency(Duration::from_secs(1)));
    let token = CancellationToken::new();

    let dispatcher =
        dispatcher(Arc::clone(&service), Arc::clone(&cache)).with_cancellation(token.clone());
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        stopper.cancel();
    });

    let report = dispatcher
        .run(collection_items("Justice", &twelve_subjects()), 2)
        .await
        .unwrap();

    // Two rounds of two workers started before the stop; in-flight calls finish.
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.cancelled_keys.len(), 8);
    assert!(report.was_cancelled());
    assert_eq!(cache.count(Phase::Collection).unwrap(), 4);
}
