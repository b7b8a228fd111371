//! Magic code and view throttle tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use panocube::access::{CodeRegistry, MagicCodeAllocator, MemoryCodeRegistry, ViewThrottle};
use panocube::error::PipelineError;

use super::test_utils::{
    good_upload, orchestrator, submit_request, CountingRepository, SlowCodeRegistry,
};

#[tokio::test]
async fn test_ten_thousand_allocations_never_collide() {
    let registry = Arc::new(MemoryCodeRegistry::new());
    let allocator = MagicCodeAllocator::new(registry.clone(), 4);

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let code = allocator.allocate().await.unwrap();
        assert!(seen.insert(code), "duplicate magic code");
    }
    assert_eq!(registry.len().await, 10_000);
}

#[tokio::test]
async fn test_throttle_simulated_clock() {
    let throttle = ViewThrottle::new();
    let start = Instant::now();

    assert!(throttle.should_count_at("198.51.100.4", "tour", start).await);
    assert!(
        !throttle
            .should_count_at("198.51.100.4", "tour", start + Duration::from_secs(60))
            .await
    );
    assert!(
        throttle
            .should_count_at("198.51.100.4", "tour", start + Duration::from_secs(301))
            .await
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_throttle_concurrent_same_key_counts_once() {
    let throttle = Arc::new(ViewThrottle::new());
    let now = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let throttle = throttle.clone();
        handles.push(tokio::spawn(async move {
            throttle.should_count_at("viewer", "tour", now).await
        }));
    }

    let mut counted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            counted += 1;
        }
    }
    assert_eq!(counted, 1);
}

#[tokio::test]
async fn test_views_counted_per_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), Arc::new(CountingRepository::new()), 2)
        .with_throttle(Arc::new(ViewThrottle::with_settings(
            Duration::from_secs(300),
            100,
        )));

    let submission = orch
        .submit(submit_request(vec![good_upload("a.jpg")], true))
        .await
        .unwrap();
    let code = submission.aggregate.magic_code.clone().unwrap();
    submission.join().await.unwrap();

    assert!(orch.view_by_magic_code(&code, "a").await.unwrap().counted);
    assert!(!orch.view_by_magic_code(&code, "a").await.unwrap().counted);
    let view = orch.view_by_magic_code(&code, "b").await.unwrap();
    assert!(view.counted);
    assert_eq!(view.aggregate.views, 2);
    assert_eq!(view.items.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publish_agrees_on_one_code() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(SlowCodeRegistry::new(Duration::from_millis(30)));
    let orch = orchestrator(dir.path(), Arc::new(CountingRepository::new()), 2)
        .with_allocator(Arc::new(MagicCodeAllocator::new(registry.clone(), 4)));

    let submission = orch
        .submit(submit_request(vec![good_upload("a.jpg")], false))
        .await
        .unwrap();
    let id = submission.aggregate.id.clone();
    submission.join().await.unwrap();

    let (a, b) = tokio::join!(orch.publish(&id), orch.publish(&id));
    let code_a = a.unwrap().magic_code.unwrap();
    let code_b = b.unwrap().magic_code.unwrap();
    assert_eq!(code_a, code_b);

    // The losing allocation went back to the registry
    assert_eq!(registry.len().await, 1);
    let view = orch.view_by_magic_code(&code_a, "viewer").await.unwrap();
    assert_eq!(view.aggregate.id, id);
}

#[tokio::test]
async fn test_deactivated_tour_is_hidden_from_viewers() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), Arc::new(CountingRepository::new()), 2);

    let submission = orch
        .submit(submit_request(vec![good_upload("a.jpg")], true))
        .await
        .unwrap();
    let id = submission.aggregate.id.clone();
    let code = submission.aggregate.magic_code.clone().unwrap();
    assert!(submission.aggregate.is_active);
    submission.join().await.unwrap();

    let locked = orch.deactivate(&id).await.unwrap();
    assert!(!locked.is_active);
    assert!(locked.is_public);
    assert_eq!(locked.magic_code.as_deref(), Some(code.as_str()));
    assert!(matches!(
        orch.view_by_magic_code(&code, "viewer").await,
        Err(PipelineError::MagicCodeNotFound(_))
    ));

    assert!(orch.activate(&id).await.unwrap().is_active);
    let view = orch.view_by_magic_code(&code, "viewer").await.unwrap();
    assert!(view.counted);
    assert_eq!(view.aggregate.views, 1);

    assert!(matches!(
        orch.deactivate("missing").await,
        Err(PipelineError::AggregateNotFound(_))
    ));
}
