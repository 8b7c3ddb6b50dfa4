//! Tests for retrying tool execution.

mod test_utils;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockBehavior, MockToolHost, request, tool};
use tokio_util::sync::CancellationToken;
use toolbridge_core::{ExecutionStatus, ToolErrorKind};
use toolbridge_error::BridgeErrorKind;
use toolbridge_executor::{ExecutorSettings, RetryPolicy, ToolExecutor};

fn settings(retries: u32) -> ExecutorSettings {
    ExecutorSettings {
        retry: RetryPolicy {
            max_retries: retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(1),
        },
        health_timeout: Duration::from_millis(500),
        record_retention: Duration::from_secs(600),
        max_records: 1000,
    }
}

fn executor(host: MockToolHost, retries: u32) -> (Arc<MockToolHost>, ToolExecutor) {
    let host = Arc::new(host);
    let executor = ToolExecutor::new(host.clone(), settings(retries));
    (host, executor)
}

fn unreachable() -> BridgeErrorKind {
    BridgeErrorKind::HostUnreachable("HTTP 503: busy".to_string())
}

#[tokio::test]
async fn test_execute_success() {
    let (host, executor) = executor(
        MockToolHost::new(vec![tool("search")])
            .with_behavior("search", MockBehavior::Succeed(json!({"hits": 3}))),
        3,
    );

    let result = executor
        .execute(toolbridge_core::ToolCallRequest::new(
            "call-1",
            "search",
            json!({"query": "rust"}),
            "openai",
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.id, "call-1");
    assert_eq!(result.result, Some(json!({"hits": 3})));
    assert_eq!(result.metadata.retry_count, 0);
    assert_eq!(host.last_arguments("search"), Some(json!({"query": "rust"})));

    let record = executor.record("call-1").unwrap();
    assert_eq!(record.status(), &ExecutionStatus::Completed);

    let metrics = executor.metrics();
    assert_eq!(*metrics.total(), 1);
    assert_eq!(*metrics.succeeded(), 1);
    assert_eq!(*metrics.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_with_increasing_delay() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior(
            "search",
            MockBehavior::FailThen {
                failures: 3,
                kind: unreachable(),
                then: json!("ok"),
            },
        ),
        3,
    );

    let result = executor.execute(request("r1", "search")).await;
    assert!(result.success);
    assert_eq!(result.metadata.retry_count, 3);

    let times = host.call_times("search");
    assert_eq!(times.len(), 4);
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    for (gap, expected_ms) in gaps.iter().zip([100, 200, 400]) {
        let expected = Duration::from_millis(expected_ms);
        assert!(*gap >= expected && *gap < expected + Duration::from_millis(5), "{:?}", gaps);
    }
    assert!(gaps.windows(2).all(|w| w[1] > w[0]));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_return_failed_result() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("search", MockBehavior::Fail(unreachable())),
        2,
    );

    let result = executor.execute(request("r1", "search")).await;
    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::HostUnreachable));
    assert_eq!(result.metadata.retry_count, 2);
    assert_eq!(host.call_count("search"), 3);
    assert_eq!(
        executor.record("r1").unwrap().status(),
        &ExecutionStatus::Failed
    );
    assert_eq!(*executor.metrics().failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_and_auth_are_not_retried() {
    let (host, executor) = executor(
        MockToolHost::new(vec![])
            .with_behavior(
                "missing",
                MockBehavior::Fail(BridgeErrorKind::ToolNotFound("missing".to_string())),
            )
            .with_behavior(
                "secret",
                MockBehavior::Fail(BridgeErrorKind::Unauthorized("bad token".to_string())),
            )
            .with_behavior(
                "strict",
                MockBehavior::Fail(BridgeErrorKind::ParameterValidation("path required".to_string())),
            ),
        5,
    );

    let results = executor
        .execute_batch(vec![
            request("a", "missing"),
            request("b", "secret"),
            request("c", "strict"),
        ])
        .await;

    assert_eq!(results[0].error_kind(), Some(ToolErrorKind::ToolNotFound));
    assert_eq!(results[1].error_kind(), Some(ToolErrorKind::Unauthorized));
    assert_eq!(results[2].error_kind(), Some(ToolErrorKind::ParameterValidation));
    for name in ["missing", "secret", "strict"] {
        assert_eq!(host.call_count(name), 1, "{} was retried", name);
    }
    assert!(results.iter().all(|r| r.metadata.retry_count == 0));
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_is_retried_then_reported() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("slow", MockBehavior::Hang),
        2,
    );

    let result = executor.execute(request("r1", "slow")).await;
    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::Timeout));
    assert!(result.error.as_deref().unwrap().contains("Timed out after 1000ms"));
    assert_eq!(host.call_count("slow"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_timeout_does_not_affect_siblings() {
    let (_host, executor) = executor(
        MockToolHost::new(vec![])
            .with_behavior("search", MockBehavior::Delay(Duration::from_millis(300), json!("found")))
            .with_behavior("createFile", MockBehavior::Succeed(json!("created")))
            .with_behavior("slow", MockBehavior::Hang),
        2,
    );

    let results = executor
        .execute_parallel(vec![
            request("1", "search"),
            request("2", "slow"),
            request("3", "createFile"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "2");
    assert!(failed[0].error.as_deref().unwrap().contains("Timed out"));

    let by_id = |id: &str| results.iter().find(|r| r.id == id).unwrap();
    assert_eq!(by_id("1").result, Some(json!("found")));
    assert_eq!(by_id("3").result, Some(json!("created")));
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let (_host, executor) = executor(MockToolHost::new(vec![]), 0);
    let requests = (0..5)
        .map(|i| request(&format!("id-{}", i), &format!("tool{}", i)))
        .collect();

    let results = executor.execute_batch(requests).await;
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["id-0", "id-1", "id-2", "id-3", "id-4"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_in_flight_call() {
    let (_host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("slow", MockBehavior::Hang),
        3,
    );
    let token = CancellationToken::new();
    let canceller = token.clone();

    let (result, _) = tokio::join!(
        executor.execute_with_cancel(request("r1", "slow"), token),
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        }
    );

    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::Cancelled));
    assert_eq!(
        executor.record("r1").unwrap().status(),
        &ExecutionStatus::Cancelled
    );
    assert_eq!(*executor.metrics().cancelled(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("flaky", MockBehavior::Fail(unreachable())),
        3,
    );
    let token = CancellationToken::new();
    let canceller = token.clone();

    let (result, _) = tokio::join!(
        executor.execute_with_cancel(request("r1", "flaky"), token),
        async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        }
    );

    assert_eq!(result.error_kind(), Some(ToolErrorKind::Cancelled));
    // First attempt at 0ms, retry at 100ms, cancelled while waiting 200ms.
    assert_eq!(host.call_count("flaky"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_in_flight_id_rejected() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("slow", MockBehavior::Hang),
        0,
    );
    let token = CancellationToken::new();
    let canceller = token.clone();

    let (first, second) = tokio::join!(
        executor.execute_with_cancel(request("dup", "slow"), token),
        async {
            let result = executor.execute(request("dup", "search")).await;
            canceller.cancel();
            result
        }
    );

    assert_eq!(second.error_kind(), Some(ToolErrorKind::ParameterValidation));
    assert!(second.error.as_deref().unwrap().contains("duplicate request id"));
    assert_eq!(host.call_count("search"), 0);
    assert_eq!(first.error_kind(), Some(ToolErrorKind::Cancelled));

    // A finished id may be reused.
    let again = executor.execute(request("dup", "search")).await;
    assert!(again.success);
}

#[tokio::test]
async fn test_dropped_execution_is_settled_as_cancelled() {
    let host = Arc::new(MockToolHost::new(vec![]).with_behavior("slow", MockBehavior::Hang));
    let mut limits = settings(0);
    limits.record_retention = Duration::from_millis(1);
    limits.max_records = 1;
    let executor = ToolExecutor::new(host.clone(), limits);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        executor.execute(request("c1", "slow")),
    )
    .await;
    assert!(abandoned.is_err());

    let record = executor.record("c1").unwrap();
    assert_eq!(*record.status(), ExecutionStatus::Cancelled);
    let metrics = executor.metrics();
    assert_eq!(*metrics.in_flight(), 0);
    assert_eq!(*metrics.cancelled(), 1);

    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(executor.prune_records(), 1);
    assert_eq!(executor.record_count(), 0);

    // The id is free again.
    host.set_behavior("slow", MockBehavior::Succeed(json!({"ok": true})));
    assert!(executor.execute(request("c1", "slow")).await.success);
}

#[tokio::test]
async fn test_records_pruned_beyond_cap() {
    let host = Arc::new(MockToolHost::new(vec![]));
    let mut limits = settings(0);
    limits.max_records = 2;
    let executor = ToolExecutor::new(host, limits);

    for i in 0..5 {
        executor.execute(request(&format!("r{}", i), "search")).await;
    }

    assert_eq!(executor.record_count(), 2);
    assert!(executor.record("r4").is_some());
    assert!(executor.record("r0").is_none());
    assert_eq!(*executor.metrics().total(), 5);
}

#[tokio::test]
async fn test_records_expire_after_retention() {
    let host = Arc::new(MockToolHost::new(vec![]));
    let mut limits = settings(0);
    limits.record_retention = Duration::from_millis(20);
    let executor = ToolExecutor::new(host, limits);

    executor.execute(request("r1", "search")).await;
    std::thread::sleep(Duration::from_millis(40));

    assert_eq!(executor.prune_records(), 1);
    assert!(executor.record("r1").is_none());
}

#[tokio::test]
async fn test_metrics_average() {
    let (_host, executor) = executor(MockToolHost::new(vec![]), 0);
    assert_eq!(*executor.metrics().average_execution_ms(), 0.0);

    executor
        .execute_parallel(vec![request("a", "one"), request("b", "two")])
        .await;
    let metrics = executor.metrics();
    assert_eq!(*metrics.total(), 2);
    assert!(*metrics.average_execution_ms() >= 0.0);
}

#[tokio::test]
async fn test_settings_update_applies_to_next_call() {
    let (host, executor) = executor(
        MockToolHost::new(vec![]).with_behavior("flaky", MockBehavior::Fail(unreachable())),
        0,
    );
    executor.execute(request("a", "flaky")).await;
    assert_eq!(host.call_count("flaky"), 1);

    let mut updated = executor.settings();
    updated.retry.max_retries = 1;
    updated.retry.base_delay = Duration::from_millis(1);
    executor.update_settings(updated);

    executor.execute(request("b", "flaky")).await;
    assert_eq!(host.call_count("flaky"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_connection_check() {
    let (host, executor) = executor(MockToolHost::new(vec![]), 3);
    assert!(executor.test_connection().await.is_ok());

    host.set_healthy(false);
    let err = executor.test_connection().await.unwrap_err();
    assert!(matches!(err.kind(), BridgeErrorKind::HostUnreachable(_)));

    host.hang_health();
    let err = executor.test_connection().await.unwrap_err();
    assert_eq!(err.kind(), &BridgeErrorKind::Timeout(500));
}
