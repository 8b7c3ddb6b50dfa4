//! Tests for the bridge orchestrator lifecycle and execution paths.

mod test_utils;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockBehavior, MockToolHost, config, request, tool};
use toolbridge_bridge::{BridgeOrchestrator, BridgeState};
use toolbridge_core::{Tool, ToolCallRequest, ToolErrorKind};
use toolbridge_error::BridgeErrorKind;

fn catalog() -> Vec<Tool> {
    vec![
        Tool::new(
            "search",
            "Search notes",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        ),
        tool("createFile"),
        tool("slow"),
        tool("vault.search"),
    ]
}

fn bridge_with(host: MockToolHost) -> (Arc<MockToolHost>, BridgeOrchestrator) {
    let host = Arc::new(host);
    let bridge = BridgeOrchestrator::new(config(), host.clone());
    (host, bridge)
}

async fn ready_bridge() -> (Arc<MockToolHost>, BridgeOrchestrator) {
    let (host, bridge) = bridge_with(
        MockToolHost::new(catalog()).with_behavior("slow", MockBehavior::Hang),
    );
    bridge.initialize().await.unwrap();
    (host, bridge)
}

#[tokio::test]
async fn test_calls_before_initialize_fail_fast() {
    let (host, bridge) = bridge_with(MockToolHost::new(catalog()));
    assert_eq!(bridge.state(), BridgeState::Uninitialized);

    let err = bridge.get_tools_for_provider("openai").unwrap_err();
    assert_eq!(err.kind(), &BridgeErrorKind::BridgeNotInitialized);

    let err = bridge.execute_tool(request("r1", "createFile")).await.unwrap_err();
    assert_eq!(err.kind(), &BridgeErrorKind::BridgeNotInitialized);
    assert_eq!(host.call_count("createFile"), 0);
}

#[tokio::test]
async fn test_initialize_loads_catalog() {
    let (_host, bridge) = ready_bridge().await;
    assert_eq!(bridge.state(), BridgeState::Ready);
    assert_eq!(bridge.catalog().len(), 4);
    assert!(*bridge.health().connected());

    let tools = bridge.get_tools_for_provider("anthropic").unwrap();
    assert_eq!(tools.len(), 4);
    assert!(tools.iter().any(|t| t.native_name() == "vault_search"));

    // Second initialize is a no-op.
    bridge.initialize().await.unwrap();
    assert_eq!(bridge.state(), BridgeState::Ready);
}

#[tokio::test]
async fn test_initialize_fails_when_host_unhealthy() {
    let host = MockToolHost::new(catalog());
    host.set_healthy(false);
    let (host, bridge) = bridge_with(host);

    let err = bridge.initialize().await.unwrap_err();
    assert!(matches!(err.kind(), BridgeErrorKind::HostUnreachable(_)));
    match bridge.state() {
        BridgeState::Error(cause) => assert_eq!(cause.kind(), err.kind()),
        other => panic!("unexpected state {:?}", other),
    }
    assert!(bridge.catalog().is_empty());
    assert!(!*bridge.health().connected());

    // Recovers once the host comes back.
    host.set_healthy(true);
    bridge.initialize().await.unwrap();
    assert!(bridge.state().is_ready());
}

#[tokio::test]
async fn test_initialize_fails_on_bad_catalog() {
    let host = MockToolHost::new(vec![]);
    let (_host, bridge) = bridge_with(host);

    let err = bridge.initialize().await.unwrap_err();
    assert!(matches!(err.kind(), BridgeErrorKind::MalformedResponse(_)));
    assert!(matches!(bridge.state(), BridgeState::Error(_)));
}

#[tokio::test]
async fn test_provider_enablement() {
    let (_host, bridge) = ready_bridge().await;

    let err = bridge.get_tools_for_provider("mistral").unwrap_err();
    assert!(matches!(err.kind(), BridgeErrorKind::ProviderNotSupported(p) if p == "mistral"));

    bridge
        .update_configuration(&json!({"providers": {"gemini": {"enabled": false}}}))
        .unwrap();
    assert!(bridge.get_tools_for_provider("gemini").unwrap().is_empty());
    assert!(bridge.tool_definitions("gemini").unwrap().is_empty());
    assert_eq!(bridge.get_tools_for_provider("openai").unwrap().len(), 4);
}

#[tokio::test]
async fn test_refresh_only_invalidates_on_change() {
    let (host, bridge) = ready_bridge().await;
    let first = bridge.conversion_report("openai").unwrap().unwrap();
    assert!(!first.cache_hit());

    let refresh = bridge.refresh_tools().await.unwrap();
    assert!(!refresh.changed());
    assert!(bridge.conversion_report("openai").unwrap().unwrap().cache_hit());

    let mut tools = catalog();
    tools.push(tool("deleteFile"));
    host.set_tools(tools);
    let refresh = bridge.refresh_tools().await.unwrap();
    assert!(refresh.changed());
    assert!(bridge.converter().cache().is_empty());

    let report = bridge.conversion_report("openai").unwrap().unwrap();
    assert!(!report.cache_hit());
    assert_eq!(report.tools().len(), 5);
    assert_ne!(report.catalog_hash(), first.catalog_hash());
}

#[tokio::test]
async fn test_execute_resolves_sanitized_names() {
    let (host, bridge) = ready_bridge().await;

    let result = bridge
        .execute_tool(ToolCallRequest::new("r1", "vault_search", json!({}), "openai"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(host.call_count("vault.search"), 1);
    assert_eq!(host.call_count("vault_search"), 0);
}

#[tokio::test]
async fn test_execute_validates_arguments() {
    let (host, bridge) = ready_bridge().await;

    let missing = bridge.execute_tool(request("r1", "search")).await.unwrap();
    assert_eq!(missing.error_kind(), Some(ToolErrorKind::ParameterValidation));
    assert!(missing.error.as_deref().unwrap().contains("query"));

    let not_object = bridge
        .execute_tool(ToolCallRequest::new("r2", "search", json!(["rust"]), "openai"))
        .await
        .unwrap();
    assert_eq!(not_object.error_kind(), Some(ToolErrorKind::ParameterValidation));
    assert_eq!(host.call_count("search"), 0);

    let ok = bridge
        .execute_tool(ToolCallRequest::new("r3", "search", json!({"query": "rust"}), "openai"))
        .await
        .unwrap();
    assert!(ok.success);

    let null_args = bridge
        .execute_tool(ToolCallRequest::new("r4", "createFile", serde_json::Value::Null, "openai"))
        .await
        .unwrap();
    assert!(null_args.success);
    assert_eq!(host.last_arguments("createFile"), Some(json!({})));
}

#[tokio::test]
async fn test_unknown_tool_is_a_failed_result() {
    let (_host, bridge) = ready_bridge().await;
    let result = bridge.execute_tool(request("r1", "ghost")).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.id, "r1");
    assert_eq!(result.error_kind(), Some(ToolErrorKind::ToolNotFound));
}

#[tokio::test(start_paused = true)]
async fn test_parallel_with_one_timeout() {
    let (_host, bridge) = ready_bridge().await;

    let results = bridge
        .execute_tools_parallel(vec![
            ToolCallRequest::new("1", "search", json!({"query": "a"}), "openai"),
            request("2", "slow"),
            request("3", "createFile"),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "2");
    assert_eq!(failed[0].error_kind(), Some(ToolErrorKind::Timeout));
    assert_eq!(failed[0].metadata.retry_count, 3);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let (_host, bridge) = ready_bridge().await;
    let results = bridge
        .execute_tools_batch(vec![
            request("a", "createFile"),
            request("b", "ghost"),
            request("c", "vault.search"),
        ])
        .await
        .unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(!results[1].success);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_in_flight_and_resets() {
    let (_host, bridge) = ready_bridge().await;

    let (result, _) = tokio::join!(bridge.execute_tool(request("r1", "slow")), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        bridge.dispose().await;
    });

    let result = result.unwrap();
    assert_eq!(result.error_kind(), Some(ToolErrorKind::Cancelled));
    assert_eq!(bridge.state(), BridgeState::Uninitialized);
    assert!(bridge.catalog().is_empty());

    let err = bridge.execute_tool(request("r2", "createFile")).await.unwrap_err();
    assert_eq!(err.kind(), &BridgeErrorKind::BridgeNotInitialized);
    assert!(bridge.refresh_tools().await.is_err());

    bridge.initialize().await.unwrap();
    assert!(bridge.execute_tool(request("r3", "createFile")).await.unwrap().success);
}

#[tokio::test(start_paused = true)]
async fn test_health_monitor_runs_on_interval() {
    let (host, bridge) = ready_bridge().await;
    assert_eq!(host.health_checks(), 1);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(host.health_checks(), 4);

    host.set_healthy(false);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let health = bridge.health();
    assert!(!*health.connected());
    assert_eq!(*health.consecutive_failures(), 2);
    assert!(health.last_error().is_some());

    bridge.dispose().await;
    let checks = host.health_checks();
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(host.health_checks(), checks);
}

#[tokio::test(start_paused = true)]
async fn test_health_check_does_not_block_execution() {
    let (host, bridge) = ready_bridge().await;
    host.hang_health();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let result = bridge.execute_tool(request("r1", "createFile")).await.unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn test_update_configuration() {
    let (_host, bridge) = ready_bridge().await;

    let updated = bridge
        .update_configuration(&json!({"host": {"retries": 0, "timeout_ms": 2500}}))
        .unwrap();
    assert_eq!(updated.host.retries, 0);
    assert_eq!(bridge.executor().settings().retry.max_retries, 0);
    assert_eq!(
        bridge.executor().settings().retry.attempt_timeout,
        Duration::from_millis(2500)
    );

    let err = bridge
        .update_configuration(&json!({"host": {"base_url": "ftp://nowhere"}}))
        .unwrap_err();
    assert!(matches!(err.kind(), BridgeErrorKind::Config(_)));
    assert_eq!(bridge.configuration().host.timeout_ms, 2500);
    assert!(bridge.configuration().host.base_url.starts_with("http"));
}

#[tokio::test(start_paused = true)]
async fn test_health_interval_change_restarts_monitor() {
    let (host, bridge) = ready_bridge().await;
    bridge
        .update_configuration(&json!({"host": {"health_interval_ms": 200}}))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1050)).await;
    assert_eq!(host.health_checks(), 6);
}

#[tokio::test]
async fn test_status_summary() {
    let (_host, bridge) = ready_bridge().await;
    bridge.get_tools_for_provider("openai").unwrap();
    bridge.execute_tool(request("r1", "createFile")).await.unwrap();

    let status = bridge.status();
    assert_eq!(status.state(), "ready");
    assert_eq!(*status.tool_count(), 4);
    assert_eq!(*status.cache().entries(), 1);
    assert_eq!(*status.executor().succeeded(), 1);
    assert!(serde_json::to_value(&status).is_ok());
}
