//! End-to-end tests through the facade against a mock execution host.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use toolbridge::{
    BridgeConfiguration, BridgeOrchestrator, BridgeState, ToolCallRequest, ToolErrorKind,
};

const TOOLS: &str = r#"{
    "tools": [
        {
            "name": "vault.search",
            "description": "Search notes in the vault",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1},
                    "limit": {"type": "integer", "default": 10}
                },
                "required": ["query"]
            }
        },
        {
            "name": "createFile",
            "description": "Create a note",
            "inputSchema": {
                "type": "object",
                "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                "required": ["path"]
            }
        }
    ]
}"#;

async fn host() -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/tools")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TOOLS)
        .create_async()
        .await;
    server
}

fn config(server: &ServerGuard) -> BridgeConfiguration {
    BridgeConfiguration::default()
        .merge(&json!({
            "host": {
                "base_url": server.url(),
                "retries": 1,
                "base_delay_ms": 10
            }
        }))
        .unwrap()
}

#[tokio::test]
async fn test_definitions_for_every_provider() {
    let server = host().await;
    let bridge = BridgeOrchestrator::from_config(config(&server));
    bridge.initialize().await.unwrap();
    assert_eq!(bridge.state(), BridgeState::Ready);

    let openai = bridge.tool_definitions("openai").unwrap();
    assert_eq!(openai.len(), 2);
    assert_eq!(openai[0]["type"], "function");
    assert_eq!(openai[0]["function"]["name"], "vault_search");

    let anthropic = bridge.tool_definitions("anthropic").unwrap();
    assert_eq!(anthropic[0]["name"], "vault_search");
    assert_eq!(anthropic[0]["input_schema"]["required"], json!(["query"]));

    let gemini = bridge.tool_definitions("gemini").unwrap();
    assert_eq!(gemini[0]["name"], "vault.search");
    assert!(gemini[0]["parameters"]["properties"]["limit"].get("default").is_none());
    assert_eq!(gemini[0]["parameters"]["properties"]["query"]["minLength"], 1);

    bridge.dispose().await;
}

#[tokio::test]
async fn test_execute_native_name_against_host() {
    let mut server = host().await;
    let execute = server
        .mock("POST", "/tools/execute")
        .match_body(Matcher::Json(json!({
            "name": "vault.search",
            "arguments": {"query": "rust"}
        })))
        .with_status(200)
        .with_body(r#"{"success":true,"result":{"hits":2}}"#)
        .expect(1)
        .create_async()
        .await;

    let bridge = BridgeOrchestrator::from_config(config(&server));
    bridge.initialize().await.unwrap();

    let result = bridge
        .execute_tool(ToolCallRequest::new(
            "call_1",
            "vault_search",
            json!({"query": "rust"}),
            "openai",
        ))
        .await
        .unwrap();

    execute.assert_async().await;
    assert!(result.success);
    assert_eq!(result.result, Some(json!({"hits": 2})));
    assert_eq!(result.metadata.retry_count, 0);

    bridge.dispose().await;
}

#[tokio::test]
async fn test_host_tool_failure_is_data() {
    let mut server = host().await;
    let execute = server
        .mock("POST", "/tools/execute")
        .with_status(200)
        .with_body(r#"{"success":false,"error":{"code":"TOOL_ERROR","message":"disk full"}}"#)
        .expect(1)
        .create_async()
        .await;

    let bridge = BridgeOrchestrator::from_config(config(&server));
    bridge.initialize().await.unwrap();

    let result = bridge
        .execute_tool(ToolCallRequest::new(
            "call_1",
            "createFile",
            json!({"path": "a.md"}),
            "anthropic",
        ))
        .await
        .unwrap();

    execute.assert_async().await;
    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::ToolExecution));
    assert!(result.error.unwrap().contains("disk full"));

    bridge.dispose().await;
}

#[tokio::test]
async fn test_unreachable_host_fails_initialize() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(503)
        .create_async()
        .await;

    let bridge = BridgeOrchestrator::from_config(config(&server));
    let err = bridge.initialize().await.unwrap_err();

    assert!(matches!(bridge.state(), BridgeState::Error(_)));
    assert!(err.to_string().contains("unreachable"));
}
