//! Where the session sends tool calls.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolbridge_bridge::BridgeOrchestrator;
use toolbridge_core::{ToolCallRequest, ToolCallResult};
use toolbridge_error::BridgeResult;

/// Supplies tool definitions and executes calls for a session.
#[async_trait]
pub trait ToolDispatcher: Send + Sync + std::fmt::Debug {
    /// Native definitions for `provider`.
    fn tool_definitions(&self, provider: &str) -> BridgeResult<Vec<Value>>;

    /// Executes `requests` concurrently until `cancel` fires.
    async fn execute_tools(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<ToolCallResult>>;
}

#[async_trait]
impl ToolDispatcher for BridgeOrchestrator {
    fn tool_definitions(&self, provider: &str) -> BridgeResult<Vec<Value>> {
        BridgeOrchestrator::tool_definitions(self, provider)
    }

    async fn execute_tools(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<ToolCallResult>> {
        self.execute_tools_parallel_with_cancel(requests, cancel)
            .await
    }
}
