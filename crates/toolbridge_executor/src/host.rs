//! The execution host abstraction.

use async_trait::async_trait;
use serde_json::Value;
use toolbridge_core::{HostConfig, Tool};
use toolbridge_error::BridgeResult;

/// The external service that lists tools and performs their effects.
///
/// Errors carry a [`toolbridge_error::BridgeErrorKind`] whose
/// [`is_retryable`](toolbridge_error::BridgeErrorKind::is_retryable) decides
/// whether the executor tries again.
#[async_trait]
pub trait ToolHost: Send + Sync + std::fmt::Debug {
    /// Lists the tools the host currently exposes.
    async fn list_tools(&self) -> BridgeResult<Vec<Tool>>;

    /// Invokes one tool, returning its result payload.
    async fn invoke(&self, name: &str, arguments: &Value) -> BridgeResult<Value>;

    /// Lightweight liveness check.
    async fn health(&self) -> BridgeResult<()>;

    /// Applies updated host settings. Hosts without settings ignore this.
    fn reconfigure(&self, _config: &HostConfig) {}
}
