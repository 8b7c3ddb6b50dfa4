//! Lifecycle state and host health.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::Serialize;
use toolbridge_error::BridgeError;
use toolbridge_executor::ExecutorMetrics;
use toolbridge_schema::CacheStats;

/// Orchestrator lifecycle.
///
/// `Uninitialized -> Initializing -> Ready | Error`; `dispose` returns to
/// `Uninitialized`.
#[derive(Debug, Clone, PartialEq, Eq, Default, derive_more::Display)]
pub enum BridgeState {
    /// Not started, or disposed
    #[default]
    #[display("uninitialized")]
    Uninitialized,
    /// Probing the host and loading the catalog
    #[display("initializing")]
    Initializing,
    /// Serving requests
    #[display("ready")]
    Ready,
    /// Initialization failed with the retained error
    #[display("error: {_0}")]
    Error(BridgeError),
}

impl BridgeState {
    /// Whether requests may be served.
    pub fn is_ready(&self) -> bool {
        matches!(self, BridgeState::Ready)
    }
}

/// Last known reachability of the execution host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct HostHealth {
    /// Whether the last health check succeeded
    connected: bool,
    /// When the last health check finished
    last_checked: Option<DateTime<Utc>>,
    /// Health checks failed in a row
    consecutive_failures: u32,
    /// Error from the last failed health check
    last_error: Option<String>,
    /// Round-trip time of the last successful health check
    latency_ms: Option<u64>,
}

impl HostHealth {
    pub(crate) fn record_success(&mut self, latency_ms: u64) {
        self.connected = true;
        self.last_checked = Some(Utc::now());
        self.consecutive_failures = 0;
        self.last_error = None;
        self.latency_ms = Some(latency_ms);
    }

    pub(crate) fn record_failure(&mut self, error: String) {
        self.connected = false;
        self.last_checked = Some(Utc::now());
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        self.latency_ms = None;
    }
}

/// Point-in-time summary of the orchestrator.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct BridgeStatus {
    /// Rendered lifecycle state
    state: String,
    /// Tools in the catalog
    tool_count: usize,
    /// Hash of the catalog
    catalog_hash: String,
    /// Host reachability
    health: HostHealth,
    /// Conversion cache counters
    cache: CacheStats,
    /// Executor counters
    executor: ExecutorMetrics,
}

impl BridgeStatus {
    pub(crate) fn new(
        state: &BridgeState,
        tool_count: usize,
        catalog_hash: String,
        health: HostHealth,
        cache: CacheStats,
        executor: ExecutorMetrics,
    ) -> Self {
        Self {
            state: state.to_string(),
            tool_count,
            catalog_hash,
            health,
            cache,
            executor,
        }
    }
}
