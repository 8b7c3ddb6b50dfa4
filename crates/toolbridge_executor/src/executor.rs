//! Tool execution with retries, timeouts, and execution bookkeeping.

use crate::host::ToolHost;
use crate::retry::{RetryPolicy, retry_with_backoff};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use derive_getters::Getters;
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use toolbridge_core::{
    BridgeConfiguration, ExecutionRecord, ExecutionStatus, ToolCallRequest, ToolCallResult,
};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use tracing::{debug, info, instrument, warn};

/// Settings the executor reads at the start of every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Retry and per-attempt timeout policy
    pub retry: RetryPolicy,
    /// Deadline for [`ToolExecutor::test_connection`]
    pub health_timeout: Duration,
    /// How long finished records are kept
    pub record_retention: Duration,
    /// Upper bound on stored records
    pub max_records: usize,
}

impl ExecutorSettings {
    /// Derives settings from the bridge configuration.
    pub fn from_config(config: &BridgeConfiguration) -> Self {
        Self {
            retry: RetryPolicy::from_host_config(&config.host),
            health_timeout: config.host.health_timeout(),
            record_retention: config.cache.record_retention(),
            max_records: config.cache.max_records,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&BridgeConfiguration::default())
    }
}

/// Aggregate execution statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Getters)]
pub struct ExecutorMetrics {
    /// Executions started
    total: u64,
    /// Executions that returned a successful result
    succeeded: u64,
    /// Executions that failed after all retries
    failed: u64,
    /// Executions aborted by cancellation
    cancelled: u64,
    /// Executions currently running
    in_flight: u64,
    /// Mean wall-clock time of finished executions
    average_execution_ms: f64,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    finished_time_ms: AtomicU64,
}

/// Executes tool calls against a [`ToolHost`].
///
/// Failures are returned as unsuccessful [`ToolCallResult`]s, never as errors,
/// so the conversation loop can hand them back to the model.
#[derive(Debug)]
pub struct ToolExecutor {
    host: Arc<dyn ToolHost>,
    settings: RwLock<ExecutorSettings>,
    records: DashMap<String, ExecutionRecord>,
    counters: Counters,
}

impl ToolExecutor {
    /// Creates an executor for `host`.
    pub fn new(host: Arc<dyn ToolHost>, settings: ExecutorSettings) -> Self {
        Self {
            host,
            settings: RwLock::new(settings),
            records: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// The host calls are sent to.
    pub fn host(&self) -> &Arc<dyn ToolHost> {
        &self.host
    }

    /// Current settings.
    pub fn settings(&self) -> ExecutorSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the settings used by subsequent calls.
    pub fn update_settings(&self, settings: ExecutorSettings) {
        debug!(?settings, "Updating executor settings");
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Executes one call with retries.
    pub async fn execute(&self, request: ToolCallRequest) -> ToolCallResult {
        self.execute_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Executes one call, aborting when `cancel` fires.
    #[instrument(skip(self, request, cancel), fields(request_id = %request.id, tool = %request.name, provider = %request.provider))]
    pub async fn execute_with_cancel(
        &self,
        request: ToolCallRequest,
        cancel: CancellationToken,
    ) -> ToolCallResult {
        let started = Instant::now();

        match self.records.entry(request.id.clone()) {
            Entry::Occupied(existing) if !existing.get().status().is_terminal() => {
                warn!("Rejecting duplicate in-flight request id");
                return ToolCallResult::from_error(
                    request.id.clone(),
                    &BridgeErrorKind::ParameterValidation(format!(
                        "duplicate request id '{}' is already executing",
                        request.id
                    )),
                    started.elapsed(),
                    0,
                );
            }
            Entry::Occupied(mut existing) => {
                existing.insert(ExecutionRecord::new(request.id.clone(), request.name.clone()));
            }
            Entry::Vacant(slot) => {
                slot.insert(ExecutionRecord::new(request.id.clone(), request.name.clone()));
            }
        }
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let in_flight = InFlight {
            executor: self,
            id: request.id.clone(),
            started,
            settled: false,
        };

        let settings = self.settings();
        let outcome = retry_with_backoff(&settings.retry, &cancel, |attempt| {
            if let Some(mut record) = self.records.get_mut(&request.id) {
                record.begin_attempt(attempt);
            }
            let host = self.host.clone();
            let name = request.name.clone();
            let arguments = request.parameters.clone();
            async move { host.invoke(&name, &arguments).await }
        })
        .await;

        let elapsed = started.elapsed();
        let result = match outcome.result {
            Ok(value) => {
                info!(retries = outcome.retries, elapsed_ms = elapsed.as_millis() as u64, "Tool call succeeded");
                in_flight.settle(ExecutionStatus::Completed);
                ToolCallResult::success(request.id, value, elapsed, outcome.retries)
            }
            Err(err) => {
                let status = if matches!(err.kind(), BridgeErrorKind::Cancelled) {
                    ExecutionStatus::Cancelled
                } else {
                    ExecutionStatus::Failed
                };
                warn!(retries = outcome.retries, error = %err.kind(), "Tool call failed");
                in_flight.settle(status);
                ToolCallResult::from_error(request.id, err.kind(), elapsed, outcome.retries)
            }
        };

        self.prune_records();
        result
    }

    /// Executes calls concurrently. Callers correlate results by id.
    ///
    /// One failing or timed-out call does not affect the others.
    pub async fn execute_parallel(&self, requests: Vec<ToolCallRequest>) -> Vec<ToolCallResult> {
        self.execute_parallel_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Executes calls concurrently, all aborted when `cancel` fires.
    #[instrument(skip(self, requests, cancel), fields(count = requests.len()))]
    pub async fn execute_parallel_with_cancel(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallResult> {
        join_all(
            requests
                .into_iter()
                .map(|request| self.execute_with_cancel(request, cancel.child_token())),
        )
        .await
    }

    /// Executes calls one after another, preserving order.
    pub async fn execute_batch(&self, requests: Vec<ToolCallRequest>) -> Vec<ToolCallResult> {
        self.execute_batch_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Executes calls one after another until `cancel` fires.
    #[instrument(skip(self, requests, cancel), fields(count = requests.len()))]
    pub async fn execute_batch_with_cancel(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.execute_with_cancel(request, cancel.child_token()).await);
        }
        results
    }

    /// Checks the host once with the health timeout. Returns the round-trip time.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> BridgeResult<Duration> {
        let deadline = self.settings().health_timeout;
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.host.health()).await {
            Ok(Ok(())) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Execution host healthy");
                Ok(started.elapsed())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(BridgeError::new(BridgeErrorKind::Timeout(
                u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            ))),
        }
    }

    /// Current aggregate statistics.
    pub fn metrics(&self) -> ExecutorMetrics {
        let succeeded = self.counters.succeeded.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);
        let cancelled = self.counters.cancelled.load(Ordering::Relaxed);
        let finished = succeeded + failed + cancelled;
        let average_execution_ms = if finished == 0 {
            0.0
        } else {
            self.counters.finished_time_ms.load(Ordering::Relaxed) as f64 / finished as f64
        };
        let in_flight = self
            .records
            .iter()
            .filter(|record| !record.status().is_terminal())
            .count() as u64;

        ExecutorMetrics {
            total: self.counters.total.load(Ordering::Relaxed),
            succeeded,
            failed,
            cancelled,
            in_flight,
            average_execution_ms,
        }
    }

    /// A copy of the record for `id`, if still retained.
    pub fn record(&self, id: &str) -> Option<ExecutionRecord> {
        self.records.get(id).map(|record| record.clone())
    }

    /// Number of retained records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Drops expired records, then the oldest finished ones beyond the cap.
    ///
    /// Returns how many were removed. Running executions are never dropped.
    pub fn prune_records(&self) -> usize {
        let settings = self.settings();
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.is_expired(settings.record_retention));

        let overflow = self.records.len().saturating_sub(settings.max_records);
        if overflow > 0 {
            let mut finished: Vec<(String, Instant)> = self
                .records
                .iter()
                .filter_map(|record| record.end_time().map(|end| (record.id().clone(), end)))
                .collect();
            finished.sort_by_key(|(_, end)| *end);
            for (id, _) in finished.into_iter().take(overflow) {
                self.records.remove(&id);
            }
        }

        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, "Pruned execution records");
        }
        removed
    }

    /// Drops every finished record.
    pub fn clear_records(&self) {
        self.records.retain(|_, record| !record.status().is_terminal());
    }

    fn finish(&self, id: &str, status: ExecutionStatus, elapsed: Duration) {
        if let Some(mut record) = self.records.get_mut(id) {
            record.finish(status);
        }
        let counter = match status {
            ExecutionStatus::Completed => &self.counters.succeeded,
            ExecutionStatus::Cancelled => &self.counters.cancelled,
            _ => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.counters
            .finished_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }
}

/// Settles the record of a running execution.
///
/// If the execution future is dropped before settling, the record is marked
/// [`ExecutionStatus::Cancelled`] so it can be pruned and its id reused.
struct InFlight<'a> {
    executor: &'a ToolExecutor,
    id: String,
    started: Instant,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, status: ExecutionStatus) {
        self.settled = true;
        self.executor.finish(&self.id, status, self.started.elapsed());
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(request_id = %self.id, "Execution dropped before completion");
            self.executor
                .finish(&self.id, ExecutionStatus::Cancelled, self.started.elapsed());
        }
    }
}
