//! Execution bookkeeping records.

use derive_getters::Getters;
use std::time::{Duration, Instant};

/// Lifecycle of a single tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ExecutionStatus {
    /// Accepted, not yet sent
    Pending,
    /// Attempt in flight
    Executing,
    /// Finished successfully
    Completed,
    /// Finished with a failure
    Failed,
    /// Aborted by the owning session
    Cancelled,
}

impl ExecutionStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

/// Internal record of one execution, garbage-collected after a retention window.
#[derive(Debug, Clone, Getters)]
pub struct ExecutionRecord {
    /// Request id
    id: String,
    /// Tool being executed
    tool: String,
    /// Current status
    status: ExecutionStatus,
    /// When the request was accepted
    start_time: Instant,
    /// When the request reached a terminal status
    end_time: Option<Instant>,
    /// Retries performed so far
    retry_count: u32,
}

impl ExecutionRecord {
    /// Creates a pending record.
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            status: ExecutionStatus::Pending,
            start_time: Instant::now(),
            end_time: None,
            retry_count: 0,
        }
    }

    /// Marks an attempt as in flight. `attempt` is zero-based.
    pub fn begin_attempt(&mut self, attempt: u32) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Executing;
        self.retry_count = attempt;
    }

    /// Moves the record to a terminal status. Terminal records never change again.
    pub fn finish(&mut self, status: ExecutionStatus) {
        if self.status.is_terminal() || !status.is_terminal() {
            return;
        }
        self.status = status;
        self.end_time = Some(Instant::now());
    }

    /// Time from acceptance to completion (or to now, while running).
    pub fn elapsed(&self) -> Duration {
        self.end_time
            .unwrap_or_else(Instant::now)
            .duration_since(self.start_time)
    }

    /// Whether the record finished longer ago than `retention`.
    pub fn is_expired(&self, retention: Duration) -> bool {
        self.end_time
            .map(|end| end.elapsed() >= retention)
            .unwrap_or(false)
    }
}
