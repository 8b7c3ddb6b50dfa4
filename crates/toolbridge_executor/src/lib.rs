//! Tool discovery and execution against the execution host.
//!
//! The [`ToolCatalog`] holds the canonical tool list fetched through a
//! [`ToolHost`]; the [`ToolExecutor`] sends individual calls with per-attempt
//! timeouts, exponential backoff, cancellation, and execution bookkeeping.
//! [`HttpToolHost`] is the production host client.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod executor;
mod host;
mod http;
mod retry;

pub use catalog::{CatalogRefresh, CatalogSnapshot, ToolCatalog, validate_tools};
pub use executor::{ExecutorMetrics, ExecutorSettings, ToolExecutor};
pub use host::ToolHost;
pub use http::HttpToolHost;
pub use retry::{RetryOutcome, RetryPolicy, retry_with_backoff};
