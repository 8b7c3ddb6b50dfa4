//! Bridge orchestrator for the Toolbridge tool-calling bridge.
//!
//! [`BridgeOrchestrator`] owns the configuration, the tool catalog, the
//! orchestrating converter, and the executor. It drives the lifecycle
//! (`initialize` / `dispose`), monitors execution host health on a timer, and
//! is the single entry point streaming sessions use to list and run tools.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod orchestrator;
mod state;

pub use orchestrator::BridgeOrchestrator;
pub use state::{BridgeState, BridgeStatus, HostHealth};
