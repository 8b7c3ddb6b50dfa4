//! Toolbridge: one tool catalog, many model providers.
//!
//! Toolbridge discovers the tools an execution host offers, converts their
//! schemas into each provider's function-calling dialect, executes the calls
//! models make (with retries, timeouts, and cancellation), and drives streaming
//! conversations that loop through tool calls until the model is done.
//!
//! This crate re-exports the workspace:
//!
//! - `toolbridge_core`: tools, calls, transcript, configuration
//! - `toolbridge_schema`: per-provider schema converters and the conversion cache
//! - `toolbridge_executor`: the execution host client, catalog, and executor
//! - `toolbridge_bridge`: the [`BridgeOrchestrator`]
//! - `toolbridge_session`: provider adapters and the [`SessionController`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolbridge::{BridgeConfiguration, BridgeOrchestrator, OpenAiCompatAdapter, SessionController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfiguration::default();
//! let bridge = BridgeOrchestrator::from_config(config.clone());
//! bridge.initialize().await?;
//!
//! let adapter = Arc::new(OpenAiCompatAdapter::openai("sk-...", "gpt-4o"));
//! let mut session = SessionController::new(adapter, Arc::new(bridge.clone()), config.session);
//! let outcome = session.run_turn("What changed in the vault today?").await?;
//! println!("{}", outcome.text());
//!
//! bridge.dispose().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use toolbridge_bridge::*;
pub use toolbridge_core::*;
pub use toolbridge_error::*;
pub use toolbridge_executor::*;
pub use toolbridge_schema::*;
pub use toolbridge_session::*;
