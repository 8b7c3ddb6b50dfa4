//! Error types for the Toolbridge library.
//!
//! Every error records the file and line where it was constructed. Crate-level
//! failures use [`BridgeError`], whose [`BridgeErrorKind`] carries the discovery,
//! conversion, and execution taxonomy shared by every other crate;
//! [`SessionError`] covers failures that end a conversation turn and
//! [`ConfigError`] covers loading and validating settings.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bridge;
mod config;
mod session;

pub use bridge::{BridgeError, BridgeErrorKind, BridgeResult};
pub use config::{ConfigError, ConfigErrorKind};
pub use session::{SessionError, SessionErrorKind, SessionResult};
