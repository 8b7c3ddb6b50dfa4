//! Test utilities for bridge tests.
//!
//! Provides a scripted in-memory execution host.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use toolbridge_core::{BridgeConfiguration, Tool, ToolCallRequest};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use toolbridge_executor::ToolHost;

/// How the mock host answers calls to one tool.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the value immediately
    Succeed(Value),
    /// Fail with `kind` for the first `failures` calls, then return `then`
    FailThen {
        failures: u32,
        kind: BridgeErrorKind,
        then: Value,
    },
    /// Always fail with `kind`
    Fail(BridgeErrorKind),
    /// Never answer
    Hang,
    /// Answer after a delay
    Delay(Duration, Value),
}

/// Scripted [`ToolHost`] recording every invocation.
#[derive(Debug)]
pub struct MockToolHost {
    tools: Mutex<Result<Vec<Tool>, BridgeErrorKind>>,
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    calls: Mutex<Vec<(String, Value, Instant)>>,
    healthy: AtomicBool,
    hang_health: AtomicBool,
    health_checks: AtomicUsize,
}

impl MockToolHost {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self {
            tools: Mutex::new(Ok(tools)),
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            hang_health: AtomicBool::new(false),
            health_checks: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(self, tool: &str, behavior: MockBehavior) -> Self {
        self.set_behavior(tool, behavior);
        self
    }

    pub fn set_behavior(&self, tool: &str, behavior: MockBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(tool.to_string(), behavior);
    }

    pub fn set_tools(&self, tools: Vec<Tool>) {
        *self.tools.lock().unwrap() = Ok(tools);
    }

    pub fn fail_listing(&self, kind: BridgeErrorKind) {
        *self.tools.lock().unwrap() = Err(kind);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn hang_health(&self) {
        self.hang_health.store(true, Ordering::SeqCst);
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn call_count(&self, tool: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == tool)
            .count()
    }

    pub fn call_times(&self, tool: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == tool)
            .map(|(_, _, at)| *at)
            .collect()
    }

    pub fn last_arguments(&self, tool: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _, _)| name == tool)
            .map(|(_, args, _)| args.clone())
    }
}

#[async_trait]
impl ToolHost for MockToolHost {
    async fn list_tools(&self) -> BridgeResult<Vec<Tool>> {
        self.tools
            .lock()
            .unwrap()
            .clone()
            .map_err(BridgeError::new)
    }

    async fn invoke(&self, name: &str, arguments: &Value) -> BridgeResult<Value> {
        let previous = self.call_count(name) as u32;
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone(), Instant::now()));

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| MockBehavior::Succeed(json!({"tool": name})));

        match behavior {
            MockBehavior::Succeed(value) => Ok(value),
            MockBehavior::FailThen {
                failures,
                kind,
                then,
            } => {
                if previous < failures {
                    Err(BridgeError::new(kind))
                } else {
                    Ok(then)
                }
            }
            MockBehavior::Fail(kind) => Err(BridgeError::new(kind)),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            MockBehavior::Delay(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        }
    }

    async fn health(&self) -> BridgeResult<()> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.hang_health.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BridgeError::new(BridgeErrorKind::HostUnreachable(
                "mock host down".to_string(),
            )))
        }
    }
}

pub fn tool(name: &str) -> Tool {
    Tool::new(
        name,
        format!("{} tool", name),
        json!({"type": "object", "properties": {}}),
    )
}

pub fn request(id: &str, name: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, name, json!({}), "openai")
}

pub fn config() -> BridgeConfiguration {
    let mut config = BridgeConfiguration::default();
    config.host.base_delay_ms = 10;
    config.host.timeout_ms = 1000;
    config.host.health_interval_ms = 1000;
    config.host.health_timeout_ms = 200;
    config
}
