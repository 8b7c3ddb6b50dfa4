//! The canonical tool catalog fetched from the execution host.

use crate::host::ToolHost;
use derive_getters::Getters;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use toolbridge_core::{Tool, catalog_hash};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use tracing::{debug, info, instrument, warn};

/// An immutable view of the catalog at one point in time.
#[derive(Debug, Clone, Default, Getters)]
pub struct CatalogSnapshot {
    /// Tools in host order
    tools: Vec<Tool>,
    /// Content hash of `tools`
    hash: String,
    #[getter(skip)]
    index: HashMap<String, usize>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from a validated tool list.
    pub fn new(tools: Vec<Tool>) -> Self {
        let hash = catalog_hash(&tools);
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name().clone(), i))
            .collect();
        Self { tools, hash, index }
    }

    /// Looks up a tool by canonical name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the snapshot holds no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct CatalogRefresh {
    /// Hash of the new catalog
    hash: String,
    /// Whether the hash differs from the previous catalog
    changed: bool,
    /// Number of tools in the new catalog
    tool_count: usize,
}

/// Checks a listed tool set before it may replace the catalog.
pub fn validate_tools(tools: &[Tool]) -> BridgeResult<()> {
    if tools.is_empty() {
        return Err(malformed("tool list is empty"));
    }
    let mut seen = HashSet::with_capacity(tools.len());
    for tool in tools {
        if tool.name().trim().is_empty() {
            return Err(malformed("tool with empty name"));
        }
        if !seen.insert(tool.name().as_str()) {
            return Err(malformed(format!("duplicate tool name '{}'", tool.name())));
        }
        if !(tool.parameter_schema().is_object() || tool.parameter_schema().is_null()) {
            return Err(malformed(format!(
                "tool '{}' has a non-object inputSchema",
                tool.name()
            )));
        }
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::MalformedResponse(message.into()))
}

/// Holds the current tool set and swaps it wholesale on refresh.
///
/// Readers take an [`Arc`] of the current snapshot and never observe a
/// partially replaced catalog.
#[derive(Debug)]
pub struct ToolCatalog {
    host: Arc<dyn ToolHost>,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl ToolCatalog {
    /// Creates an empty catalog backed by `host`.
    pub fn new(host: Arc<dyn ToolHost>) -> Self {
        Self {
            host,
            current: RwLock::new(Arc::new(CatalogSnapshot::new(Vec::new()))),
        }
    }

    /// Fetches and validates the host's tools, then replaces the catalog.
    ///
    /// On failure the previous catalog is retained.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> BridgeResult<CatalogRefresh> {
        let tools = self.host.list_tools().await.inspect_err(|e| {
            warn!(error = %e.kind(), "Tool discovery failed, keeping previous catalog");
        })?;
        validate_tools(&tools).inspect_err(|e| {
            warn!(error = %e.kind(), "Rejected tool list, keeping previous catalog");
        })?;

        let snapshot = Arc::new(CatalogSnapshot::new(tools));
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, snapshot.clone())
        };

        let refresh = CatalogRefresh {
            hash: snapshot.hash().clone(),
            changed: previous.hash() != snapshot.hash(),
            tool_count: snapshot.len(),
        };
        if refresh.changed {
            info!(tool_count = refresh.tool_count, hash = %refresh.hash, "Tool catalog changed");
        } else {
            debug!(tool_count = refresh.tool_count, "Tool catalog unchanged");
        }
        Ok(refresh)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A copy of every tool.
    pub fn get_all(&self) -> Vec<Tool> {
        self.snapshot().tools().clone()
    }

    /// A copy of one tool.
    pub fn get(&self, name: &str) -> Option<Tool> {
        self.snapshot().get(name).cloned()
    }

    /// Hash of the current catalog.
    pub fn hash(&self) -> String {
        self.snapshot().hash().clone()
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no tools have been loaded.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Drops every tool.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(CatalogSnapshot::new(Vec::new()));
    }
}
