//! Whole-catalog conversion with validation, collision handling, and caching.

use crate::cache::{CacheStats, ConversionCache, ConversionCacheEntry, ConversionFailure};
use crate::converter::SchemaConverter;
use crate::registry::ConverterRegistry;
use derive_getters::Getters;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use toolbridge_core::{CacheConfig, ProviderTool, Tool, catalog_hash};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use tracing::instrument;

/// Outcome of converting a catalog for one provider.
#[derive(Debug, Clone, Getters)]
pub struct ConversionReport {
    /// Provider key
    provider: String,
    /// Hash of the converted catalog
    catalog_hash: String,
    /// Tools that converted and validated cleanly
    tools: Arc<Vec<ProviderTool>>,
    /// Tools left out of the batch
    failures: Arc<Vec<ConversionFailure>>,
    /// Whether the batch came from the cache
    cache_hit: bool,
}

impl ConversionReport {
    fn from_entry(entry: ConversionCacheEntry, cache_hit: bool) -> Self {
        Self {
            provider: entry.provider().clone(),
            catalog_hash: entry.catalog_hash().clone(),
            tools: entry.tools().clone(),
            failures: entry.failures().clone(),
            cache_hit,
        }
    }

    /// Canonical name behind a provider-native name.
    pub fn original_name(&self, native_name: &str) -> Option<&str> {
        self.tools
            .iter()
            .find(|tool| tool.native_name() == native_name)
            .map(|tool| tool.original_name().as_str())
    }

    /// Native definitions in catalog order, ready to attach to a request.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| tool.native_definition().clone())
            .collect()
    }
}

/// Converts catalogs through the registered converters and caches the batches.
#[derive(Debug)]
pub struct ToolConverter {
    registry: ConverterRegistry,
    cache: ConversionCache,
}

impl ToolConverter {
    /// Creates a converter over an explicit registry and cache.
    pub fn new(registry: ConverterRegistry, cache: ConversionCache) -> Self {
        Self { registry, cache }
    }

    /// Creates a converter with the built-in providers and a configured cache.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(ConverterRegistry::with_defaults(), ConversionCache::from_config(config))
    }

    /// The converter registry.
    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// The conversion cache.
    pub fn cache(&self) -> &ConversionCache {
        &self.cache
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Converts every tool for `provider`.
    ///
    /// Individual failures are logged and reported, never fatal. A cached batch
    /// for the same catalog hash is returned without converting anything.
    #[instrument(skip(self, tools), fields(tool_count = tools.len()))]
    pub fn convert_all(&self, tools: &[Tool], provider: &str) -> BridgeResult<ConversionReport> {
        let converter = self.registry.get(provider)?;
        let hash = catalog_hash(tools);

        if let Some(entry) = self.cache.get(provider, &hash) {
            tracing::debug!(catalog_hash = %hash, "Conversion cache hit");
            return Ok(ConversionReport::from_entry(entry, true));
        }

        let mut converted = Vec::with_capacity(tools.len());
        let mut failures = Vec::new();
        let mut used_names = HashSet::new();

        for tool in tools {
            match convert_checked(converter.as_ref(), tool) {
                Ok(provider_tool) => {
                    let provider_tool = dedupe(converter.as_ref(), provider_tool, &mut used_names);
                    converted.push(provider_tool);
                }
                Err(e) => {
                    tracing::warn!(tool = %tool.name(), error = %e.kind(), "Skipping tool that failed conversion");
                    failures.push(ConversionFailure::new(tool.name().clone(), e.kind().to_string()));
                }
            }
        }

        tracing::info!(
            converted = converted.len(),
            failed = failures.len(),
            catalog_hash = %hash,
            "Converted tool catalog"
        );

        let entry = self
            .cache
            .insert(provider, &hash, Arc::new(converted), Arc::new(failures));
        Ok(ConversionReport::from_entry(entry, false))
    }

    /// Converts and validates a single tool for `provider`, bypassing the cache.
    #[instrument(skip(self, tool), fields(tool = %tool.name()))]
    pub fn convert_single(&self, tool: &Tool, provider: &str) -> BridgeResult<ProviderTool> {
        let converter = self.registry.get(provider)?;
        convert_checked(converter.as_ref(), tool)
    }

    /// Maps a provider-native name back to the canonical tool name.
    pub fn lookup_original(
        &self,
        tools: &[Tool],
        provider: &str,
        native_name: &str,
    ) -> BridgeResult<Option<String>> {
        let report = self.convert_all(tools, provider)?;
        Ok(report.original_name(native_name).map(str::to_string))
    }

    /// Drops cached batches for one provider.
    pub fn invalidate_provider(&self, provider: &str) -> usize {
        self.cache.invalidate_provider(provider)
    }

    /// Drops every cached batch.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn convert_checked(converter: &dyn SchemaConverter, tool: &Tool) -> BridgeResult<ProviderTool> {
    let provider_tool = converter.convert(tool)?;
    let report = converter.validate(tool, &provider_tool);

    for warning in report.warnings() {
        tracing::debug!(tool = %tool.name(), provider = converter.provider(), warning = %warning, "Conversion warning");
    }
    if !report.is_valid() {
        return Err(BridgeError::new(BridgeErrorKind::SchemaConversion {
            tool: tool.name().clone(),
            provider: converter.provider().to_string(),
            reason: report.errors().join("; "),
        }));
    }
    Ok(provider_tool)
}

fn dedupe(
    converter: &dyn SchemaConverter,
    provider_tool: ProviderTool,
    used_names: &mut HashSet<String>,
) -> ProviderTool {
    if used_names.insert(provider_tool.native_name().clone()) {
        return provider_tool;
    }

    let rules = converter.name_rules();
    let base = provider_tool.native_name().clone();
    let mut n = 2;
    loop {
        let candidate = rules.with_suffix(&base, n);
        if used_names.insert(candidate.clone()) {
            tracing::warn!(
                tool = %provider_tool.original_name(),
                native_name = %candidate,
                "Sanitized name collided, renamed"
            );
            return converter.rename(provider_tool, candidate);
        }
        n += 1;
    }
}
