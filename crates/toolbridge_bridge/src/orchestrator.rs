//! The bridge orchestrator: catalog, converter, and executor behind one handle.

use crate::state::{BridgeState, BridgeStatus, HostHealth};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use toolbridge_core::{BridgeConfiguration, ProviderTool, ToolCallRequest, ToolCallResult};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use toolbridge_executor::{
    CatalogRefresh, ExecutorMetrics, ExecutorSettings, HttpToolHost, ToolCatalog, ToolExecutor,
    ToolHost,
};
use toolbridge_schema::{ConversionCache, ConversionReport, ConverterRegistry, ToolConverter};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default)]
struct Lifecycle {
    shutdown: CancellationToken,
    health_task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct BridgeInner {
    config: RwLock<BridgeConfiguration>,
    state: RwLock<BridgeState>,
    health: RwLock<HostHealth>,
    lifecycle: Mutex<Lifecycle>,
    host: Arc<dyn ToolHost>,
    catalog: ToolCatalog,
    converter: ToolConverter,
    executor: ToolExecutor,
}

impl BridgeInner {
    async fn check_health(&self) -> HostHealth {
        let check = self.executor.test_connection().await;
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        match check {
            Ok(latency) => {
                if !health.connected() {
                    info!("Execution host connected");
                }
                health.record_success(latency.as_millis() as u64);
            }
            Err(err) => {
                warn!(error = %err.kind(), failures = health.consecutive_failures() + 1, "Execution host health check failed");
                health.record_failure(err.kind().to_string());
            }
        }
        health.clone()
    }
}

/// Top-level handle wiring catalog, converters, and executor together.
///
/// Cloning is cheap; clones share state. Construct one per process and pass
/// it to every session.
#[derive(Debug, Clone)]
pub struct BridgeOrchestrator {
    inner: Arc<BridgeInner>,
}

impl BridgeOrchestrator {
    /// Creates an orchestrator talking to the HTTP execution host in `config`.
    pub fn from_config(config: BridgeConfiguration) -> Self {
        let host = Arc::new(HttpToolHost::new(config.host.clone()));
        Self::new(config, host)
    }

    /// Creates an orchestrator over any [`ToolHost`] with the built-in converters.
    pub fn new(config: BridgeConfiguration, host: Arc<dyn ToolHost>) -> Self {
        Self::with_registry(config, host, ConverterRegistry::with_defaults())
    }

    /// Creates an orchestrator with a custom converter registry.
    pub fn with_registry(
        config: BridgeConfiguration,
        host: Arc<dyn ToolHost>,
        registry: ConverterRegistry,
    ) -> Self {
        let converter = ToolConverter::new(registry, ConversionCache::from_config(&config.cache));
        let executor = ToolExecutor::new(host.clone(), ExecutorSettings::from_config(&config));
        let inner = BridgeInner {
            catalog: ToolCatalog::new(host.clone()),
            config: RwLock::new(config),
            state: RwLock::new(BridgeState::Uninitialized),
            health: RwLock::new(HostHealth::default()),
            lifecycle: Mutex::new(Lifecycle::default()),
            host,
            converter,
            executor,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Checks the host, loads the catalog, and starts health monitoring.
    ///
    /// Any failure leaves the orchestrator in [`BridgeState::Error`] holding the cause.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> BridgeResult<()> {
        {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            match *state {
                BridgeState::Ready => {
                    debug!("Bridge already initialized");
                    return Ok(());
                }
                BridgeState::Initializing => {
                    return Err(BridgeError::new(BridgeErrorKind::BridgeNotInitialized));
                }
                _ => *state = BridgeState::Initializing,
            }
        }
        info!("Initializing bridge");

        let outcome = async {
            self.inner.executor.test_connection().await?;
            self.inner.catalog.refresh().await
        }
        .await;

        match outcome {
            Ok(refresh) => {
                self.inner.health.write().unwrap_or_else(PoisonError::into_inner).record_success(0);
                self.set_state(BridgeState::Ready);
                self.start_health_monitor();
                info!(tool_count = refresh.tool_count(), "Bridge ready");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err.kind(), "Bridge initialization failed");
                self.inner
                    .health
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_failure(err.kind().to_string());
                self.set_state(BridgeState::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// Converted tools for `provider`, or none when the provider is disabled.
    #[instrument(skip(self))]
    pub fn get_tools_for_provider(&self, provider: &str) -> BridgeResult<Vec<ProviderTool>> {
        Ok(match self.conversion_report(provider)? {
            Some(report) => report.tools().as_ref().clone(),
            None => Vec::new(),
        })
    }

    /// Native tool definitions for `provider`, ready to attach to a request.
    pub fn tool_definitions(&self, provider: &str) -> BridgeResult<Vec<Value>> {
        Ok(self
            .conversion_report(provider)?
            .map(|report| report.definitions())
            .unwrap_or_default())
    }

    /// The full conversion report, `None` when the provider is disabled.
    pub fn conversion_report(&self, provider: &str) -> BridgeResult<Option<ConversionReport>> {
        self.ensure_ready()?;
        if !self.inner.converter.registry().contains(provider) {
            return Err(BridgeError::new(BridgeErrorKind::ProviderNotSupported(
                provider.to_string(),
            )));
        }
        if !self.configuration().is_provider_enabled(provider) {
            warn!(provider, "Provider disabled, exposing no tools");
            return Ok(None);
        }
        let snapshot = self.inner.catalog.snapshot();
        self.inner
            .converter
            .convert_all(snapshot.tools(), provider)
            .map(Some)
    }

    /// Re-fetches the catalog, dropping converted batches when it changed.
    #[instrument(skip(self))]
    pub async fn refresh_tools(&self) -> BridgeResult<CatalogRefresh> {
        self.ensure_ready()?;
        let refresh = self.inner.catalog.refresh().await?;
        if *refresh.changed() {
            info!(hash = %refresh.hash(), "Catalog changed, clearing conversion cache");
            self.inner.converter.clear_cache();
        }
        Ok(refresh)
    }

    /// Executes one call. Per-call failures come back as failed results.
    pub async fn execute_tool(&self, request: ToolCallRequest) -> BridgeResult<ToolCallResult> {
        self.execute_tool_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Executes one call, aborted by `cancel` or by [`dispose`](Self::dispose).
    #[instrument(skip(self, request, cancel), fields(request_id = %request.id, tool = %request.name))]
    pub async fn execute_tool_with_cancel(
        &self,
        request: ToolCallRequest,
        cancel: &CancellationToken,
    ) -> BridgeResult<ToolCallResult> {
        self.ensure_ready()?;
        let token = self.linked_token(cancel);
        let _linked = token.clone().drop_guard();
        Ok(self.run(request, token).await)
    }

    /// Executes calls concurrently. Results correlate by id.
    pub async fn execute_tools_parallel(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> BridgeResult<Vec<ToolCallResult>> {
        self.execute_tools_parallel_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Executes calls concurrently until `cancel` fires.
    #[instrument(skip(self, requests, cancel), fields(count = requests.len()))]
    pub async fn execute_tools_parallel_with_cancel(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<ToolCallResult>> {
        self.ensure_ready()?;
        let token = self.linked_token(cancel);
        let _linked = token.clone().drop_guard();
        Ok(join_all(
            requests
                .into_iter()
                .map(|request| self.run(request, token.child_token())),
        )
        .await)
    }

    /// Executes calls in order, one at a time.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn execute_tools_batch(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> BridgeResult<Vec<ToolCallResult>> {
        self.ensure_ready()?;
        let token = self.linked_token(&CancellationToken::new());
        let _linked = token.clone().drop_guard();
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.run(request, token.child_token()).await);
        }
        Ok(results)
    }

    /// Checks host health now and records the outcome.
    pub async fn check_health(&self) -> HostHealth {
        self.inner.check_health().await
    }

    /// Deep-merges `patch` into the configuration and applies it.
    ///
    /// Executor timeouts and retries apply to subsequent calls; a changed
    /// health interval restarts monitoring. An invalid patch changes nothing.
    #[instrument(skip(self, patch))]
    pub fn update_configuration(&self, patch: &Value) -> BridgeResult<BridgeConfiguration> {
        let previous = self.configuration();
        let merged = previous
            .merge(patch)
            .map_err(|e| BridgeError::new(BridgeErrorKind::Config(e.to_string())))?;

        self.inner
            .executor
            .update_settings(ExecutorSettings::from_config(&merged));
        self.inner.host.reconfigure(&merged.host);
        *self.inner.config.write().unwrap_or_else(PoisonError::into_inner) = merged.clone();

        if previous.host.health_interval_ms != merged.host.health_interval_ms
            && self.state().is_ready()
        {
            info!(interval_ms = merged.host.health_interval_ms, "Restarting health monitor");
            self.start_health_monitor();
        }
        Ok(merged)
    }

    /// Stops monitoring, cancels in-flight calls, and drops cached state.
    ///
    /// The orchestrator returns to [`BridgeState::Uninitialized`] and may be
    /// initialized again.
    #[instrument(skip(self))]
    pub async fn dispose(&self) {
        let task = {
            let mut lifecycle = self.lifecycle();
            lifecycle.shutdown.cancel();
            lifecycle.shutdown = CancellationToken::new();
            lifecycle.health_task.take()
        };
        self.set_state(BridgeState::Uninitialized);

        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }

        self.inner.converter.clear_cache();
        self.inner.catalog.clear();
        self.inner.executor.clear_records();
        *self.inner.health.write().unwrap_or_else(PoisonError::into_inner) = HostHealth::default();
        info!("Bridge disposed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Last recorded host health.
    pub fn health(&self) -> HostHealth {
        self.inner
            .health
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A copy of the current configuration.
    pub fn configuration(&self) -> BridgeConfiguration {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Executor counters.
    pub fn metrics(&self) -> ExecutorMetrics {
        self.inner.executor.metrics()
    }

    /// Summary of state, catalog, cache, and executor.
    pub fn status(&self) -> BridgeStatus {
        let snapshot = self.inner.catalog.snapshot();
        BridgeStatus::new(
            &self.state(),
            snapshot.len(),
            snapshot.hash().clone(),
            self.health(),
            self.inner.converter.cache_stats(),
            self.metrics(),
        )
    }

    /// The tool catalog.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.inner.catalog
    }

    /// The orchestrating converter.
    pub fn converter(&self) -> &ToolConverter {
        &self.inner.converter
    }

    /// The tool executor.
    pub fn executor(&self) -> &ToolExecutor {
        &self.inner.executor
    }

    fn ensure_ready(&self) -> BridgeResult<()> {
        if self.state().is_ready() {
            Ok(())
        } else {
            Err(BridgeError::new(BridgeErrorKind::BridgeNotInitialized))
        }
    }

    fn set_state(&self, state: BridgeState) {
        debug!(state = %state, "Bridge state change");
        *self.inner.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// A token cancelled by either `cancel` or disposal.
    ///
    /// Callers hold a drop guard on it so the forwarding task ends with the call.
    fn linked_token(&self, cancel: &CancellationToken) -> CancellationToken {
        let linked = self.lifecycle().shutdown.child_token();
        let caller = cancel.clone();
        let forward = linked.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = caller.cancelled() => forward.cancel(),
                _ = forward.cancelled() => {}
            }
        });
        linked
    }

    async fn run(&self, request: ToolCallRequest, cancel: CancellationToken) -> ToolCallResult {
        let started = Instant::now();
        let request = match self.resolve(request) {
            Ok(request) => request,
            Err((id, kind)) => {
                debug!(request_id = %id, error = %kind, "Rejected tool call before execution");
                return ToolCallResult::from_error(id, &kind, started.elapsed(), 0);
            }
        };
        self.inner.executor.execute_with_cancel(request, cancel).await
    }

    /// Maps provider-native names to canonical ones and checks required arguments.
    fn resolve(
        &self,
        mut request: ToolCallRequest,
    ) -> Result<ToolCallRequest, (String, BridgeErrorKind)> {
        let snapshot = self.inner.catalog.snapshot();
        let canonical = match snapshot.get(&request.name) {
            Some(tool) => Some(tool.name().clone()),
            None => self
                .inner
                .converter
                .lookup_original(snapshot.tools(), &request.provider, &request.name)
                .ok()
                .flatten(),
        };
        let Some(tool) = canonical.as_deref().and_then(|name| snapshot.get(name)) else {
            return Err((request.id, BridgeErrorKind::ToolNotFound(request.name)));
        };

        if request.parameters.is_null() {
            request.parameters = Value::Object(Map::new());
        }
        let Some(arguments) = request.parameters.as_object() else {
            return Err((
                request.id,
                BridgeErrorKind::ParameterValidation("arguments must be a JSON object".to_string()),
            ));
        };
        let missing: Vec<&str> = tool
            .required_parameters()
            .into_iter()
            .filter(|name| !arguments.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            let message = format!("missing required parameter(s): {}", missing.join(", "));
            return Err((request.id, BridgeErrorKind::ParameterValidation(message)));
        }

        request.name = tool.name().clone();
        Ok(request)
    }

    fn start_health_monitor(&self) {
        let interval = self.configuration().host.health_interval();
        let mut lifecycle = self.lifecycle();
        if let Some(previous) = lifecycle.health_task.take() {
            previous.abort();
        }
        let shutdown = lifecycle.shutdown.clone();
        let inner: Weak<BridgeInner> = Arc::downgrade(&self.inner);

        lifecycle.health_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.check_health().await;
            }
            debug!("Health monitor stopped");
        }));
    }
}
