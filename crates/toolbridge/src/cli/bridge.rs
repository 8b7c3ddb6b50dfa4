//! Handlers for commands that talk to the execution host through the bridge.

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use toolbridge::{BridgeConfiguration, BridgeOrchestrator, ToolCallRequest};
use tracing::{info, instrument};

pub(super) async fn ready_bridge(config: BridgeConfiguration) -> Result<BridgeOrchestrator> {
    let bridge = BridgeOrchestrator::from_config(config);
    bridge
        .initialize()
        .await
        .context("initializing the bridge")?;
    Ok(bridge)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the catalog converted for `provider`.
#[instrument(skip(config))]
pub async fn handle_tools(config: BridgeConfiguration, provider: &str, report: bool) -> Result<()> {
    let bridge = ready_bridge(config).await?;
    let result = print_tools(&bridge, provider, report);
    bridge.dispose().await;
    result
}

fn print_tools(bridge: &BridgeOrchestrator, provider: &str, report: bool) -> Result<()> {
    let Some(conversion) = bridge.conversion_report(provider)? else {
        info!(provider, "Provider is disabled in configuration");
        return print_json(&json!([]));
    };

    if !report {
        return print_json(&Value::Array(conversion.definitions()));
    }
    print_json(&json!({
        "provider": conversion.provider(),
        "catalog_hash": conversion.catalog_hash(),
        "cache_hit": conversion.cache_hit(),
        "tools": conversion.definitions(),
        "failures": conversion.failures().as_slice(),
    }))
}

/// Executes one tool and prints the result.
#[instrument(skip(config, args))]
pub async fn handle_call(
    config: BridgeConfiguration,
    name: &str,
    args: &str,
    provider: &str,
) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).context("--args must be a JSON object")?;
    if !arguments.is_object() {
        bail!("--args must be a JSON object");
    }

    let bridge = ready_bridge(config).await?;
    let request = ToolCallRequest::new(format!("cli-{}", std::process::id()), name, arguments, provider);
    let result = bridge.execute_tool(request).await;
    bridge.dispose().await;

    let result = result?;
    print_json(&serde_json::to_value(&result)?)?;
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Checks the host and prints its health.
#[instrument(skip(config))]
pub async fn handle_health(config: BridgeConfiguration) -> Result<()> {
    let bridge = BridgeOrchestrator::from_config(config);
    let health = bridge.check_health().await;
    print_json(&serde_json::to_value(&health)?)?;
    if !health.connected() {
        std::process::exit(1);
    }
    Ok(())
}

/// Loads the catalog and prints bridge status.
#[instrument(skip(config))]
pub async fn handle_metrics(config: BridgeConfiguration) -> Result<()> {
    let bridge = ready_bridge(config).await?;
    let status = bridge.status();
    bridge.dispose().await;
    print_json(&serde_json::to_value(&status)?)
}
