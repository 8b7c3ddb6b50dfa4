//! HTTP client for the execution host.

use crate::host::ToolHost;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{PoisonError, RwLock};
use toolbridge_core::{HostConfig, Tool};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use tracing::{debug, error, instrument};

/// Body of the execute-tool request.
#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    name: &'a str,
    arguments: &'a Value,
}

/// Body of the execute-tool response.
#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<WireError>,
}

/// Error object reported by the host.
#[derive(Debug, Default, Deserialize)]
struct WireError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

impl WireError {
    fn into_kind(self) -> BridgeErrorKind {
        let message = if self.message.is_empty() {
            self.code.clone().unwrap_or_else(|| "unknown error".to_string())
        } else {
            self.message
        };
        match self.code.as_deref() {
            Some("TOOL_NOT_FOUND") | Some("NOT_FOUND") => BridgeErrorKind::ToolNotFound(message),
            Some("INVALID_ARGUMENTS") | Some("VALIDATION_ERROR") => {
                BridgeErrorKind::ParameterValidation(message)
            }
            _ => BridgeErrorKind::ToolExecution(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: WireError,
}

/// [`ToolHost`] speaking the execution host's JSON-over-HTTP protocol.
///
/// Per-attempt deadlines are enforced by the executor, so the underlying
/// client carries no timeout of its own.
#[derive(Debug)]
pub struct HttpToolHost {
    client: Client,
    config: RwLock<HostConfig>,
}

impl HttpToolHost {
    /// Creates a client for the host described by `config`.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub fn new(config: HostConfig) -> Self {
        debug!("Created execution host client");
        Self {
            client: Client::new(),
            config: RwLock::new(config),
        }
    }

    fn config(&self) -> HostConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn authorize(&self, builder: RequestBuilder, config: &HostConfig) -> RequestBuilder {
        match &config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> BridgeResult<Response> {
        builder.send().await.map_err(|e| {
            error!(error = ?e, "HTTP request to execution host failed");
            BridgeError::new(BridgeErrorKind::HostUnreachable(e.to_string()))
        })
    }

    async fn status_error(response: Response) -> BridgeError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(text);
        error!(status, error = %message, "Execution host returned error status");
        BridgeError::new(BridgeErrorKind::from_status(status, message))
    }

    async fn json_body(response: Response) -> BridgeResult<Value> {
        response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse execution host response");
            BridgeError::new(BridgeErrorKind::MalformedResponse(e.to_string()))
        })
    }
}

#[async_trait]
impl ToolHost for HttpToolHost {
    #[instrument(skip(self))]
    async fn list_tools(&self) -> BridgeResult<Vec<Tool>> {
        let config = self.config();
        let url = config.endpoint(&config.tools_path);
        let response = self
            .send(self.authorize(self.client.get(&url), &config))
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body = Self::json_body(response).await?;
        let Some(tools) = body.get("tools").filter(|t| t.is_array()) else {
            return Err(BridgeError::new(BridgeErrorKind::MalformedResponse(
                "response has no 'tools' array".to_string(),
            )));
        };
        let tools: Vec<Tool> = serde_json::from_value(tools.clone()).map_err(|e| {
            BridgeError::new(BridgeErrorKind::MalformedResponse(format!(
                "invalid tool entry: {}",
                e
            )))
        })?;

        debug!(tool_count = tools.len(), "Listed tools");
        Ok(tools)
    }

    #[instrument(skip(self, arguments), fields(tool = name))]
    async fn invoke(&self, name: &str, arguments: &Value) -> BridgeResult<Value> {
        let config = self.config();
        let url = config.endpoint(&config.execute_path);
        let builder = self
            .client
            .post(&url)
            .json(&ExecuteRequest { name, arguments });
        let response = self.send(self.authorize(builder, &config)).await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body = Self::json_body(response).await?;
        let parsed: ExecuteResponse = serde_json::from_value(body).map_err(|e| {
            BridgeError::new(BridgeErrorKind::MalformedResponse(e.to_string()))
        })?;

        if parsed.success {
            Ok(parsed.result.unwrap_or(Value::Null))
        } else {
            let kind = parsed.error.unwrap_or_default().into_kind();
            debug!(error = %kind, "Tool reported failure");
            Err(BridgeError::new(kind))
        }
    }

    #[instrument(skip(self))]
    async fn health(&self) -> BridgeResult<()> {
        let config = self.config();
        let url = config.endpoint(&config.health_path);
        let response = self
            .send(self.authorize(self.client.get(&url), &config))
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BridgeError::new(BridgeErrorKind::HostUnreachable(format!(
                "health check returned {}",
                status
            ))))
        }
    }

    fn reconfigure(&self, config: &HostConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config.clone();
    }
}
