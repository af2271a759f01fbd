//! HTTP core shared by the gateway clients.
//!
//! Every call produces a [`GatewayResponse`]; transport failures, timeouts and
//! non-2xx answers are folded into `success = false` rather than raised.

use crate::config::GatewayConfig;
use crate::services::metrics::record_gateway_call;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Uniform outcome of one gateway call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl GatewayResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn into_parts(self) -> (bool, String, Option<Value>) {
        (self.success, self.message, self.data)
    }
}

/// Body envelope used by the gateway for every endpoint.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Major to minor currency units, `None` on overflow.
pub fn to_minor(amount: u64) -> Option<u64> {
    amount.checked_mul(100)
}

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    secret_key: Secret<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().is_empty()
    }

    pub async fn get(&self, path: &str) -> GatewayResponse {
        self.send(Method::GET, path, self.request(Method::GET, path))
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> GatewayResponse {
        self.send(
            Method::POST,
            path,
            self.request(Method::POST, path).json(body),
        )
        .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.secret_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> GatewayResponse {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    "Gateway request timed out".to_string()
                } else {
                    format!("Gateway unreachable: {}", e)
                };
                tracing::warn!(method = %method, path = %path, error = %e, "Gateway request failed");
                record_gateway_call(&method, false);
                return GatewayResponse::failure(message);
            }
        };

        let status = response.status();
        let result = match response.text().await {
            Ok(body) => {
                tracing::debug!(method = %method, path = %path, status = %status, "Gateway response");
                classify(status, &body)
            }
            Err(e) => GatewayResponse::failure(format!("Failed to read gateway response: {}", e)),
        };

        if !result.success {
            tracing::warn!(
                method = %method,
                path = %path,
                status = %status,
                message = %result.message,
                "Gateway call unsuccessful"
            );
        }
        record_gateway_call(&method, result.success);

        result
    }
}

/// Success needs a 2xx and a body that does not say `"status": false`.
fn classify(status: StatusCode, body: &str) -> GatewayResponse {
    let body = if body.trim().is_empty() { "{}" } else { body };

    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return GatewayResponse::failure(format!("Gateway returned {}", status));
        }
        Err(e) => {
            return GatewayResponse::failure(format!("Invalid gateway response: {}", e));
        }
    };

    let success = status.is_success() && envelope.status != Some(false);
    let message = match envelope.message {
        Some(message) => message,
        None if !success => format!("Gateway returned {}", status),
        None => String::new(),
    };

    GatewayResponse {
        success,
        message,
        data: envelope.data,
    }
}
