use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::LogFormat;
use std::time::Duration;

/// Service settings.
///
/// Loaded from an optional `configuration` file and `RELAY__*` environment
/// variables, e.g. `RELAY__GATEWAY__SECRET_KEY`, `RELAY__SERVER__PORT`.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Credentials and endpoint of the payment gateway. Both the charge and the
/// transfer clients are built from this.
#[derive(Deserialize, Clone, Debug)]
pub struct GatewayConfig {
    pub secret_key: Secret<String>,
    /// Handed to the browser checkout widget; not a secret.
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Payment record storage. Without a URL the service keeps records in memory.
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<Secret<String>>,
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            db_name: default_db_name(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_service_name() -> String {
    "relay-service".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3003
}

fn default_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_db_name() -> String {
    "relay_db".to_string()
}

fn default_log_level() -> String {
    "info,relay_service=debug".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        service_core::config::load("configuration", "RELAY")
    }
}
