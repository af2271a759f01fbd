#![allow(dead_code)]

use relay_service::config::{Config, DatabaseConfig, GatewayConfig, LogConfig, ServerConfig};
use relay_service::services::{
    ChargeClient, GatewayClient, InMemoryPaymentStore, TransferClient,
};
use relay_service::{build_router, AppState, Application};
use secrecy::Secret;
use std::sync::Arc;
use wiremock::MockServer;

pub const TEST_SECRET_KEY: &str = "sk_test_secret";
pub const TEST_PUBLIC_KEY: &str = "pk_test_public";

pub fn test_config(gateway_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        gateway: GatewayConfig {
            secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
            public_key: TEST_PUBLIC_KEY.to_string(),
            base_url: gateway_url.to_string(),
            currency: "NGN".to_string(),
            timeout_secs: 1,
        },
        database: DatabaseConfig::default(),
        log: LogConfig::default(),
        service_name: "relay-service-test".to_string(),
    }
}

pub fn bearer() -> String {
    format!("Bearer {}", TEST_SECRET_KEY)
}

pub fn gateway_client(server: &MockServer) -> GatewayClient {
    GatewayClient::new(&test_config(&server.uri()).gateway).expect("Failed to build gateway client")
}

pub fn transfer_client(server: &MockServer) -> TransferClient {
    TransferClient::new(gateway_client(server), "NGN")
}

pub fn charge_client(server: &MockServer) -> ChargeClient {
    ChargeClient::new(gateway_client(server))
}

/// Router wired to a mock gateway and an in-memory store the test can inspect.
pub fn test_router(server: &MockServer) -> (axum::Router, InMemoryPaymentStore) {
    let store = InMemoryPaymentStore::new();
    let state = AppState::new(test_config(&server.uri()), Arc::new(store.clone()))
        .expect("Failed to build app state");
    (build_router(state), store)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub gateway: MockServer,
    pub store: InMemoryPaymentStore,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let gateway = MockServer::start().await;
        let store = InMemoryPaymentStore::new();

        let app = Application::build_with_store(test_config(&gateway.uri()), Arc::new(store.clone()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            gateway,
            store,
        }
    }
}
