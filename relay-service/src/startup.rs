//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{
    ChargeClient, GatewayClient, InMemoryPaymentStore, MongoPaymentStore, PaymentStore,
    TransferClient,
};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PaymentStore>,
    pub charge: ChargeClient,
    pub transfers: TransferClient,
}

impl AppState {
    /// Wire the gateway clients and the given store from configuration.
    pub fn new(config: Config, store: Arc<dyn PaymentStore>) -> Result<Self, AppError> {
        let gateway = GatewayClient::new(&config.gateway)
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        if !gateway.is_configured() {
            tracing::warn!("Gateway secret key is empty - gateway calls will be rejected");
        }

        Ok(Self {
            charge: ChargeClient::new(gateway.clone()),
            transfers: TransferClient::new(gateway, config.gateway.currency.clone()),
            config,
            store,
        })
    }
}

/// Build the payment store selected by configuration.
async fn connect_store(config: &Config) -> Result<Arc<dyn PaymentStore>, AppError> {
    let Some(url) = config.database.url.as_ref() else {
        tracing::warn!("No database configured - payment records are kept in memory");
        return Ok(Arc::new(InMemoryPaymentStore::new()));
    };

    let mut client_options = ClientOptions::parse(url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::DatabaseError(e.into())
        })?;
    client_options.app_name = Some(config.service_name.clone());

    let client = Client::with_options(client_options)
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    let store = MongoPaymentStore::new(&client.database(&config.database.db_name));
    store.init_indexes().await?;

    Ok(Arc::new(store))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/initiate_payment",
            get(handlers::payments::payment_form).post(handlers::payments::initiate_payment),
        )
        .route("/transfers", get(handlers::transfers::list_transfers))
        .route("/:reference/", get(handlers::payments::verify_payment))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        Self::build_with_store(config, store).await
    }

    /// Build with an explicit store, bypassing the database settings.
    pub async fn build_with_store(
        config: Config,
        store: Arc<dyn PaymentStore>,
    ) -> Result<Self, AppError> {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        let state = AppState::new(config, store)?;
        let router = build_router(state);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
