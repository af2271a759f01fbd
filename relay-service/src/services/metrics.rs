use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use reqwest::Method;
use std::sync::{Mutex, OnceLock, PoisonError};

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static INIT: Mutex<()> = Mutex::new(());

/// Install the global Prometheus recorder. Calling it again, from any thread,
/// is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count one outbound gateway call by HTTP method and outcome.
pub fn record_gateway_call(method: &Method, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "gateway_requests_total",
        "method" => method.as_str().to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Count payment verifications by outcome.
pub fn record_verification(verified: bool) {
    let outcome = if verified { "verified" } else { "rejected" };
    counter!("payment_verifications_total", "outcome" => outcome).increment(1);
}
