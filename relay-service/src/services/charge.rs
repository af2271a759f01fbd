//! Card-charge gateway client: hosted checkout initialisation and
//! verification of a completed charge by reference.

use crate::services::gateway::{to_minor, GatewayClient, GatewayResponse};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct ChargeClient {
    gateway: GatewayClient,
}

impl ChargeClient {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_configured()
    }

    /// Open a checkout session. On success `data.authorization_url` points at
    /// the gateway's payment page.
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount: u64,
        reference: &str,
    ) -> GatewayResponse {
        let Some(amount) = to_minor(amount) else {
            return GatewayResponse::failure("Amount out of range");
        };

        tracing::info!(reference = %reference, amount, "Initializing checkout");

        let body = json!({
            "email": email,
            "amount": amount,
            "reference": reference,
        });
        self.gateway.post("/transaction/initialize", &body).await
    }

    /// Ask the gateway about `reference` and decide whether it settled the
    /// expected amount.
    ///
    /// Verified means the call succeeded, the charge status is `success` and
    /// the charged minor amount equals `expected_amount` × 100.
    pub async fn verify_payment(
        &self,
        reference: &str,
        expected_amount: u64,
    ) -> (bool, GatewayResponse) {
        let response = self
            .gateway
            .get(&format!(
                "/transaction/verify/{}",
                urlencoding::encode(reference)
            ))
            .await;

        if !response.success {
            return (false, response);
        }

        let data = response.data.as_ref();
        let charge_status = data.and_then(|d| d.get("status")).and_then(Value::as_str);
        let charged = data.and_then(|d| d.get("amount")).and_then(Value::as_u64);

        let verified = charge_status == Some("success")
            && charged.is_some()
            && charged == to_minor(expected_amount);

        if verified {
            tracing::info!(reference = %reference, "Charge verified");
        } else {
            tracing::warn!(
                reference = %reference,
                charge_status = ?charge_status,
                charged = ?charged,
                expected_amount,
                "Charge did not verify"
            );
        }

        (verified, response)
    }
}
