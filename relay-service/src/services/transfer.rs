//! Transfer (payout) gateway client.
//!
//! Recipients, single and bulk transfers, OTP finalisation, balances and the
//! bank directory. Amounts are taken in major units and sent in minor units.

use crate::models::{Balance, BulkTransferItem, TransferRecord};
use crate::services::filter::{filter_transfers, FilterError, FilterSpec};
use crate::services::gateway::{to_minor, GatewayClient, GatewayResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

const AMOUNT_OUT_OF_RANGE: &str = "Amount out of range";

#[derive(Clone)]
pub struct TransferClient {
    gateway: GatewayClient,
    currency: String,
}

/// Balance entry as reported by the gateway, in minor units.
#[derive(Deserialize)]
struct RawBalance {
    currency: String,
    balance: u64,
}

impl TransferClient {
    pub fn new(gateway: GatewayClient, currency: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
        }
    }

    /// Register a bank account as a transfer recipient.
    ///
    /// `bank_name` is resolved to a bank code through the bank directory; an
    /// unknown bank fails without contacting the recipient endpoint. A failed
    /// directory lookup is returned as is.
    pub async fn create_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_name: &str,
    ) -> GatewayResponse {
        let directory = self.get_banks().await;
        if !directory.success {
            return directory;
        }

        let bank_code = find_bank(directory.data, bank_name)
            .and_then(|bank| bank.get("code").and_then(Value::as_str).map(str::to_string));
        let Some(bank_code) = bank_code else {
            return GatewayResponse::failure(format!("Bank not found: {}", bank_name));
        };

        tracing::info!(name = %name, bank_code = %bank_code, "Creating transfer recipient");

        let body = json!({
            "type": "nuban",
            "name": name,
            "description": name,
            "account_number": account_number,
            "bank_code": bank_code,
            "currency": self.currency,
        });
        self.gateway.post("/transferrecipient", &body).await
    }

    pub async fn initialize_transfer(
        &self,
        amount: u64,
        recipient_code: &str,
        reason: &str,
    ) -> GatewayResponse {
        let Some(amount) = to_minor(amount) else {
            return GatewayResponse::failure(AMOUNT_OUT_OF_RANGE);
        };

        tracing::info!(recipient = %recipient_code, amount, "Initiating transfer");

        let body = json!({
            "source": "balance",
            "reason": reason,
            "amount": amount,
            "recipient": recipient_code,
        });
        self.gateway.post("/transfer", &body).await
    }

    /// Finalise a transfer that is waiting on an OTP.
    pub async fn verify_transfer(&self, transfer_code: &str, otp: &str) -> GatewayResponse {
        let body = json!({ "transfer_code": transfer_code, "otp": otp });
        self.gateway
            .post("/transfer/finalize_transfer", &body)
            .await
    }

    pub async fn get_transfer(&self, transfer_code: &str) -> GatewayResponse {
        self.gateway
            .get(&format!("/transfer/{}", urlencoding::encode(transfer_code)))
            .await
    }

    /// Fetch the transfer list and keep the records selected by `spec`.
    ///
    /// Gateway failures come back in the response; an invalid filter or an
    /// unparseable timestamp is returned as an error.
    pub async fn list_transfers(&self, spec: &FilterSpec) -> Result<GatewayResponse, FilterError> {
        let response = self.gateway.get("/transfer").await;
        if !response.success {
            return Ok(response);
        }

        let records: Vec<TransferRecord> = match response.data {
            None | Some(Value::Null) => Vec::new(),
            Some(data) => match serde_json::from_value(data) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "Unexpected transfer list shape");
                    return Ok(GatewayResponse::failure(format!(
                        "Unexpected transfer list shape: {}",
                        e
                    )));
                }
            },
        };

        let matched = filter_transfers(&records, spec)?;
        tracing::debug!(total = records.len(), matched = matched.len(), "Filtered transfers");

        let data = match serde_json::to_value(&matched) {
            Ok(data) => data,
            Err(e) => return Ok(GatewayResponse::failure(e.to_string())),
        };

        Ok(GatewayResponse {
            success: true,
            message: response.message,
            data: Some(data),
        })
    }

    pub async fn bulk_transfer(&self, transfers: &[BulkTransferItem]) -> GatewayResponse {
        let mut legs = Vec::with_capacity(transfers.len());
        for item in transfers {
            let Some(amount) = to_minor(item.amount) else {
                return GatewayResponse::failure(AMOUNT_OUT_OF_RANGE);
            };
            legs.push(json!({ "amount": amount, "recipient": item.recipient }));
        }

        tracing::info!(count = legs.len(), "Queueing bulk transfer");

        let body = json!({
            "currency": self.currency,
            "source": "balance",
            "transfers": legs,
        });
        self.gateway.post("/transfer/bulk", &body).await
    }

    /// Balances in major units. Empty when the gateway call fails.
    pub async fn check_balance(&self) -> Vec<Balance> {
        let response = self.gateway.get("/balance").await;
        if !response.success {
            return Vec::new();
        }

        let raw: Vec<RawBalance> = match response.data.map(serde_json::from_value) {
            Some(Ok(raw)) => raw,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Unexpected balance shape");
                return Vec::new();
            }
            None => return Vec::new(),
        };

        raw.into_iter()
            .map(|b| Balance {
                currency: b.currency,
                balance: Decimal::from(b.balance) / Decimal::ONE_HUNDRED,
            })
            .collect()
    }

    pub async fn get_banks(&self) -> GatewayResponse {
        self.gateway.get("/bank").await
    }

    /// First bank in the directory whose name matches exactly.
    pub async fn get_bank(&self, name: &str) -> Option<Value> {
        let response = self.get_banks().await;
        if !response.success {
            return None;
        }
        find_bank(response.data, name)
    }
}

fn find_bank(directory: Option<Value>, name: &str) -> Option<Value> {
    match directory? {
        Value::Array(banks) => banks
            .into_iter()
            .find(|bank| bank.get("name").and_then(Value::as_str) == Some(name)),
        _ => None,
    }
}
