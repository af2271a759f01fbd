use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One transfer as reported by the transfer gateway.
///
/// Only the fields the filter inspects are typed; everything else rides along
/// in `extra` and is serialized back out untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub status: String,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(alias = "updatedAt")]
    pub updated_at: String,
    pub recipient: Recipient,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Beneficiary embedded in a transfer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecipient")]
pub struct Recipient {
    pub recipient_code: String,
    pub name: String,
    /// `None` when the gateway reports no account (or a null one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a recipient; the gateway nests the account number under
/// `details`, local fixtures may carry it flat.
#[derive(Deserialize)]
struct RawRecipient {
    recipient_code: String,
    name: String,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawRecipient> for Recipient {
    fn from(raw: RawRecipient) -> Self {
        let account_number = raw.account_number.or_else(|| {
            raw.extra
                .get("details")
                .and_then(|d| d.get("account_number"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Self {
            recipient_code: raw.recipient_code,
            name: raw.name,
            account_number,
            extra: raw.extra,
        }
    }
}

/// Account balance in major currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub balance: Decimal,
}

/// One leg of a bulk transfer; `amount` is in major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkTransferItem {
    pub amount: u64,
    pub recipient: String,
}

/// A card payment attempt started from the web form.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub reference: String,
    pub email: String,
    /// Major currency units.
    pub amount: u64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(reference: String, email: String, amount: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reference,
            email,
            amount,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}
