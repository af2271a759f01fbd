pub mod charge;
pub mod filter;
pub mod gateway;
pub mod metrics;
pub mod store;
pub mod transfer;

pub use charge::ChargeClient;
pub use filter::{filter_transfers, FilterError, FilterQuery, FilterSpec};
pub use gateway::{GatewayClient, GatewayError, GatewayResponse};
pub use metrics::{get_metrics, init_metrics};
pub use store::{InMemoryPaymentStore, MongoPaymentStore, PaymentStore, StoreError};
pub use transfer::TransferClient;
