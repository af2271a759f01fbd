//! Persistence of payment attempts, keyed by reference.

use crate::models::PaymentRecord;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{bson::doc, Collection, Database, IndexModel};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate payment reference: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new record; fails with [`StoreError::Duplicate`] if the
    /// reference is taken.
    async fn insert(&self, record: PaymentRecord) -> Result<(), StoreError>;

    async fn find_by_reference(&self, reference: &str)
        -> Result<Option<PaymentRecord>, StoreError>;

    /// Returns `false` when no record has this reference.
    async fn mark_verified(&self, reference: &str) -> Result<bool, StoreError>;
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<DashMap<String, PaymentRecord>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<(), StoreError> {
        match self.records.entry(record.reference.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.reference)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.records.get(reference).map(|r| r.value().clone()))
    }

    async fn mark_verified(&self, reference: &str) -> Result<bool, StoreError> {
        match self.records.get_mut(reference) {
            Some(mut record) => {
                record.verified = true;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone)]
pub struct MongoPaymentStore {
    collection: Collection<PaymentRecord>,
}

impl MongoPaymentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("payments"),
        }
    }

    /// Unique index on `reference`; lookups and duplicate detection rely on it.
    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        let reference_index = IndexModel::builder()
            .keys(doc! { "reference": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_reference_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([reference_index], None)
            .await?;

        tracing::info!("Payment store indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MongoPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<(), StoreError> {
        let reference = record.reference.clone();
        match self.collection.insert_one(record, None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let duplicate = matches!(
                    *e.kind,
                    ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY
                );
                if duplicate {
                    Err(StoreError::Duplicate(reference))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let record = self
            .collection
            .find_one(doc! { "reference": reference }, None)
            .await?;
        Ok(record)
    }

    async fn mark_verified(&self, reference: &str) -> Result<bool, StoreError> {
        let update = doc! {
            "$set": {
                "verified": true,
                "updated_at": mongodb::bson::to_bson(&Utc::now())?,
            }
        };
        let result = self
            .collection
            .update_one(doc! { "reference": reference }, update, None)
            .await?;
        Ok(result.matched_count > 0)
    }
}
