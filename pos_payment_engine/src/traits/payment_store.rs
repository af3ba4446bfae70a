use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::db_types::{
    DailySummary,
    EmailAttempt,
    Fulfillment,
    FulfillmentSnapshot,
    NewEmailAttempt,
    Payment,
    PaymentId,
    PaymentUpdate,
    Receipt,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Could not serialize the fulfillment snapshot. {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

/// The write side of the payment store. Backends must make each of these calls atomic, since the same payment can be
/// reconciled by a webhook and a manual re-check at the same time.
#[allow(async_fn_in_trait)]
pub trait PaymentStore: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Inserts the payment if it does not exist, otherwise merges `update` onto the stored record, following the same
    /// rules as [`Payment::merged_with`]. The merge happens in a single statement, so concurrent writers can never
    /// revert `confirmed` or erase a known field. Returns the payment as stored after the merge.
    async fn upsert_payment(&self, payment_id: &PaymentId, update: &PaymentUpdate) -> Result<Payment, StoreError>;

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Stores the receipt markup for a payment, replacing any previous markup.
    async fn upsert_receipt(&self, payment_id: &PaymentId, print_string: &str) -> Result<Receipt, StoreError>;

    async fn fetch_receipt(&self, payment_id: &PaymentId) -> Result<Option<Receipt>, StoreError>;

    async fn fetch_fulfillment(&self, payment_id: &PaymentId) -> Result<Option<Fulfillment>, StoreError>;

    /// Writes the fulfillment marker unless one already exists.
    ///
    /// Returns `true` if this call created the marker, and `false` if it was already there. At most one caller ever
    /// sees `true` for a given payment.
    async fn insert_fulfillment_if_absent(
        &self,
        payment_id: &PaymentId,
        snapshot: &FulfillmentSnapshot,
    ) -> Result<bool, StoreError>;

    /// Records the outcome of a receipt email, overwriting the previous attempt for the same payment.
    async fn record_email_attempt(&self, attempt: NewEmailAttempt) -> Result<EmailAttempt, StoreError>;

    async fn fetch_email_attempt(&self, payment_id: &PaymentId) -> Result<Option<EmailAttempt>, StoreError>;
}

/// Read-only queries used by the admin endpoints and the background sweep. Records are always backed by a store.
#[allow(async_fn_in_trait)]
pub trait PaymentRecords: PaymentStore {
    /// The most recently created payments, newest first.
    async fn recent_payments(&self, limit: i64) -> Result<Vec<Payment>, StoreError>;

    /// The most recent email attempts, newest first.
    async fn recent_email_attempts(&self, limit: i64) -> Result<Vec<EmailAttempt>, StoreError>;

    /// Payments created since `since` that are neither confirmed nor cancelled, and that carry enough information
    /// (currency and address) to be re-checked with the gateway.
    async fn payments_awaiting_confirmation(&self, since: DateTime<Utc>) -> Result<Vec<Payment>, StoreError>;

    /// Confirmed payments whose confirmation time falls on `date`, with per-currency totals.
    async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, StoreError>;
}
