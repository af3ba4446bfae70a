use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    db_types::{DailySummary, EmailAttempt, Fulfillment, Payment, PaymentId, Receipt},
    traits::{PaymentRecords, PaymentStore, StoreError},
};

/// The number of rows returned by the "recent" listings.
pub const RECENT_LIMIT: i64 = 50;

/// `RecordsApi` is the read side of the payment store, used by the admin endpoints and the background sweep.
pub struct RecordsApi<B> {
    db: B,
}

impl<B> Debug for RecordsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordsApi")
    }
}

impl<B> RecordsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> RecordsApi<B>
where B: PaymentRecords
{
    pub async fn recent_payments(&self) -> Result<Vec<Payment>, StoreError> {
        self.db.recent_payments(RECENT_LIMIT).await
    }

    pub async fn payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        self.db.fetch_payment(payment_id).await
    }

    pub async fn recent_email_attempts(&self) -> Result<Vec<EmailAttempt>, StoreError> {
        self.db.recent_email_attempts(RECENT_LIMIT).await
    }

    pub async fn receipt(&self, payment_id: &PaymentId) -> Result<Option<Receipt>, StoreError> {
        self.db.fetch_receipt(payment_id).await
    }

    pub async fn fulfillment(&self, payment_id: &PaymentId) -> Result<Option<Fulfillment>, StoreError> {
        self.db.fetch_fulfillment(payment_id).await
    }

    pub async fn payments_awaiting_confirmation(&self, since: DateTime<Utc>) -> Result<Vec<Payment>, StoreError> {
        self.db.payments_awaiting_confirmation(since).await
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, StoreError> {
        self.db.daily_summary(date).await
    }
}
