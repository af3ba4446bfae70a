//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, email_attempts, fulfillments, new_pool, payments, receipts, reports};
use crate::{
    db_types::{
        DailySummary,
        EmailAttempt,
        Fulfillment,
        FulfillmentSnapshot,
        NewEmailAttempt,
        Payment,
        PaymentId,
        PaymentUpdate,
        Receipt,
    },
    traits::{PaymentRecords, PaymentStore, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn upsert_payment(&self, payment_id: &PaymentId, update: &PaymentUpdate) -> Result<Payment, StoreError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::upsert_merge(payment_id, update, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(payment_id, &mut conn).await
    }

    async fn upsert_receipt(&self, payment_id: &PaymentId, print_string: &str) -> Result<Receipt, StoreError> {
        let mut tx = self.pool.begin().await?;
        let receipt = receipts::upsert_receipt(payment_id, print_string, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Receipt for [{payment_id}] stored");
        Ok(receipt)
    }

    async fn fetch_receipt(&self, payment_id: &PaymentId) -> Result<Option<Receipt>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        receipts::fetch_receipt(payment_id, &mut conn).await
    }

    async fn fetch_fulfillment(&self, payment_id: &PaymentId) -> Result<Option<Fulfillment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fulfillments::fetch_fulfillment(payment_id, &mut conn).await
    }

    async fn insert_fulfillment_if_absent(
        &self,
        payment_id: &PaymentId,
        snapshot: &FulfillmentSnapshot,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = fulfillments::insert_if_absent(payment_id, snapshot, &mut tx).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn record_email_attempt(&self, attempt: NewEmailAttempt) -> Result<EmailAttempt, StoreError> {
        let mut tx = self.pool.begin().await?;
        let attempt = email_attempts::upsert_attempt(attempt, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Email attempt for [{}] recorded as {}", attempt.payment_id, attempt.status);
        Ok(attempt)
    }

    async fn fetch_email_attempt(&self, payment_id: &PaymentId) -> Result<Option<EmailAttempt>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        email_attempts::fetch_attempt(payment_id, &mut conn).await
    }
}

impl PaymentRecords for SqliteDatabase {
    async fn recent_payments(&self, limit: i64) -> Result<Vec<Payment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_recent_payments(limit, &mut conn).await
    }

    async fn recent_email_attempts(&self, limit: i64) -> Result<Vec<EmailAttempt>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        email_attempts::fetch_recent_attempts(limit, &mut conn).await
    }

    async fn payments_awaiting_confirmation(&self, since: DateTime<Utc>) -> Result<Vec<Payment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_unconfirmed_since(since, &mut conn).await
    }

    async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, StoreError> {
        let mut conn = self.pool.acquire().await?;
        reports::daily_summary(date, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `POS_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
