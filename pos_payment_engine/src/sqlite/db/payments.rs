use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Payment, PaymentId, PaymentUpdate},
    traits::StoreError,
};

/// Inserts the payment, or merges the update onto the existing row, in a single statement.
///
/// * Ordinary fields are only replaced by non-empty values.
/// * `confirmed` is monotonic (`MAX`), and `confirmed_time` is write-once.
/// * `status` and `state` are frozen once the stored row is confirmed.
///
/// Because the read and the write are the same statement, two concurrent merges are serialised by SQLite and neither
/// can clobber the other's confirmation.
pub async fn upsert_merge(
    payment_id: &PaymentId,
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Payment, StoreError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payment_id,
                order_id,
                pos_id,
                address,
                currency,
                invoice_amount,
                invoice_currency,
                crypto_amount,
                status,
                state,
                confirmed,
                confirmed_time,
                payer_id,
                customer_email
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT(payment_id) DO UPDATE SET
                order_id = COALESCE(NULLIF(excluded.order_id, ''), payments.order_id),
                pos_id = COALESCE(NULLIF(excluded.pos_id, ''), payments.pos_id),
                address = COALESCE(NULLIF(excluded.address, ''), payments.address),
                currency = COALESCE(NULLIF(excluded.currency, ''), payments.currency),
                invoice_amount = COALESCE(NULLIF(excluded.invoice_amount, ''), payments.invoice_amount),
                invoice_currency = COALESCE(NULLIF(excluded.invoice_currency, ''), payments.invoice_currency),
                crypto_amount = COALESCE(NULLIF(excluded.crypto_amount, ''), payments.crypto_amount),
                status = CASE
                    WHEN payments.confirmed = 1 AND payments.status IS NOT NULL THEN payments.status
                    ELSE COALESCE(NULLIF(excluded.status, ''), payments.status)
                END,
                state = CASE
                    WHEN payments.confirmed = 1 AND payments.state IS NOT NULL THEN payments.state
                    ELSE COALESCE(NULLIF(excluded.state, ''), payments.state)
                END,
                confirmed = MAX(payments.confirmed, excluded.confirmed),
                confirmed_time = COALESCE(payments.confirmed_time, NULLIF(excluded.confirmed_time, '')),
                payer_id = COALESCE(NULLIF(excluded.payer_id, ''), payments.payer_id),
                customer_email = COALESCE(NULLIF(excluded.customer_email, ''), payments.customer_email),
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(&update.order_id)
    .bind(&update.pos_id)
    .bind(&update.address)
    .bind(&update.currency)
    .bind(&update.invoice_amount)
    .bind(&update.invoice_currency)
    .bind(&update.crypto_amount)
    .bind(&update.status)
    .bind(&update.state)
    .bind(update.confirmed)
    .bind(&update.confirmed_time)
    .bind(&update.payer_id)
    .bind(&update.customer_email)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Payment [{payment_id}] merged. confirmed: {}", payment.confirmed);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: &PaymentId, conn: &mut SqliteConnection) -> Result<Option<Payment>, StoreError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// The most recently created payments, newest first.
pub async fn fetch_recent_payments(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, StoreError> {
    let payments =
        sqlx::query_as("SELECT * FROM payments ORDER BY created_at DESC, rowid DESC LIMIT $1")
            .bind(limit)
            .fetch_all(conn)
            .await?;
    Ok(payments)
}

/// Unconfirmed, non-cancelled payments created since `since` that can be re-checked (they carry both a currency and
/// an address). Oldest first.
pub async fn fetch_unconfirmed_since(
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, StoreError> {
    let since = since.format("%Y-%m-%d %H:%M:%S").to_string();
    let payments = sqlx::query_as(
        r#"
            SELECT * FROM payments
            WHERE confirmed = 0
              AND lower(COALESCE(state, 'created')) NOT IN ('cancelled', 'canceled', 'expired')
              AND currency IS NOT NULL
              AND address IS NOT NULL
              AND datetime(created_at) >= datetime($1)
            ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(since)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}
