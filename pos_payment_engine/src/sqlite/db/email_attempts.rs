use sqlx::SqliteConnection;

use crate::{
    db_types::{EmailAttempt, NewEmailAttempt, PaymentId},
    traits::StoreError,
};

/// Records the latest email attempt for a payment. Earlier attempts are overwritten.
pub async fn upsert_attempt(attempt: NewEmailAttempt, conn: &mut SqliteConnection) -> Result<EmailAttempt, StoreError> {
    let attempt = sqlx::query_as(
        r#"
            INSERT INTO email_attempts (payment_id, to_email, status, error) VALUES ($1, $2, $3, $4)
            ON CONFLICT(payment_id) DO UPDATE SET
                to_email = excluded.to_email,
                status = excluded.status,
                error = excluded.error,
                sent_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(attempt.payment_id)
    .bind(attempt.to_email)
    .bind(attempt.status)
    .bind(attempt.error)
    .fetch_one(conn)
    .await?;
    Ok(attempt)
}

pub async fn fetch_attempt(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<EmailAttempt>, StoreError> {
    let attempt = sqlx::query_as("SELECT * FROM email_attempts WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(attempt)
}

pub async fn fetch_recent_attempts(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<EmailAttempt>, StoreError> {
    let attempts = sqlx::query_as("SELECT * FROM email_attempts ORDER BY sent_at DESC, rowid DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(attempts)
}
