use sqlx::SqliteConnection;

use crate::{
    db_types::{PaymentId, Receipt},
    traits::StoreError,
};

/// Stores the receipt markup verbatim. A `NULL` never replaces existing markup.
pub async fn upsert_receipt(
    payment_id: &PaymentId,
    print_string: &str,
    conn: &mut SqliteConnection,
) -> Result<Receipt, StoreError> {
    let receipt = sqlx::query_as(
        r#"
            INSERT INTO receipts (payment_id, print_string) VALUES ($1, $2)
            ON CONFLICT(payment_id) DO UPDATE SET
                print_string = COALESCE(excluded.print_string, receipts.print_string),
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(print_string)
    .fetch_one(conn)
    .await?;
    Ok(receipt)
}

pub async fn fetch_receipt(payment_id: &PaymentId, conn: &mut SqliteConnection) -> Result<Option<Receipt>, StoreError> {
    let receipt = sqlx::query_as("SELECT * FROM receipts WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(receipt)
}
