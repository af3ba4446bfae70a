use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Fulfillment, FulfillmentSnapshot, PaymentId},
    traits::StoreError,
};

/// Writes the fulfillment marker if there isn't one already. Returns `true` if this call wrote it.
///
/// The primary key on `payment_id` is the idempotency boundary: of any number of concurrent callers, exactly one
/// gets a row count of one.
pub async fn insert_if_absent(
    payment_id: &PaymentId,
    snapshot: &FulfillmentSnapshot,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let payload = serde_json::to_string(snapshot)?;
    let result = sqlx::query(
        "INSERT INTO fulfillments (payment_id, payload_json) VALUES ($1, $2) ON CONFLICT(payment_id) DO NOTHING",
    )
    .bind(payment_id)
    .bind(payload)
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    debug!("🗃️ Fulfillment marker for [{payment_id}] {}", if inserted { "written" } else { "already present" });
    Ok(inserted)
}

pub async fn fetch_fulfillment(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Fulfillment>, StoreError> {
    let fulfillment = sqlx::query_as("SELECT * FROM fulfillments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(fulfillment)
}
