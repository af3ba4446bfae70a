use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CurrencyTotal, DailySummary, Payment},
    traits::StoreError,
};

/// Confirmed payments whose confirmation time falls on `date`, grouped by fiat and by crypto currency.
pub async fn daily_summary(date: NaiveDate, conn: &mut SqliteConnection) -> Result<DailySummary, StoreError> {
    let day = date.format("%Y-%m-%d").to_string();
    let fiat_totals: Vec<CurrencyTotal> = sqlx::query_as(
        r#"
            SELECT invoice_currency AS currency,
                   COUNT(*) AS count,
                   ROUND(SUM(CAST(invoice_amount AS REAL)), 2) AS total
            FROM payments
            WHERE confirmed = 1 AND date(confirmed_time) = date($1)
            GROUP BY invoice_currency
            ORDER BY invoice_currency
        "#,
    )
    .bind(&day)
    .fetch_all(&mut *conn)
    .await?;
    let crypto_totals: Vec<CurrencyTotal> = sqlx::query_as(
        r#"
            SELECT currency,
                   COUNT(*) AS count,
                   ROUND(SUM(CAST(crypto_amount AS REAL)), 8) AS total
            FROM payments
            WHERE confirmed = 1 AND date(confirmed_time) = date($1)
            GROUP BY currency
            ORDER BY currency
        "#,
    )
    .bind(&day)
    .fetch_all(&mut *conn)
    .await?;
    let payments: Vec<Payment> = sqlx::query_as(
        "SELECT * FROM payments WHERE confirmed = 1 AND date(confirmed_time) = date($1) ORDER BY confirmed_time ASC",
    )
    .bind(&day)
    .fetch_all(&mut *conn)
    .await?;
    Ok(DailySummary { date, fiat_totals, crypto_totals, payments })
}
