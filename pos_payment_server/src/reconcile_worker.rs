use std::time::Duration;

use chrono::Utc;
use log::*;
use pos_payment_engine::{
    db_types::Payment,
    request_objects::{CheckOutcome, InvoiceSettings, ReconcileRequest},
    ReconciliationApi,
    RecordsApi,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

use crate::integrations::{GatewayConnector, SmtpMailer};

/// Starts the reconciliation sweep. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, payments created within the last `window` that are still unconfirmed are re-checked with the
/// gateway. This picks up confirmations whose webhook was lost or rejected.
pub fn start_reconciliation_worker(
    db: SqliteDatabase,
    gateway: GatewayConnector,
    mailer: SmtpMailer,
    settings: InvoiceSettings,
    interval: Duration,
    window: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let records = RecordsApi::new(db.clone());
        let api = ReconciliationApi::new(db, gateway, mailer, settings);
        info!("🕰️ Reconciliation sweep started");
        loop {
            timer.tick().await;
            let since = Utc::now() - window;
            let pending = match records.payments_awaiting_confirmation(since).await {
                Ok(p) => p,
                Err(e) => {
                    error!("🕰️ Could not fetch unconfirmed payments: {e}");
                    continue;
                },
            };
            if pending.is_empty() {
                trace!("🕰️ No unconfirmed payments to re-check");
                continue;
            }
            info!("🕰️ Re-checking {} unconfirmed payments", pending.len());
            let mut confirmed = Vec::new();
            for payment in &pending {
                match api.check_and_fulfill(&ReconcileRequest::from(payment)).await {
                    Ok(CheckOutcome { payment, is_now_confirmed: true, .. }) => confirmed.push(payment),
                    Ok(_) => {},
                    Err(e) => warn!("🕰️ Could not re-check payment [{}]. {e}", payment.payment_id),
                }
            }
            info!("🕰️ {} of {} payments are now confirmed", confirmed.len(), pending.len());
            debug!("🕰️ Confirmed by the sweep: {}", payment_list(&confirmed));
        }
    })
}

fn payment_list(payments: &[Payment]) -> String {
    payments
        .iter()
        .map(|p| format!("[{}] order_id: {}", p.payment_id, p.order_id.as_deref().unwrap_or("-")))
        .collect::<Vec<String>>()
        .join(", ")
}
