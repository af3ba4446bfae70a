use std::fmt::Debug;

use log::*;
use pos_common::{helpers::non_blank, is_valid_email};

use crate::{
    db_types::{EmailAttempt, FulfillmentSnapshot, NewEmailAttempt, Payment, PaymentId},
    pos_api::{errors::FulfillmentError, request_objects::FulfillmentOutcome},
    traits::{PaymentStore, ReceiptEmail, ReceiptMailer},
};

/// `FulfillmentApi` turns a confirmed payment into a fulfilled one, exactly once.
///
/// The fulfillment marker in the store is the only synchronisation point. Whoever manages to write it performs the
/// side effects (currently the receipt email). Everyone else is told the work has already been done.
pub struct FulfillmentApi<B, M> {
    db: B,
    mailer: M,
}

impl<B, M> Debug for FulfillmentApi<B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi")
    }
}

impl<B, M> FulfillmentApi<B, M> {
    pub fn new(db: B, mailer: M) -> Self {
        Self { db, mailer }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }
}

impl<B, M> FulfillmentApi<B, M>
where
    B: PaymentStore,
    M: ReceiptMailer,
{
    /// Fulfills the payment unless it has been fulfilled already.
    ///
    /// Safe to call any number of times, from any number of concurrent tasks. A failed receipt email is recorded but
    /// never undoes the fulfillment, and is never retried automatically.
    pub async fn fulfill_if_needed(&self, payment: &Payment) -> Result<FulfillmentOutcome, FulfillmentError> {
        let payment_id = &payment.payment_id;
        if !payment.confirmed {
            return Err(FulfillmentError::NotConfirmed(payment_id.to_string()));
        }
        if self.db.fetch_fulfillment(payment_id).await?.is_some() {
            debug!("🧾 Payment [{payment_id}] has already been fulfilled");
            return Ok(FulfillmentOutcome { already_done: true, email: None });
        }
        let snapshot = FulfillmentSnapshot::from(payment);
        if !self.db.insert_fulfillment_if_absent(payment_id, &snapshot).await? {
            debug!("🧾 Payment [{payment_id}] was fulfilled by a concurrent caller");
            return Ok(FulfillmentOutcome { already_done: true, email: None });
        }
        info!(
            "🧾 Fulfilled payment [{payment_id}] for order {}. {} {} paid with {} {}",
            snapshot.order_id.as_deref().unwrap_or("(none)"),
            snapshot.amount_fiat.value.as_deref().unwrap_or("?"),
            snapshot.amount_fiat.currency.as_deref().unwrap_or("?"),
            snapshot.amount_crypto.value.as_deref().unwrap_or("?"),
            snapshot.amount_crypto.currency.as_deref().unwrap_or("?"),
        );
        let email = self.auto_email(payment).await?;
        Ok(FulfillmentOutcome { already_done: false, email })
    }

    async fn auto_email(&self, payment: &Payment) -> Result<Option<EmailAttempt>, FulfillmentError> {
        let payment_id = &payment.payment_id;
        let to_email = match non_blank(payment.customer_email.as_deref()) {
            Some(email) if is_valid_email(&email) => email,
            Some(email) => {
                warn!("🧾 Not emailing a receipt for [{payment_id}]. '{email}' is not a valid email address");
                return Ok(None);
            },
            None => return Ok(None),
        };
        if !self.mailer.is_enabled() {
            info!("🧾 Email is not configured. Skipping the receipt email for [{payment_id}]");
            return Ok(None);
        }
        let attempt = self.deliver(payment, to_email).await?;
        Ok(Some(attempt))
    }

    /// Sends the receipt and records the outcome. Delivery failures are recorded, not returned.
    async fn deliver(&self, payment: &Payment, to_email: String) -> Result<EmailAttempt, FulfillmentError> {
        let payment_id = payment.payment_id.clone();
        // An unreadable receipt is sent without its printed block
        let receipt = self.db.fetch_receipt(&payment_id).await.unwrap_or_else(|e| {
            warn!("📧 Could not fetch the receipt for [{payment_id}]. Sending the email without it. {e}");
            None
        });
        let email = ReceiptEmail { to_email: to_email.clone(), payment: payment.clone(), receipt };
        let attempt = match self.mailer.send_receipt(&email).await {
            Ok(()) => {
                info!("📧 Receipt for [{payment_id}] emailed to {to_email}");
                NewEmailAttempt::sent(payment_id, to_email)
            },
            Err(e) => {
                warn!("📧 Could not email the receipt for [{payment_id}] to {to_email}. {e}");
                NewEmailAttempt::failed(payment_id, to_email, e.to_string())
            },
        };
        let attempt = self.db.record_email_attempt(attempt).await?;
        Ok(attempt)
    }

    /// Emails the receipt on request, to `to_email` if given, otherwise to the customer email on file.
    ///
    /// Unlike the automatic email, a delivery failure is returned to the caller (after being recorded).
    pub async fn send_receipt(
        &self,
        payment_id: &PaymentId,
        to_email: Option<&str>,
    ) -> Result<EmailAttempt, FulfillmentError> {
        let payment = self
            .db
            .fetch_payment(payment_id)
            .await?
            .ok_or_else(|| FulfillmentError::PaymentNotFound(payment_id.to_string()))?;
        let to_email = non_blank(to_email)
            .or_else(|| non_blank(payment.customer_email.as_deref()))
            .filter(|e| is_valid_email(e))
            .ok_or(FulfillmentError::InvalidEmail)?;
        if !self.mailer.is_enabled() {
            return Err(FulfillmentError::MailerDisabled);
        }
        let attempt = self.deliver(&payment, to_email).await?;
        match &attempt.error {
            Some(e) => Err(FulfillmentError::EmailFailed(e.clone())),
            None => Ok(attempt),
        }
    }
}
