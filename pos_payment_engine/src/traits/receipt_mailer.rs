use thiserror::Error;

use crate::db_types::{Payment, Receipt};

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct MailerError(pub String);

/// Everything a mailer needs to compose a receipt email.
#[derive(Debug, Clone)]
pub struct ReceiptEmail {
    pub to_email: String,
    pub payment: Payment,
    pub receipt: Option<Receipt>,
}

#[allow(async_fn_in_trait)]
pub trait ReceiptMailer {
    /// `false` if no mail transport is configured. Fulfillment skips email entirely in that case.
    fn is_enabled(&self) -> bool;

    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), MailerError>;
}
