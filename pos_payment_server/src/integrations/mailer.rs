//! SMTP delivery of receipt emails.
//!
//! The mailer is only enabled when the SMTP host and credentials are all configured. A disabled mailer never
//! attempts delivery, and the engine skips automatic receipt emails entirely.
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;
use pos_payment_engine::traits::{MailerError, ReceiptEmail, ReceiptMailer};

use crate::{
    config::MailConfig,
    errors::ServerError,
    receipt::{receipt_subject, render_email_html, render_email_text},
};

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
    brand_name: String,
}

impl SmtpMailer {
    pub fn disabled(brand_name: &str) -> Self {
        Self { transport: None, from: None, brand_name: brand_name.to_string() }
    }

    /// Builds a STARTTLS transport from the mail configuration, or a disabled mailer if SMTP is not configured.
    pub fn new(config: &MailConfig) -> Result<Self, ServerError> {
        let (Some(host), Some(user)) = (config.smtp_host.as_deref(), config.smtp_user.as_deref()) else {
            return Ok(Self::disabled(&config.brand_name));
        };
        if config.smtp_pass.is_empty() {
            return Ok(Self::disabled(&config.brand_name));
        }
        let from = format!("{} <{}>", config.brand_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| ServerError::InitializeError(format!("Invalid sender address {}. {e}", config.from_email)))?;
        let credentials = Credentials::new(user.to_string(), config.smtp_pass.reveal().clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ServerError::InitializeError(format!("Could not configure SMTP relay {host}. {e}")))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();
        debug!("📧 SMTP mailer configured for {host}:{}", config.smtp_port);
        Ok(Self { transport: Some(transport), from: Some(from), brand_name: config.brand_name.clone() })
    }

    fn compose(&self, from: Mailbox, email: &ReceiptEmail) -> Result<Message, MailerError> {
        let to = email
            .to_email
            .parse::<Mailbox>()
            .map_err(|e| MailerError(format!("Invalid recipient {}. {e}", email.to_email)))?;
        let markup = email.receipt.as_ref().and_then(|r| r.print_string.as_deref());
        let html = render_email_html(&self.brand_name, &email.payment, markup);
        let text = render_email_text(&self.brand_name, &email.payment, markup);
        Message::builder()
            .from(from)
            .to(to)
            .subject(receipt_subject(&self.brand_name, &email.payment))
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| MailerError(format!("Could not build the receipt email. {e}")))
    }
}

impl ReceiptMailer for SmtpMailer {
    fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), MailerError> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            return Err(MailerError("Email not configured".to_string()));
        };
        let message = self.compose(from.clone(), email)?;
        trace!("📧 Sending receipt for [{}] to {}", email.payment.payment_id, email.to_email);
        transport.send(message).await.map_err(|e| MailerError(e.to_string()))?;
        Ok(())
    }
}
