use thiserror::Error;

use crate::{
    projection::ProjectionError,
    traits::{GatewayError, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("The server is not configured to create invoices. Missing: {}", .0.join(", "))]
    Configuration(Vec<String>),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The payment gateway call failed. {detail}")]
    GatewayUnavailable { status: Option<u16>, detail: String },
    /// The gateway answered the invoice request without a payment. Its status and body are kept for the caller.
    #[error("The gateway did not create an invoice. {body}")]
    InvoiceRejected { status: u16, body: String },
    #[error("The gateway response contained no usable payment data. {0}")]
    NoUpdate(String),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Fulfillment(#[from] FulfillmentError),
}

impl From<GatewayError> for ReconcileError {
    fn from(e: GatewayError) -> Self {
        ReconcileError::GatewayUnavailable { status: e.status(), detail: e.detail() }
    }
}

impl From<ProjectionError> for ReconcileError {
    fn from(e: ProjectionError) -> Self {
        ReconcileError::NoUpdate(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Payment {0} is not confirmed, so it cannot be fulfilled")]
    NotConfirmed(String),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Valid to_email required")]
    InvalidEmail,
    #[error("Email not configured")]
    MailerDisabled,
    #[error("{0}")]
    EmailFailed(String),
    #[error("{0}")]
    Store(#[from] StoreError),
}
