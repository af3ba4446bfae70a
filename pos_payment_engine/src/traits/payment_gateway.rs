use thiserror::Error;

use crate::traits::data_objects::{GatewayResponse, NewInvoice, PaymentQuery};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached. {0}")]
    Unreachable(String),
    #[error("The payment gateway did not respond in time.")]
    Timeout,
    #[error("The payment gateway rejected the request with status {status}. {body}")]
    Rejected { status: u16, body: String },
}

impl GatewayError {
    /// The HTTP status the gateway returned, if it returned one at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw gateway body, or a description of the failure.
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Rejected { body, .. } => body.clone(),
            e => e.to_string(),
        }
    }
}

/// The outbound side of the payment gateway. Implementations must bound every call with a timeout.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Lists every configuration item that must be set before invoices can be created. Empty means ready.
    fn missing_configuration(&self) -> Vec<String>;

    /// Asks the gateway to create an invoice.
    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<GatewayResponse, GatewayError>;

    /// Asks the gateway for the current status of a payment.
    async fn query_status(&self, query: &PaymentQuery) -> Result<GatewayResponse, GatewayError>;
}
