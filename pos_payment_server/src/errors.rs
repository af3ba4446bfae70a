use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use pos_payment_engine::{traits::StoreError, FulfillmentError, ReconcileError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Missing env vars")]
    ConfigurationError(Vec<String>),
    /// The gateway refused or failed a StartPayment call. Its status and body are relayed to the caller. Without a
    /// gateway status, this is a 502.
    #[error("{body}")]
    GatewayError { status: Option<u16>, body: String },
    /// A re-check could not reach the gateway. Always a 502.
    #[error("failed to re-check")]
    RecheckFailed(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    EmailError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GatewayError { status, .. } => {
                status.and_then(|s| StatusCode::from_u16(s).ok()).unwrap_or(StatusCode::BAD_GATEWAY)
            },
            Self::RecheckFailed(_) => StatusCode::BAD_GATEWAY,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::EmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::ConfigurationError(missing) => json!({ "error": self.to_string(), "missing": missing }),
            Self::GatewayError { body, .. } => return gateway_body_response(self.status_code(), body),
            Self::RecheckFailed(detail) => json!({ "error": self.to_string(), "detail": detail }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

/// Relays the gateway's own error body. JSON bodies are passed through as-is, anything else is wrapped.
fn gateway_body_response(status: StatusCode, body: &str) -> HttpResponse {
    let body = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => v.to_string(),
        Err(_) => json!({ "error": body }).to_string(),
    };
    HttpResponse::build(status).insert_header(ContentType::json()).body(body)
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<ReconcileError> for ServerError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Configuration(missing) => Self::ConfigurationError(missing),
            ReconcileError::InvalidRequest(msg) => Self::InvalidRequestBody(msg),
            ReconcileError::GatewayUnavailable { status, detail } => Self::GatewayError { status, body: detail },
            ReconcileError::InvoiceRejected { status, body } => Self::GatewayError { status: Some(status), body },
            ReconcileError::NoUpdate(msg) => Self::GatewayError { status: None, body: msg },
            ReconcileError::Store(e) => e.into(),
            ReconcileError::Fulfillment(e) => e.into(),
        }
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::PaymentNotFound(_) => Self::NoRecordFound("Payment not found".to_string()),
            FulfillmentError::InvalidEmail => Self::InvalidRequestBody(e.to_string()),
            FulfillmentError::MailerDisabled => Self::EmailError("Email not configured on server".to_string()),
            FulfillmentError::EmailFailed(detail) => Self::EmailError(format!("Failed to send email. {detail}")),
            FulfillmentError::NotConfirmed(_) => Self::BackendError(e.to_string()),
            FulfillmentError::Store(e) => e.into(),
        }
    }
}
