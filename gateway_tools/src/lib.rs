//! # Gateway tools
//!
//! A thin, stateless client for the payment gateway's invoice API. Only two calls are needed by the point-of-sale
//! backend:
//!
//! * `StartPayment` creates a new invoice and returns a settlement address, the crypto amount and a receipt template.
//! * `CheckPayment` returns the gateway's current view of an invoice.
//!
//! Responses are returned as a [`GatewayReply`] holding the raw body. Interpreting the body is the job of the payment
//! engine, since the gateway is not consistent about which fields it returns on which endpoint.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{CheckPaymentRequest, GatewayReply, StartPaymentRequest};
pub use error::GatewayApiError;
