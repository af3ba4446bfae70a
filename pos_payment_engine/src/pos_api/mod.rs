//! # Payment engine public API
//!
//! The `pos_api` module exposes the programmatic API for the payment engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`reconciliation_api`] creates gateway invoices and keeps local payment records in step with the gateway, via
//!   webhooks and re-checks.
//! * [`fulfillment_api`] fulfills confirmed payments exactly once, and sends receipt emails.
//! * [`records_api`] provides read-only access to payments, receipts, email attempts and daily reports.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend (and, where needed, a gateway and a mailer) that
//! implements the traits in [`crate::traits`].
//!
//! ```rust,ignore
//! use pos_payment_engine::{ReconciliationApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = ReconciliationApi::new(db, gateway, mailer, settings);
//! let outcome = api.check_and_fulfill(&ReconcileRequest::new("P1", "USDT", "0xabc")).await?;
//! ```
pub mod errors;
pub mod fulfillment_api;
pub mod reconciliation_api;
pub mod records_api;
pub mod request_objects;
