//! #  Backend and collaborator contracts.
//!
//! The reconciliation engine is provider-agnostic. It talks to three collaborators, each described by a trait here:
//!
//! * [`PaymentStore`] is the durable record of payments, receipts, fulfillment markers and email attempts. Its merge
//!   and insert-if-absent operations are the engine's only synchronisation points.
//! * [`PaymentRecords`] provides the read-only queries used by the admin endpoints and the background sweep.
//! * [`PaymentGateway`] creates invoices and reports payment status.
//! * [`ReceiptMailer`] delivers receipt emails.
mod data_objects;
mod payment_gateway;
mod payment_store;
mod receipt_mailer;

pub use data_objects::{GatewayResponse, NewInvoice, PaymentQuery};
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use payment_store::{PaymentRecords, PaymentStore, StoreError};
pub use receipt_mailer::{MailerError, ReceiptEmail, ReceiptMailer};
