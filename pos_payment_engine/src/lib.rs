//! Point-of-sale Payment Engine
//!
//! The payment engine reconciles point-of-sale invoices with a third-party crypto payment gateway. It creates
//! invoices, learns about confirmations from webhooks and re-checks, and makes sure every confirmed payment is
//! fulfilled exactly once. It is provider-agnostic: the gateway, the mailer and the database are all traits.
//!
//! The library is divided into these main sections:
//! 1. Data types and the projection of gateway responses onto payments ([`db_types`], [`projection`]). The projection
//!    is pure and is the single definition of how gateway data is merged.
//! 2. Backend contracts ([`traits`]) and the SQLite backend ([`SqliteDatabase`]). The store's atomic upsert-merge and
//!    insert-if-absent operations are the engine's only synchronisation points.
//! 3. The payment engine public API ([`ReconciliationApi`], [`FulfillmentApi`], [`RecordsApi`]).
pub mod db_types;
pub mod helpers;
pub mod projection;
pub mod traits;

mod pos_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use pos_api::{
    errors::{FulfillmentError, ReconcileError},
    fulfillment_api::FulfillmentApi,
    reconciliation_api::ReconciliationApi,
    records_api::{RecordsApi, RECENT_LIMIT},
    request_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
