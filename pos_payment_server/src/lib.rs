//! # Point-of-sale payment server
//! This crate hosts the HTTP server for the point-of-sale payment engine. It is responsible for:
//! * Creating gateway invoices on behalf of the point-of-sale frontend.
//! * Receiving gateway webhooks, which trigger a re-check of the payment with the gateway.
//! * Serving the payment records, receipts and daily reports.
//! * Delivering receipt emails over SMTP.
//! * Periodically re-checking payments that are still waiting for confirmation (optional).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/start-payment`, `/check-payment`: invoice creation and manual re-checks.
//! * `/api/gateway/callback`: The gateway webhook. Token protected and rate limited.
//! * `/payments`, `/email-receipts`, `/receipt/{id}`, `/report/daily`: read-only records.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod receipt;
pub mod reconcile_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
