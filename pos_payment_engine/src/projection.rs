//! # Payment projection
//!
//! Gateway responses (invoice creation, status checks and webhook payloads) are loosely structured JSON objects.
//! This module reads the fields we care about through an explicit rule table, and merges them onto the stored
//! [`Payment`] record. Everything here is pure: no I/O, no clocks beyond the merge timestamp.
//!
//! Unknown keys are ignored. Numbers are stringified. Empty strings and `null` count as "not reported", so a sparse
//! response can never erase a field we already know about.
use pos_common::helpers::non_blank;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{Payment, PaymentId, PaymentUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    PaymentId,
    OrderId,
    PosId,
    Address,
    Currency,
    InvoiceAmount,
    InvoiceCurrency,
    CryptoAmount,
    Status,
    State,
    ConfirmedTime,
    PayerId,
    CustomerEmail,
}

/// Each field and the response keys it is read from, in order of precedence.
pub const FIELD_SOURCES: &[(PaymentField, &[&str])] = &[
    (PaymentField::PaymentId, &["payment_id", "paymentId"]),
    (PaymentField::OrderId, &["order_id", "orderId"]),
    (PaymentField::PosId, &["pos_id", "posId"]),
    (PaymentField::Address, &["address"]),
    (PaymentField::Currency, &["currency"]),
    (PaymentField::InvoiceAmount, &["invoice_amount", "invoiceAmount"]),
    (PaymentField::InvoiceCurrency, &["invoice_currency", "invoiceCurrency"]),
    (PaymentField::CryptoAmount, &["payment", "amount", "crypto_amount"]),
    (PaymentField::Status, &["status"]),
    (PaymentField::State, &["state"]),
    (PaymentField::ConfirmedTime, &["confirmed_time", "confirmedTime"]),
    (PaymentField::PayerId, &["payer_id", "payerId"]),
    (PaymentField::CustomerEmail, &["customer_email", "customerEmail"]),
];

/// A single way the gateway can tell us a payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationRule {
    /// The key holds `true` (or `1`, or `"true"`).
    Flag(&'static str),
    /// The key holds exactly this string. Case-sensitive.
    Equals(&'static str, &'static str),
}

/// A response is a confirmation if any of these rules match.
pub const CONFIRMATION_RULES: &[ConfirmationRule] = &[
    ConfirmationRule::Flag("confirmed"),
    ConfirmationRule::Equals("state", "confirmed"),
    ConfirmationRule::Equals("status", "Confirmed"),
];

const PRINT_STRING_KEYS: &[&str] = &["print_string", "printString"];

#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    #[error("The gateway response does not identify a payment")]
    MissingPaymentId,
}

impl ConfirmationRule {
    pub fn matches(&self, response: &Value) -> bool {
        match self {
            ConfirmationRule::Flag(key) => match response.get(*key) {
                Some(Value::Bool(b)) => *b,
                Some(Value::Number(n)) => n.as_i64() == Some(1),
                Some(Value::String(s)) => s == "true" || s == "1",
                _ => false,
            },
            ConfirmationRule::Equals(key, expected) => response.get(*key).and_then(Value::as_str) == Some(*expected),
        }
    }
}

/// Reads a scalar as a string. Objects, arrays, nulls and blank strings yield `None`.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns the first usable value for `field` in `response`.
pub fn read_field(response: &Value, field: PaymentField) -> Option<String> {
    FIELD_SOURCES
        .iter()
        .filter(|(f, _)| *f == field)
        .flat_map(|(_, keys)| keys.iter())
        .find_map(|key| response.get(*key).and_then(scalar))
}

pub fn is_confirmed(response: &Value) -> bool {
    CONFIRMATION_RULES.iter().any(|rule| rule.matches(response))
}

/// The receipt markup carried by the response, if any.
pub fn print_string(response: &Value) -> Option<String> {
    PRINT_STRING_KEYS.iter().find_map(|key| response.get(*key).and_then(Value::as_str)).and_then(|s| {
        if s.trim().is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

impl PaymentUpdate {
    /// Extracts every recognised field from a gateway response.
    ///
    /// When any confirmation rule matches, the update is marked confirmed and its `state` is normalised to
    /// `confirmed`.
    pub fn from_gateway_response(response: &Value) -> Self {
        let get = |field| read_field(response, field);
        let confirmed = is_confirmed(response);
        let state = if confirmed { Some("confirmed".to_string()) } else { get(PaymentField::State) };
        Self {
            payment_id: get(PaymentField::PaymentId).map(PaymentId::from),
            order_id: get(PaymentField::OrderId),
            pos_id: get(PaymentField::PosId),
            address: get(PaymentField::Address),
            currency: get(PaymentField::Currency),
            invoice_amount: get(PaymentField::InvoiceAmount),
            invoice_currency: get(PaymentField::InvoiceCurrency),
            crypto_amount: get(PaymentField::CryptoAmount),
            status: get(PaymentField::Status),
            state,
            confirmed,
            confirmed_time: get(PaymentField::ConfirmedTime),
            payer_id: get(PaymentField::PayerId),
            customer_email: get(PaymentField::CustomerEmail),
        }
    }
}

/// Projects a gateway response onto the existing record (if any) and returns the merged payment.
///
/// Fails only when there is no existing record and the response does not carry a payment id.
pub fn project(existing: Option<&Payment>, response: &Value) -> Result<Payment, ProjectionError> {
    let update = PaymentUpdate::from_gateway_response(response);
    match existing {
        Some(payment) => Ok(payment.merged_with(&update)),
        None => {
            let id = update.payment_id.clone().ok_or(ProjectionError::MissingPaymentId)?;
            Ok(Payment::from_update(id, &update))
        },
    }
}
