use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       PaymentId       ---------------------------------------------------------
/// The gateway-assigned identifier for a payment. Opaque to us, and immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl FromStr for PaymentId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      PaymentState     ---------------------------------------------------------
/// The lifecycle of a payment, as far as the point of sale is concerned.
///
/// This is derived from the stored `confirmed` flag and the normalised gateway `state`. It is never stored itself.
/// `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentState {
    /// The invoice exists at the gateway, but nothing has been seen on-chain yet.
    Created,
    /// The gateway has seen a transaction, or is otherwise working on the payment.
    Waiting,
    /// The gateway has confirmed the payment. Fulfillment may proceed.
    Confirmed,
    /// The invoice was cancelled or has expired at the gateway.
    Cancelled,
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Created => write!(f, "Created"),
            PaymentState::Waiting => write!(f, "Waiting"),
            PaymentState::Confirmed => write!(f, "Confirmed"),
            PaymentState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment state: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentState {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Waiting" => Ok(Self::Waiting),
            "Confirmed" => Ok(Self::Confirmed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl PaymentState {
    pub fn derive(confirmed: bool, state: Option<&str>) -> Self {
        if confirmed {
            return PaymentState::Confirmed;
        }
        match state.map(|s| s.trim().to_ascii_lowercase()) {
            None => PaymentState::Created,
            Some(s) if s.is_empty() || s == "created" => PaymentState::Created,
            Some(s) if matches!(s.as_str(), "cancelled" | "canceled" | "expired") => PaymentState::Cancelled,
            Some(_) => PaymentState::Waiting,
        }
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub order_id: Option<String>,
    pub pos_id: Option<String>,
    pub address: Option<String>,
    pub currency: Option<String>,
    pub invoice_amount: Option<String>,
    pub invoice_currency: Option<String>,
    pub crypto_amount: Option<String>,
    /// Gateway-reported status, free text
    pub status: Option<String>,
    /// Normalised gateway state: created / waiting / confirmed / cancelled / ...
    pub state: Option<String>,
    pub confirmed: bool,
    pub confirmed_time: Option<String>,
    pub payer_id: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn lifecycle(&self) -> PaymentState {
        PaymentState::derive(self.confirmed, self.state.as_deref())
    }

    /// A payment created from scratch out of a single update. Timestamps are set to now.
    pub fn from_update(payment_id: PaymentId, update: &PaymentUpdate) -> Self {
        let now = Utc::now();
        Self {
            payment_id,
            order_id: update.order_id.clone(),
            pos_id: update.pos_id.clone(),
            address: update.address.clone(),
            currency: update.currency.clone(),
            invoice_amount: update.invoice_amount.clone(),
            invoice_currency: update.invoice_currency.clone(),
            crypto_amount: update.crypto_amount.clone(),
            status: update.status.clone(),
            state: update.state.clone(),
            confirmed: update.confirmed,
            confirmed_time: update.confirmed_time.clone(),
            payer_id: update.payer_id.clone(),
            customer_email: update.customer_email.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `update` onto this record and returns the result.
    ///
    /// * A field is only replaced by a non-empty value. Absent fields never erase known data.
    /// * `confirmed` never reverts to `false`.
    /// * `confirmed_time` is never overwritten once set.
    /// * Once confirmed, `status` and `state` are frozen (if they are known).
    ///
    /// The SQLite backend applies exactly these rules inside a single `INSERT .. ON CONFLICT` statement.
    pub fn merged_with(&self, update: &PaymentUpdate) -> Self {
        fn pick(new: &Option<String>, old: &Option<String>) -> Option<String> {
            new.clone().or_else(|| old.clone())
        }
        fn frozen(confirmed: bool, new: &Option<String>, old: &Option<String>) -> Option<String> {
            if confirmed && old.is_some() {
                old.clone()
            } else {
                pick(new, old)
            }
        }
        Self {
            payment_id: self.payment_id.clone(),
            order_id: pick(&update.order_id, &self.order_id),
            pos_id: pick(&update.pos_id, &self.pos_id),
            address: pick(&update.address, &self.address),
            currency: pick(&update.currency, &self.currency),
            invoice_amount: pick(&update.invoice_amount, &self.invoice_amount),
            invoice_currency: pick(&update.invoice_currency, &self.invoice_currency),
            crypto_amount: pick(&update.crypto_amount, &self.crypto_amount),
            status: frozen(self.confirmed, &update.status, &self.status),
            state: frozen(self.confirmed, &update.state, &self.state),
            confirmed: self.confirmed || update.confirmed,
            confirmed_time: self.confirmed_time.clone().or_else(|| update.confirmed_time.clone()),
            payer_id: pick(&update.payer_id, &self.payer_id),
            customer_email: pick(&update.customer_email, &self.customer_email),
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }
}

//--------------------------------------     PaymentUpdate     ---------------------------------------------------------
/// A partial view of a payment, as reported by a single gateway response (or an invoice request).
///
/// `None` means "not reported". Empty strings are never stored in an update; see [`pos_common::helpers::non_blank`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment_id: Option<PaymentId>,
    pub order_id: Option<String>,
    pub pos_id: Option<String>,
    pub address: Option<String>,
    pub currency: Option<String>,
    pub invoice_amount: Option<String>,
    pub invoice_currency: Option<String>,
    pub crypto_amount: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub confirmed: bool,
    pub confirmed_time: Option<String>,
    pub payer_id: Option<String>,
    pub customer_email: Option<String>,
}

impl PaymentUpdate {
    /// Fills every field this update does not carry from `fallback`. Used to layer request values under gateway
    /// values.
    pub fn or_else(mut self, fallback: PaymentUpdate) -> Self {
        self.payment_id = self.payment_id.or(fallback.payment_id);
        self.order_id = self.order_id.or(fallback.order_id);
        self.pos_id = self.pos_id.or(fallback.pos_id);
        self.address = self.address.or(fallback.address);
        self.currency = self.currency.or(fallback.currency);
        self.invoice_amount = self.invoice_amount.or(fallback.invoice_amount);
        self.invoice_currency = self.invoice_currency.or(fallback.invoice_currency);
        self.crypto_amount = self.crypto_amount.or(fallback.crypto_amount);
        self.status = self.status.or(fallback.status);
        self.state = self.state.or(fallback.state);
        self.confirmed = self.confirmed || fallback.confirmed;
        self.confirmed_time = self.confirmed_time.or(fallback.confirmed_time);
        self.payer_id = self.payer_id.or(fallback.payer_id);
        self.customer_email = self.customer_email.or(fallback.customer_email);
        self
    }
}

//--------------------------------------        Receipt        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Receipt {
    pub payment_id: PaymentId,
    /// Gateway receipt markup, stored verbatim
    pub print_string: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Fulfillment      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Option<String>,
    pub currency: Option<String>,
}

/// The payment facts captured at the moment of fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentSnapshot {
    pub order_id: Option<String>,
    pub amount_fiat: Amount,
    pub amount_crypto: Amount,
    pub confirmed_time: Option<String>,
}

impl From<&Payment> for FulfillmentSnapshot {
    fn from(p: &Payment) -> Self {
        Self {
            order_id: p.order_id.clone(),
            amount_fiat: Amount { value: p.invoice_amount.clone(), currency: p.invoice_currency.clone() },
            amount_crypto: Amount { value: p.crypto_amount.clone(), currency: p.currency.clone() },
            confirmed_time: p.confirmed_time.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Fulfillment {
    pub payment_id: PaymentId,
    pub fulfilled_at: DateTime<Utc>,
    pub payload_json: String,
}

impl Fulfillment {
    pub fn snapshot(&self) -> Result<FulfillmentSnapshot, serde_json::Error> {
        serde_json::from_str(&self.payload_json)
    }
}

//--------------------------------------     EmailAttempt      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Sent,
    Failed,
}

impl Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailStatus::Sent => write!(f, "sent"),
            EmailStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The outcome of the most recent receipt email for a payment. Overwritten by every new attempt.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EmailAttempt {
    pub payment_id: PaymentId,
    pub to_email: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmailAttempt {
    pub payment_id: PaymentId,
    pub to_email: String,
    pub status: EmailStatus,
    pub error: Option<String>,
}

impl NewEmailAttempt {
    pub fn sent(payment_id: PaymentId, to_email: String) -> Self {
        Self { payment_id, to_email, status: EmailStatus::Sent, error: None }
    }

    pub fn failed(payment_id: PaymentId, to_email: String, error: String) -> Self {
        Self { payment_id, to_email, status: EmailStatus::Failed, error: Some(error) }
    }
}

//--------------------------------------      Daily report     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CurrencyTotal {
    pub currency: Option<String>,
    pub count: i64,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub fiat_totals: Vec<CurrencyTotal>,
    pub crypto_totals: Vec<CurrencyTotal>,
    pub payments: Vec<Payment>,
}
