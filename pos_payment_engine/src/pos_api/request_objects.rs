use pos_common::{helpers::non_blank, Secret};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    db_types::{EmailAttempt, Payment, PaymentId, Receipt},
    traits::PaymentQuery,
};

pub const DEFAULT_PAYER_IP: &str = "203.0.113.10";

/// Invoice-creation parameters that come from configuration rather than from the cashier.
#[derive(Debug, Clone, Default)]
pub struct InvoiceSettings {
    pub pos_id: String,
    pub callback_url: Option<String>,
    pub webhook_token: Secret<String>,
}

impl InvoiceSettings {
    pub fn missing_configuration(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if non_blank(self.callback_url.as_deref()).is_none() {
            missing.push("POS_GATEWAY_CALLBACK_URL".to_string());
        }
        missing
    }
}

/// Accepts a JSON string or number, since point-of-sale frontends send amounts either way.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub invoice_amount: Option<String>,
    pub invoice_currency: Option<String>,
    pub currency: Option<String>,
    pub payer_id: Option<String>,
    pub payer_ip_address: Option<String>,
    pub order_id: Option<String>,
    pub customer_email: Option<String>,
}

/// The identity triple used to re-check a payment with the gateway. All three fields are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub payment_id: Option<String>,
    pub currency: Option<String>,
    pub address: Option<String>,
}

impl ReconcileRequest {
    pub fn new<S: Into<String>>(payment_id: S, currency: S, address: S) -> Self {
        Self { payment_id: Some(payment_id.into()), currency: Some(currency.into()), address: Some(address.into()) }
    }

    /// Reads the identity triple out of a webhook payload. Other keys are ignored.
    pub fn from_event(event: &Value) -> Self {
        let get = |key: &str| event.get(key).and_then(Value::as_str).map(String::from);
        Self { payment_id: get("payment_id"), currency: get("currency"), address: get("address") }
    }

    /// Names of the mandatory fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [("payment_id", &self.payment_id), ("currency", &self.currency), ("address", &self.address)]
            .into_iter()
            .filter(|(_, v)| non_blank(v.as_deref()).is_none())
            .map(|(k, _)| k)
            .collect()
    }

    pub(crate) fn to_query(&self, pos_id: &str) -> Option<PaymentQuery> {
        Some(PaymentQuery {
            pos_id: pos_id.to_string(),
            payment_id: non_blank(self.payment_id.as_deref())?,
            currency: non_blank(self.currency.as_deref())?,
            address: non_blank(self.address.as_deref())?,
        })
    }
}

impl From<&Payment> for ReconcileRequest {
    fn from(p: &Payment) -> Self {
        Self { payment_id: Some(p.payment_id.to_string()), currency: p.currency.clone(), address: p.address.clone() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceCreated {
    pub payment: Payment,
    pub receipt: Option<Receipt>,
    /// The gateway's HTTP status and body, relayed verbatim to the caller
    pub gateway_status: u16,
    pub gateway_body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentOutcome {
    /// `true` if the payment had already been fulfilled by someone else. No side effects were performed.
    pub already_done: bool,
    /// The receipt email attempted as part of this fulfillment, if any
    pub email: Option<EmailAttempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub payment: Payment,
    pub is_now_confirmed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub payment: Payment,
    pub is_now_confirmed: bool,
    /// Present when the payment is confirmed and fulfillment was attempted
    pub fulfillment: Option<FulfillmentOutcome>,
}

/// The result of a manual re-check.
#[derive(Debug, Clone, Serialize)]
pub enum RecheckOutcome {
    Updated(CheckOutcome),
    /// The gateway answered, but with nothing usable. The stored payment (if any) is returned unchanged.
    NoUpdate { reason: String, payment: Option<Payment> },
}

#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The webhook token did not match. Nothing was touched.
    Unauthorized,
    /// The payload did not carry the identity triple. Nothing was touched.
    Ignored(String),
    Processed { payment_id: PaymentId, confirmed: bool, fulfillment: Option<FulfillmentOutcome> },
    /// Reconciliation failed. The webhook is still acknowledged; the next webhook or re-check will retry.
    Failed(String),
}
