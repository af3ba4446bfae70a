use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The parameters of a new gateway invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub pos_id: String,
    pub invoice_amount: String,
    pub invoice_currency: String,
    pub currency: String,
    pub payer_id: String,
    pub payer_ip_address: String,
    pub order_id: String,
    pub callback_url: Option<String>,
}

/// The identity triple the gateway needs to look up a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentQuery {
    pub pos_id: String,
    pub payment_id: String,
    pub currency: String,
    pub address: String,
}

/// A raw 2xx gateway reply. The body is kept verbatim so that it can be relayed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self { status, body: body.into() }
    }

    /// The body as a JSON object, or `None` if it is not one.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str::<Value>(&self.body).ok().filter(Value::is_object)
    }
}
