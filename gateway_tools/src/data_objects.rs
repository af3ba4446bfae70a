use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Form fields for the `StartPayment` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartPaymentRequest {
    pub pos_id: String,
    pub invoice_amount: String,
    pub invoice_currency: String,
    pub currency: String,
    pub payer_ip_address: String,
    pub payer_id: String,
    pub order_id: String,
    pub callback_url: String,
}

/// Form fields for the `CheckPayment` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckPaymentRequest {
    pub pos_id: String,
    pub payment_id: String,
    pub currency: String,
    pub address: String,
}

/// A successful (2xx) response from the gateway.
///
/// The body is kept verbatim. The gateway does not always send JSON, so [`GatewayReply::json`] is best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: String,
}

impl GatewayReply {
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self { status, body: body.into() }
    }

    /// Parses the body as a JSON object. Anything else (HTML error pages, empty bodies, bare strings, arrays) is
    /// treated as "no usable data" and returns `None`.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str::<Value>(&self.body).ok().filter(Value::is_object)
    }
}
