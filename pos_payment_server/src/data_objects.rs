use chrono::NaiveDate;
use pos_payment_engine::{
    db_types::{Payment, PaymentId},
    request_objects::RecheckOutcome,
};
use serde::{Deserialize, Serialize};

/// The result of a manual re-check, as reported to the point-of-sale frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckPaymentResponse {
    /// `false` if the gateway answered with nothing usable. The payment is then reported as stored.
    pub updated: bool,
    pub confirmed: bool,
    /// `true` if this call performed the fulfillment
    pub fulfilled: bool,
    /// `true` if the payment had been fulfilled before this call
    pub already_done: bool,
    pub payment: Option<Payment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<RecheckOutcome> for CheckPaymentResponse {
    fn from(outcome: RecheckOutcome) -> Self {
        match outcome {
            RecheckOutcome::Updated(outcome) => {
                let (fulfilled, already_done) = match &outcome.fulfillment {
                    Some(f) => (!f.already_done, f.already_done),
                    None => (false, false),
                };
                Self {
                    updated: true,
                    confirmed: outcome.is_now_confirmed,
                    fulfilled,
                    already_done,
                    payment: Some(outcome.payment),
                    detail: None,
                }
            },
            RecheckOutcome::NoUpdate { reason, payment } => Self {
                updated: false,
                confirmed: payment.as_ref().map(|p| p.confirmed).unwrap_or(false),
                fulfilled: false,
                already_done: false,
                payment,
                detail: Some(reason),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSentResponse {
    pub ok: bool,
    pub payment_id: PaymentId,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub payment_id: PaymentId,
    pub print_string: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyReportQuery {
    pub date: Option<String>,
}

impl DailyReportQuery {
    /// The requested date, or `today` if none was given. Only the first 10 characters (`YYYY-MM-DD`) are used, so
    /// full timestamps are accepted too.
    pub fn date_or(&self, today: NaiveDate) -> Result<NaiveDate, String> {
        match self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(today),
            Some(s) => {
                let day = s.get(..10).unwrap_or(s);
                NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}'. {e}"))
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
}
