use std::fmt::Debug;

use log::*;
use pos_common::{helpers::non_blank, is_valid_email};
use serde_json::Value;

use crate::{
    db_types::{PaymentId, PaymentUpdate, Receipt},
    helpers::{default_order_id, with_token_in_url},
    pos_api::{
        errors::ReconcileError,
        fulfillment_api::FulfillmentApi,
        request_objects::{
            CheckOutcome,
            InvoiceCreated,
            InvoiceRequest,
            InvoiceSettings,
            RecheckOutcome,
            ReconcileOutcome,
            ReconcileRequest,
            WebhookOutcome,
            DEFAULT_PAYER_IP,
        },
    },
    projection::print_string,
    traits::{GatewayResponse, NewInvoice, PaymentGateway, PaymentStore, ReceiptMailer},
};

/// `ReconciliationApi` keeps the local payment records in step with the gateway.
///
/// There are two ways to learn that a payment has moved on: the gateway pushes a webhook, or someone (an operator, or
/// the background sweep) asks for a re-check. Both paths converge on [`Self::reconcile`], which never trusts the
/// caller's payload and always re-queries the gateway. Confirmed payments are then handed to the
/// [`FulfillmentApi`], which guarantees they are fulfilled exactly once.
pub struct ReconciliationApi<B, G, M> {
    db: B,
    gateway: G,
    fulfillment: FulfillmentApi<B, M>,
    settings: InvoiceSettings,
}

impl<B, G, M> Debug for ReconciliationApi<B, G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B: Clone, G, M> ReconciliationApi<B, G, M> {
    pub fn new(db: B, gateway: G, mailer: M, settings: InvoiceSettings) -> Self {
        let fulfillment = FulfillmentApi::new(db.clone(), mailer);
        Self { db, gateway, fulfillment, settings }
    }
}

impl<B, G, M> ReconciliationApi<B, G, M> {
    pub fn fulfillment(&self) -> &FulfillmentApi<B, M> {
        &self.fulfillment
    }

    pub fn settings(&self) -> &InvoiceSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G, M> ReconciliationApi<B, G, M>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: ReceiptMailer,
{
    /// Creates a gateway invoice and records the new payment.
    ///
    /// Nothing is persisted unless the gateway accepted the invoice and returned a payment id.
    pub async fn create_invoice(&self, request: InvoiceRequest) -> Result<InvoiceCreated, ReconcileError> {
        let mut missing = self.gateway.missing_configuration();
        missing.extend(self.settings.missing_configuration());
        if !missing.is_empty() {
            warn!("🧾 Cannot create invoices. Missing configuration: {}", missing.join(", "));
            return Err(ReconcileError::Configuration(missing));
        }
        let invoice = self.new_invoice(&request)?;
        let customer_email = non_blank(request.customer_email.as_deref());
        if let Some(email) = customer_email.as_deref() {
            if !is_valid_email(email) {
                return Err(ReconcileError::InvalidRequest(format!("'{email}' is not a valid customer_email")));
            }
        }
        debug!("🧾 Creating invoice for order {}: {} {}", invoice.order_id, invoice.invoice_amount, invoice.currency);
        let response = self.gateway.create_invoice(&invoice).await?;
        let json = response.json();
        let mut update = json.as_ref().map(PaymentUpdate::from_gateway_response).unwrap_or_default();
        let (Some(json), Some(payment_id)) = (json, update.payment_id.clone()) else {
            warn!("🧾 The gateway did not create a payment for order {}. {}", invoice.order_id, response.body);
            return Err(ReconcileError::InvoiceRejected { status: response.status, body: response.body });
        };
        if !update.confirmed {
            update.status = Some("Created".to_string());
            update.state = Some("created".to_string());
        }
        let update = update.or_else(PaymentUpdate {
            order_id: Some(invoice.order_id.clone()),
            pos_id: Some(invoice.pos_id.clone()),
            currency: Some(invoice.currency.clone()),
            invoice_amount: Some(invoice.invoice_amount.clone()),
            invoice_currency: Some(invoice.invoice_currency.clone()),
            payer_id: Some(invoice.payer_id.clone()),
            customer_email,
            ..Default::default()
        });
        let payment = self.db.upsert_payment(&payment_id, &update).await?;
        let receipt = self.store_receipt(&payment_id, &json).await?;
        info!("🧾 Invoice created. Payment [{payment_id}] for order {}", invoice.order_id);
        Ok(InvoiceCreated { payment, receipt, gateway_status: response.status, gateway_body: response.body })
    }

    fn new_invoice(&self, request: &InvoiceRequest) -> Result<NewInvoice, ReconcileError> {
        let required = [
            ("invoice_amount", &request.invoice_amount),
            ("invoice_currency", &request.invoice_currency),
            ("currency", &request.currency),
            ("payer_id", &request.payer_id),
        ];
        let missing = required
            .iter()
            .filter(|(_, v)| non_blank(v.as_deref()).is_none())
            .map(|(k, _)| *k)
            .collect::<Vec<&str>>();
        if !missing.is_empty() {
            return Err(ReconcileError::InvalidRequest(format!("Missing required fields: {}", missing.join(", "))));
        }
        let field = |v: &Option<String>| non_blank(v.as_deref()).unwrap_or_default();
        let callback_url = self
            .settings
            .callback_url
            .as_deref()
            .map(|url| with_token_in_url(url, self.settings.webhook_token.reveal_non_empty()));
        Ok(NewInvoice {
            pos_id: self.settings.pos_id.clone(),
            invoice_amount: field(&request.invoice_amount),
            invoice_currency: field(&request.invoice_currency),
            currency: field(&request.currency),
            payer_id: field(&request.payer_id),
            payer_ip_address: non_blank(request.payer_ip_address.as_deref())
                .unwrap_or_else(|| DEFAULT_PAYER_IP.to_string()),
            order_id: non_blank(request.order_id.as_deref()).unwrap_or_else(default_order_id),
            callback_url,
        })
    }

    /// Re-queries the gateway for the payment and merges the answer into the stored record.
    ///
    /// If the gateway cannot be reached, or answers with something unusable, the stored payment is left untouched.
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileOutcome, ReconcileError> {
        let query = request.to_query(&self.settings.pos_id).ok_or_else(|| {
            ReconcileError::InvalidRequest(format!(
                "payment_id, currency, and address are required. Missing: {}",
                request.missing_fields().join(", ")
            ))
        })?;
        let payment_id = PaymentId::from(query.payment_id.clone());
        let response = self.gateway.query_status(&query).await.map_err(|e| {
            warn!("🧾 Could not re-check payment [{payment_id}]. {e}");
            ReconcileError::from(e)
        })?;
        let json = response_json(&response)?;
        let update = PaymentUpdate::from_gateway_response(&json).or_else(PaymentUpdate {
            address: Some(query.address.clone()),
            currency: Some(query.currency.clone()),
            pos_id: Some(query.pos_id.clone()),
            ..Default::default()
        });
        let payment = self.db.upsert_payment(&payment_id, &update).await?;
        self.store_receipt(&payment_id, &json).await?;
        let is_now_confirmed = payment.confirmed;
        debug!("🧾 Payment [{payment_id}] reconciled. State: {}", payment.lifecycle());
        Ok(ReconcileOutcome { payment, is_now_confirmed })
    }

    /// The manual re-check path: reconcile, then fulfill if the payment is confirmed.
    pub async fn check_and_fulfill(&self, request: &ReconcileRequest) -> Result<CheckOutcome, ReconcileError> {
        let ReconcileOutcome { payment, is_now_confirmed } = self.reconcile(request).await?;
        let fulfillment = if is_now_confirmed { Some(self.fulfillment.fulfill_if_needed(&payment).await?) } else { None };
        Ok(CheckOutcome { payment, is_now_confirmed, fulfillment })
    }

    /// [`Self::check_and_fulfill`] for callers that want a soft answer when the gateway replies with something
    /// unusable (a non-JSON 2xx, say). The stored payment is reported as it is, with no fulfillment attempted.
    /// Unreachable gateways and every other failure are still errors.
    pub async fn recheck(&self, request: &ReconcileRequest) -> Result<RecheckOutcome, ReconcileError> {
        match self.check_and_fulfill(request).await {
            Ok(outcome) => Ok(RecheckOutcome::Updated(outcome)),
            Err(ReconcileError::NoUpdate(reason)) => {
                let payment = match non_blank(request.payment_id.as_deref()) {
                    Some(id) => self.db.fetch_payment(&PaymentId::from(id)).await?,
                    None => None,
                };
                info!("🧾 Re-check produced no update. {reason}");
                Ok(RecheckOutcome::NoUpdate { reason, payment })
            },
            Err(e) => Err(e),
        }
    }

    /// Handles a gateway webhook.
    ///
    /// The payload is only used to learn *which* payment to re-check; its status fields are never trusted. A token
    /// mismatch is rejected before anything else happens. Every other outcome should be acknowledged to the gateway.
    pub async fn handle_webhook(&self, event: &Value, token: Option<&str>) -> WebhookOutcome {
        if let Some(expected) = self.settings.webhook_token.reveal_non_empty() {
            if token != Some(expected) {
                warn!("🧾 Webhook token mismatch. Ignoring the webhook");
                return WebhookOutcome::Unauthorized;
            }
        }
        let request = ReconcileRequest::from_event(event);
        let missing = request.missing_fields();
        if !missing.is_empty() {
            let reason = format!("Webhook is missing {}", missing.join(", "));
            warn!("🧾 {reason}. Cannot re-check the payment");
            return WebhookOutcome::Ignored(reason);
        }
        match self.check_and_fulfill(&request).await {
            Ok(CheckOutcome { payment, is_now_confirmed, fulfillment }) => {
                if let Some(f) = &fulfillment {
                    if f.already_done {
                        info!("🧾 Webhook for [{}]: already fulfilled", payment.payment_id);
                    }
                }
                WebhookOutcome::Processed { payment_id: payment.payment_id, confirmed: is_now_confirmed, fulfillment }
            },
            Err(e) => {
                error!("🧾 Webhook processing failed. {e}");
                WebhookOutcome::Failed(e.to_string())
            },
        }
    }

    async fn store_receipt(&self, payment_id: &PaymentId, json: &Value) -> Result<Option<Receipt>, ReconcileError> {
        match print_string(json) {
            Some(markup) => Ok(Some(self.db.upsert_receipt(payment_id, &markup).await?)),
            None => Ok(None),
        }
    }
}

fn response_json(response: &GatewayResponse) -> Result<Value, ReconcileError> {
    response.json().ok_or_else(|| {
        warn!("🧾 The gateway returned a non-JSON body: {}", response.body);
        ReconcileError::NoUpdate("The gateway response is not a JSON object".to_string())
    })
}
