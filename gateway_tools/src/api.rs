use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Serialize;

use crate::{
    config::GatewayConfig,
    data_objects::{CheckPaymentRequest, GatewayReply, StartPaymentRequest},
    GatewayApiError,
};

const START_PAYMENT_PATH: &str = "/pay/v2/StartPayment/";
const CHECK_PAYMENT_PATH: &str = "/pay/v2/CheckPayment/";

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Sends a form-encoded POST to the gateway, authenticated with HTTP Basic credentials.
    ///
    /// Non-2xx responses are returned as [`GatewayApiError::QueryError`] carrying the raw body, so that callers can
    /// show the gateway's own error text.
    pub async fn form_query<F: Serialize + ?Sized>(&self, path: &str, form: &F) -> Result<GatewayReply, GatewayApiError> {
        let url = self.url(path);
        trace!("🌐 Sending gateway request: {url}");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.user, Some(self.config.secret.reveal()))
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            trace!("🌐 Gateway request successful. {status}");
            Ok(GatewayReply::new(status.as_u16(), body))
        } else {
            debug!("🌐 Gateway request failed. {status}: {body}");
            Err(GatewayApiError::QueryError { status: status.as_u16(), message: body })
        }
    }

    pub async fn start_payment(&self, request: &StartPaymentRequest) -> Result<GatewayReply, GatewayApiError> {
        debug!(
            "🌐 StartPayment for order {} ({} {} in {})",
            request.order_id, request.invoice_amount, request.invoice_currency, request.currency
        );
        let reply = self.form_query(START_PAYMENT_PATH, request).await?;
        info!("🌐 StartPayment for order {} returned {}", request.order_id, reply.status);
        Ok(reply)
    }

    pub async fn check_payment(&self, request: &CheckPaymentRequest) -> Result<GatewayReply, GatewayApiError> {
        debug!("🌐 CheckPayment for {} ({} @ {})", request.payment_id, request.currency, request.address);
        let reply = self.form_query(CHECK_PAYMENT_PATH, request).await?;
        debug!("🌐 CheckPayment for {} returned {}: {}", request.payment_id, reply.status, reply.body);
        Ok(reply)
    }
}
