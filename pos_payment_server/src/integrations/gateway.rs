use gateway_tools::{CheckPaymentRequest, GatewayApi, GatewayApiError, GatewayReply, StartPaymentRequest};
use pos_payment_engine::traits::{GatewayError, GatewayResponse, NewInvoice, PaymentGateway, PaymentQuery};

/// Connects the engine's [`PaymentGateway`] contract to the HTTP gateway client.
#[derive(Clone)]
pub struct GatewayConnector {
    api: GatewayApi,
}

impl GatewayConnector {
    pub fn new(api: GatewayApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &GatewayApi {
        &self.api
    }
}

fn to_response(reply: GatewayReply) -> GatewayResponse {
    GatewayResponse::new(reply.status, reply.body)
}

fn to_gateway_error(e: GatewayApiError) -> GatewayError {
    match e {
        GatewayApiError::QueryError { status, message } => GatewayError::Rejected { status, body: message },
        GatewayApiError::Timeout(_) => GatewayError::Timeout,
        GatewayApiError::Transport(msg) | GatewayApiError::Initialization(msg) => GatewayError::Unreachable(msg),
    }
}

fn start_payment_form(invoice: &NewInvoice) -> StartPaymentRequest {
    StartPaymentRequest {
        pos_id: invoice.pos_id.clone(),
        invoice_amount: invoice.invoice_amount.clone(),
        invoice_currency: invoice.invoice_currency.clone(),
        currency: invoice.currency.clone(),
        payer_ip_address: invoice.payer_ip_address.clone(),
        payer_id: invoice.payer_id.clone(),
        order_id: invoice.order_id.clone(),
        callback_url: invoice.callback_url.clone().unwrap_or_default(),
    }
}

fn check_payment_form(query: &PaymentQuery) -> CheckPaymentRequest {
    CheckPaymentRequest {
        pos_id: query.pos_id.clone(),
        payment_id: query.payment_id.clone(),
        currency: query.currency.clone(),
        address: query.address.clone(),
    }
}

impl PaymentGateway for GatewayConnector {
    fn missing_configuration(&self) -> Vec<String> {
        self.api.config().missing_credentials()
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<GatewayResponse, GatewayError> {
        let request = start_payment_form(invoice);
        self.api.start_payment(&request).await.map(to_response).map_err(to_gateway_error)
    }

    async fn query_status(&self, query: &PaymentQuery) -> Result<GatewayResponse, GatewayError> {
        let request = check_payment_form(query);
        self.api.check_payment(&request).await.map(to_response).map_err(to_gateway_error)
    }
}
