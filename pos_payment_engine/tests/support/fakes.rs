use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use pos_payment_engine::traits::{
    GatewayError,
    GatewayResponse,
    MailerError,
    NewInvoice,
    PaymentGateway,
    PaymentQuery,
    ReceiptEmail,
    ReceiptMailer,
};
use serde_json::Value;

#[derive(Default)]
struct GatewayState {
    /// Replies handed out in order. When only one is left, it is repeated.
    replies: Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>,
    invoices: Mutex<Vec<NewInvoice>>,
    queries: Mutex<Vec<PaymentQuery>>,
    calls: AtomicUsize,
}

/// A gateway that plays back scripted replies and records every request.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<GatewayState>,
    missing: Vec<String>,
}

impl ScriptedGateway {
    pub fn replying(body: Value) -> Self {
        let gateway = Self::default();
        gateway.push_json(body);
        gateway
    }

    pub fn failing(error: GatewayError) -> Self {
        let gateway = Self::default();
        gateway.push(Err(error));
        gateway
    }

    pub fn unconfigured(missing: &[&str]) -> Self {
        Self { missing: missing.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn push(&self, reply: Result<GatewayResponse, GatewayError>) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_json(&self, body: Value) {
        self.push(Ok(GatewayResponse::new(200, body.to_string())));
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn invoices(&self) -> Vec<NewInvoice> {
        self.state.invoices.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<PaymentQuery> {
        self.state.queries.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Result<GatewayResponse, GatewayError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.state.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or_else(|| Err(GatewayError::Unreachable("no scripted reply".into())))
        }
    }
}

impl PaymentGateway for ScriptedGateway {
    fn missing_configuration(&self) -> Vec<String> {
        self.missing.clone()
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<GatewayResponse, GatewayError> {
        self.state.invoices.lock().unwrap().push(invoice.clone());
        tokio::task::yield_now().await;
        self.next_reply()
    }

    async fn query_status(&self, query: &PaymentQuery) -> Result<GatewayResponse, GatewayError> {
        self.state.queries.lock().unwrap().push(query.clone());
        tokio::task::yield_now().await;
        self.next_reply()
    }
}

/// A mailer that records what it was asked to send, and optionally fails.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    disabled: bool,
    failure: Option<String>,
    sent: Arc<Mutex<Vec<ReceiptEmail>>>,
}

impl RecordingMailer {
    pub fn disabled() -> Self {
        Self { disabled: true, ..Default::default() }
    }

    pub fn failing(reason: &str) -> Self {
        Self { failure: Some(reason.to_string()), ..Default::default() }
    }

    pub fn sent(&self) -> Vec<ReceiptEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl ReceiptMailer for RecordingMailer {
    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(email.clone());
        match &self.failure {
            Some(reason) => Err(MailerError(reason.clone())),
            None => Ok(()),
        }
    }
}
