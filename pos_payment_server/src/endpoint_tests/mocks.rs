use mockall::mock;
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

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        fn missing_configuration(&self) -> Vec<String>;
        async fn create_invoice(&self, invoice: &NewInvoice) -> Result<GatewayResponse, GatewayError>;
        async fn query_status(&self, query: &PaymentQuery) -> Result<GatewayResponse, GatewayError>;
    }
}

mock! {
    pub Mailer {}
    impl ReceiptMailer for Mailer {
        fn is_enabled(&self) -> bool;
        async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), MailerError>;
    }
}
