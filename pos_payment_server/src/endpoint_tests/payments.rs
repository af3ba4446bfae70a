use actix_web::{http::StatusCode, test, test::TestRequest, App};
use pos_payment_engine::{
    db_types::{EmailStatus, PaymentId, PaymentUpdate},
    traits::{GatewayError, GatewayResponse, MailerError, PaymentRecords, PaymentStore},
};
use serde_json::{json, Value};

use super::{
    helpers::{call, configure, new_db, CALLBACK_URL, WEBHOOK_TOKEN},
    mocks::{MockGateway, MockMailer},
};
use crate::data_objects::{CheckPaymentResponse, EmailSentResponse};

const START_BODY: &str = r#"{"payment_id":"P-100","address":"0xabc123","currency":"USDT","amount":"12.51","print_string":"<BOLD>Thanks!</BOLD>"}"#;

const CONFIRMED_BODY: &str = r#"{"payment_id":"P-200","currency":"BTC","address":"bc1qexample","state":"confirmed","confirmed":true,"confirmed_time":"2024-05-01 10:00:00","payment":"0.0002","invoice_amount":"25.00","invoice_currency":"USD"}"#;

fn invoice_request() -> Value {
    json!({
        "invoice_amount": 12.5,
        "invoice_currency": "USD",
        "currency": "USDT",
        "payer_id": "walk-in"
    })
}

#[actix_web::test]
async fn start_payment_relays_the_gateway_body() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_missing_configuration().returning(Vec::new);
    gateway
        .expect_create_invoice()
        .withf(|invoice| {
            invoice.callback_url.as_deref() == Some(format!("{CALLBACK_URL}?token={WEBHOOK_TOKEN}").as_str()) &&
                invoice.payer_ip_address == "203.0.113.10" &&
                invoice.invoice_amount == "12.5" &&
                invoice.pos_id == "pos-test"
        })
        .times(1)
        .returning(|_| Ok(GatewayResponse::new(200, START_BODY)));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post().uri("/start-payment").set_json(invoice_request()).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, START_BODY);

    let payment = db.fetch_payment(&PaymentId::from("P-100")).await.unwrap().expect("payment was stored");
    assert_eq!(payment.invoice_amount.as_deref(), Some("12.5"));
    assert_eq!(payment.invoice_currency.as_deref(), Some("USD"));
    assert_eq!(payment.crypto_amount.as_deref(), Some("12.51"));
    assert_eq!(payment.state.as_deref(), Some("created"));
    assert!(!payment.confirmed);
    let receipt = db.fetch_receipt(&PaymentId::from("P-100")).await.unwrap().expect("receipt was stored");
    assert_eq!(receipt.print_string.as_deref(), Some("<BOLD>Thanks!</BOLD>"));
}

#[actix_web::test]
async fn start_payment_reports_missing_configuration() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_missing_configuration().returning(|| vec!["POS_GATEWAY_API_KEY".to_string()]);
    gateway.expect_create_invoice().never();
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post().uri("/start-payment").set_json(invoice_request()).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "Missing env vars");
    assert_eq!(body["missing"], json!(["POS_GATEWAY_API_KEY"]));
    assert!(db.recent_payments(50).await.unwrap().is_empty());
}

#[actix_web::test]
async fn start_payment_relays_gateway_rejections() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_missing_configuration().returning(Vec::new);
    gateway
        .expect_create_invoice()
        .times(1)
        .returning(|_| Err(GatewayError::Rejected { status: 422, body: r#"{"err":"Invalid currency"}"#.to_string() }));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post().uri("/start-payment").set_json(invoice_request()).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, r#"{"err":"Invalid currency"}"#);
    assert!(db.recent_payments(50).await.unwrap().is_empty());
}

#[actix_web::test]
async fn start_payment_relays_successful_replies_without_a_payment() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_missing_configuration().returning(Vec::new);
    gateway
        .expect_create_invoice()
        .times(1)
        .returning(|_| Ok(GatewayResponse::new(200, r#"{"err":"Invalid currency"}"#)));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post().uri("/start-payment").set_json(invoice_request()).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"err":"Invalid currency"}"#);
    assert!(db.recent_payments(50).await.unwrap().is_empty());
}

#[actix_web::test]
async fn start_payment_rejects_incomplete_requests() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_missing_configuration().returning(Vec::new);
    gateway.expect_create_invoice().never();
    let app = test::init_service(App::new().configure(configure(db, gateway, MockMailer::new()))).await;
    let req = TestRequest::post().uri("/start-payment").set_json(json!({"invoice_amount": "5"})).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("payer_id"), "{body}");
}

#[actix_web::test]
async fn check_payment_needs_the_full_identity() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().never();
    let app = test::init_service(App::new().configure(configure(db, gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri("/check-payment")
        .set_json(json!({"payment_id": "P-200", "currency": "BTC"}))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("address"), "{body}");
}

#[actix_web::test]
async fn check_payment_reports_gateway_failures() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(1).returning(|_| Err(GatewayError::Timeout));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri("/check-payment")
        .set_json(json!({"payment_id": "P-200", "currency": "BTC", "address": "bc1qexample"}))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "failed to re-check");
    assert!(db.fetch_payment(&PaymentId::from("P-200")).await.unwrap().is_none());
}

#[actix_web::test]
async fn check_payment_with_an_unusable_reply_returns_the_stored_payment() {
    let db = new_db().await;
    let payment_id = seed_payment(&db, None).await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(1).returning(|_| Ok(GatewayResponse::new(200, "<html>busy</html>")));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri("/check-payment")
        .set_json(json!({"payment_id": "P-300", "currency": "BTC", "address": "bc1qexample"}))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: CheckPaymentResponse = serde_json::from_str(&body).unwrap();
    assert!(!outcome.updated);
    assert!(!outcome.confirmed);
    assert!(!outcome.fulfilled);
    assert_eq!(outcome.payment.map(|p| p.payment_id), Some(payment_id.clone()));
    assert!(outcome.detail.is_some());
    assert!(db.fetch_fulfillment(&payment_id).await.unwrap().is_none());
}

#[actix_web::test]
async fn check_payment_fulfills_exactly_once() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(2).returning(|_| Ok(GatewayResponse::new(200, CONFIRMED_BODY)));
    // No customer email is on file, so the mailer is never consulted
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let check = || {
        TestRequest::post()
            .uri("/check-payment")
            .set_json(json!({"payment_id": "P-200", "currency": "BTC", "address": "bc1qexample"}))
            .to_request()
    };
    let (status, body) = call(&app, check()).await;
    assert_eq!(status, StatusCode::OK);
    let first: CheckPaymentResponse = serde_json::from_str(&body).unwrap();
    assert!(first.confirmed);
    assert!(first.fulfilled);
    assert!(!first.already_done);
    assert_eq!(first.payment.as_ref().and_then(|p| p.confirmed_time.as_deref()), Some("2024-05-01 10:00:00"));

    let (status, body) = call(&app, check()).await;
    assert_eq!(status, StatusCode::OK);
    let second: CheckPaymentResponse = serde_json::from_str(&body).unwrap();
    assert!(second.confirmed);
    assert!(!second.fulfilled);
    assert!(second.already_done);

    let fulfillment = db.fetch_fulfillment(&PaymentId::from("P-200")).await.unwrap().expect("fulfilled");
    let snapshot = fulfillment.snapshot().unwrap();
    assert_eq!(snapshot.amount_fiat.value.as_deref(), Some("25.00"));
    assert_eq!(snapshot.amount_crypto.currency.as_deref(), Some("BTC"));
}

//----------------------------------------------   Manual emails  ----------------------------------------------------

async fn seed_payment(db: &impl PaymentStore, customer_email: Option<&str>) -> PaymentId {
    let payment_id = PaymentId::from("P-300");
    let update = PaymentUpdate {
        currency: Some("BTC".into()),
        address: Some("bc1qexample".into()),
        invoice_amount: Some("8.00".into()),
        invoice_currency: Some("USD".into()),
        customer_email: customer_email.map(String::from),
        ..Default::default()
    };
    db.upsert_payment(&payment_id, &update).await.unwrap();
    payment_id
}

#[actix_web::test]
async fn email_for_unknown_payment_is_404() {
    let db = new_db().await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri("/payments/nope/email")
        .set_json(json!({"to_email": "bob@example.com"}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn email_needs_a_valid_address() {
    let db = new_db().await;
    seed_payment(&db, None).await;
    let mut mailer = MockMailer::new();
    mailer.expect_send_receipt().never();
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), mailer))).await;
    let (status, body) = call(&app, TestRequest::post().uri("/payments/P-300/email").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Valid to_email required"), "{body}");

    let req = TestRequest::post().uri("/payments/P-300/email").set_json(json!({"to_email": "not-an-email"})).to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn email_needs_a_configured_mailer() {
    let db = new_db().await;
    seed_payment(&db, Some("amy@example.com")).await;
    let mut mailer = MockMailer::new();
    mailer.expect_is_enabled().returning(|| false);
    mailer.expect_send_receipt().never();
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), mailer))).await;
    let (status, body) = call(&app, TestRequest::post().uri("/payments/P-300/email").to_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Email not configured on server"), "{body}");
}

#[actix_web::test]
async fn email_is_sent_to_the_requested_address() {
    let db = new_db().await;
    let payment_id = seed_payment(&db, Some("amy@example.com")).await;
    let mut mailer = MockMailer::new();
    mailer.expect_is_enabled().returning(|| true);
    mailer
        .expect_send_receipt()
        .withf(|email| email.to_email == "bob@example.com" && email.payment.payment_id.as_str() == "P-300")
        .times(1)
        .returning(|_| Ok(()));
    let app = test::init_service(App::new().configure(configure(db.clone(), MockGateway::new(), mailer))).await;
    let req = TestRequest::post()
        .uri("/payments/P-300/email")
        .set_json(json!({"to_email": "bob@example.com"}))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let sent: EmailSentResponse = serde_json::from_str(&body).unwrap();
    assert!(sent.ok);
    assert_eq!(sent.payment_id, payment_id);
    assert_eq!(sent.to, "bob@example.com");
    let attempt = db.fetch_email_attempt(&payment_id).await.unwrap().expect("attempt recorded");
    assert_eq!(attempt.status, EmailStatus::Sent);
}

#[actix_web::test]
async fn failed_email_is_recorded_and_reported() {
    let db = new_db().await;
    let payment_id = seed_payment(&db, Some("amy@example.com")).await;
    let mut mailer = MockMailer::new();
    mailer.expect_is_enabled().returning(|| true);
    mailer.expect_send_receipt().times(1).returning(|_| Err(MailerError("relay refused".into())));
    let app = test::init_service(App::new().configure(configure(db.clone(), MockGateway::new(), mailer))).await;
    let (status, body) = call(&app, TestRequest::post().uri("/payments/P-300/email").to_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Failed to send email"), "{body}");
    let attempt = db.fetch_email_attempt(&payment_id).await.unwrap().expect("attempt recorded");
    assert_eq!(attempt.status, EmailStatus::Failed);
    assert_eq!(attempt.to_email, "amy@example.com");
    assert!(attempt.error.unwrap_or_default().contains("relay refused"));
}
