use actix_web::{http::StatusCode, test, test::TestRequest, App};
use pos_payment_engine::{
    db_types::{EmailStatus, PaymentId},
    traits::{GatewayResponse, PaymentRecords, PaymentStore},
};
use serde_json::json;

use super::{
    helpers::{call, configure, configure_app, new_db, peer, WEBHOOK_TOKEN},
    mocks::{MockGateway, MockMailer},
};
use crate::{middleware::ip_rate_limiter, routes::parse_event};

const CONFIRMED_WITH_EMAIL: &str = r#"{"payment_id":"P-400","currency":"LTC","address":"ltc1qexample","status":"Confirmed","confirmed_time":"2024-05-02 09:30:00","payment":"0.5","invoice_amount":"40.00","invoice_currency":"EUR","customer_email":"amy@example.com"}"#;

fn callback_uri(token: &str) -> String {
    format!("/api/gateway/callback?token={token}")
}

#[actix_web::test]
async fn webhook_with_the_wrong_token_is_rejected() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().never();
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri(&callback_uri("guess"))
        .set_json(json!({"payment_id": "P-400", "currency": "LTC", "address": "ltc1qexample", "confirmed": true}))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "unauthorized");

    let req = TestRequest::post().uri("/api/gateway/callback").set_json(json!({"payment_id": "P-400"})).to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(db.recent_payments(50).await.unwrap().is_empty());
}

#[actix_web::test]
async fn webhook_confirms_fulfills_and_emails_once() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_status()
        .withf(|q| q.payment_id == "P-400" && q.currency == "LTC" && q.address == "ltc1qexample")
        .times(2)
        .returning(|_| Ok(GatewayResponse::new(200, CONFIRMED_WITH_EMAIL)));
    let mut mailer = MockMailer::new();
    mailer.expect_is_enabled().returning(|| true);
    mailer.expect_send_receipt().withf(|e| e.to_email == "amy@example.com").times(1).returning(|_| Ok(()));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, mailer))).await;
    // The payload claims nothing about the status. The gateway is the only source of truth.
    let event = json!({"payment_id": "P-400", "currency": "LTC", "address": "ltc1qexample"});
    for _ in 0..2 {
        let req = TestRequest::post().uri(&callback_uri(WEBHOOK_TOKEN)).set_json(event.clone()).to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
    let payment_id = PaymentId::from("P-400");
    let payment = db.fetch_payment(&payment_id).await.unwrap().expect("payment stored");
    assert!(payment.confirmed);
    assert_eq!(payment.customer_email.as_deref(), Some("amy@example.com"));
    assert!(db.fetch_fulfillment(&payment_id).await.unwrap().is_some());
    let attempt = db.fetch_email_attempt(&payment_id).await.unwrap().expect("email attempted");
    assert_eq!(attempt.status, EmailStatus::Sent);
}

#[actix_web::test]
async fn form_encoded_webhooks_are_accepted() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_status()
        .withf(|q| q.payment_id == "P-500" && q.address == "bc1q example")
        .times(1)
        .returning(|_| Ok(GatewayResponse::new(200, r#"{"payment_id":"P-500","state":"waiting"}"#)));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri(&callback_uri(WEBHOOK_TOKEN))
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("payment_id=P-500&currency=BTC&address=bc1q+example")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    let payment = db.fetch_payment(&PaymentId::from("P-500")).await.unwrap().expect("payment stored");
    assert!(!payment.confirmed);
    assert_eq!(payment.state.as_deref(), Some("waiting"));
    assert_eq!(payment.address.as_deref(), Some("bc1q example"));
}

#[actix_web::test]
async fn incomplete_and_failed_webhooks_are_still_acknowledged() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(1).returning(|_| Ok(GatewayResponse::new(200, "<html>oops</html>")));
    let app = test::init_service(App::new().configure(configure(db.clone(), gateway, MockMailer::new()))).await;
    let req = TestRequest::post()
        .uri(&callback_uri(WEBHOOK_TOKEN))
        .set_json(json!({"payment_id": "P-600", "currency": "BTC"}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::post()
        .uri(&callback_uri(WEBHOOK_TOKEN))
        .set_json(json!({"payment_id": "P-600", "currency": "BTC", "address": "bc1q"}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(db.fetch_payment(&PaymentId::from("P-600")).await.unwrap().is_none());
}

#[actix_web::test]
async fn webhooks_are_rate_limited_per_ip() {
    let db = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().never();
    let limiter = ip_rate_limiter(1);
    let app =
        test::init_service(App::new().configure(configure_app(db, gateway, MockMailer::new(), limiter))).await;
    let req = || TestRequest::post().uri(&callback_uri("wrong")).peer_addr(peer()).set_json(json!({})).to_request();
    let (status, _) = call(&app, req()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, req()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    // Other endpoints are not limited
    let (status, body) = call(&app, TestRequest::get().uri("/health").peer_addr(peer()).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[actix_web::test]
async fn webhook_bodies() {
    let event = parse_event(br#"{"payment_id":"P1","currency":"BTC"}"#);
    assert_eq!(event, json!({"payment_id": "P1", "currency": "BTC"}));
    let event = parse_event(b"payment_id=P1&address=a%26b&currency=USDT");
    assert_eq!(event, json!({"payment_id": "P1", "address": "a&b", "currency": "USDT"}));
    assert_eq!(parse_event(b""), json!({}));
    assert_eq!(parse_event(b"[1,2,3]"), json!({}));
}
