use actix_web::{http::StatusCode, test, test::TestRequest, App};
use pos_payment_engine::{
    db_types::{DailySummary, NewEmailAttempt, Payment, PaymentId, PaymentUpdate},
    traits::PaymentStore,
};
use serde_json::Value;

use super::{
    helpers::{call, configure, new_db},
    mocks::{MockGateway, MockMailer},
};
use crate::data_objects::ReceiptResponse;

async fn seed(db: &impl PaymentStore) {
    let confirmed = |amount: &str, crypto: &str, time: &str| PaymentUpdate {
        currency: Some("BTC".into()),
        address: Some("bc1qexample".into()),
        invoice_amount: Some(amount.into()),
        invoice_currency: Some("USD".into()),
        crypto_amount: Some(crypto.into()),
        state: Some("confirmed".into()),
        confirmed: true,
        confirmed_time: Some(time.into()),
        ..Default::default()
    };
    db.upsert_payment(&"P-1".into(), &confirmed("10.00", "0.0001", "2024-05-01 09:00:00")).await.unwrap();
    db.upsert_payment(&"P-2".into(), &confirmed("15.50", "0.0002", "2024-05-01 17:45:00")).await.unwrap();
    db.upsert_payment(&"P-3".into(), &confirmed("99.00", "0.0010", "2024-05-02 08:00:00")).await.unwrap();
    let waiting = PaymentUpdate { state: Some("waiting".into()), currency: Some("BTC".into()), ..Default::default() };
    db.upsert_payment(&"P-4".into(), &waiting).await.unwrap();
    db.upsert_receipt(&"P-1".into(), "<CENTER><BOLD>Test Shop</BOLD></CENTER><BR>Total: 10.00 USD").await.unwrap();
    db.record_email_attempt(NewEmailAttempt::sent("P-1".into(), "amy@example.com".into())).await.unwrap();
}

#[actix_web::test]
async fn health() {
    let db = new_db().await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[actix_web::test]
async fn payments_are_listed_and_fetched() {
    let db = new_db().await;
    seed(&db).await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/payments").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let payments: Vec<Payment> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.len(), 4);

    let (status, body) = call(&app, TestRequest::get().uri("/payments/P-2").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.payment_id, PaymentId::from("P-2"));
    assert_eq!(payment.invoice_amount.as_deref(), Some("15.50"));

    let (status, body) = call(&app, TestRequest::get().uri("/payments/P-404").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("P-404"));
}

#[actix_web::test]
async fn email_attempts_are_listed() {
    let db = new_db().await;
    seed(&db).await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/email-receipts").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let attempts: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(attempts.as_array().map(Vec::len), Some(1));
    assert_eq!(attempts[0]["to_email"], "amy@example.com");
    assert_eq!(attempts[0]["status"], "sent");
}

#[actix_web::test]
async fn receipts() {
    let db = new_db().await;
    seed(&db).await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/receipt/P-1").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let receipt: ReceiptResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(receipt.payment_id, PaymentId::from("P-1"));
    assert!(receipt.print_string.starts_with("<CENTER>"));

    let (status, _) = call(&app, TestRequest::get().uri("/receipt/P-2").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn printable_receipts() {
    let db = new_db().await;
    seed(&db).await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/receipt/P-1/print").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<strong>Test Shop</strong>"), "{body}");
    assert!(body.contains("Total: 10.00 USD"));
    assert!(body.contains("window.print()"));

    let (status, body) = call(&app, TestRequest::get().uri("/receipt/P-3/print").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "<h1>No receipt found</h1>");
}

#[actix_web::test]
async fn daily_report() {
    let db = new_db().await;
    seed(&db).await;
    let app = test::init_service(App::new().configure(configure(db, MockGateway::new(), MockMailer::new()))).await;
    let (status, body) = call(&app, TestRequest::get().uri("/report/daily?date=2024-05-01").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let summary: DailySummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.date.to_string(), "2024-05-01");
    assert_eq!(summary.payments.len(), 2);
    assert_eq!(summary.fiat_totals.len(), 1);
    assert_eq!(summary.fiat_totals[0].currency.as_deref(), Some("USD"));
    assert_eq!(summary.fiat_totals[0].count, 2);
    assert_eq!(summary.fiat_totals[0].total, Some(25.5));

    let (status, _) = call(&app, TestRequest::get().uri("/report/daily?date=yesterday").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
