use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    web,
    web::ServiceConfig,
};
use pos_common::Secret;
use pos_payment_engine::{
    request_objects::InvoiceSettings,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ReconciliationApi,
    RecordsApi,
    SqliteDatabase,
};

use crate::{
    config::{Branding, ServerOptions},
    endpoint_tests::mocks::{MockGateway, MockMailer},
    middleware::{ip_rate_limiter, IpRateLimiter, RateLimitMiddlewareFactory},
    routes::{
        health,
        CheckPaymentRoute,
        DailyReportRoute,
        EmailReceiptRoute,
        EmailReceiptsRoute,
        GatewayCallbackRoute,
        PaymentByIdRoute,
        PaymentsRoute,
        PrintReceiptRoute,
        ReceiptRoute,
        StartPaymentRoute,
    },
};

pub const CALLBACK_URL: &str = "https://pos.example.com/api/gateway/callback";
pub const WEBHOOK_TOKEN: &str = "s3cret-token";

pub async fn new_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub fn settings() -> InvoiceSettings {
    InvoiceSettings {
        pos_id: "pos-test".to_string(),
        callback_url: Some(CALLBACK_URL.to_string()),
        webhook_token: Secret::new(WEBHOOK_TOKEN.to_string()),
    }
}

pub fn peer() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20)), 40000)
}

/// Registers every route against a real database and the given mocks.
pub fn configure_app(
    db: SqliteDatabase,
    gateway: MockGateway,
    mailer: MockMailer,
    limiter: Arc<IpRateLimiter>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let options = ServerOptions { use_x_forwarded_for: false, use_forwarded: false };
        let reconciliation_api = ReconciliationApi::new(db.clone(), gateway, mailer, settings());
        cfg.app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(RecordsApi::new(db)))
            .app_data(web::Data::new(Branding { brand_name: "Test Shop".to_string() }))
            .service(health)
            .service(StartPaymentRoute::<SqliteDatabase, MockGateway, MockMailer>::new())
            .service(CheckPaymentRoute::<SqliteDatabase, MockGateway, MockMailer>::new())
            .service(PaymentsRoute::<SqliteDatabase>::new())
            .service(PaymentByIdRoute::<SqliteDatabase>::new())
            .service(EmailReceiptRoute::<SqliteDatabase, MockGateway, MockMailer>::new())
            .service(EmailReceiptsRoute::<SqliteDatabase>::new())
            .service(ReceiptRoute::<SqliteDatabase>::new())
            .service(PrintReceiptRoute::<SqliteDatabase>::new())
            .service(DailyReportRoute::<SqliteDatabase>::new())
            .service(
                web::scope("/api/gateway")
                    .wrap(RateLimitMiddlewareFactory::new(limiter, options))
                    .service(GatewayCallbackRoute::<SqliteDatabase, MockGateway, MockMailer>::new()),
            );
    }
}

/// Same as [`configure_app`], with a rate limit that tests will not hit.
pub fn configure(db: SqliteDatabase, gateway: MockGateway, mailer: MockMailer) -> impl FnOnce(&mut ServiceConfig) {
    configure_app(db, gateway, mailer, ip_rate_limiter(1000))
}

/// Calls the service and returns the status and body. Errors raised by middleware are converted to their response
/// status, with the error message as the body.
pub async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, String)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
