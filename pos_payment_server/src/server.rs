use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::GatewayApi;
use log::*;
use pos_payment_engine::{ReconciliationApi, RecordsApi, SqliteDatabase};

use crate::{
    config::{Branding, ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{GatewayConnector, SmtpMailer},
    middleware::{ip_rate_limiter, start_limiter_cleanup, IpRateLimiter, RateLimitMiddlewareFactory},
    reconcile_worker::start_reconciliation_worker,
    routes::{
        health,
        index,
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

const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let gateway = GatewayApi::new(config.gateway.clone())
        .map(GatewayConnector::new)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mailer = SmtpMailer::new(&config.mail)?;
    if let Some(interval) = config.sweep.interval {
        let _handle = start_reconciliation_worker(
            db.clone(),
            gateway.clone(),
            mailer.clone(),
            config.invoice_settings(),
            interval,
            config.sweep.window,
        );
    }
    // Shared by all workers, so the limit applies per IP across the whole server
    let limiter = ip_rate_limiter(config.webhook_rate_limit);
    let _cleanup = start_limiter_cleanup(limiter.clone(), LIMITER_CLEANUP_INTERVAL);
    let srv = create_server_instance(config, db, gateway, mailer, limiter)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayConnector,
    mailer: SmtpMailer,
    limiter: Arc<IpRateLimiter>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let branding = Branding::from_config(&config);
    let settings = config.invoice_settings();
    let srv = HttpServer::new(move || {
        let reconciliation_api =
            ReconciliationApi::new(db.clone(), gateway.clone(), mailer.clone(), settings.clone());
        let records_api = RecordsApi::new(db.clone());
        let webhook_scope = web::scope("/api/gateway")
            .wrap(RateLimitMiddlewareFactory::new(limiter.clone(), options))
            .service(GatewayCallbackRoute::<SqliteDatabase, GatewayConnector, SmtpMailer>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pos::access_log"))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(records_api))
            .app_data(web::Data::new(branding.clone()))
            .service(health)
            .service(index)
            .service(StartPaymentRoute::<SqliteDatabase, GatewayConnector, SmtpMailer>::new())
            .service(CheckPaymentRoute::<SqliteDatabase, GatewayConnector, SmtpMailer>::new())
            .service(PaymentsRoute::<SqliteDatabase>::new())
            .service(PaymentByIdRoute::<SqliteDatabase>::new())
            .service(EmailReceiptRoute::<SqliteDatabase, GatewayConnector, SmtpMailer>::new())
            .service(EmailReceiptsRoute::<SqliteDatabase>::new())
            .service(ReceiptRoute::<SqliteDatabase>::new())
            .service(PrintReceiptRoute::<SqliteDatabase>::new())
            .service(DailyReportRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}
