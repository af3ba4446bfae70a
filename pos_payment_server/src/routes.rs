//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use pos_payment_engine::{
    db_types::PaymentId,
    request_objects::{InvoiceRequest, ReconcileRequest, WebhookOutcome},
    traits::{PaymentGateway, PaymentRecords, PaymentStore, ReceiptMailer},
    ReconcileError,
    ReconciliationApi,
    RecordsApi,
};
use serde_json::{Map, Value};

use crate::{
    config::Branding,
    data_objects::{
        CheckPaymentResponse,
        DailyReportQuery,
        EmailRequest,
        EmailSentResponse,
        ReceiptResponse,
        WebhookQuery,
    },
    errors::ServerError,
    receipt::render_receipt_page,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("ok")
}

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Point-of-sale payment server is running 🚀")
}

//----------------------------------------------   Invoices  ----------------------------------------------------
route!(start_payment => Post "/start-payment" impl PaymentStore, PaymentGateway, ReceiptMailer);
/// Route handler for the start-payment endpoint
///
/// Creates a gateway invoice for the point-of-sale. On success, the gateway's own response is relayed to the caller
/// verbatim, since the frontend needs the settlement address and QR data it contains.
///
/// If the server is missing configuration, a 500 is returned with the list of `missing` settings. Gateway failures
/// are relayed with the gateway's status and body.
pub async fn start_payment<B, G, M>(
    body: web::Json<InvoiceRequest>,
    api: web::Data<ReconciliationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: ReceiptMailer,
{
    debug!("💻️ POST start-payment");
    let created = api.create_invoice(body.into_inner()).await.map_err(|e| {
        warn!("💻️ Could not create invoice. {e}");
        ServerError::from(e)
    })?;
    let status = StatusCode::from_u16(created.gateway_status).unwrap_or(StatusCode::OK);
    Ok(HttpResponse::build(status).content_type("application/json").body(created.gateway_body))
}

route!(check_payment => Post "/check-payment" impl PaymentStore, PaymentGateway, ReceiptMailer);
/// Route handler for the manual re-check endpoint
///
/// Re-queries the gateway for `{payment_id, currency, address}` and fulfills the payment if it is now confirmed.
/// This is the same path the webhook takes, so it is safe to call as often as the cashier likes. If the gateway answers
/// with something unusable, the stored payment is returned with `updated: false`.
pub async fn check_payment<B, G, M>(
    body: web::Json<ReconcileRequest>,
    api: web::Data<ReconciliationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: ReceiptMailer,
{
    let request = body.into_inner();
    debug!("💻️ POST check-payment for {:?}", request.payment_id);
    let outcome = api.recheck(&request).await.map_err(|e| match e {
        ReconcileError::GatewayUnavailable { detail, .. } => {
            warn!("💻️ Re-check failed. {detail}");
            ServerError::RecheckFailed(detail)
        },
        e => ServerError::from(e),
    })?;
    Ok(HttpResponse::Ok().json(CheckPaymentResponse::from(outcome)))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(gateway_callback => Post "/callback" impl PaymentStore, PaymentGateway, ReceiptMailer);
/// Route handler for the gateway webhook
///
/// The payload is only used to identify the payment. The status is always re-checked with the gateway. Calls without
/// the configured `token` query parameter get a 401. Everything else is acknowledged with a 200 so that the gateway
/// does not keep retrying, even if processing failed.
pub async fn gateway_callback<B, G, M>(
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, G, M>>,
) -> HttpResponse
where
    B: PaymentStore,
    G: PaymentGateway,
    M: ReceiptMailer,
{
    let event = parse_event(&body);
    trace!("💻️ Gateway webhook: {event}");
    match api.handle_webhook(&event, query.token.as_deref()).await {
        WebhookOutcome::Unauthorized => HttpResponse::Unauthorized().body("unauthorized"),
        WebhookOutcome::Ignored(reason) => {
            debug!("💻️ Webhook ignored. {reason}");
            HttpResponse::Ok().body("ok")
        },
        WebhookOutcome::Processed { payment_id, confirmed, fulfillment } => {
            let fulfilled = fulfillment.map(|f| !f.already_done).unwrap_or(false);
            info!("💻️ Webhook for [{payment_id}] processed. confirmed: {confirmed}, fulfilled now: {fulfilled}");
            HttpResponse::Ok().body("ok")
        },
        WebhookOutcome::Failed(reason) => {
            warn!("💻️ Webhook acknowledged, but processing failed. {reason}");
            HttpResponse::Ok().body("ok")
        },
    }
}

/// Gateways post either JSON or form-encoded webhooks. Anything unreadable becomes an empty object.
pub fn parse_event(body: &[u8]) -> Value {
    if let Ok(v @ Value::Object(_)) = serde_json::from_slice::<Value>(body) {
        return v;
    }
    let text = String::from_utf8_lossy(body);
    let decode = |s: &str| {
        let s = s.replace('+', " ");
        urlencoding::decode(&s).map(|d| d.into_owned()).unwrap_or(s)
    };
    let fields = text
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (decode(k), Value::String(decode(v))))
        .collect::<Map<String, Value>>();
    Value::Object(fields)
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(payments => Get "/payments" impl PaymentRecords);
/// Lists the 50 most recently created payments
pub async fn payments<B: PaymentRecords>(api: web::Data<RecordsApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET payments");
    let payments = api.recent_payments().await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(payment_by_id => Get "/payments/{payment_id}" impl PaymentRecords);
pub async fn payment_by_id<B: PaymentRecords>(
    path: web::Path<PaymentId>,
    api: web::Data<RecordsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    debug!("💻️ GET payment {payment_id}");
    let payment = api.payment(&payment_id).await?.ok_or_else(|| ServerError::NoRecordFound(payment_id.to_string()))?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(email_receipt => Post "/payments/{payment_id}/email" impl PaymentStore, PaymentGateway, ReceiptMailer);
/// Route handler for the manual receipt email endpoint
///
/// Sends the receipt to `to_email` if it is given, otherwise to the customer email on file. Unlike the automatic
/// email, a delivery failure is reported to the caller.
pub async fn email_receipt<B, G, M>(
    path: web::Path<PaymentId>,
    body: Option<web::Json<EmailRequest>>,
    api: web::Data<ReconciliationApi<B, G, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    G: PaymentGateway,
    M: ReceiptMailer,
{
    let payment_id = path.into_inner();
    let to_email = body.and_then(|b| b.into_inner().to_email);
    debug!("💻️ POST email receipt for {payment_id}");
    let attempt = api.fulfillment().send_receipt(&payment_id, to_email.as_deref()).await.map_err(|e| {
        warn!("💻️ Could not email the receipt for {payment_id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(EmailSentResponse { ok: true, payment_id, to: attempt.to_email }))
}

route!(email_receipts => Get "/email-receipts" impl PaymentRecords);
/// Lists the 50 most recent email attempts
pub async fn email_receipts<B: PaymentRecords>(api: web::Data<RecordsApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET email-receipts");
    let attempts = api.recent_email_attempts().await?;
    Ok(HttpResponse::Ok().json(attempts))
}

//----------------------------------------------   Receipts  ----------------------------------------------------
route!(receipt => Get "/receipt/{payment_id}" impl PaymentRecords);
pub async fn receipt<B: PaymentRecords>(
    path: web::Path<PaymentId>,
    api: web::Data<RecordsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    debug!("💻️ GET receipt for {payment_id}");
    let print_string = stored_print_string(&payment_id, &api).await?;
    Ok(HttpResponse::Ok().json(ReceiptResponse { payment_id, print_string }))
}

route!(print_receipt => Get "/receipt/{payment_id}/print" impl PaymentRecords);
/// Renders the stored receipt as a printable HTML page
pub async fn print_receipt<B: PaymentRecords>(
    path: web::Path<PaymentId>,
    api: web::Data<RecordsApi<B>>,
    branding: web::Data<Branding>,
) -> HttpResponse {
    let payment_id = path.into_inner();
    debug!("💻️ GET printable receipt for {payment_id}");
    match stored_print_string(&payment_id, &api).await {
        Ok(markup) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_receipt_page(&branding.brand_name, &markup)),
        Err(ServerError::NoRecordFound(_)) => {
            HttpResponse::NotFound().content_type("text/html; charset=utf-8").body("<h1>No receipt found</h1>")
        },
        Err(e) => {
            error!("💻️ Could not render the receipt for {payment_id}. {e}");
            HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body("<h1>Failed to render receipt</h1>")
        },
    }
}

async fn stored_print_string<B: PaymentRecords>(
    payment_id: &PaymentId,
    api: &RecordsApi<B>,
) -> Result<String, ServerError> {
    api.receipt(payment_id)
        .await?
        .and_then(|r| r.print_string)
        .ok_or_else(|| ServerError::NoRecordFound(format!("No receipt found for {payment_id}")))
}

//----------------------------------------------   Reports  ----------------------------------------------------
route!(daily_report => Get "/report/daily" impl PaymentRecords);
/// Daily sales summary
///
/// Totals the payments confirmed on `date` (`YYYY-MM-DD`, default today in UTC), per fiat and per crypto currency.
pub async fn daily_report<B: PaymentRecords>(
    query: web::Query<DailyReportQuery>,
    api: web::Data<RecordsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let date = query.date_or(Utc::now().date_naive()).map_err(ServerError::InvalidRequestBody)?;
    debug!("💻️ GET daily report for {date}");
    let summary = api.daily_summary(date).await?;
    Ok(HttpResponse::Ok().json(summary))
}
