//! Per-IP rate limiting for Actix Web.
//!
//! The gateway webhook can be called by anyone who knows the URL, and every accepted call costs us a gateway
//! re-check. This middleware caps the number of calls a single remote address can make per minute. Calls over the
//! limit are rejected with `429 Too Many Requests` before they reach the handler.
//!
//! The remote address is resolved with [`get_remote_ip`], so the `X-Forwarded-For` and `Forwarded` headers are only
//! trusted if the server is configured to do so.
use std::{
    future::{ready, Ready},
    net::IpAddr,
    num::NonZeroU32,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorTooManyRequests,
    Error,
};
use futures::future::LocalBoxFuture;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use log::{debug, trace, warn};
use tokio::task::JoinHandle;

use crate::{config::ServerOptions, helpers::get_remote_ip};

pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Builds a limiter that allows `per_minute` calls per IP address. A limit of zero is treated as one.
pub fn ip_rate_limiter(per_minute: u32) -> Arc<IpRateLimiter> {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Starts a task that drops per-IP state for addresses that have not called in a while, so the limiter does not grow
/// with every address it has ever seen. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_limiter_cleanup(limiter: Arc<IpRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        loop {
            timer.tick().await;
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            trace!("🚦️ Rate limiter cleanup. {before} addresses before, {} after", limiter.len());
            if before > limiter.len() {
                debug!("🚦️ Forgot {} idle addresses", before - limiter.len());
            }
        }
    })
}

pub struct RateLimitMiddlewareFactory {
    limiter: Arc<IpRateLimiter>,
    options: ServerOptions,
}

impl RateLimitMiddlewareFactory {
    /// The limiter is shared, so every worker thread draws from the same per-IP budget.
    pub fn new(limiter: Arc<IpRateLimiter>, options: ServerOptions) -> Self {
        RateLimitMiddlewareFactory { limiter, options }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = RateLimitMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            limiter: Arc::clone(&self.limiter),
            options: self.options,
            service: Rc::new(service),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    limiter: Arc<IpRateLimiter>,
    options: ServerOptions,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let remote_ip =
            get_remote_ip(req.request(), self.options.use_x_forwarded_for, self.options.use_forwarded);
        let allowed = match remote_ip {
            Some(ip) => {
                let ok = self.limiter.check_key(&ip).is_ok();
                if !ok {
                    warn!("🚦️ Rate limit exceeded for {ip} on {}", req.path());
                }
                ok
            },
            None => {
                warn!("🚦️ Could not determine the remote address for {}. Not rate limiting it.", req.path());
                true
            },
        };
        Box::pin(async move {
            if allowed {
                trace!("🚦️ Rate limit check passed");
                service.call(req).await
            } else {
                Err(ErrorTooManyRequests("Too many requests"))
            }
        })
    }
}
