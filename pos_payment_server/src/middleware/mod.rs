mod rate_limit;

pub use rate_limit::{
    ip_rate_limiter,
    start_limiter_cleanup,
    IpRateLimiter,
    RateLimitMiddlewareFactory,
    RateLimitMiddlewareService,
};
