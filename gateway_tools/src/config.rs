use std::{env, time::Duration};

use log::*;
use pos_common::Secret;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://sandbox.api.forumpay.com";
pub const DEFAULT_POS_ID: &str = "pos-01";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, without a trailing slash. e.g. "https://api.forumpay.com"
    pub base_url: String,
    /// The API user (sometimes called the API key)
    pub user: String,
    pub secret: Secret<String>,
    /// The point-of-sale identifier that is sent with every request
    pub pos_id: String,
    /// Upper bound on the duration of any single gateway call
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_BASE_URL.to_string(),
            user: String::default(),
            secret: Secret::default(),
            pos_id: DEFAULT_POS_ID.to_string(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("POS_GATEWAY_BASE_URL").unwrap_or_else(|_| {
            warn!("POS_GATEWAY_BASE_URL not set, using the sandbox URL {DEFAULT_GATEWAY_BASE_URL} as default");
            DEFAULT_GATEWAY_BASE_URL.to_string()
        });
        let base_url = base_url.trim_end_matches('/').to_string();
        let user = env::var("POS_GATEWAY_USER").or_else(|_| env::var("POS_GATEWAY_API_KEY")).unwrap_or_else(|_| {
            warn!("Neither POS_GATEWAY_USER nor POS_GATEWAY_API_KEY is set. Invoices cannot be created.");
            String::default()
        });
        let secret =
            env::var("POS_GATEWAY_SECRET").or_else(|_| env::var("POS_GATEWAY_API_SECRET")).unwrap_or_else(|_| {
                warn!("Neither POS_GATEWAY_SECRET nor POS_GATEWAY_API_SECRET is set. Invoices cannot be created.");
                String::default()
            });
        let pos_id = env::var("POS_GATEWAY_POS_ID").unwrap_or_else(|_| {
            info!("POS_GATEWAY_POS_ID not set, using {DEFAULT_POS_ID} as default");
            DEFAULT_POS_ID.to_string()
        });
        let timeout = env::var("POS_GATEWAY_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for POS_GATEWAY_TIMEOUT ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self { base_url, user, secret: Secret::new(secret), pos_id, timeout }
    }

    /// Lists the credentials that are required to talk to the gateway but have not been configured.
    pub fn missing_credentials(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.user.trim().is_empty() {
            missing.push("POS_GATEWAY_USER or POS_GATEWAY_API_KEY".to_string());
        }
        if self.secret.is_empty() {
            missing.push("POS_GATEWAY_SECRET or POS_GATEWAY_API_SECRET".to_string());
        }
        missing
    }
}
