use std::{env, time::Duration};

use gateway_tools::GatewayConfig;
use log::*;
use pos_common::{
    helpers::{non_blank, parse_boolean_flag},
    Secret,
};
use pos_payment_engine::request_objects::InvoiceSettings;

const DEFAULT_POS_HOST: &str = "127.0.0.1";
const DEFAULT_POS_PORT: u16 = 5050;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/pos_store.db";
const DEFAULT_WEBHOOK_RATE_LIMIT: u32 = 60;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_EMAIL: &str = "receipts@pos.local";
const DEFAULT_BRAND_NAME: &str = "Crypto POS";
const DEFAULT_SWEEP_WINDOW_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Credentials and endpoint for the payment gateway
    pub gateway: GatewayConfig,
    /// The URL the gateway posts webhooks to. Invoices cannot be created without it.
    pub callback_url: Option<String>,
    /// Shared secret that webhook callers must supply in the `token` query parameter. Empty disables the check.
    pub webhook_token: Secret<String>,
    /// Maximum number of webhook calls per minute from a single IP address
    pub webhook_rate_limit: u32,
    pub mail: MailConfig,
    pub sweep: SweepConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_POS_HOST.to_string(),
            port: DEFAULT_POS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway: GatewayConfig::default(),
            callback_url: None,
            webhook_token: Secret::default(),
            webhook_rate_limit: DEFAULT_WEBHOOK_RATE_LIMIT,
            mail: MailConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("POS_HOST").ok().unwrap_or_else(|| DEFAULT_POS_HOST.into());
        let port = env::var("POS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for POS_PORT. {e} Using the default, {DEFAULT_POS_PORT}, instead."
                    );
                    DEFAULT_POS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_POS_PORT);
        let database_url = env::var("POS_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ POS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let gateway = GatewayConfig::new_from_env_or_default();
        let callback_url = non_blank(env::var("POS_GATEWAY_CALLBACK_URL").ok().as_deref());
        if callback_url.is_none() {
            warn!("🪛️ POS_GATEWAY_CALLBACK_URL is not set. The server will refuse to create invoices until it is.");
        }
        let webhook_token = Secret::new(env::var("POS_WEBHOOK_TOKEN").unwrap_or_default());
        if webhook_token.is_empty() {
            warn!("🚨️ POS_WEBHOOK_TOKEN is not set. Anyone can trigger payment re-checks via the webhook.");
        }
        let webhook_rate_limit = env::var("POS_WEBHOOK_RATE_LIMIT")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .or_else(|| {
                        warn!("🪛️ Invalid value for POS_WEBHOOK_RATE_LIMIT ({s}). Using {DEFAULT_WEBHOOK_RATE_LIMIT}");
                        None
                    })
            })
            .unwrap_or(DEFAULT_WEBHOOK_RATE_LIMIT);
        let use_x_forwarded_for = parse_boolean_flag(env::var("POS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("POS_USE_FORWARDED").ok(), false);
        let mail = MailConfig::from_env_or_default();
        let sweep = SweepConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            gateway,
            callback_url,
            webhook_token,
            webhook_rate_limit,
            mail,
            sweep,
        }
    }

    /// The configuration-derived parameters the engine needs to create invoices.
    pub fn invoice_settings(&self) -> InvoiceSettings {
        InvoiceSettings {
            pos_id: self.gateway.pos_id.clone(),
            callback_url: self.callback_url.clone(),
            webhook_token: self.webhook_token.clone(),
        }
    }
}

//-------------------------------------------------  MailConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Secret<String>,
    pub from_email: String,
    /// Used in email subjects and on the printable receipt
    pub brand_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: Secret::default(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            brand_name: DEFAULT_BRAND_NAME.to_string(),
        }
    }
}

impl MailConfig {
    pub fn from_env_or_default() -> Self {
        let smtp_host = non_blank(env::var("POS_SMTP_HOST").ok().as_deref());
        let smtp_port = env::var("POS_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().map_err(|e| warn!("🪛️ Invalid value for POS_SMTP_PORT ({s}). {e}")).ok())
            .unwrap_or(DEFAULT_SMTP_PORT);
        let smtp_user = non_blank(env::var("POS_SMTP_USER").ok().as_deref());
        let smtp_pass = Secret::new(env::var("POS_SMTP_PASS").unwrap_or_default());
        let from_email =
            non_blank(env::var("POS_FROM_EMAIL").ok().as_deref()).unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string());
        let brand_name =
            non_blank(env::var("POS_BRAND_NAME").ok().as_deref()).unwrap_or_else(|| DEFAULT_BRAND_NAME.to_string());
        let config = Self { smtp_host, smtp_port, smtp_user, smtp_pass, from_email, brand_name };
        if config.is_enabled() {
            info!("🪛️ Receipt emails will be sent via {}:{}", config.smtp_host.as_deref().unwrap_or_default(), smtp_port);
        } else {
            info!("🪛️ SMTP is not fully configured (POS_SMTP_HOST, POS_SMTP_USER, POS_SMTP_PASS). Receipt emails are off.");
        }
        config
    }

    /// Email is only enabled when the host and both credentials are present.
    pub fn is_enabled(&self) -> bool {
        self.smtp_host.is_some() && self.smtp_user.is_some() && !self.smtp_pass.is_empty()
    }
}

//-------------------------------------------------  SweepConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// How often unconfirmed payments are re-checked. `None` switches the sweep off.
    pub interval: Option<Duration>,
    /// Only payments created within this window are re-checked.
    pub window: chrono::Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval: None, window: chrono::Duration::hours(DEFAULT_SWEEP_WINDOW_HOURS) }
    }
}

impl SweepConfig {
    pub fn from_env_or_default() -> Self {
        let interval = env::var("POS_SWEEP_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid value for POS_SWEEP_INTERVAL ({s}). {e}")).ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let window = env::var("POS_SWEEP_WINDOW")
            .map_err(|_| {
                debug!("🪛️ POS_SWEEP_WINDOW is not set. Using the default value of {DEFAULT_SWEEP_WINDOW_HOURS} hrs.")
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(chrono::Duration::hours)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for POS_SWEEP_WINDOW. {e}"))
            })
            .ok()
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_SWEEP_WINDOW_HOURS));
        match interval {
            Some(i) => info!("🪛️ Unconfirmed payments will be re-checked every {}s", i.as_secs()),
            None => info!("🪛️ The reconciliation sweep is disabled. Set POS_SWEEP_INTERVAL to enable it."),
        }
        Self { interval, window }
    }
}

/// The non-secret part of the mail configuration that the receipt pages need.
#[derive(Clone, Debug)]
pub struct Branding {
    pub brand_name: String,
}

impl Branding {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { brand_name: config.mail.brand_name.clone() }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
