use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::order::PriceTable;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StripeSettings {
    pub api_key: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub stripe_version: String,
    #[serde(default = "default_stripe_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_webhook_tolerance_seconds")]
    pub webhook_tolerance_seconds: i64,
    /// Accept webhook payloads without a signature when no secret is set.
    #[serde(default)]
    pub allow_unsigned_webhooks: bool,
    #[serde(default)]
    pub prices: PriceTable,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            account_id: String::new(),
            stripe_version: String::new(),
            timeout_ms: default_stripe_timeout_ms(),
            webhook_secret: String::new(),
            webhook_tolerance_seconds: default_webhook_tolerance_seconds(),
            allow_unsigned_webhooks: false,
            prices: PriceTable::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS on connect; otherwise STARTTLS is attempted when offered.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    #[serde(default = "default_smtp_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            secure: false,
            user: None,
            password: None,
            from: "CashMesh AI <no-reply@cashmesh.ai>".to_string(),
            timeout: default_smtp_timeout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stripe: StripeSettings,
    #[serde(default)]
    pub smtp: SmtpSettings,
    pub server_port: u16,
    pub public_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stripe: StripeSettings::default(),
            smtp: SmtpSettings::default(),
            server_port: 3000,
            public_dir: "public".to_string(),
        }
    }
}

impl Config {
    /// Load from config.toml (if present) and environment variables.
    /// Environment variables override file values.
    /// Supported env keys: STRIPE_SECRET_KEY (or STRIPE_API_KEY), STRIPE_ACCOUNT_ID,
    /// STRIPE_VERSION, STRIPE_TIMEOUT_MS, STRIPE_WEBHOOK_SECRET,
    /// STRIPE_WEBHOOK_TOLERANCE_SECONDS, STRIPE_ALLOW_UNSIGNED_WEBHOOKS,
    /// STRIPE_PRICE_STANDARD, STRIPE_PRICE_PREMIUM, STRIPE_PRICE_ENTERPRISE,
    /// SMTP_HOST, SMTP_PORT, SMTP_SECURE, SMTP_USER, SMTP_PASSWORD, SMTP_FROM,
    /// SMTP_TIMEOUT, PORT (or SERVER_PORT), PUBLIC_DIR
    pub fn load() -> Self {
        let base: Config = Default::default();
        let mut fig = Figment::from(Serialized::defaults(base));
        if std::path::Path::new("config.toml").exists() {
            fig = fig.merge(Toml::file("config.toml"));
        }
        let mut cfg = Self::extract_or_default(fig);
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    fn extract_or_default(fig: Figment) -> Self {
        fig.extract().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid config.toml; using defaults");
            Config::default()
        })
    }

    pub fn from_env() -> Self {
        // A missing .env file is the normal case in deployments.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("STRIPE_API_KEY") {
            self.stripe.api_key = v;
        }
        if let Some(v) = var("STRIPE_SECRET_KEY") {
            self.stripe.api_key = v;
        }
        if let Some(v) = var("STRIPE_ACCOUNT_ID") {
            self.stripe.account_id = v;
        }
        if let Some(v) = var("STRIPE_VERSION") {
            self.stripe.stripe_version = v;
        }
        if let Some(v) = var("STRIPE_TIMEOUT_MS") {
            self.stripe.timeout_ms = v.parse().unwrap_or(self.stripe.timeout_ms);
        }
        if let Some(v) = var("STRIPE_WEBHOOK_SECRET") {
            self.stripe.webhook_secret = v;
        }
        if let Some(v) = var("STRIPE_WEBHOOK_TOLERANCE_SECONDS") {
            self.stripe.webhook_tolerance_seconds =
                v.parse().unwrap_or(self.stripe.webhook_tolerance_seconds);
        }
        if let Some(v) = var("STRIPE_ALLOW_UNSIGNED_WEBHOOKS") {
            self.stripe.allow_unsigned_webhooks = parse_flag(&v);
        }
        if let Some(v) = var("STRIPE_PRICE_STANDARD") {
            self.stripe.prices.standard = v;
        }
        if let Some(v) = var("STRIPE_PRICE_PREMIUM") {
            self.stripe.prices.premium = v;
        }
        if let Some(v) = var("STRIPE_PRICE_ENTERPRISE") {
            self.stripe.prices.enterprise = v;
        }
        if let Some(v) = var("SMTP_HOST") {
            self.smtp.host = v;
        }
        if let Some(v) = var("SMTP_PORT") {
            self.smtp.port = v.parse().unwrap_or(self.smtp.port);
        }
        if let Some(v) = var("SMTP_SECURE") {
            self.smtp.secure = v == "true";
        }
        if let Some(v) = var("SMTP_USER").filter(|v| !v.is_empty()) {
            self.smtp.user = Some(v);
        }
        if let Some(v) = var("SMTP_PASSWORD") {
            self.smtp.password = Some(v);
        }
        if let Some(v) = var("SMTP_FROM") {
            self.smtp.from = v;
        }
        if let Some(v) = var("SMTP_TIMEOUT") {
            self.smtp.timeout = parse_duration_env(&v, self.smtp.timeout);
        }
        if let Some(v) = var("SERVER_PORT") {
            self.server_port = v.parse().unwrap_or(self.server_port);
        }
        if let Some(v) = var("PORT") {
            self.server_port = v.parse().unwrap_or(self.server_port);
        }
        if let Some(v) = var("PUBLIC_DIR") {
            self.public_dir = v;
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_duration_env(value: &str, current: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or(current)
}

fn default_stripe_timeout_ms() -> u64 {
    15_000
}

fn default_webhook_tolerance_seconds() -> i64 {
    300 // 5 minutes
}

fn default_smtp_timeout() -> Duration {
    Duration::from_secs(10)
}
