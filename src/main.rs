mod http_server;
mod notifier;
mod order;
mod report;
mod settings;
mod stripe;

use crate::http_server::AppState;
use crate::notifier::{monitor_deliveries, Notifier, SmtpMailer};
use crate::stripe::webhook::WebhookVerifier;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration from .env, config.toml and environment
    let cfg = settings::Config::from_env();

    // Validate Stripe configuration
    if cfg.stripe.api_key.is_empty() {
        tracing::error!("STRIPE_SECRET_KEY not set; exiting");
        return Ok(());
    }
    tracing::info!("Starting CashMesh checkout service");

    let verifier = WebhookVerifier::from_settings(&cfg.stripe);
    if verifier.accepts_unsigned() {
        tracing::warn!(
            "Webhook secret not configured and unsigned webhooks allowed - payloads are NOT authenticated"
        );
    } else if !verifier.verifies_signatures() {
        tracing::warn!("Webhook secret not configured - webhook requests will be rejected");
    }

    let payment_links = stripe::rest_client(&cfg.stripe)?;
    let mailer = SmtpMailer::new(&cfg.smtp)?;
    tracing::info!(
        host = %cfg.smtp.host,
        port = cfg.smtp.port,
        secure = cfg.smtp.secure,
        "SMTP transport configured"
    );

    let notifier = Notifier::new(Arc::new(mailer));
    tokio::spawn(monitor_deliveries(notifier.subscribe()));

    let state = AppState {
        payment_links: Arc::new(payment_links),
        prices: Arc::new(cfg.stripe.prices.clone()),
        webhook: Arc::new(verifier),
        notifier,
    };

    http_server::run_server(cfg.server_port, &cfg.public_dir, state).await
}
