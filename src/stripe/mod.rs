// Stripe provider module

pub mod errors;
pub mod rest;
pub mod types;
pub mod webhook;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::settings::StripeSettings;
use self::errors::StripeApiError;
use self::rest::StripeRestClient;
use self::types::{CreatePaymentLinkRequest, PaymentLink};

/// Creates hosted payment links; the HTTP layer only sees this seam.
#[async_trait]
pub trait PaymentLinkIssuer: Send + Sync {
    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> Result<PaymentLink, StripeApiError>;
}

// Build reqwest client with rustls and timeout from cfg.
pub fn rest_client(cfg: &StripeSettings) -> Result<StripeRestClient, StripeApiError> {
    let timeout_ms = if cfg.timeout_ms > 0 { cfg.timeout_ms } else { 15_000 };
    let timeout = Duration::from_millis(timeout_ms);
    let http = Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()
        .map_err(|e| StripeApiError::Http(e.to_string()))?;

    Ok(StripeRestClient::new(http, cfg.api_key.clone())
        .with_account(Some(cfg.account_id.clone()).filter(|s| !s.is_empty()))
        .with_version(Some(cfg.stripe_version.clone()).filter(|s| !s.is_empty())))
}
