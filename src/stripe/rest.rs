// Stripe REST client
// Implements the payment-link endpoint with idempotency header propagation.

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use std::future::Future;
use tracing::{info, instrument, warn};

use crate::stripe::errors::{StripeApiError, StripeErrorEnvelope};
use crate::stripe::types::{CreatePaymentLinkRequest, PaymentLink};
use crate::stripe::PaymentLinkIssuer;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct StripeRestClient {
    pub(crate) http: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) account_id: Option<String>,
    pub(crate) stripe_version: Option<String>,
    // Retry knobs with safe defaults
    pub(crate) max_retries: u32,
    pub(crate) base_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
}

impl StripeRestClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: STRIPE_API_BASE.to_string(),
            account_id: None,
            stripe_version: None,
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }

    pub fn with_account(mut self, acct: impl Into<Option<String>>) -> Self {
        self.account_id = acct.into();
        self
    }

    pub fn with_version(mut self, ver: impl Into<Option<String>>) -> Self {
        self.stripe_version = ver.into();
        self
    }

    fn apply_common_headers(
        &self,
        req: reqwest::RequestBuilder,
        idempotency_key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = req.bearer_auth(&self.api_key);
        if let Some(k) = idempotency_key {
            req = req.header("Idempotency-Key", k);
        }
        if let Some(v) = &self.stripe_version {
            if !v.is_empty() {
                req = req.header("Stripe-Version", v);
            }
        }
        if let Some(acct) = &self.account_id {
            if !acct.is_empty() {
                req = req.header("Stripe-Account", acct);
            }
        }
        req
    }

    fn map_error(status: StatusCode, body: &str) -> StripeApiError {
        if let Ok(env) = serde_json::from_str::<StripeErrorEnvelope>(body) {
            env.to_api_error_with_status(Some(status.as_u16()))
        } else {
            StripeApiError::Http(format!("status={} body={}", status.as_u16(), body))
        }
    }

    async fn with_retries<F, Fut, T>(&self, desc: &str, mut op: F) -> Result<T, StripeApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StripeApiError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if !e.is_transient() || attempt >= self.max_retries {
                        return Err(e);
                    }

                    // Exponential backoff with full jitter
                    let exp = self
                        .base_delay_ms
                        .saturating_mul(1u64 << attempt.min(20));
                    let cap = exp.min(self.max_delay_ms.max(self.base_delay_ms));
                    let mut rng = SmallRng::from_entropy();
                    let delay_ms = if cap > self.base_delay_ms {
                        rng.gen_range(self.base_delay_ms..=cap)
                    } else {
                        self.base_delay_ms
                    };

                    warn!(
                        target: "stripe",
                        desc = %desc,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        next_delay_ms = delay_ms,
                        "retrying transient Stripe error"
                    );

                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }

    // POST /v1/payment_links
    // application/x-www-form-urlencoded
    #[instrument(
        skip(self, request),
        fields(method = "POST", path = "/v1/payment_links", idempotency_key = ?idempotency_key)
    )]
    pub async fn create_payment_link_with_key(
        &self,
        request: &CreatePaymentLinkRequest,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentLink, StripeApiError> {
        if request.price.is_empty() {
            return Err(StripeApiError::Precondition("price id required"));
        }
        let form = request.to_form();

        info!(
            target: "stripe",
            method = "POST",
            path = "/v1/payment_links",
            price = %request.price,
            idempotency_key = idempotency_key.unwrap_or(""),
            "stripe request"
        );

        let req_builder = || {
            let url = format!("{}/v1/payment_links", self.base_url);
            let req = self.http.post(url).form(&form);
            let req = self.apply_common_headers(req, idempotency_key);
            async move {
                let resp = req
                    .send()
                    .await
                    .map_err(|e| StripeApiError::Http(e.to_string()))?;
                let status = resp.status();
                let text = resp
                    .text()
                    .await
                    .map_err(|e| StripeApiError::Decode(e.to_string()))?;
                if status.is_success() {
                    serde_json::from_str::<PaymentLink>(&text)
                        .map_err(|e| StripeApiError::Decode(e.to_string()))
                } else {
                    Err(Self::map_error(status, &text))
                }
            }
        };
        self.with_retries("create_payment_link", req_builder).await
    }
}

#[async_trait]
impl PaymentLinkIssuer for StripeRestClient {
    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> Result<PaymentLink, StripeApiError> {
        // One key per order so retries never mint a second link.
        let idempotency_key = uuid::Uuid::new_v4().to_string();
        self.create_payment_link_with_key(request, Some(&idempotency_key))
            .await
    }
}
