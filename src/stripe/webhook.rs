// Stripe webhook handling: signature verification and event interpretation

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::settings::StripeSettings;
use crate::stripe::errors::WebhookError;
use crate::stripe::types::{PaymentIntent, StripeEvent, PAYMENT_INTENT_SUCCEEDED};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// How inbound webhook payloads are authenticated.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: i64,
    allow_unsigned: bool,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds,
            allow_unsigned: false,
        }
    }

    /// Trust unsigned payloads when no secret is configured.
    pub fn allow_unsigned(mut self, allow: bool) -> Self {
        self.allow_unsigned = allow;
        self
    }

    pub fn from_settings(cfg: &StripeSettings) -> Self {
        Self::new(cfg.webhook_secret.clone(), cfg.webhook_tolerance_seconds)
            .allow_unsigned(cfg.allow_unsigned_webhooks)
    }

    pub fn verifies_signatures(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn accepts_unsigned(&self) -> bool {
        !self.verifies_signatures() && self.allow_unsigned
    }

    /// Authenticate (when configured) and decode a raw webhook body
    pub fn parse_event(
        &self,
        payload: &[u8],
        headers: &http::HeaderMap,
    ) -> Result<StripeEvent, WebhookError> {
        if self.verifies_signatures() {
            verify_signature(payload, headers, &self.secret, self.tolerance_seconds)?;
        } else if !self.allow_unsigned {
            return Err(WebhookError::MissingSecret);
        }

        serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedPayload(format!("JSON parse error: {}", e)))
    }
}

/// Verify Stripe webhook signature using HMAC SHA-256
pub fn verify_signature(
    payload: &[u8],
    headers: &http::HeaderMap,
    webhook_secret: &str,
    tolerance_seconds: i64,
) -> Result<(), WebhookError> {
    if webhook_secret.is_empty() {
        return Err(WebhookError::MissingSecret);
    }

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .ok_or(WebhookError::MissingSignature)?
        .to_str()
        .map_err(|e| WebhookError::InvalidSignature(format!("Invalid header encoding: {}", e)))?;

    // t=timestamp,v1=signature[,v1=signature2,...]
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {} // v0 and unknown schemes are ignored
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        WebhookError::InvalidSignature("Missing timestamp in signature header".to_string())
    })?;

    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature(
            "No v1 signature found".to_string(),
        ));
    }

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| WebhookError::InvalidSignature(format!("System time error: {}", e)))?
        .as_secs() as i64;

    let time_diff = current_time.saturating_sub(timestamp).saturating_abs();
    if time_diff > tolerance_seconds {
        return Err(WebhookError::TimestampTolerance(format!(
            "Timestamp {} differs from current time {} by {} seconds (tolerance: {})",
            timestamp, current_time, time_diff, tolerance_seconds
        )));
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(format!("HMAC init error: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time
    let signature_valid = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !signature_valid {
        return Err(WebhookError::InvalidSignature(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    debug!(
        timestamp = timestamp,
        time_diff = time_diff,
        "Webhook signature verified successfully"
    );

    Ok(())
}

/// Customer details carried on a succeeded payment's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub payment_intent_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub topic: String,
}

/// Decide whether an event calls for a confirmation email
pub fn order_confirmation(evt: &StripeEvent) -> Result<Option<OrderConfirmation>, WebhookError> {
    if evt.event_type != PAYMENT_INTENT_SUCCEEDED {
        info!(event_type = %evt.event_type, "Ignoring unsupported event type");
        return Ok(None);
    }

    let mut intent: PaymentIntent =
        serde_json::from_value(evt.data.object.clone()).map_err(|e| {
            WebhookError::MalformedPayload(format!("Failed to parse PaymentIntent: {}", e))
        })?;

    info!(payment_intent_id = %intent.id, "Payment succeeded");

    let customer_email = intent.metadata.remove("customer_email").unwrap_or_default();
    if customer_email.is_empty() {
        warn!(
            payment_intent_id = %intent.id,
            "Payment succeeded without customer_email metadata; no confirmation sent"
        );
        return Ok(None);
    }

    Ok(Some(OrderConfirmation {
        payment_intent_id: intent.id,
        customer_email,
        customer_name: intent.metadata.remove("customer_name").unwrap_or_default(),
        topic: intent.metadata.remove("topic").unwrap_or_default(),
    }))
}

/// Build a `stripe-signature` header value for `payload` signed at `timestamp`.
#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
