// Minimal Stripe DTOs
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Shown on Stripe's hosted page once checkout completes.
pub const HOSTED_CONFIRMATION_MESSAGE: &str =
    "Thank you for your order! Your strategic report will be generated and delivered within 2 hours.";

/// Parameters for POST /v1/payment_links with a single line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentLinkRequest {
    pub price: String,
    pub quantity: u32,
    pub confirmation_message: String,
    pub metadata: HashMap<String, String>,
}

impl CreatePaymentLinkRequest {
    /// Stripe form encoding, keys sorted for stable output
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("line_items[0][price]".into(), self.price.clone()),
            ("line_items[0][quantity]".into(), self.quantity.to_string()),
            ("after_completion[type]".into(), "hosted_confirmation".into()),
            (
                "after_completion[hosted_confirmation][custom_message]".into(),
                self.confirmation_message.clone(),
            ),
        ];
        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        for k in keys {
            form.push((format!("metadata[{}]", k), self.metadata[k].clone()));
        }
        form
    }
}

// PaymentLink minimal shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

// Webhook event types

/// Stripe webhook event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripeEventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

/// The parts of a payment intent a succeeded event is read for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentIntent {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "string_metadata")]
    pub metadata: HashMap<String, String>,
}

// Null metadata reads as empty; non-string values are dropped.
fn string_metadata<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_link_form() {
        let req = CreatePaymentLinkRequest {
            price: "price_123".into(),
            quantity: 1,
            confirmation_message: HOSTED_CONFIRMATION_MESSAGE.into(),
            metadata: HashMap::from([
                ("topic".to_string(), "Market Expansion".to_string()),
                ("add_ons".to_string(), "[]".to_string()),
            ]),
        };
        let form = req.to_form();
        assert_eq!(
            form,
            vec![
                ("line_items[0][price]".to_string(), "price_123".to_string()),
                ("line_items[0][quantity]".to_string(), "1".to_string()),
                ("after_completion[type]".to_string(), "hosted_confirmation".to_string()),
                (
                    "after_completion[hosted_confirmation][custom_message]".to_string(),
                    HOSTED_CONFIRMATION_MESSAGE.to_string()
                ),
                ("metadata[add_ons]".to_string(), "[]".to_string()),
                ("metadata[topic]".to_string(), "Market Expansion".to_string()),
            ]
        );
    }

    #[test]
    fn test_event_without_data() {
        let evt: StripeEvent = serde_json::from_str(r#"{"type":"charge.refunded"}"#).unwrap();
        assert_eq!(evt.event_type, "charge.refunded");
        assert!(evt.id.is_none());
        assert!(evt.data.object.is_null());
    }

    #[test]
    fn test_payment_intent_lenient_metadata() {
        let pi: PaymentIntent =
            serde_json::from_str(r#"{"id":"pi_1","metadata":null}"#).unwrap();
        assert!(pi.metadata.is_empty());

        let pi: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_1","metadata":{"customer_email":"a@b.com","attempt":2,"flag":null}}"#,
        )
        .unwrap();
        assert_eq!(pi.metadata.len(), 1);
        assert_eq!(pi.metadata["customer_email"], "a@b.com");
    }
}
