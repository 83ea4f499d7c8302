// Order request schema shared by the payment-link and report endpoints

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Price used for every tier until real prices are configured.
pub const PLACEHOLDER_PRICE_ID: &str = "price_1SN2CVKLLm6GspecIyutiq8P";

/// Order fields as posted by the storefront.
///
/// Every field defaults to empty, and `null` reads as empty, so that an
/// absent field is reported by [`OrderRequest::validate`] rather than by the
/// JSON decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub customer_email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub package_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub add_ons: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),
}

impl OrderRequest {
    /// Validate the fields every order-accepting endpoint requires
    pub fn validate(&self) -> Result<(), OrderError> {
        let missing: Vec<&'static str> = [
            ("customerName", &self.customer_name),
            ("customerEmail", &self.customer_email),
            ("topic", &self.topic),
            ("packageType", &self.package_type),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OrderError::MissingFields(missing))
        }
    }

    pub fn package(&self) -> PackageType {
        PackageType::parse(&self.package_type)
    }

    /// Metadata attached to the payment link and round-tripped in webhooks.
    pub fn link_metadata(&self) -> Result<HashMap<String, String>, serde_json::Error> {
        Ok(HashMap::from([
            ("customer_email".to_string(), self.customer_email.clone()),
            ("customer_name".to_string(), self.customer_name.clone()),
            ("topic".to_string(), self.topic.clone()),
            ("package".to_string(), self.package_type.clone()),
            ("add_ons".to_string(), serde_json::to_string(&self.add_ons)?),
        ]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    Standard,
    Premium,
    Enterprise,
}

impl PackageType {
    /// Unknown tiers are sold at the standard price.
    pub fn parse(s: &str) -> Self {
        match s {
            "premium" => PackageType::Premium,
            "enterprise" => PackageType::Enterprise,
            _ => PackageType::Standard,
        }
    }
}

/// Stripe price id per package tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceTable {
    pub standard: String,
    pub premium: String,
    pub enterprise: String,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            standard: PLACEHOLDER_PRICE_ID.to_string(),
            premium: PLACEHOLDER_PRICE_ID.to_string(),
            enterprise: PLACEHOLDER_PRICE_ID.to_string(),
        }
    }
}

impl PriceTable {
    pub fn price_for(&self, package: PackageType) -> &str {
        match package {
            PackageType::Standard => &self.standard,
            PackageType::Premium => &self.premium,
            PackageType::Enterprise => &self.enterprise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> OrderRequest {
        OrderRequest {
            customer_name: "Ana".to_string(),
            customer_email: "a@b.com".to_string(),
            topic: "Market Expansion".to_string(),
            package_type: "premium".to_string(),
            add_ons: vec!["slides".to_string()],
        }
    }

    fn distinct_prices() -> PriceTable {
        PriceTable {
            standard: "price_std".to_string(),
            premium: "price_pro".to_string(),
            enterprise: "price_ent".to_string(),
        }
    }

    #[test]
    fn test_validate_complete_order() {
        assert!(order().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_each_missing_field() {
        let mut o = order();
        o.customer_name.clear();
        assert_eq!(
            o.validate(),
            Err(OrderError::MissingFields(vec!["customerName"]))
        );

        let o = OrderRequest::default();
        assert_eq!(
            o.validate(),
            Err(OrderError::MissingFields(vec![
                "customerName",
                "customerEmail",
                "topic",
                "packageType"
            ]))
        );
    }

    #[test]
    fn test_add_ons_are_optional() {
        let o: OrderRequest = serde_json::from_str(
            r#"{"customerName":"Ana","customerEmail":"a@b.com","topic":"t","packageType":"standard"}"#,
        )
        .unwrap();
        assert!(o.add_ons.is_empty());
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_null_fields_read_as_missing() {
        let o: OrderRequest = serde_json::from_str(
            r#"{"customerName":null,"customerEmail":"a@b.com","topic":"t","packageType":null,"addOns":null}"#,
        )
        .unwrap();
        assert!(o.add_ons.is_empty());
        assert_eq!(
            o.validate(),
            Err(OrderError::MissingFields(vec!["customerName", "packageType"]))
        );
    }

    #[test]
    fn test_price_for_known_tiers() {
        let prices = distinct_prices();
        assert_eq!(prices.price_for(PackageType::parse("standard")), "price_std");
        assert_eq!(prices.price_for(PackageType::parse("premium")), "price_pro");
        assert_eq!(prices.price_for(PackageType::parse("enterprise")), "price_ent");
    }

    #[test]
    fn test_unknown_tier_falls_back_to_standard() {
        let prices = distinct_prices();
        for tier in ["gold", "Premium", ""] {
            assert_eq!(prices.price_for(PackageType::parse(tier)), "price_std");
        }
    }

    #[test]
    fn test_link_metadata_encodes_add_ons() {
        let mut o = order();
        o.add_ons.push("call".to_string());
        let meta = o.link_metadata().unwrap();
        assert_eq!(meta["customer_email"], "a@b.com");
        assert_eq!(meta["customer_name"], "Ana");
        assert_eq!(meta["topic"], "Market Expansion");
        assert_eq!(meta["package"], "premium");
        assert_eq!(meta["add_ons"], r#"["slides","call"]"#);

        o.add_ons.clear();
        assert_eq!(o.link_metadata().unwrap()["add_ons"], "[]");
    }
}
