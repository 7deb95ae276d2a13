//! Risk engine configuration
//!
//! Thresholds and high-risk sets are configurable; defaults match the
//! production tuning this service shipped with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Configuration for the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Score at or above which the recommendation is CHALLENGE.
    #[serde(default = "default_challenge_threshold")]
    pub challenge_threshold: i32,

    /// Score at or above which the recommendation is DECLINE.
    #[serde(default = "default_decline_threshold")]
    pub decline_threshold: i32,

    /// MCCs treated as high-risk.
    #[serde(default = "default_high_risk_mccs")]
    pub high_risk_mccs: HashSet<String>,

    /// Country codes treated as high-risk.
    #[serde(default)]
    pub high_risk_countries: HashSet<String>,

    /// Per-currency high-value thresholds.
    #[serde(default = "default_high_value_thresholds")]
    pub high_value_thresholds: HashMap<String, Decimal>,

    /// High-value threshold for currencies not listed above.
    #[serde(default = "default_high_value_fallback")]
    pub high_value_fallback: Decimal,
}

fn default_challenge_threshold() -> i32 {
    70
}

fn default_decline_threshold() -> i32 {
    90
}

fn default_high_risk_mccs() -> HashSet<String> {
    [
        "7995", // gambling
        "5993", // cigar stores
        "5921", // package stores: beer, wine, liquor
        "7273", // dating and escort services
        "7994", // video game arcades
        "5816", // digital goods: games
        "5967", // direct marketing: inbound teleservices
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_high_value_thresholds() -> HashMap<String, Decimal> {
    [
        ("USD", Decimal::new(1_000, 0)),
        ("EUR", Decimal::new(900, 0)),
        ("GBP", Decimal::new(800, 0)),
    ]
    .into_iter()
    .map(|(code, value)| (code.to_string(), value))
    .collect()
}

fn default_high_value_fallback() -> Decimal {
    Decimal::new(500, 0)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            challenge_threshold: default_challenge_threshold(),
            decline_threshold: default_decline_threshold(),
            high_risk_mccs: default_high_risk_mccs(),
            high_risk_countries: HashSet::new(),
            high_value_thresholds: default_high_value_thresholds(),
            high_value_fallback: default_high_value_fallback(),
        }
    }
}

impl RiskConfig {
    /// High-value threshold for a currency code.
    pub fn high_value_threshold(&self, currency: &str) -> Decimal {
        self.high_value_thresholds
            .get(currency)
            .copied()
            .unwrap_or(self.high_value_fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_thresholds() {
        let config = RiskConfig::default();
        assert_eq!(config.challenge_threshold, 70);
        assert_eq!(config.decline_threshold, 90);
    }

    #[test]
    fn test_default_high_risk_mccs() {
        let config = RiskConfig::default();
        assert!(config.high_risk_mccs.contains("7995"));
        assert!(config.high_risk_mccs.contains("5967"));
        assert!(!config.high_risk_mccs.contains("5411"));
    }

    #[test]
    fn test_high_value_thresholds_per_currency() {
        let config = RiskConfig::default();
        assert_eq!(config.high_value_threshold("USD"), dec!(1000));
        assert_eq!(config.high_value_threshold("EUR"), dec!(900));
        assert_eq!(config.high_value_threshold("GBP"), dec!(800));
        // Unlisted currencies use the fallback.
        assert_eq!(config.high_value_threshold("JPY"), dec!(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "decline_threshold": 95 }"#;
        let config: RiskConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.decline_threshold, 95);
        assert_eq!(config.challenge_threshold, 70);
        assert!(config.high_risk_mccs.contains("7995"));
    }
}
