//! Limit configuration
//!
//! Fallback limits and channel scaling, overridable via config file.

use cardgate_core::{Amount, TransactionChannel};
use cardgate_directory::CardLimits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the limit evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Fallback limits when neither card nor product defines one.
    #[serde(default)]
    pub defaults: DefaultLimits,

    /// Per-channel scaling of the effective transaction/daily limits.
    #[serde(default)]
    pub channel_multipliers: ChannelMultipliers,

    /// Product-code limit tables, consulted after card-level limits.
    #[serde(default)]
    pub product_limits: HashMap<String, CardLimits>,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultLimits::default(),
            channel_multipliers: ChannelMultipliers::default(),
            product_limits: HashMap::new(),
        }
    }
}

/// The configured fallback limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLimits {
    #[serde(default = "default_transaction_limit")]
    pub transaction_limit: Amount,

    #[serde(default = "default_daily_limit")]
    pub daily_limit: Amount,

    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: Amount,

    #[serde(default = "default_atm_daily_limit")]
    pub atm_daily_limit: Amount,

    #[serde(default = "default_contactless_limit")]
    pub contactless_limit: Amount,

    #[serde(default = "default_online_limit")]
    pub online_limit: Amount,
}

/// Channel factors applied to the effective transaction and daily limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMultipliers {
    #[serde(default = "default_atm_multiplier")]
    pub atm: Decimal,

    #[serde(default = "default_ecommerce_multiplier")]
    pub ecommerce: Decimal,

    #[serde(default = "default_pos_multiplier")]
    pub pos: Decimal,
}

impl ChannelMultipliers {
    /// Factor for a channel; channels without a configured factor scale
    /// by 1.
    pub fn factor(&self, channel: TransactionChannel) -> Decimal {
        match channel {
            TransactionChannel::Atm => self.atm,
            TransactionChannel::ECommerce => self.ecommerce,
            TransactionChannel::Pos => self.pos,
            _ => Decimal::ONE,
        }
    }
}

// Default value functions for serde

fn default_transaction_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(2_000_0000, 4))
}

fn default_daily_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(5_000_0000, 4))
}

fn default_monthly_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(20_000_0000, 4))
}

fn default_atm_daily_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(1_000_0000, 4))
}

fn default_contactless_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(100_0000, 4))
}

fn default_online_limit() -> Amount {
    Amount::new_unchecked(Decimal::new(3_000_0000, 4))
}

fn default_atm_multiplier() -> Decimal {
    Decimal::new(5, 1)
}

fn default_ecommerce_multiplier() -> Decimal {
    Decimal::new(75, 2)
}

fn default_pos_multiplier() -> Decimal {
    Decimal::ONE
}

impl Default for DefaultLimits {
    fn default() -> Self {
        Self {
            transaction_limit: default_transaction_limit(),
            daily_limit: default_daily_limit(),
            monthly_limit: default_monthly_limit(),
            atm_daily_limit: default_atm_daily_limit(),
            contactless_limit: default_contactless_limit(),
            online_limit: default_online_limit(),
        }
    }
}

impl Default for ChannelMultipliers {
    fn default() -> Self {
        Self {
            atm: default_atm_multiplier(),
            ecommerce: default_ecommerce_multiplier(),
            pos: default_pos_multiplier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_limits() {
        let config = LimitConfig::default();

        assert_eq!(config.defaults.transaction_limit.value(), dec!(2000.0000));
        assert_eq!(config.defaults.daily_limit.value(), dec!(5000.0000));
        assert_eq!(config.defaults.monthly_limit.value(), dec!(20000.0000));
        assert_eq!(config.defaults.atm_daily_limit.value(), dec!(1000.0000));
        assert_eq!(config.defaults.contactless_limit.value(), dec!(100.0000));
        assert_eq!(config.defaults.online_limit.value(), dec!(3000.0000));
    }

    #[test]
    fn test_default_multipliers() {
        let multipliers = ChannelMultipliers::default();
        assert_eq!(multipliers.factor(TransactionChannel::Atm), dec!(0.5));
        assert_eq!(
            multipliers.factor(TransactionChannel::ECommerce),
            dec!(0.75)
        );
        assert_eq!(multipliers.factor(TransactionChannel::Pos), dec!(1));
        assert_eq!(multipliers.factor(TransactionChannel::Recurring), dec!(1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "defaults": { "daily_limit": "8000" } }"#;
        let config: LimitConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.defaults.daily_limit.value(), dec!(8000.0000));
        // Everything else falls back.
        assert_eq!(config.defaults.transaction_limit.value(), dec!(2000.0000));
        assert_eq!(config.channel_multipliers.atm, dec!(0.5));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = LimitConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LimitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.defaults.monthly_limit,
            config.defaults.monthly_limit
        );
    }
}
