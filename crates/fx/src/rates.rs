//! Rate lookup and conversion

use async_trait::async_trait;
use cardgate_core::{Amount, Currency};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::FxError;

/// Rate source between two currencies.
///
/// Implementations can be table-backed (below) or wrap a market data feed.
#[async_trait]
pub trait FxProvider: Send + Sync {
    /// Rate such that `amount_in_to = amount_in_from * rate`.
    ///
    /// Same-currency lookups return 1.
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, FxError>;
}

/// Convert an amount between currencies, half-up at four decimals.
pub async fn convert(
    provider: &dyn FxProvider,
    amount: Amount,
    from: &Currency,
    to: &Currency,
) -> Result<Amount, FxError> {
    if from == to {
        return Ok(amount);
    }
    let rate = provider.rate(from, to).await?;
    amount
        .apply_rate(rate)
        .map_err(|e| FxError::Transport(format!("conversion failed: {e}")))
}

/// In-memory rate table.
///
/// Seeded with the USD/EUR/GBP/JPY matrix by default; additional pairs can
/// be inserted for tests or local runs.
pub struct RateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    /// Empty table.
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// Insert or replace a rate for one direction.
    pub fn insert(&mut self, from: Currency, to: Currency, rate: Decimal) {
        self.rates.insert((from, to), rate);
    }
}

impl Default for RateTable {
    fn default() -> Self {
        let mut table = Self::empty();
        let pairs: [(&str, &str, Decimal); 12] = [
            ("USD", "EUR", Decimal::new(85, 2)),
            ("USD", "GBP", Decimal::new(75, 2)),
            ("USD", "JPY", Decimal::new(1100, 1)),
            ("EUR", "USD", Decimal::new(118, 2)),
            ("EUR", "GBP", Decimal::new(88, 2)),
            ("EUR", "JPY", Decimal::new(1300, 1)),
            ("GBP", "USD", Decimal::new(133, 2)),
            ("GBP", "EUR", Decimal::new(114, 2)),
            ("GBP", "JPY", Decimal::new(1450, 1)),
            ("JPY", "USD", Decimal::new(9, 3)),
            ("JPY", "EUR", Decimal::new(77, 4)),
            ("JPY", "GBP", Decimal::new(69, 4)),
        ];
        for (from, to, rate) in pairs {
            table.insert(
                from.parse().expect("seed currency"),
                to.parse().expect("seed currency"),
                rate,
            );
        }
        table
    }
}

#[async_trait]
impl FxProvider for RateTable {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| FxError::UnknownRate {
                from: from.clone(),
                to: to.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_same_currency_rate_is_one() {
        let table = RateTable::default();
        let rate = table.rate(&Currency::Usd, &Currency::Usd).await.unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_seeded_rates() {
        let table = RateTable::default();
        assert_eq!(
            table.rate(&Currency::Eur, &Currency::Usd).await.unwrap(),
            dec!(1.18)
        );
        assert_eq!(
            table.rate(&Currency::Usd, &Currency::Gbp).await.unwrap(),
            dec!(0.75)
        );
    }

    #[tokio::test]
    async fn test_unknown_pair_errors() {
        let table = RateTable::default();
        let sek: Currency = "SEK".parse().unwrap();
        let result = table.rate(&sek, &Currency::Usd).await;
        assert!(matches!(result, Err(FxError::UnknownRate { .. })));
    }

    #[tokio::test]
    async fn test_convert_rounds_half_up() {
        let table = RateTable::default();
        let amount = Amount::new(dec!(50)).unwrap();
        let converted = convert(&table, amount, &Currency::Eur, &Currency::Usd)
            .await
            .unwrap();
        assert_eq!(converted.value(), dec!(59.0000));
    }

    #[tokio::test]
    async fn test_convert_same_currency_is_identity() {
        let table = RateTable::empty();
        let amount = Amount::new(dec!(10)).unwrap();
        let converted = convert(&table, amount, &Currency::Usd, &Currency::Usd)
            .await
            .unwrap();
        assert_eq!(converted, amount);
    }
}
