//! Risk scoring rules

use cardgate_core::{AuthorizationRequest, TransactionChannel};
use cardgate_directory::CardDetails;
use chrono::Timelike;
use rust_decimal::Decimal;

use crate::{Recommendation, RiskAssessment, RiskConfig, RiskLevel};

const MAX_SCORE: i32 = 100;

/// Rule-based risk engine.
///
/// Stateless and deterministic given input and configuration.
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score a request against the rule set.
    pub fn assess(&self, request: &AuthorizationRequest, card: &CardDetails) -> RiskAssessment {
        let mut score = 0;
        let mut triggered = Vec::new();

        let mut trigger = |name: &str, weight: i32, fired: bool| {
            if fired {
                score += weight;
                triggered.push(name.to_string());
            }
        };

        trigger(
            "high_value_transaction",
            20,
            self.is_high_value(request),
        );
        trigger("round_amount", 5, is_round_amount(request));
        trigger("unusual_country", 30, is_unusual_country(request, card));
        trigger(
            "unusual_merchant_category",
            15,
            self.is_high_risk_mcc(request),
        );
        trigger(
            "high_risk_country",
            30,
            self.is_high_risk_country(request),
        );
        trigger("unusual_time", 10, is_unusual_time(request));
        trigger(
            "ecommerce_without_3ds",
            25,
            is_ecommerce_without_3ds(request, card),
        );

        let score = score.min(MAX_SCORE);

        let (level, recommendation, reason) = if score >= self.config.decline_threshold {
            (
                RiskLevel::High,
                Recommendation::Decline,
                "Transaction appears to be high risk",
            )
        } else if score >= self.config.challenge_threshold {
            (
                RiskLevel::Medium,
                Recommendation::Challenge,
                "Additional verification recommended",
            )
        } else {
            (
                RiskLevel::Low,
                Recommendation::Approve,
                "Transaction appears normal",
            )
        };

        RiskAssessment {
            score,
            level,
            recommendation,
            triggered_rules: triggered,
            reason: reason.to_string(),
        }
    }

    fn is_high_value(&self, request: &AuthorizationRequest) -> bool {
        let threshold = self.config.high_value_threshold(request.currency.code());
        request.amount.value() >= threshold
    }

    fn is_high_risk_mcc(&self, request: &AuthorizationRequest) -> bool {
        match &request.mcc {
            Some(mcc) if !mcc.is_empty() => self.config.high_risk_mccs.contains(mcc),
            _ => false,
        }
    }

    fn is_high_risk_country(&self, request: &AuthorizationRequest) -> bool {
        match &request.country_code {
            Some(country) if !country.is_empty() => {
                self.config.high_risk_countries.contains(country)
            }
            _ => false,
        }
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

/// Exact multiple of 100 and at least 500: a pattern seen in testing
/// stolen cards.
fn is_round_amount(request: &AuthorizationRequest) -> bool {
    request.amount.value() >= Decimal::new(500, 0)
        && request.amount.is_multiple_of(Decimal::new(100, 0))
}

/// Transaction country differs from the issuer country (both known).
fn is_unusual_country(request: &AuthorizationRequest, card: &CardDetails) -> bool {
    match (&request.country_code, &card.issuer_country) {
        (Some(request_country), Some(issuer_country))
            if !request_country.is_empty() && !issuer_country.is_empty() =>
        {
            request_country != issuer_country
        }
        _ => false,
    }
}

/// 01:00-05:59 local-to-issuer is the quiet window.
fn is_unusual_time(request: &AuthorizationRequest) -> bool {
    let hour = request.timestamp.hour();
    (1..=5).contains(&hour)
}

/// E-commerce without a usable 3-DS path: the card is not enrolled, or no
/// 3-DS data came with the request.
fn is_ecommerce_without_3ds(request: &AuthorizationRequest, card: &CardDetails) -> bool {
    request.channel == TransactionChannel::ECommerce
        && (!card.is_enrolled_in_3ds() || !request.has_three_ds_data())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_core::model::request::TransactionType;
    use cardgate_core::{Amount, Currency};
    use cardgate_directory::card_with;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn request(amount: Decimal) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: 123_456_789_012,
            masked_pan: "411111******1111".into(),
            pan_hash: Some("hash-1".into()),
            token: None,
            expiry_date: "12/28".into(),
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            channel: TransactionChannel::Pos,
            mcc: Some("5411".into()),
            country_code: Some("USA".into()),
            transaction_type: TransactionType::Purchase,
            amount: Amount::new(amount).unwrap(),
            currency: Currency::Usd,
            // Midday, well outside the quiet window.
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap(),
            cryptogram: None,
            pin_data: None,
            three_ds_data: None,
            additional_data: None,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_risk_transaction() {
        let engine = RiskEngine::default();
        let assessment = engine.assess(&request(dec!(50)), &card_with("hash-1", |_| {}));

        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.recommendation, Recommendation::Approve);
        assert!(assessment.triggered_rules.is_empty());
    }

    #[test]
    fn test_high_value_rule() {
        let engine = RiskEngine::default();
        let assessment = engine.assess(&request(dec!(2000.55)), &card_with("hash-1", |_| {}));

        assert!(assessment.triggered("high_value_transaction"));
        assert_eq!(assessment.score, 20);
    }

    #[test]
    fn test_high_value_thresholds_per_currency() {
        let engine = RiskEngine::default();

        let mut eur = request(dec!(950));
        eur.currency = Currency::Eur;
        let assessment = engine.assess(&eur, &card_with("hash-1", |_| {}));
        assert!(assessment.triggered("high_value_transaction"));

        let mut eur_low = request(dec!(850.01));
        eur_low.currency = Currency::Eur;
        let assessment = engine.assess(&eur_low, &card_with("hash-1", |_| {}));
        assert!(!assessment.triggered("high_value_transaction"));
    }

    #[test]
    fn test_round_amount_rule() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        // 500 is both high-value-adjacent and round: only round fires at
        // this amount in USD (threshold 1000).
        let assessment = engine.assess(&request(dec!(500)), &card);
        assert!(assessment.triggered("round_amount"));
        assert_eq!(assessment.score, 5);

        // 400 is round but under the floor.
        let assessment = engine.assess(&request(dec!(400)), &card);
        assert!(!assessment.triggered("round_amount"));

        // 550 is no multiple of 100.
        let assessment = engine.assess(&request(dec!(550)), &card);
        assert!(!assessment.triggered("round_amount"));
    }

    #[test]
    fn test_unusual_country_rule() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        let mut abroad = request(dec!(50));
        abroad.country_code = Some("FRA".into());
        let assessment = engine.assess(&abroad, &card);
        assert!(assessment.triggered("unusual_country"));
        assert_eq!(assessment.score, 30);

        // Unknown country on either side: rule cannot fire.
        let mut unknown = request(dec!(50));
        unknown.country_code = None;
        assert!(!engine
            .assess(&unknown, &card)
            .triggered("unusual_country"));
    }

    #[test]
    fn test_high_risk_mcc_rule() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        let mut gambling = request(dec!(50));
        gambling.mcc = Some("7995".into());
        let assessment = engine.assess(&gambling, &card);
        assert!(assessment.triggered("unusual_merchant_category"));
        assert_eq!(assessment.score, 15);
    }

    #[test]
    fn test_high_risk_country_set_from_config() {
        let mut config = RiskConfig::default();
        config.high_risk_countries.insert("RUS".into());
        let engine = RiskEngine::new(config);
        let card = card_with("hash-1", |c| c.issuer_country = Some("RUS".into()));

        let mut risky = request(dec!(50));
        risky.country_code = Some("RUS".into());
        let assessment = engine.assess(&risky, &card);
        // Same as issuer, so unusual_country stays quiet, but the
        // configured set fires.
        assert!(assessment.triggered("high_risk_country"));
        assert!(!assessment.triggered("unusual_country"));
    }

    #[test]
    fn test_unusual_time_rule() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        let mut night = request(dec!(50));
        night.timestamp = Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap();
        assert!(engine.assess(&night, &card).triggered("unusual_time"));

        let mut edge = request(dec!(50));
        edge.timestamp = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        assert!(!engine.assess(&edge, &card).triggered("unusual_time"));
    }

    #[test]
    fn test_ecommerce_without_3ds_rule() {
        let engine = RiskEngine::default();

        let mut online = request(dec!(50));
        online.channel = TransactionChannel::ECommerce;

        // Enrolled card, but no 3-DS data on the request.
        let enrolled = card_with("hash-1", |_| {});
        assert!(engine
            .assess(&online, &enrolled)
            .triggered("ecommerce_without_3ds"));

        // Enrolled card with 3-DS data: quiet.
        let mut with_data = online.clone();
        with_data.three_ds_data = Some("eyJ0aHJlZURT...".into());
        assert!(!engine
            .assess(&with_data, &enrolled)
            .triggered("ecommerce_without_3ds"));

        // Unenrolled card fires even with data present.
        let unenrolled = card_with("hash-1", |c| {
            c.three_ds_enrollment_status = Some("N".into());
        });
        assert!(engine
            .assess(&with_data, &unenrolled)
            .triggered("ecommerce_without_3ds"));
    }

    #[test]
    fn test_challenge_band() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        // E-commerce without 3-DS (+25), abroad (+30), high value (+20):
        // 75 lands in the challenge band.
        let mut risky = request(dec!(1500.55));
        risky.channel = TransactionChannel::ECommerce;
        risky.country_code = Some("FRA".into());
        let assessment = engine.assess(&risky, &card);

        assert_eq!(assessment.score, 75);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.recommendation, Recommendation::Challenge);
    }

    #[test]
    fn test_decline_band_and_score_cap() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});

        // Abroad (+30), gambling MCC (+15), night (+10), e-commerce
        // without 3-DS (+25), high value (+20), round (+5): raw 105,
        // capped at 100.
        let mut risky = request(dec!(2000));
        risky.channel = TransactionChannel::ECommerce;
        risky.country_code = Some("FRA".into());
        risky.mcc = Some("7995".into());
        risky.timestamp = Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap();
        let assessment = engine.assess(&risky, &card);

        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.recommendation, Recommendation::Decline);
        assert_eq!(assessment.triggered_rules.len(), 6);
    }

    #[test]
    fn test_determinism() {
        let engine = RiskEngine::default();
        let card = card_with("hash-1", |_| {});
        let request = request(dec!(1500.55));

        let a = engine.assess(&request, &card);
        let b = engine.assess(&request, &card);
        assert_eq!(a.score, b.score);
        assert_eq!(a.triggered_rules, b.triggered_rules);
    }
}
