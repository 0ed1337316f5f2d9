//! Recurring tier calculator
//!
//! Maps a subscription period onto the rule's rate schedule.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{MrrCommissionType, ProductCommissionRule, TrackingType};
use crate::domain::value_objects::{Rate, RateError};

/// Renewal-rate multiplier inside the trailing window
pub const DEFAULT_TRAILING_RATE_FACTOR: Decimal = dec!(0.5);

/// Why a period pays nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotDueReason {
    FirstPaymentOnly,
    DurationExceeded,
}

impl NotDueReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::FirstPaymentOnly => "commission is paid on the first payment only",
            Self::DurationExceeded => "commission duration exceeded",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierDecision {
    Due { rate: Rate, tracking_type: TrackingType },
    NotDue(NotDueReason),
}

impl TierDecision {
    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due { .. })
    }
}

/// Stateless apart from the configured trailing factor
#[derive(Clone, Copy, Debug)]
pub struct RecurringTierCalculator {
    trailing_rate_factor: Decimal,
}

impl RecurringTierCalculator {
    pub fn new(trailing_rate_factor: Decimal) -> Result<Self, RateError> {
        if trailing_rate_factor.is_sign_negative() && !trailing_rate_factor.is_zero() {
            return Err(RateError::Negative(trailing_rate_factor));
        }
        if trailing_rate_factor > Decimal::ONE {
            return Err(RateError::FactorAboveOne(trailing_rate_factor));
        }
        Ok(Self { trailing_rate_factor })
    }

    pub fn trailing_rate_factor(&self) -> Decimal {
        self.trailing_rate_factor
    }

    /// `period_number` is 1-based; 0 is treated as the first payment.
    pub fn decide(&self, rule: &ProductCommissionRule, period_number: u32) -> TierDecision {
        if period_number <= 1 {
            return TierDecision::Due {
                rate: rule.initial_sale_rate,
                tracking_type: TrackingType::Initial,
            };
        }

        let renewal = TierDecision::Due {
            rate: rule.renewal_rate,
            tracking_type: TrackingType::Renewal,
        };

        match rule.mrr_commission_type {
            Some(MrrCommissionType::FirstPaymentOnly) => TierDecision::NotDue(NotDueReason::FirstPaymentOnly),
            Some(MrrCommissionType::Duration) if period_number > rule.mrr_duration_months => {
                TierDecision::NotDue(NotDueReason::DurationExceeded)
            }
            Some(MrrCommissionType::Trailing) => {
                let window_end = rule.mrr_duration_months.saturating_add(rule.trailing_months);
                if period_number > window_end {
                    TierDecision::NotDue(NotDueReason::DurationExceeded)
                } else if period_number > rule.mrr_duration_months {
                    TierDecision::Due {
                        rate: self.trailing_rate(rule.renewal_rate),
                        tracking_type: TrackingType::Trailing,
                    }
                } else {
                    renewal
                }
            }
            Some(MrrCommissionType::Duration) | None => renewal,
        }
    }

    fn trailing_rate(&self, renewal_rate: Rate) -> Rate {
        // The factor was checked to lie in [0, 1] in `new`.
        renewal_rate.scaled(self.trailing_rate_factor).unwrap_or(renewal_rate)
    }
}

impl Default for RecurringTierCalculator {
    fn default() -> Self {
        Self { trailing_rate_factor: DEFAULT_TRAILING_RATE_FACTOR }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EntityId, Money, OrganizationId};
    use proptest::prelude::*;

    fn rule(kind: Option<MrrCommissionType>, duration: u32, trailing: u32) -> ProductCommissionRule {
        let mut rule = ProductCommissionRule::new(
            OrganizationId::new("org"),
            EntityId::new(),
            Rate::new(dec!(10)).unwrap(),
            Rate::new(dec!(5)).unwrap(),
        );
        rule.mrr_commission_type = kind;
        rule.mrr_duration_months = duration;
        rule.trailing_months = trailing;
        rule
    }

    fn due(rate: Decimal, tracking_type: TrackingType) -> TierDecision {
        TierDecision::Due { rate: Rate::new(rate).unwrap(), tracking_type }
    }

    #[test]
    fn test_first_period_pays_initial_rate() {
        let calc = RecurringTierCalculator::default();
        for kind in [None, Some(MrrCommissionType::FirstPaymentOnly), Some(MrrCommissionType::Trailing)] {
            assert_eq!(calc.decide(&rule(kind, 0, 0), 1), due(dec!(10), TrackingType::Initial));
        }
    }

    #[test]
    fn test_no_policy_pays_renewal_forever() {
        let calc = RecurringTierCalculator::default();
        assert_eq!(calc.decide(&rule(None, 0, 0), 240), due(dec!(5), TrackingType::Renewal));
    }

    #[test]
    fn test_trailing_schedule() {
        let calc = RecurringTierCalculator::default();
        let r = rule(Some(MrrCommissionType::Trailing), 3, 2);
        let amount = Money::new(dec!(100)).unwrap();

        let paid: Vec<Option<Decimal>> = (1..=6)
            .map(|period| match calc.decide(&r, period) {
                TierDecision::Due { rate, .. } => Some(rate.apply_to(amount).unwrap().amount()),
                TierDecision::NotDue(_) => None,
            })
            .collect();

        assert_eq!(
            paid,
            vec![Some(dec!(10)), Some(dec!(5)), Some(dec!(5)), Some(dec!(2.50)), Some(dec!(2.50)), None]
        );
        assert_eq!(calc.decide(&r, 6), TierDecision::NotDue(NotDueReason::DurationExceeded));
    }

    #[test]
    fn test_configurable_trailing_factor() {
        let calc = RecurringTierCalculator::new(dec!(0.25)).unwrap();
        let r = rule(Some(MrrCommissionType::Trailing), 1, 1);
        assert_eq!(calc.decide(&r, 2), due(dec!(1.25), TrackingType::Trailing));
        assert!(RecurringTierCalculator::new(dec!(-0.5)).is_err());
        assert!(RecurringTierCalculator::new(dec!(1)).is_ok());
        assert!(RecurringTierCalculator::new(dec!(1.5)).is_err());
    }

    proptest! {
        #[test]
        fn prop_first_payment_only_never_renews(period in 2u32..10_000) {
            let calc = RecurringTierCalculator::default();
            let r = rule(Some(MrrCommissionType::FirstPaymentOnly), 12, 0);
            prop_assert_eq!(calc.decide(&r, period), TierDecision::NotDue(NotDueReason::FirstPaymentOnly));
        }

        #[test]
        fn prop_duration_boundary(n in 2u32..500) {
            let calc = RecurringTierCalculator::default();
            let r = rule(Some(MrrCommissionType::Duration), n, 0);
            prop_assert_eq!(calc.decide(&r, n), due(dec!(5), TrackingType::Renewal));
            prop_assert_eq!(calc.decide(&r, n + 1), TierDecision::NotDue(NotDueReason::DurationExceeded));
        }

        #[test]
        fn prop_trailing_window(n in 1u32..200, m in 1u32..200) {
            let calc = RecurringTierCalculator::default();
            let r = rule(Some(MrrCommissionType::Trailing), n, m);
            for period in (n + 1).max(2)..=(n + m) {
                prop_assert_eq!(calc.decide(&r, period), due(dec!(2.5), TrackingType::Trailing));
            }
            prop_assert_eq!(calc.decide(&r, n + m + 1), TierDecision::NotDue(NotDueReason::DurationExceeded));
        }

        #[test]
        fn prop_amount_is_rounded_rate_share(cents in 0u64..100_000_000, basis_points in 0u32..10_000) {
            let base = Money::from_cents(cents);
            let rate = Rate::new(Decimal::new(basis_points as i64, 2)).unwrap();
            let expected = (base.amount() * rate.percent() / dec!(100))
                .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
            prop_assert_eq!(rate.apply_to(base).unwrap().amount(), expected);
        }
    }
}
