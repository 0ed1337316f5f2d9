//! Product Commission Rule
//!
//! Per-product rate schedule and guard rails. Rules are configuration: once a
//! commission record references a rule it is never edited, a new row with a
//! higher priority supersedes it instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, Money, OrganizationId, Rate};

/// How recurring revenue keeps paying commission after the first payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MrrCommissionType {
    FirstPaymentOnly,
    Duration,
    Trailing,
}

/// Product commission rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductCommissionRule {
    pub id: EntityId,
    pub organization_id: OrganizationId,
    pub product_id: EntityId,
    pub priority: i32,
    pub initial_sale_rate: Rate,
    pub renewal_rate: Rate,
    pub mrr_commission_type: Option<MrrCommissionType>,
    pub mrr_duration_months: u32,
    pub trailing_months: u32,
    pub min_sale_amount: Option<Money>,
    pub max_commission_amount: Option<Money>,
    pub estimated_margin_percentage: Option<Decimal>,
    pub max_commission_of_margin: Option<Decimal>,
    pub requires_manager_approval: bool,
    pub approval_threshold: Option<Money>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductCommissionRule {
    /// Active rule with no recurring policy and no limits
    pub fn new(
        organization_id: OrganizationId,
        product_id: EntityId,
        initial_sale_rate: Rate,
        renewal_rate: Rate,
    ) -> Self {
        Self {
            id: EntityId::new(),
            organization_id,
            product_id,
            priority: 0,
            initial_sale_rate,
            renewal_rate,
            mrr_commission_type: None,
            mrr_duration_months: 0,
            trailing_months: 0,
            min_sale_amount: None,
            max_commission_amount: None,
            estimated_margin_percentage: None,
            max_commission_of_margin: None,
            requires_manager_approval: false,
            approval_threshold: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_mrr_policy(mut self, kind: MrrCommissionType, duration_months: u32, trailing_months: u32) -> Self {
        self.mrr_commission_type = Some(kind);
        self.mrr_duration_months = duration_months;
        self.trailing_months = trailing_months;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Highest rate the margin allows, as a percentage of the sale.
    pub fn max_allowed_rate(&self) -> Option<Decimal> {
        match (self.estimated_margin_percentage, self.max_commission_of_margin) {
            (Some(margin), Some(share)) => margin
                .checked_mul(share)
                .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED)),
            _ => None,
        }
    }

    /// Manager sign-off is needed for this commission amount
    pub fn requires_approval_for(&self, commission_amount: Money) -> bool {
        self.requires_manager_approval
            || self
                .approval_threshold
                .map(|threshold| commission_amount > threshold)
                .unwrap_or(false)
    }

    /// Pick the highest-priority active rule. Ties go to the newest row.
    pub fn select_active<'a, I>(rules: I) -> Option<&'a ProductCommissionRule>
    where
        I: IntoIterator<Item = &'a ProductCommissionRule>,
    {
        rules
            .into_iter()
            .filter(|r| r.is_active)
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rule(priority: i32, active: bool) -> ProductCommissionRule {
        let mut rule = ProductCommissionRule::new(
            OrganizationId::new("org"),
            EntityId::from_string("prod"),
            Rate::new(dec!(10)).unwrap(),
            Rate::new(dec!(5)).unwrap(),
        )
        .with_priority(priority);
        rule.is_active = active;
        rule
    }

    #[test]
    fn test_select_highest_priority_active() {
        let rules = vec![rule(1, true), rule(9, false), rule(5, true)];
        let selected = ProductCommissionRule::select_active(&rules).unwrap();
        assert_eq!(selected.priority, 5);
    }

    #[test]
    fn test_select_none_when_all_inactive() {
        let rules = vec![rule(1, false)];
        assert!(ProductCommissionRule::select_active(&rules).is_none());
    }

    #[test]
    fn test_max_allowed_rate() {
        let mut r = rule(0, true);
        assert_eq!(r.max_allowed_rate(), None);

        r.estimated_margin_percentage = Some(dec!(40));
        r.max_commission_of_margin = Some(dec!(25));
        assert_eq!(r.max_allowed_rate(), Some(dec!(10)));
    }

    #[test]
    fn test_requires_approval() {
        let mut r = rule(0, true);
        let amount = Money::new(dec!(500)).unwrap();
        assert!(!r.requires_approval_for(amount));

        r.approval_threshold = Some(Money::new(dec!(500)).unwrap());
        assert!(!r.requires_approval_for(amount));
        assert!(r.requires_approval_for(Money::new(dec!(500.01)).unwrap()));

        r.approval_threshold = None;
        r.requires_manager_approval = true;
        assert!(r.requires_approval_for(Money::zero()));
    }
}
