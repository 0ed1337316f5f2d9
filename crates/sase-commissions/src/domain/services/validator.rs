//! Commission validator
//!
//! Read-only rules engine. Each check group inspects the joined record and
//! appends its own checks; the overall status is the most severe check.
//! Failures are data, not errors.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{
    CalculationDetails, CalculationMethod, CheckStatus, CommissionEvent, CommissionRecord, Product,
    ProductCommissionRule, ValidationCheck, ValidationStatus,
};
use crate::domain::value_objects::Money;

/// Check names as persisted in audit rows
pub mod checks {
    pub const PRODUCT_ACTIVE: &str = "product_active";
    pub const PRODUCT_RULE: &str = "product_rule";
    pub const MANAGER_APPROVAL: &str = "manager_approval";
    pub const MARGIN_LIMIT: &str = "margin_limit";
    pub const MINIMUM_SALE_AMOUNT: &str = "minimum_sale_amount";
    pub const MAXIMUM_COMMISSION_AMOUNT: &str = "maximum_commission_amount";
    pub const DUPLICATE_COMMISSION: &str = "duplicate_commission";
    pub const PRODUCT_AVAILABILITY: &str = "product_availability";
}

/// Everything the validator reads about one record
#[derive(Clone, Copy, Debug)]
pub struct ValidationContext<'a> {
    pub record: &'a CommissionRecord,
    pub event: &'a CommissionEvent,
    pub product: Option<&'a Product>,
    pub rule: Option<&'a ProductCommissionRule>,
    /// Other records that reference the same event
    pub other_records: &'a [CommissionRecord],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub requires_approval: bool,
    pub checks: Vec<ValidationCheck>,
    pub can_proceed: bool,
    pub suggested_actions: Vec<String>,
}

impl ValidationResult {
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

pub struct CommissionValidator;

impl CommissionValidator {
    pub fn validate(ctx: &ValidationContext<'_>) -> ValidationResult {
        let mut checks = Vec::new();

        let requires_approval = Self::product_rule_checks(ctx, &mut checks);
        Self::margin_checks(ctx, &mut checks);
        Self::amount_checks(ctx, &mut checks);
        Self::duplicate_checks(ctx, &mut checks);
        Self::availability_checks(ctx, &mut checks);

        let status: ValidationStatus = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Passed)
            .into();

        let suggested_actions = checks
            .iter()
            .filter(|c| c.status != CheckStatus::Passed)
            .map(|c| Self::suggested_action(&c.name).to_string())
            .collect();

        ValidationResult {
            status,
            requires_approval,
            can_proceed: status != ValidationStatus::Failed,
            checks,
            suggested_actions,
        }
    }

    /// Returns whether manager approval is required.
    fn product_rule_checks(ctx: &ValidationContext<'_>, checks: &mut Vec<ValidationCheck>) -> bool {
        match ctx.product {
            Some(product) if product.is_active => {
                checks.push(ValidationCheck::passed(checks::PRODUCT_ACTIVE, "product is active"));
            }
            Some(product) => {
                checks.push(ValidationCheck::failed(
                    checks::PRODUCT_ACTIVE,
                    format!("product {} is inactive", product.name),
                ));
            }
            None => {
                checks.push(ValidationCheck::failed(checks::PRODUCT_ACTIVE, "product not found in catalog"));
            }
        }

        let Some(rule) = ctx.rule else {
            if ctx.record.calculation_method() == CalculationMethod::ChallengeBonus {
                checks.push(ValidationCheck::passed(checks::PRODUCT_RULE, "manual bonus needs no product rule"));
            } else {
                checks.push(ValidationCheck::failed(checks::PRODUCT_RULE, "no active commission rule for product"));
            }
            return false;
        };

        // Retiring a rule does not change the verdict on records it priced
        if !rule.is_active {
            checks.push(ValidationCheck::warning(
                checks::PRODUCT_RULE,
                "commission was calculated under a rule that has since been retired",
            ));
        } else {
            checks.push(ValidationCheck::passed(checks::PRODUCT_RULE, "commission rule is active"));
        }

        let amount = ctx.record.commission_amount();
        let requires_approval = rule.requires_approval_for(amount);
        if requires_approval {
            let message = match rule.approval_threshold {
                Some(threshold) if amount > threshold => {
                    format!("commission {amount} exceeds approval threshold {threshold}")
                }
                _ => "product requires manager approval".to_string(),
            };
            checks.push(ValidationCheck::passed(checks::MANAGER_APPROVAL, message));
        }

        requires_approval
    }

    fn margin_checks(ctx: &ValidationContext<'_>, checks: &mut Vec<ValidationCheck>) {
        let Some(max_allowed) = ctx.rule.and_then(|r| r.max_allowed_rate()) else {
            return;
        };
        let Some(rate) = Self::rate_on_sale(ctx.record) else {
            return;
        };

        if rate > max_allowed {
            checks.push(ValidationCheck::warning(
                checks::MARGIN_LIMIT,
                format!(
                    "rate {}% exceeds margin allowance {}%",
                    rate.normalize(),
                    max_allowed.normalize()
                ),
            ));
        } else {
            checks.push(ValidationCheck::passed(checks::MARGIN_LIMIT, "rate within margin allowance"));
        }
    }

    fn amount_checks(ctx: &ValidationContext<'_>, checks: &mut Vec<ValidationCheck>) {
        let Some(rule) = ctx.rule else {
            return;
        };

        if let Some(min) = rule.min_sale_amount {
            let sale = ctx.event.event_amount();
            if sale < min {
                checks.push(ValidationCheck::failed(
                    checks::MINIMUM_SALE_AMOUNT,
                    format!("sale amount {sale} is below minimum {min}"),
                ));
            } else {
                checks.push(ValidationCheck::passed(checks::MINIMUM_SALE_AMOUNT, "sale meets minimum amount"));
            }
        }

        if let Some(max) = rule.max_commission_amount {
            let amount = ctx.record.commission_amount();
            if amount > max {
                checks.push(ValidationCheck::warning(
                    checks::MAXIMUM_COMMISSION_AMOUNT,
                    format!("commission {amount} exceeds maximum {max}"),
                ));
            } else {
                checks.push(ValidationCheck::passed(
                    checks::MAXIMUM_COMMISSION_AMOUNT,
                    "commission within maximum amount",
                ));
            }
        }
    }

    fn duplicate_checks(ctx: &ValidationContext<'_>, checks: &mut Vec<ValidationCheck>) {
        let others: Vec<&CommissionRecord> = ctx
            .other_records
            .iter()
            .filter(|r| r.id() != ctx.record.id() && r.event_id() == ctx.record.event_id())
            .collect();

        if others.is_empty() {
            checks.push(ValidationCheck::passed(checks::DUPLICATE_COMMISSION, "no other commissions for this event"));
            return;
        }

        let total: Money = others.iter().map(|r| r.commission_amount()).sum();
        checks.push(ValidationCheck::warning(
            checks::DUPLICATE_COMMISSION,
            format!("{} other commission(s) totalling {} reference this event", others.len(), total),
        ));
    }

    fn availability_checks(ctx: &ValidationContext<'_>, checks: &mut Vec<ValidationCheck>) {
        let Some(product) = ctx.product else {
            return;
        };

        if product.created_at > ctx.event.event_date() {
            checks.push(ValidationCheck::failed(
                checks::PRODUCT_AVAILABILITY,
                format!(
                    "product created {} after sale date {}",
                    product.created_at.format("%Y-%m-%d"),
                    ctx.event.event_date().format("%Y-%m-%d")
                ),
            ));
        } else {
            checks.push(ValidationCheck::passed(checks::PRODUCT_AVAILABILITY, "product existed at sale date"));
        }
    }

    /// Commission rate expressed against the sale amount. `None` for fixed amounts.
    fn rate_on_sale(record: &CommissionRecord) -> Option<Decimal> {
        let rate = record.commission_rate().percent();
        match (record.calculation_method(), record.calculation_details()) {
            (method, _) if method.is_fixed() => None,
            (
                CalculationMethod::PercentageProfit,
                CalculationDetails::Opportunity { margin_percentage: Some(margin), .. },
            ) => rate.checked_mul(*margin).and_then(|product| product.checked_div(Decimal::ONE_HUNDRED)),
            _ => Some(rate),
        }
    }

    fn suggested_action(check: &str) -> &'static str {
        match check {
            checks::PRODUCT_ACTIVE => "Reactivate the product or void this commission",
            checks::PRODUCT_RULE => "Configure an active commission rule for the product",
            checks::MARGIN_LIMIT => "Review the rate against the product margin",
            checks::MINIMUM_SALE_AMOUNT => "Void the commission or override with a documented reason",
            checks::MAXIMUM_COMMISSION_AMOUNT => "Confirm the amount with a manager before payout",
            checks::DUPLICATE_COMMISSION => "Check the other commissions on this event for double payment",
            checks::PRODUCT_AVAILABILITY => "Correct the sale date or the product creation date",
            _ => "Review this commission",
        }
    }
}
