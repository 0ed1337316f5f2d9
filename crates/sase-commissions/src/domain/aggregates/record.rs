//! Commission Record Aggregate
//!
//! The computed obligation for one (event, assignment) pair. The record's
//! status is the source of truth for where the money stands; tracking rows
//! and audit approval fields follow it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::assignment::CommissionType;
use crate::domain::aggregates::tracking::TrackingType;
use crate::domain::events::{DomainEvent, RecordEvent};
use crate::domain::value_objects::{EntityId, Money, MoneyError, OrganizationId, Rate};

/// Current layout version of [`CalculationDetails`]
pub const CALCULATION_DETAILS_VERSION: u16 = 1;

/// Commission obligation state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    InitialSubscription,
    RenewalSubscription,
    TrailingSubscription,
    PercentageGross,
    PercentageProfit,
    FixedAmount,
    ChallengeBonus,
}

impl CalculationMethod {
    /// Fixed amounts are not derived from `base × rate`
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::FixedAmount | Self::ChallengeBonus)
    }
}

/// How a commission amount was derived
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationDetails {
    RecurringSubscription {
        version: u16,
        rule_id: EntityId,
        subscription_id: EntityId,
        period_number: u32,
        tracking_type: TrackingType,
        /// Multiplier applied to the renewal rate inside the trailing window
        trailing_rate_factor: Option<Decimal>,
    },
    Opportunity {
        version: u16,
        rule_id: Option<EntityId>,
        opportunity_id: EntityId,
        commission_type: CommissionType,
        stage_id: Option<EntityId>,
        margin_percentage: Option<Decimal>,
    },
    ManualBonus {
        version: u16,
        note: Option<String>,
    },
}

impl CalculationDetails {
    pub fn method(&self) -> CalculationMethod {
        match self {
            Self::RecurringSubscription { tracking_type, .. } => match tracking_type {
                TrackingType::Initial => CalculationMethod::InitialSubscription,
                TrackingType::Renewal => CalculationMethod::RenewalSubscription,
                TrackingType::Trailing => CalculationMethod::TrailingSubscription,
            },
            Self::Opportunity { commission_type, .. } => match commission_type {
                CommissionType::PercentageGross => CalculationMethod::PercentageGross,
                CommissionType::PercentageProfit => CalculationMethod::PercentageProfit,
                CommissionType::FixedAmount => CalculationMethod::FixedAmount,
            },
            Self::ManualBonus { .. } => CalculationMethod::ChallengeBonus,
        }
    }

    /// Rule the calculation read, if any
    pub fn rule_id(&self) -> Option<&EntityId> {
        match self {
            Self::RecurringSubscription { rule_id, .. } => Some(rule_id),
            Self::Opportunity { rule_id, .. } => rule_id.as_ref(),
            Self::ManualBonus { .. } => None,
        }
    }
}

/// Identity of a new record
#[derive(Clone, Debug)]
pub struct RecordOwner {
    pub organization_id: OrganizationId,
    pub event_id: EntityId,
    pub assignment_id: EntityId,
    pub user_id: EntityId,
}

/// Commission record aggregate root
#[derive(Clone, Debug, Serialize)]
pub struct CommissionRecord {
    id: EntityId,
    organization_id: OrganizationId,
    event_id: EntityId,
    assignment_id: EntityId,
    user_id: EntityId,
    base_amount: Money,
    commission_rate: Rate,
    commission_amount: Money,
    calculation_method: CalculationMethod,
    calculation_details: CalculationDetails,
    status: CommissionStatus,
    is_due_for_payout: bool,
    approved_by: Option<EntityId>,
    approved_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl CommissionRecord {
    /// Rate-based record: amount is `round(base × rate / 100)`
    pub fn calculated(
        owner: RecordOwner,
        base_amount: Money,
        commission_rate: Rate,
        details: CalculationDetails,
    ) -> Result<Self, RecordError> {
        if details.method().is_fixed() {
            return Err(RecordError::MethodMismatch(details.method()));
        }
        let amount = commission_rate.apply_to(base_amount)?;
        Ok(Self::build(owner, base_amount, commission_rate, amount, details))
    }

    /// Fixed-amount record (bonuses, flat fees). The rate is recorded as zero.
    pub fn fixed(
        owner: RecordOwner,
        base_amount: Money,
        commission_amount: Money,
        details: CalculationDetails,
    ) -> Result<Self, RecordError> {
        if !details.method().is_fixed() {
            return Err(RecordError::MethodMismatch(details.method()));
        }
        Ok(Self::build(owner, base_amount, Rate::zero(), commission_amount.rounded(), details))
    }

    fn build(
        owner: RecordOwner,
        base_amount: Money,
        commission_rate: Rate,
        commission_amount: Money,
        details: CalculationDetails,
    ) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: EntityId::new(),
            organization_id: owner.organization_id,
            event_id: owner.event_id,
            assignment_id: owner.assignment_id,
            user_id: owner.user_id,
            base_amount,
            commission_rate,
            commission_amount,
            calculation_method: details.method(),
            calculation_details: details,
            status: CommissionStatus::Pending,
            is_due_for_payout: false,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };

        record.raise_event(DomainEvent::Record(RecordEvent::Recorded {
            record_id: record.id.clone(),
            event_id: record.event_id.clone(),
            user_id: record.user_id.clone(),
            commission_amount,
            recorded_at: now,
        }));

        record
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn organization_id(&self) -> &OrganizationId { &self.organization_id }
    pub fn event_id(&self) -> &EntityId { &self.event_id }
    pub fn assignment_id(&self) -> &EntityId { &self.assignment_id }
    pub fn user_id(&self) -> &EntityId { &self.user_id }
    pub fn base_amount(&self) -> Money { self.base_amount }
    pub fn commission_rate(&self) -> Rate { self.commission_rate }
    pub fn commission_amount(&self) -> Money { self.commission_amount }
    pub fn calculation_method(&self) -> CalculationMethod { self.calculation_method }
    pub fn calculation_details(&self) -> &CalculationDetails { &self.calculation_details }
    pub fn status(&self) -> CommissionStatus { self.status }
    pub fn is_due_for_payout(&self) -> bool { self.is_due_for_payout }
    pub fn approved_by(&self) -> Option<&EntityId> { self.approved_by.as_ref() }
    pub fn approved_at(&self) -> Option<DateTime<Utc>> { self.approved_at }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> { self.paid_at }

    /// `commission_amount == round(base × rate / 100)` for rate-based methods
    pub fn amount_matches_rate(&self) -> bool {
        self.calculation_method.is_fixed()
            || self.commission_rate.apply_to(self.base_amount) == Ok(self.commission_amount)
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Approve for payout. Re-approving an approved record restamps it.
    pub fn approve(&mut self, approver: EntityId, at: DateTime<Utc>) -> Result<(), RecordError> {
        if self.status == CommissionStatus::Paid {
            return Err(RecordError::AlreadyPaid);
        }

        self.status = CommissionStatus::Approved;
        self.approved_by = Some(approver.clone());
        self.approved_at = Some(at);
        self.updated_at = at;

        self.raise_event(DomainEvent::Record(RecordEvent::Approved {
            record_id: self.id.clone(),
            approved_by: approver,
            approved_at: at,
        }));

        Ok(())
    }

    /// The underlying period was earned; money is now owed.
    pub fn mark_due(&mut self, at: DateTime<Utc>) -> Result<(), RecordError> {
        if self.status == CommissionStatus::Paid {
            return Err(RecordError::AlreadyPaid);
        }

        self.is_due_for_payout = true;
        self.updated_at = at;

        self.raise_event(DomainEvent::Record(RecordEvent::DueForPayout {
            record_id: self.id.clone(),
            due_at: at,
        }));

        Ok(())
    }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> Result<(), RecordError> {
        if self.status == CommissionStatus::Paid {
            return Err(RecordError::AlreadyPaid);
        }

        self.status = CommissionStatus::Paid;
        self.is_due_for_payout = false;
        self.paid_at = Some(at);
        self.updated_at = at;

        self.raise_event(DomainEvent::Record(RecordEvent::Paid {
            record_id: self.id.clone(),
            paid_at: at,
        }));

        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("commission has already been paid")]
    AlreadyPaid,
    #[error("calculation method {0:?} does not match the record kind")]
    MethodMismatch(CalculationMethod),
    #[error("commission amount: {0}")]
    Amount(#[from] MoneyError),
}
