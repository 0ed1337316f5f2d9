//! Commission Assignment Aggregate
//!
//! Standing rule that binds a payee to an opportunity or a product. Never
//! hard-deleted: deactivation keeps the row so historical records still
//! resolve their owner.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::catalog::PipelineStage;
use crate::domain::events::{AssignmentEvent, DomainEvent};
use crate::domain::value_objects::{EntityId, OrganizationId};

/// What an assignment pays out on
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AssignmentTarget {
    Opportunity(EntityId),
    Product(EntityId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    PercentageGross,
    PercentageProfit,
    FixedAmount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRequirement {
    /// Current stage is at or past the required one
    Reached,
    /// Current stage is exactly the required one
    Exact,
}

/// Pipeline-stage gate on an opportunity assignment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGate {
    pub required_stage_id: EntityId,
    pub requirement: StageRequirement,
}

impl StageGate {
    /// `required` is the directory entry for `required_stage_id`, if known.
    /// Unknown stages never satisfy a `Reached` gate.
    pub fn is_satisfied(&self, current: Option<&PipelineStage>, required: Option<&PipelineStage>) -> bool {
        let Some(current) = current else {
            return false;
        };
        match self.requirement {
            StageRequirement::Exact => current.id == self.required_stage_id,
            StageRequirement::Reached => required
                .map(|required| current.has_reached(required))
                .unwrap_or(false),
        }
    }
}

/// Input for [`CommissionAssignment::create`]
#[derive(Clone, Debug)]
pub struct NewAssignment {
    pub organization_id: OrganizationId,
    pub user_id: EntityId,
    pub target: AssignmentTarget,
    pub commission_type: CommissionType,
    pub base_rate: Decimal,
    pub stage_gate: Option<StageGate>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Commission assignment aggregate root
#[derive(Clone, Debug, Serialize)]
pub struct CommissionAssignment {
    id: EntityId,
    organization_id: OrganizationId,
    user_id: EntityId,
    target: AssignmentTarget,
    commission_type: CommissionType,
    base_rate: Decimal,
    stage_gate: Option<StageGate>,
    is_active: bool,
    is_disabled: bool,
    expiry_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl CommissionAssignment {
    /// Create a new active assignment
    pub fn create(new: NewAssignment) -> Result<Self, AssignmentError> {
        if new.base_rate.is_sign_negative() && !new.base_rate.is_zero() {
            return Err(AssignmentError::NegativeBaseRate);
        }
        if new.commission_type != CommissionType::FixedAmount && new.base_rate > Decimal::ONE_HUNDRED {
            return Err(AssignmentError::RateAboveHundred(new.base_rate));
        }
        if new.stage_gate.is_some() && !matches!(new.target, AssignmentTarget::Opportunity(_)) {
            return Err(AssignmentError::StageGateOnProduct);
        }

        let now = Utc::now();
        let mut assignment = Self {
            id: EntityId::new(),
            organization_id: new.organization_id,
            user_id: new.user_id,
            target: new.target,
            commission_type: new.commission_type,
            base_rate: new.base_rate,
            stage_gate: new.stage_gate,
            is_active: true,
            is_disabled: false,
            expiry_date: new.expiry_date,
            created_at: now,
            updated_at: now,
            events: vec![],
        };

        assignment.raise_event(DomainEvent::Assignment(AssignmentEvent::Created {
            assignment_id: assignment.id.clone(),
            user_id: assignment.user_id.clone(),
            created_at: now,
        }));

        Ok(assignment)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn organization_id(&self) -> &OrganizationId { &self.organization_id }
    pub fn user_id(&self) -> &EntityId { &self.user_id }
    pub fn target(&self) -> &AssignmentTarget { &self.target }
    pub fn commission_type(&self) -> CommissionType { self.commission_type }
    pub fn base_rate(&self) -> Decimal { self.base_rate }
    pub fn stage_gate(&self) -> Option<&StageGate> { self.stage_gate.as_ref() }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn is_disabled(&self) -> bool { self.is_disabled }
    pub fn expiry_date(&self) -> Option<DateTime<Utc>> { self.expiry_date }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn opportunity_id(&self) -> Option<&EntityId> {
        match &self.target {
            AssignmentTarget::Opportunity(id) => Some(id),
            AssignmentTarget::Product(_) => None,
        }
    }

    pub fn product_id(&self) -> Option<&EntityId> {
        match &self.target {
            AssignmentTarget::Product(id) => Some(id),
            AssignmentTarget::Opportunity(_) => None,
        }
    }

    /// Active, not disabled, and not past its expiry at `at`
    pub fn is_usable_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active
            && !self.is_disabled
            && self.expiry_date.map(|expiry| expiry > at).unwrap_or(true)
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Soft delete
    pub fn deactivate(&mut self, at: DateTime<Utc>) -> Result<(), AssignmentError> {
        if !self.is_active {
            return Err(AssignmentError::AlreadyInactive);
        }

        self.is_active = false;
        self.expiry_date = Some(at);
        self.updated_at = at;

        self.raise_event(DomainEvent::Assignment(AssignmentEvent::Deactivated {
            assignment_id: self.id.clone(),
            deactivated_at: at,
        }));

        Ok(())
    }

    /// Pause payouts without ending the assignment
    pub fn set_disabled(&mut self, disabled: bool) {
        self.is_disabled = disabled;
        self.updated_at = Utc::now();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("base rate cannot be negative")]
    NegativeBaseRate,
    #[error("percentage base rate cannot exceed 100: {0}")]
    RateAboveHundred(Decimal),
    #[error("stage gating only applies to opportunity assignments")]
    StageGateOnProduct,
    #[error("assignment is already inactive")]
    AlreadyInactive,
}
