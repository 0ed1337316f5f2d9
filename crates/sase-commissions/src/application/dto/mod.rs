//! Data Transfer Objects (DTOs)
//!
//! Objects for transferring data across boundaries. The organization id is
//! never part of a command body; callers pass it alongside.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{
    AssignmentTarget, CommissionEvent, CommissionRecord, CommissionType, EventSource, RecurringCommissionTracking,
    StageGate, TrackingStatus,
};
use crate::domain::services::NotDueReason;
use crate::domain::value_objects::EntityId;

// =============================================================================
// Commission Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordCommissionableEventCommand {
    pub event_source: EventSource,
    pub event_type: String,
    pub product_id: Option<EntityId>,
    pub contact_id: EntityId,
    pub amount: Option<Decimal>,
    pub subscription_id: Option<EntityId>,
    pub opportunity_id: Option<EntityId>,
    /// Opportunity's current pipeline stage, for stage-gated assignments
    pub current_stage_id: Option<EntityId>,
    pub assignment_id: Option<EntityId>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    /// Defaults to the time of recording
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_data: serde_json::Value,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateTrackingStatusCommand {
    pub status: TrackingStatus,
    pub earned_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Review Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApproveCommissionCommand {
    pub approver_id: EntityId,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverrideValidationCommand {
    pub override_by: EntityId,
    pub reason: String,
}

// =============================================================================
// Assignment Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateAssignmentCommand {
    pub user_id: EntityId,
    pub target: AssignmentTarget,
    pub commission_type: CommissionType,
    pub base_rate: Decimal,
    pub stage_gate: Option<StageGate>,
    pub expiry_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of recording a commissionable event
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommissionOutcome {
    Recorded {
        event: CommissionEvent,
        records: Vec<CommissionRecord>,
        tracking: Option<RecurringCommissionTracking>,
    },
    /// The rule's recurring policy pays nothing for this period
    NotDue {
        reason: NotDueReason,
        period_number: u32,
        message: String,
    },
}

impl CommissionOutcome {
    pub fn records(&self) -> &[CommissionRecord] {
        match self {
            Self::Recorded { records, .. } => records,
            Self::NotDue { .. } => &[],
        }
    }

    pub fn tracking(&self) -> Option<&RecurringCommissionTracking> {
        match self {
            Self::Recorded { tracking, .. } => tracking.as_ref(),
            Self::NotDue { .. } => None,
        }
    }
}
