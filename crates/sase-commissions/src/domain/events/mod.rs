//! Domain Events
//!
//! Events raised by aggregates to communicate state changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::{EntityId, Money};

/// All domain events in the commissions bounded context
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Record(RecordEvent),
    Tracking(TrackingEvent),
    Assignment(AssignmentEvent),
    Subscription(SubscriptionEvent),
    Validation(ValidationEvent),
}

/// Commission record events
#[derive(Clone, Debug, Serialize)]
pub enum RecordEvent {
    Recorded {
        record_id: EntityId,
        event_id: EntityId,
        user_id: EntityId,
        commission_amount: Money,
        recorded_at: DateTime<Utc>,
    },

    Approved {
        record_id: EntityId,
        approved_by: EntityId,
        approved_at: DateTime<Utc>,
    },

    DueForPayout {
        record_id: EntityId,
        due_at: DateTime<Utc>,
    },

    Paid {
        record_id: EntityId,
        paid_at: DateTime<Utc>,
    },
}

/// Recurring tracking events
#[derive(Clone, Debug, Serialize)]
pub enum TrackingEvent {
    Opened {
        tracking_id: EntityId,
        subscription_id: EntityId,
        period_number: u32,
    },

    StatusChanged {
        tracking_id: EntityId,
        from: String,
        to: String,
        changed_at: DateTime<Utc>,
    },
}

/// Assignment events
#[derive(Clone, Debug, Serialize)]
pub enum AssignmentEvent {
    Created {
        assignment_id: EntityId,
        user_id: EntityId,
        created_at: DateTime<Utc>,
    },

    Deactivated {
        assignment_id: EntityId,
        deactivated_at: DateTime<Utc>,
    },
}

/// Subscription lifecycle events
#[derive(Clone, Debug, Serialize)]
pub enum SubscriptionEvent {
    CommissionNotDue {
        subscription_id: EntityId,
        period_number: u32,
        reason: String,
    },
}

/// Validation events
#[derive(Clone, Debug, Serialize)]
pub enum ValidationEvent {
    Completed {
        record_id: EntityId,
        audit_id: EntityId,
        status: String,
    },

    Overridden {
        record_id: EntityId,
        audit_id: EntityId,
        override_by: EntityId,
    },
}

impl DomainEvent {
    /// Get the aggregate ID this event belongs to
    pub fn aggregate_id(&self) -> &EntityId {
        match self {
            DomainEvent::Record(e) => match e {
                RecordEvent::Recorded { record_id, .. } => record_id,
                RecordEvent::Approved { record_id, .. } => record_id,
                RecordEvent::DueForPayout { record_id, .. } => record_id,
                RecordEvent::Paid { record_id, .. } => record_id,
            },
            DomainEvent::Tracking(e) => match e {
                TrackingEvent::Opened { tracking_id, .. } => tracking_id,
                TrackingEvent::StatusChanged { tracking_id, .. } => tracking_id,
            },
            DomainEvent::Assignment(e) => match e {
                AssignmentEvent::Created { assignment_id, .. } => assignment_id,
                AssignmentEvent::Deactivated { assignment_id, .. } => assignment_id,
            },
            DomainEvent::Subscription(e) => match e {
                SubscriptionEvent::CommissionNotDue { subscription_id, .. } => subscription_id,
            },
            DomainEvent::Validation(e) => match e {
                ValidationEvent::Completed { record_id, .. } => record_id,
                ValidationEvent::Overridden { record_id, .. } => record_id,
            },
        }
    }

    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::Record(e) => match e {
                RecordEvent::Recorded { .. } => "commission.recorded",
                RecordEvent::Approved { .. } => "commission.approved",
                RecordEvent::DueForPayout { .. } => "commission.due_for_payout",
                RecordEvent::Paid { .. } => "commission.paid",
            },
            DomainEvent::Tracking(e) => match e {
                TrackingEvent::Opened { .. } => "tracking.opened",
                TrackingEvent::StatusChanged { .. } => "tracking.status_changed",
            },
            DomainEvent::Assignment(e) => match e {
                AssignmentEvent::Created { .. } => "assignment.created",
                AssignmentEvent::Deactivated { .. } => "assignment.deactivated",
            },
            DomainEvent::Subscription(e) => match e {
                SubscriptionEvent::CommissionNotDue { .. } => "commission.not_due",
            },
            DomainEvent::Validation(e) => match e {
                ValidationEvent::Completed { .. } => "commission.validated",
                ValidationEvent::Overridden { .. } => "commission.validation_overridden",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_aggregate() {
        let id = EntityId::from_string("rec-1");
        let event = DomainEvent::Record(RecordEvent::Paid {
            record_id: id.clone(),
            paid_at: Utc::now(),
        });

        assert_eq!(event.event_type(), "commission.paid");
        assert_eq!(event.aggregate_id(), &id);
    }
}
