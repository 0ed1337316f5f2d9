//! Subscription lifecycle tracker
//!
//! Period numbers are recomputed from the full lifecycle history on every
//! call. There is no counter to drift or to rebuild after a crash.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::{LifecycleEventType, SubscriptionLifecycleEvent};
use crate::domain::value_objects::{EntityId, Money, OrganizationId};

pub struct SubscriptionLifecycleTracker;

impl SubscriptionLifecycleTracker {
    /// Period number of the charge about to be processed.
    ///
    /// The first charge (no `created` event yet) is period 1. Every later
    /// charge is itself a renewal, so its period is the prior renewals plus
    /// the current one plus one.
    pub fn period_number(history: &[SubscriptionLifecycleEvent]) -> u32 {
        let renewals = history
            .iter()
            .filter(|e| e.event_type == LifecycleEventType::Renewed)
            .count() as u32;
        let created = history.iter().any(|e| e.event_type == LifecycleEventType::Created);

        if created {
            renewals + 2
        } else {
            renewals + 1
        }
    }

    /// The event to append once the current charge has been priced.
    /// Must be built from the same history the period number was read from.
    pub fn next_event(
        organization_id: OrganizationId,
        subscription_id: EntityId,
        history: &[SubscriptionLifecycleEvent],
        mrr_amount: Money,
        at: DateTime<Utc>,
    ) -> SubscriptionLifecycleEvent {
        let created = history.iter().any(|e| e.event_type == LifecycleEventType::Created);
        SubscriptionLifecycleEvent {
            id: EntityId::new(),
            organization_id,
            subscription_id,
            event_type: if created {
                LifecycleEventType::Renewed
            } else {
                LifecycleEventType::Created
            },
            event_date: at,
            mrr_amount,
            period_number: Self::period_number(history),
        }
    }
}
