//! Subscription Lifecycle Event
//!
//! Append-only history of subscription transitions. The only source of
//! truth for period numbering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, Money, OrganizationId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
    Created,
    Renewed,
}

/// One lifecycle transition. `period_number` is the billing period the
/// transition opened; the store keeps it unique per subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLifecycleEvent {
    pub id: EntityId,
    pub organization_id: OrganizationId,
    pub subscription_id: EntityId,
    pub event_type: LifecycleEventType,
    pub event_date: DateTime<Utc>,
    pub mrr_amount: Money,
    pub period_number: u32,
}
