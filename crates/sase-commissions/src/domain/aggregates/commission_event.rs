//! Commission Event
//!
//! Immutable fact that something monetizable happened. Written once to the
//! ledger and never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, Money, OrganizationId};

/// Where a commission event originated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Subscription,
    Opportunity,
    Manual,
}

/// Input for [`CommissionEvent::record`]
#[derive(Clone, Debug)]
pub struct NewCommissionEvent {
    pub organization_id: OrganizationId,
    pub event_source: EventSource,
    pub event_type: String,
    pub product_id: EntityId,
    pub subscription_id: Option<EntityId>,
    pub opportunity_id: Option<EntityId>,
    pub contact_id: EntityId,
    pub event_amount: Money,
    pub event_date: DateTime<Utc>,
    pub event_data: serde_json::Value,
}

/// Commission event
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommissionEvent {
    id: EntityId,
    organization_id: OrganizationId,
    event_source: EventSource,
    event_type: String,
    product_id: EntityId,
    subscription_id: Option<EntityId>,
    opportunity_id: Option<EntityId>,
    contact_id: EntityId,
    event_amount: Money,
    event_date: DateTime<Utc>,
    event_data: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl CommissionEvent {
    /// Record a new event. Subscription and opportunity events must name
    /// the subscription or opportunity they belong to.
    pub fn record(new: NewCommissionEvent) -> Result<Self, CommissionEventError> {
        if new.event_type.trim().is_empty() {
            return Err(CommissionEventError::MissingEventType);
        }
        match new.event_source {
            EventSource::Subscription if new.subscription_id.is_none() => {
                return Err(CommissionEventError::MissingSubscription);
            }
            EventSource::Opportunity if new.opportunity_id.is_none() => {
                return Err(CommissionEventError::MissingOpportunity);
            }
            _ => {}
        }

        Ok(Self {
            id: EntityId::new(),
            organization_id: new.organization_id,
            event_source: new.event_source,
            event_type: new.event_type,
            product_id: new.product_id,
            subscription_id: new.subscription_id,
            opportunity_id: new.opportunity_id,
            contact_id: new.contact_id,
            event_amount: new.event_amount,
            event_date: new.event_date,
            event_data: new.event_data,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn organization_id(&self) -> &OrganizationId { &self.organization_id }
    pub fn event_source(&self) -> EventSource { self.event_source }
    pub fn event_type(&self) -> &str { &self.event_type }
    pub fn product_id(&self) -> &EntityId { &self.product_id }
    pub fn subscription_id(&self) -> Option<&EntityId> { self.subscription_id.as_ref() }
    pub fn opportunity_id(&self) -> Option<&EntityId> { self.opportunity_id.as_ref() }
    pub fn contact_id(&self) -> &EntityId { &self.contact_id }
    pub fn event_amount(&self) -> Money { self.event_amount }
    pub fn event_date(&self) -> DateTime<Utc> { self.event_date }
    pub fn event_data(&self) -> &serde_json::Value { &self.event_data }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommissionEventError {
    #[error("event type is required")]
    MissingEventType,
    #[error("subscription events require a subscription id")]
    MissingSubscription,
    #[error("opportunity events require an opportunity id")]
    MissingOpportunity,
}
