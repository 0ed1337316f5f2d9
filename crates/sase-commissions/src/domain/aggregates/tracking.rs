//! Recurring Commission Tracking
//!
//! Schedule entry for one billing period of a subscription, linked 1:1 to
//! the commission record created for that period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::record::CommissionRecord;
use crate::domain::events::{DomainEvent, TrackingEvent};
use crate::domain::value_objects::{EntityId, Money, OrganizationId, Rate};

/// Rate tier a period was paid under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    Initial,
    Renewal,
    Trailing,
}

/// Ordered: a row only ever moves to a later status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Scheduled,
    Pending,
    Earned,
    Paid,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Pending => "pending",
            Self::Earned => "earned",
            Self::Paid => "paid",
        }
    }
}

/// Billing window covered by a tracking row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TrackingError> {
        if end <= start {
            return Err(TrackingError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }
}

/// Recurring commission tracking aggregate root
#[derive(Clone, Debug, Serialize)]
pub struct RecurringCommissionTracking {
    id: EntityId,
    organization_id: OrganizationId,
    commission_record_id: EntityId,
    subscription_id: EntityId,
    product_id: EntityId,
    tracking_type: TrackingType,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    period_number: u32,
    base_amount: Money,
    commission_rate: Rate,
    commission_amount: Money,
    status: TrackingStatus,
    earned_date: Option<DateTime<Utc>>,
    paid_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl RecurringCommissionTracking {
    /// Open a pending entry mirroring `record`'s amounts
    pub fn open(
        record: &CommissionRecord,
        subscription_id: EntityId,
        product_id: EntityId,
        tracking_type: TrackingType,
        period: BillingPeriod,
        period_number: u32,
    ) -> Self {
        let now = Utc::now();
        let mut tracking = Self {
            id: EntityId::new(),
            organization_id: record.organization_id().clone(),
            commission_record_id: record.id().clone(),
            subscription_id,
            product_id,
            tracking_type,
            period_start: period.start,
            period_end: period.end,
            period_number,
            base_amount: record.base_amount(),
            commission_rate: record.commission_rate(),
            commission_amount: record.commission_amount(),
            status: TrackingStatus::Pending,
            earned_date: None,
            paid_date: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };

        tracking.raise_event(DomainEvent::Tracking(TrackingEvent::Opened {
            tracking_id: tracking.id.clone(),
            subscription_id: tracking.subscription_id.clone(),
            period_number,
        }));

        tracking
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn organization_id(&self) -> &OrganizationId { &self.organization_id }
    pub fn commission_record_id(&self) -> &EntityId { &self.commission_record_id }
    pub fn subscription_id(&self) -> &EntityId { &self.subscription_id }
    pub fn product_id(&self) -> &EntityId { &self.product_id }
    pub fn tracking_type(&self) -> TrackingType { self.tracking_type }
    pub fn period_start(&self) -> DateTime<Utc> { self.period_start }
    pub fn period_end(&self) -> DateTime<Utc> { self.period_end }
    pub fn period_number(&self) -> u32 { self.period_number }
    pub fn base_amount(&self) -> Money { self.base_amount }
    pub fn commission_rate(&self) -> Rate { self.commission_rate }
    pub fn commission_amount(&self) -> Money { self.commission_amount }
    pub fn status(&self) -> TrackingStatus { self.status }
    pub fn earned_date(&self) -> Option<DateTime<Utc>> { self.earned_date }
    pub fn paid_date(&self) -> Option<DateTime<Utc>> { self.paid_date }

    /// Move forward to `to`. Returns the previous status.
    ///
    /// `earned_date` stamps the earned timestamp when moving to `Earned`
    /// (defaults to `at`). Reaching `Paid` also fills a missing earned date.
    pub fn transition_to(
        &mut self,
        to: TrackingStatus,
        at: DateTime<Utc>,
        earned_date: Option<DateTime<Utc>>,
    ) -> Result<TrackingStatus, TrackingError> {
        let from = self.status;
        if to <= from {
            return Err(TrackingError::InvalidTransition { from, to });
        }

        match to {
            TrackingStatus::Earned => {
                self.earned_date = Some(earned_date.unwrap_or(at));
            }
            TrackingStatus::Paid => {
                self.earned_date = self.earned_date.or(earned_date).or(Some(at));
                self.paid_date = Some(at);
            }
            TrackingStatus::Scheduled | TrackingStatus::Pending => {}
        }

        self.status = to;
        self.updated_at = at;

        self.raise_event(DomainEvent::Tracking(TrackingEvent::StatusChanged {
            tracking_id: self.id.clone(),
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            changed_at: at,
        }));

        Ok(from)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    #[error("cannot move tracking from {from:?} to {to:?}")]
    InvalidTransition { from: TrackingStatus, to: TrackingStatus },
    #[error("period end {end} must be after start {start}")]
    InvalidPeriod { start: DateTime<Utc>, end: DateTime<Utc> },
}
