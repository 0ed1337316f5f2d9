//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that infrastructure must implement.
//! Every lookup is scoped by organization; rows of another tenant are invisible.

use async_trait::async_trait;

use crate::domain::aggregates::{
    CommissionAssignment, CommissionEvent, CommissionRecord, PipelineStage, Product, ProductCommissionRule,
    RecurringCommissionTracking, SubscriptionLifecycleEvent, ValidationAudit,
};
use crate::domain::value_objects::{EntityId, OrganizationId};
use crate::domain::DomainEvent;

/// Product commission rule store
#[async_trait]
pub trait ProductRuleRepository: Send + Sync {
    /// Highest-priority active rule for the product
    async fn find_active_for_product(
        &self,
        org: &OrganizationId,
        product_id: &EntityId,
    ) -> Result<Option<ProductCommissionRule>, RepositoryError>;

    async fn find_by_id(&self, org: &OrganizationId, id: &EntityId)
        -> Result<Option<ProductCommissionRule>, RepositoryError>;

    async fn save(&self, rule: &ProductCommissionRule) -> Result<(), RepositoryError>;
}

/// Product catalog owned by another context
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<Product>, RepositoryError>;
}

/// Pipeline stages owned by the CRM
#[async_trait]
pub trait PipelineDirectory: Send + Sync {
    async fn find_stage(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<PipelineStage>, RepositoryError>;
}

/// Commission event ledger (reads; writes go through the unit of work)
#[async_trait]
pub trait CommissionEventRepository: Send + Sync {
    async fn find_by_id(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<CommissionEvent>, RepositoryError>;
}

/// Commission assignment store
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn find_by_id(
        &self,
        org: &OrganizationId,
        id: &EntityId,
    ) -> Result<Option<CommissionAssignment>, RepositoryError>;

    /// All assignments targeting the opportunity, usable or not
    async fn find_for_opportunity(
        &self,
        org: &OrganizationId,
        opportunity_id: &EntityId,
    ) -> Result<Vec<CommissionAssignment>, RepositoryError>;

    /// All product-level assignments for the product, usable or not
    async fn find_for_product(
        &self,
        org: &OrganizationId,
        product_id: &EntityId,
    ) -> Result<Vec<CommissionAssignment>, RepositoryError>;

    /// Insert a new assignment.
    ///
    /// Fails with [`RepositoryError::ConstraintViolation`] carrying the
    /// existing id when the user already holds an active assignment on the
    /// same opportunity.
    async fn insert(&self, assignment: &CommissionAssignment) -> Result<(), RepositoryError>;

    /// Update an existing assignment
    async fn save(&self, assignment: &CommissionAssignment) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CommissionRecordRepository: Send + Sync {
    async fn find_by_id(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<CommissionRecord>, RepositoryError>;

    async fn find_by_event(
        &self,
        org: &OrganizationId,
        event_id: &EntityId,
    ) -> Result<Vec<CommissionRecord>, RepositoryError>;
}

#[async_trait]
pub trait RecurringTrackingRepository: Send + Sync {
    async fn find_by_id(
        &self,
        org: &OrganizationId,
        id: &EntityId,
    ) -> Result<Option<RecurringCommissionTracking>, RepositoryError>;

    async fn find_by_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<RecurringCommissionTracking>, RepositoryError>;

    /// Ordered by period number
    async fn find_by_subscription(
        &self,
        org: &OrganizationId,
        subscription_id: &EntityId,
    ) -> Result<Vec<RecurringCommissionTracking>, RepositoryError>;
}

#[async_trait]
pub trait SubscriptionLifecycleRepository: Send + Sync {
    /// Full history for the subscription, oldest first
    async fn history(
        &self,
        org: &OrganizationId,
        subscription_id: &EntityId,
    ) -> Result<Vec<SubscriptionLifecycleEvent>, RepositoryError>;
}

#[async_trait]
pub trait ValidationAuditRepository: Send + Sync {
    async fn latest_for_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<ValidationAudit>, RepositoryError>;

    async fn latest_requiring_approval(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<ValidationAudit>, RepositoryError>;

    /// Oldest first
    async fn list_for_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Vec<ValidationAudit>, RepositoryError>;
}

/// Rows written together by one use case
#[derive(Clone, Debug, Default)]
pub struct CommitBatch {
    pub events: Vec<CommissionEvent>,
    pub new_records: Vec<CommissionRecord>,
    pub updated_records: Vec<CommissionRecord>,
    pub new_tracking: Vec<RecurringCommissionTracking>,
    pub updated_tracking: Vec<RecurringCommissionTracking>,
    pub lifecycle: Vec<SubscriptionLifecycleEvent>,
    pub new_audits: Vec<ValidationAudit>,
    pub updated_audits: Vec<ValidationAudit>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.new_records.is_empty()
            && self.updated_records.is_empty()
            && self.new_tracking.is_empty()
            && self.updated_tracking.is_empty()
            && self.lifecycle.is_empty()
            && self.new_audits.is_empty()
            && self.updated_audits.is_empty()
    }
}

/// Atomic multi-table write
#[async_trait]
pub trait CommissionUnitOfWork: Send + Sync {
    /// Apply every row of the batch or none of them
    async fn commit(&self, batch: CommitBatch) -> Result<(), RepositoryError>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

/// Repository error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("constraint {constraint} violated")]
    ConstraintViolation {
        constraint: String,
        existing_id: Option<EntityId>,
    },
    #[error("storage error: {0}")]
    Storage(String),
}
