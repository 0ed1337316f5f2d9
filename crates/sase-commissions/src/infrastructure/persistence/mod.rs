//! In-memory repository implementations
//!
//! All tables sit behind one lock so a commit is a single critical section.
//! Constraints are checked for the whole batch before any row is applied.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::config::{ReferenceData, RuleConfig};
use crate::domain::aggregates::{
    AssignmentTarget, CommissionAssignment, CommissionEvent, CommissionRecord, PipelineStage, Product,
    ProductCommissionRule, RecurringCommissionTracking, SubscriptionLifecycleEvent, ValidationAudit,
};
use crate::domain::value_objects::{EntityId, OrganizationId};
use crate::domain::DomainEvent;
use crate::ports::outbound::*;
use crate::ports::CommissionPorts;

/// Name of the lifecycle period uniqueness constraint
pub const LIFECYCLE_PERIOD_CONSTRAINT: &str = "subscription_lifecycle_period_unique";
/// Name of the one-active-assignment-per-(opportunity, user) constraint
pub const ACTIVE_ASSIGNMENT_CONSTRAINT: &str = "active_opportunity_assignment_unique";
/// Name of the record/tracking 1:1 constraint
pub const TRACKING_RECORD_CONSTRAINT: &str = "recurring_tracking_record_unique";

#[derive(Default)]
struct Tables {
    rules: HashMap<EntityId, ProductCommissionRule>,
    products: HashMap<EntityId, Product>,
    stages: HashMap<EntityId, PipelineStage>,
    events: HashMap<EntityId, CommissionEvent>,
    assignments: HashMap<EntityId, CommissionAssignment>,
    records: HashMap<EntityId, CommissionRecord>,
    tracking: HashMap<EntityId, RecurringCommissionTracking>,
    lifecycle: Vec<SubscriptionLifecycleEvent>,
    audits: Vec<ValidationAudit>,
}

impl Tables {
    fn check(&self, batch: &CommitBatch) -> Result<(), RepositoryError> {
        let mut event_ids = HashSet::new();
        for event in &batch.events {
            if self.events.contains_key(event.id()) || !event_ids.insert(event.id()) {
                return Err(RepositoryError::DuplicateKey(format!("commission_events.{}", event.id())));
            }
        }

        let mut record_ids = HashSet::new();
        for record in &batch.new_records {
            if self.records.contains_key(record.id()) || !record_ids.insert(record.id()) {
                return Err(RepositoryError::DuplicateKey(format!("commission_records.{}", record.id())));
            }
        }
        for record in &batch.updated_records {
            if !self.records.contains_key(record.id()) {
                return Err(RepositoryError::NotFound(format!("commission_records.{}", record.id())));
            }
        }

        let mut tracked_records = HashSet::new();
        for tracking in &batch.new_tracking {
            if self.tracking.contains_key(tracking.id()) {
                return Err(RepositoryError::DuplicateKey(format!(
                    "recurring_commission_tracking.{}",
                    tracking.id()
                )));
            }
            let existing = self
                .tracking
                .values()
                .find(|t| t.commission_record_id() == tracking.commission_record_id());
            if existing.is_some() || !tracked_records.insert(tracking.commission_record_id()) {
                return Err(RepositoryError::ConstraintViolation {
                    constraint: TRACKING_RECORD_CONSTRAINT.to_string(),
                    existing_id: existing.map(|t| t.id().clone()),
                });
            }
        }
        for tracking in &batch.updated_tracking {
            if !self.tracking.contains_key(tracking.id()) {
                return Err(RepositoryError::NotFound(format!(
                    "recurring_commission_tracking.{}",
                    tracking.id()
                )));
            }
        }

        let mut periods = HashSet::new();
        for event in &batch.lifecycle {
            let existing = self.lifecycle.iter().find(|e| {
                e.organization_id == event.organization_id
                    && e.subscription_id == event.subscription_id
                    && e.period_number == event.period_number
            });
            let key = (&event.organization_id, &event.subscription_id, event.period_number);
            if existing.is_some() || !periods.insert(key) {
                return Err(RepositoryError::ConstraintViolation {
                    constraint: LIFECYCLE_PERIOD_CONSTRAINT.to_string(),
                    existing_id: existing.map(|e| e.id.clone()),
                });
            }
        }

        for audit in &batch.new_audits {
            if self.audits.iter().any(|a| a.id() == audit.id()) {
                return Err(RepositoryError::DuplicateKey(format!(
                    "commission_validation_audit.{}",
                    audit.id()
                )));
            }
        }
        for audit in &batch.updated_audits {
            if !self.audits.iter().any(|a| a.id() == audit.id()) {
                return Err(RepositoryError::NotFound(format!(
                    "commission_validation_audit.{}",
                    audit.id()
                )));
            }
        }

        Ok(())
    }

    fn apply(&mut self, batch: CommitBatch) {
        for event in batch.events {
            self.events.insert(event.id().clone(), event);
        }
        for record in batch.new_records.into_iter().chain(batch.updated_records) {
            self.records.insert(record.id().clone(), record);
        }
        for tracking in batch.new_tracking.into_iter().chain(batch.updated_tracking) {
            self.tracking.insert(tracking.id().clone(), tracking);
        }
        self.lifecycle.extend(batch.lifecycle);
        self.audits.extend(batch.new_audits);
        for audit in batch.updated_audits {
            if let Some(slot) = self.audits.iter_mut().find(|a| a.id() == audit.id()) {
                *slot = audit;
            }
        }
    }
}

/// Transactional in-memory store backing every outbound port
#[derive(Default)]
pub struct InMemoryCommissionStore {
    tables: RwLock<Tables>,
}

impl InMemoryCommissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every outbound port to this store
    pub fn ports(self: &Arc<Self>, publisher: Arc<dyn EventPublisher>) -> CommissionPorts {
        CommissionPorts {
            rules: self.clone(),
            catalog: self.clone(),
            pipelines: self.clone(),
            events: self.clone(),
            assignments: self.clone(),
            records: self.clone(),
            tracking: self.clone(),
            lifecycle: self.clone(),
            audits: self.clone(),
            unit_of_work: self.clone(),
            publisher,
        }
    }

    // =========================================================================
    // Reference data owned by other contexts
    // =========================================================================

    pub fn seed_product(&self, product: Product) {
        self.tables.write().products.insert(product.id.clone(), product);
    }

    pub fn seed_stage(&self, stage: PipelineStage) {
        self.tables.write().stages.insert(stage.id.clone(), stage);
    }

    pub fn seed_rule(&self, rule: ProductCommissionRule) {
        self.tables.write().rules.insert(rule.id.clone(), rule);
    }

    /// Load configured reference data. Rows with an existing id are replaced.
    pub fn load_reference(&self, reference: &ReferenceData) {
        let mut tables = self.tables.write();
        for product in &reference.products {
            tables.products.insert(product.id.clone(), product.clone());
        }
        for stage in &reference.stages {
            tables.stages.insert(stage.id.clone(), stage.clone());
        }
        for rule in reference.rules.iter().map(RuleConfig::to_rule) {
            tables.rules.insert(rule.id.clone(), rule);
        }
    }

    pub fn lifecycle_len(&self, org: &OrganizationId, subscription_id: &EntityId) -> usize {
        self.tables
            .read()
            .lifecycle
            .iter()
            .filter(|e| &e.organization_id == org && &e.subscription_id == subscription_id)
            .count()
    }
}

#[async_trait]
impl ProductRuleRepository for InMemoryCommissionStore {
    async fn find_active_for_product(
        &self,
        org: &OrganizationId,
        product_id: &EntityId,
    ) -> Result<Option<ProductCommissionRule>, RepositoryError> {
        let tables = self.tables.read();
        let candidates = tables
            .rules
            .values()
            .filter(|r| &r.organization_id == org && &r.product_id == product_id);
        Ok(ProductCommissionRule::select_active(candidates).cloned())
    }

    async fn find_by_id(
        &self,
        org: &OrganizationId,
        id: &EntityId,
    ) -> Result<Option<ProductCommissionRule>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.rules.get(id).filter(|r| &r.organization_id == org).cloned())
    }

    async fn save(&self, rule: &ProductCommissionRule) -> Result<(), RepositoryError> {
        self.tables.write().rules.insert(rule.id.clone(), rule.clone());
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCommissionStore {
    async fn find_product(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.products.get(id).filter(|p| &p.organization_id == org).cloned())
    }
}

#[async_trait]
impl PipelineDirectory for InMemoryCommissionStore {
    async fn find_stage(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<PipelineStage>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.stages.get(id).filter(|s| &s.organization_id == org).cloned())
    }
}

#[async_trait]
impl CommissionEventRepository for InMemoryCommissionStore {
    async fn find_by_id(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<CommissionEvent>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.events.get(id).filter(|e| e.organization_id() == org).cloned())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryCommissionStore {
    async fn find_by_id(
        &self,
        org: &OrganizationId,
        id: &EntityId,
    ) -> Result<Option<CommissionAssignment>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.assignments.get(id).filter(|a| a.organization_id() == org).cloned())
    }

    async fn find_for_opportunity(
        &self,
        org: &OrganizationId,
        opportunity_id: &EntityId,
    ) -> Result<Vec<CommissionAssignment>, RepositoryError> {
        let tables = self.tables.read();
        let mut found: Vec<CommissionAssignment> = tables
            .assignments
            .values()
            .filter(|a| a.organization_id() == org && a.opportunity_id() == Some(opportunity_id))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at());
        Ok(found)
    }

    async fn find_for_product(
        &self,
        org: &OrganizationId,
        product_id: &EntityId,
    ) -> Result<Vec<CommissionAssignment>, RepositoryError> {
        let tables = self.tables.read();
        let mut found: Vec<CommissionAssignment> = tables
            .assignments
            .values()
            .filter(|a| a.organization_id() == org && a.product_id() == Some(product_id))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at());
        Ok(found)
    }

    async fn insert(&self, assignment: &CommissionAssignment) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();

        if tables.assignments.contains_key(assignment.id()) {
            return Err(RepositoryError::DuplicateKey(format!("commission_assignments.{}", assignment.id())));
        }

        if let AssignmentTarget::Opportunity(opportunity_id) = assignment.target() {
            let existing = tables.assignments.values().find(|a| {
                a.is_active()
                    && a.organization_id() == assignment.organization_id()
                    && a.user_id() == assignment.user_id()
                    && a.opportunity_id() == Some(opportunity_id)
            });
            if let Some(existing) = existing {
                return Err(RepositoryError::ConstraintViolation {
                    constraint: ACTIVE_ASSIGNMENT_CONSTRAINT.to_string(),
                    existing_id: Some(existing.id().clone()),
                });
            }
        }

        tables.assignments.insert(assignment.id().clone(), assignment.clone());
        Ok(())
    }

    async fn save(&self, assignment: &CommissionAssignment) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        match tables.assignments.get_mut(assignment.id()) {
            Some(slot) => {
                *slot = assignment.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("commission_assignments.{}", assignment.id()))),
        }
    }
}

#[async_trait]
impl CommissionRecordRepository for InMemoryCommissionStore {
    async fn find_by_id(&self, org: &OrganizationId, id: &EntityId) -> Result<Option<CommissionRecord>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.records.get(id).filter(|r| r.organization_id() == org).cloned())
    }

    async fn find_by_event(
        &self,
        org: &OrganizationId,
        event_id: &EntityId,
    ) -> Result<Vec<CommissionRecord>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .records
            .values()
            .filter(|r| r.organization_id() == org && r.event_id() == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecurringTrackingRepository for InMemoryCommissionStore {
    async fn find_by_id(
        &self,
        org: &OrganizationId,
        id: &EntityId,
    ) -> Result<Option<RecurringCommissionTracking>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.tracking.get(id).filter(|t| t.organization_id() == org).cloned())
    }

    async fn find_by_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<RecurringCommissionTracking>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .tracking
            .values()
            .find(|t| t.organization_id() == org && t.commission_record_id() == record_id)
            .cloned())
    }

    async fn find_by_subscription(
        &self,
        org: &OrganizationId,
        subscription_id: &EntityId,
    ) -> Result<Vec<RecurringCommissionTracking>, RepositoryError> {
        let tables = self.tables.read();
        let mut rows: Vec<RecurringCommissionTracking> = tables
            .tracking
            .values()
            .filter(|t| t.organization_id() == org && t.subscription_id() == subscription_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.period_number());
        Ok(rows)
    }
}

#[async_trait]
impl SubscriptionLifecycleRepository for InMemoryCommissionStore {
    async fn history(
        &self,
        org: &OrganizationId,
        subscription_id: &EntityId,
    ) -> Result<Vec<SubscriptionLifecycleEvent>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .lifecycle
            .iter()
            .filter(|e| &e.organization_id == org && &e.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ValidationAuditRepository for InMemoryCommissionStore {
    async fn latest_for_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<ValidationAudit>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .audits
            .iter()
            .rev()
            .find(|a| a.organization_id() == org && a.commission_record_id() == record_id)
            .cloned())
    }

    async fn latest_requiring_approval(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Option<ValidationAudit>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .audits
            .iter()
            .rev()
            .find(|a| a.organization_id() == org && a.commission_record_id() == record_id && a.requires_approval())
            .cloned())
    }

    async fn list_for_record(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<Vec<ValidationAudit>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .audits
            .iter()
            .filter(|a| a.organization_id() == org && a.commission_record_id() == record_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommissionUnitOfWork for InMemoryCommissionStore {
    async fn commit(&self, batch: CommitBatch) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        tables.check(&batch)?;
        tables.apply(batch);
        Ok(())
    }
}

/// Event publisher that drops everything
#[derive(Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Event publisher that keeps what it was given
#[derive(Default)]
pub struct InMemoryEventPublisher {
    published: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<DomainEvent> {
        self.published.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.published.lock().iter().map(|e| e.event_type()).collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        for event in &events {
            tracing::debug!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                "domain event published"
            );
        }
        self.published.lock().extend(events);
        Ok(())
    }
}
