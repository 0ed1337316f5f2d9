//! Ports module (Hexagonal Architecture)
//!
//! Defines interfaces for external dependencies.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;

use std::sync::Arc;

/// Outbound adapters the application services are wired with
#[derive(Clone)]
pub struct CommissionPorts {
    pub rules: Arc<dyn ProductRuleRepository>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub pipelines: Arc<dyn PipelineDirectory>,
    pub events: Arc<dyn CommissionEventRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub records: Arc<dyn CommissionRecordRepository>,
    pub tracking: Arc<dyn RecurringTrackingRepository>,
    pub lifecycle: Arc<dyn SubscriptionLifecycleRepository>,
    pub audits: Arc<dyn ValidationAuditRepository>,
    pub unit_of_work: Arc<dyn CommissionUnitOfWork>,
    pub publisher: Arc<dyn EventPublisher>,
}
