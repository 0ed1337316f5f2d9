//! Aggregates module

pub mod assignment;
pub mod audit;
pub mod catalog;
pub mod commission_event;
pub mod lifecycle;
pub mod product_rule;
pub mod record;
pub mod tracking;

pub use assignment::{
    AssignmentError, AssignmentTarget, CommissionAssignment, CommissionType, NewAssignment, StageGate,
    StageRequirement,
};
pub use audit::{ApprovalStatus, CheckStatus, ValidationAudit, ValidationCheck, ValidationStatus};
pub use catalog::{PipelineStage, Product};
pub use commission_event::{CommissionEvent, CommissionEventError, EventSource, NewCommissionEvent};
pub use lifecycle::{LifecycleEventType, SubscriptionLifecycleEvent};
pub use product_rule::{MrrCommissionType, ProductCommissionRule};
pub use record::{
    CalculationDetails, CalculationMethod, CommissionRecord, CommissionStatus, RecordError, RecordOwner,
    CALCULATION_DETAILS_VERSION,
};
pub use tracking::{BillingPeriod, RecurringCommissionTracking, TrackingError, TrackingStatus, TrackingType};
