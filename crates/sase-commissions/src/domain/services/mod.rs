//! Domain services module
//!
//! Stateless calculations over aggregates the application layer has loaded.

pub mod lifecycle;
pub mod resolver;
pub mod tier;
pub mod validator;

pub use lifecycle::SubscriptionLifecycleTracker;
pub use resolver::{AssignmentResolver, ResolutionError, ResolvedAssignment};
pub use tier::{NotDueReason, RecurringTierCalculator, TierDecision, DEFAULT_TRAILING_RATE_FACTOR};
pub use validator::{checks, CommissionValidator, ValidationContext, ValidationResult};
