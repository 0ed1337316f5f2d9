//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;

use crate::application::dto::*;
use crate::domain::aggregates::{
    AssignmentError, CommissionAssignment, CommissionEventError, RecordError, RecurringCommissionTracking,
    TrackingError,
};
use crate::domain::services::{ResolutionError, ValidationResult};
use crate::domain::value_objects::{EntityId, MoneyError, OrganizationId, RateError};
use crate::ports::outbound::RepositoryError;

/// Commission recording use cases
#[async_trait]
pub trait CommissionUseCases: Send + Sync {
    /// Record a monetizable event and the commissions it earns
    async fn record_commissionable_event(
        &self,
        org: &OrganizationId,
        command: RecordCommissionableEventCommand,
    ) -> Result<CommissionOutcome, UseCaseError>;

    /// Move a tracking row forward and cascade to its record
    async fn update_recurring_tracking_status(
        &self,
        org: &OrganizationId,
        tracking_id: &EntityId,
        command: UpdateTrackingStatusCommand,
    ) -> Result<RecurringCommissionTracking, UseCaseError>;
}

/// Validation and sign-off use cases
#[async_trait]
pub trait ReviewUseCases: Send + Sync {
    /// Run the validator and append an audit row
    async fn validate_commission(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<ValidationResult, UseCaseError>;

    async fn approve_commission(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
        command: ApproveCommissionCommand,
    ) -> Result<bool, UseCaseError>;

    async fn override_validation(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
        command: OverrideValidationCommand,
    ) -> Result<bool, UseCaseError>;
}

/// Assignment management use cases
#[async_trait]
pub trait AssignmentUseCases: Send + Sync {
    async fn create_assignment(
        &self,
        org: &OrganizationId,
        command: CreateAssignmentCommand,
    ) -> Result<CommissionAssignment, UseCaseError>;

    /// Soft delete
    async fn deactivate_assignment(
        &self,
        org: &OrganizationId,
        assignment_id: &EntityId,
    ) -> Result<CommissionAssignment, UseCaseError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UseCaseError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no active commission rule for product {product_id}")]
    NoActiveRuleFound { product_id: EntityId },
    #[error("no assignment found: {0}")]
    NoAssignmentFound(String),
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        existing_id: Option<EntityId>,
    },
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for UseCaseError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey(key) => Self::Conflict {
                message: format!("duplicate key {key}"),
                existing_id: None,
            },
            RepositoryError::ConstraintViolation { constraint, existing_id } => Self::Conflict {
                message: format!("constraint {constraint} violated"),
                existing_id,
            },
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<RecordError> for UseCaseError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Amount(_) => Self::InvalidRequest(err.to_string()),
            _ => Self::InvalidTransition(err.to_string()),
        }
    }
}

impl From<TrackingError> for UseCaseError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            TrackingError::InvalidPeriod { .. } => Self::InvalidRequest(err.to_string()),
        }
    }
}

impl From<AssignmentError> for UseCaseError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::AlreadyInactive => Self::InvalidTransition(err.to_string()),
            _ => Self::InvalidRequest(err.to_string()),
        }
    }
}

impl From<CommissionEventError> for UseCaseError {
    fn from(err: CommissionEventError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<MoneyError> for UseCaseError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<RateError> for UseCaseError {
    fn from(err: RateError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<ResolutionError> for UseCaseError {
    fn from(err: ResolutionError) -> Self {
        Self::NoAssignmentFound(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_becomes_conflict() {
        let existing = EntityId::new();
        let err: UseCaseError = RepositoryError::ConstraintViolation {
            constraint: "active_opportunity_assignment".into(),
            existing_id: Some(existing.clone()),
        }
        .into();

        assert!(matches!(err, UseCaseError::Conflict { existing_id: Some(id), .. } if id == existing));
    }

    #[test]
    fn test_storage_error_becomes_persistence() {
        let err: UseCaseError = RepositoryError::Storage("disk".into()).into();
        assert!(matches!(err, UseCaseError::Persistence(_)));
    }

    #[test]
    fn test_backward_tracking_move_is_invalid_transition() {
        use crate::domain::aggregates::TrackingStatus;
        let err: UseCaseError = TrackingError::InvalidTransition {
            from: TrackingStatus::Paid,
            to: TrackingStatus::Earned,
        }
        .into();
        assert!(matches!(err, UseCaseError::InvalidTransition(_)));
    }
}
