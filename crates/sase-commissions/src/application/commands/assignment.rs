//! Assignment management

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::application::dto::CreateAssignmentCommand;
use crate::domain::aggregates::{CommissionAssignment, NewAssignment};
use crate::domain::value_objects::{EntityId, OrganizationId};
use crate::ports::inbound::{AssignmentUseCases, UseCaseError};
use crate::ports::CommissionPorts;

/// Assignment application service
pub struct AssignmentService {
    ports: CommissionPorts,
}

impl AssignmentService {
    pub fn new(ports: CommissionPorts) -> Self {
        Self { ports }
    }
}

#[async_trait]
impl AssignmentUseCases for AssignmentService {
    #[tracing::instrument(skip_all, fields(organization_id = %org, user_id = %command.user_id))]
    async fn create_assignment(
        &self,
        org: &OrganizationId,
        command: CreateAssignmentCommand,
    ) -> Result<CommissionAssignment, UseCaseError> {
        let mut assignment = CommissionAssignment::create(NewAssignment {
            organization_id: org.clone(),
            user_id: command.user_id,
            target: command.target,
            commission_type: command.commission_type,
            base_rate: command.base_rate,
            stage_gate: command.stage_gate,
            expiry_date: command.expiry_date,
        })?;
        let events = assignment.take_events();

        if let Err(err) = self.ports.assignments.insert(&assignment).await {
            warn!(error = %err, "assignment rejected");
            return Err(err.into());
        }
        if let Err(err) = self.ports.publisher.publish(events).await {
            warn!(error = %err, "failed to publish domain events");
        }

        info!(assignment_id = %assignment.id(), "assignment created");
        Ok(assignment)
    }

    #[tracing::instrument(skip_all, fields(organization_id = %org, assignment_id = %assignment_id))]
    async fn deactivate_assignment(
        &self,
        org: &OrganizationId,
        assignment_id: &EntityId,
    ) -> Result<CommissionAssignment, UseCaseError> {
        let mut assignment = self
            .ports
            .assignments
            .find_by_id(org, assignment_id)
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("assignment {assignment_id}")))?;

        assignment.deactivate(Utc::now())?;
        let events = assignment.take_events();
        self.ports.assignments.save(&assignment).await?;
        if let Err(err) = self.ports.publisher.publish(events).await {
            warn!(error = %err, "failed to publish domain events");
        }

        info!("assignment deactivated");
        Ok(assignment)
    }
}
