//! Assignment resolver
//!
//! Decides which standing assignments earn on an event. Works on rows the
//! application layer has already loaded, so it stays pure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::aggregates::{CommissionAssignment, PipelineStage};
use crate::domain::value_objects::EntityId;

/// An assignment that earns on the event, with the rate basis it earns at
#[derive(Clone, Debug)]
pub struct ResolvedAssignment {
    pub assignment: CommissionAssignment,
    pub base_rate: Decimal,
}

impl ResolvedAssignment {
    fn from_assignment(assignment: CommissionAssignment) -> Self {
        let base_rate = assignment.base_rate();
        Self { assignment, base_rate }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no active assignment for product {product_id}")]
    NoProductAssignment { product_id: EntityId },
    #[error("assignment {assignment_id} is missing, inactive or expired")]
    UnusableAssignment { assignment_id: EntityId },
    #[error("an explicit assignment id is required")]
    AssignmentRequired,
}

pub struct AssignmentResolver;

impl AssignmentResolver {
    /// Opportunity events: every usable assignment whose stage gate passes.
    /// Gated rows that fail are skipped, never reported as errors.
    pub fn resolve_opportunity(
        candidates: Vec<CommissionAssignment>,
        opportunity_id: &EntityId,
        current_stage: Option<&PipelineStage>,
        required_stages: &HashMap<EntityId, PipelineStage>,
        at: DateTime<Utc>,
    ) -> Vec<ResolvedAssignment> {
        candidates
            .into_iter()
            .filter(|a| a.opportunity_id() == Some(opportunity_id))
            .filter(|a| a.is_usable_at(at))
            .filter(|a| match a.stage_gate() {
                None => true,
                Some(gate) => {
                    let passed = gate.is_satisfied(current_stage, required_stages.get(&gate.required_stage_id));
                    if !passed {
                        tracing::debug!(
                            assignment_id = %a.id(),
                            required_stage_id = %gate.required_stage_id,
                            "stage gate not satisfied, skipping assignment"
                        );
                    }
                    passed
                }
            })
            .map(ResolvedAssignment::from_assignment)
            .collect()
    }

    /// Subscription events: the explicit assignment when one was named,
    /// otherwise the product-level default.
    ///
    /// `explicit` is `Some(None)` when an id was named but not found.
    pub fn resolve_subscription(
        explicit: Option<(EntityId, Option<CommissionAssignment>)>,
        product_level: Vec<CommissionAssignment>,
        product_id: &EntityId,
        at: DateTime<Utc>,
    ) -> Result<ResolvedAssignment, ResolutionError> {
        if let Some((assignment_id, found)) = explicit {
            return Self::usable(assignment_id, found, at);
        }

        let mut usable: Vec<CommissionAssignment> = product_level
            .into_iter()
            .filter(|a| a.product_id() == Some(product_id))
            .filter(|a| a.is_usable_at(at))
            .collect();

        if usable.len() > 1 {
            tracing::warn!(
                product_id = %product_id,
                count = usable.len(),
                "multiple active product assignments, using the most recent"
            );
        }

        usable.sort_by_key(|a| a.created_at());
        usable
            .pop()
            .map(ResolvedAssignment::from_assignment)
            .ok_or_else(|| ResolutionError::NoProductAssignment { product_id: product_id.clone() })
    }

    /// Manual events: an explicit, usable assignment is mandatory.
    pub fn resolve_manual(
        explicit: Option<(EntityId, Option<CommissionAssignment>)>,
        at: DateTime<Utc>,
    ) -> Result<ResolvedAssignment, ResolutionError> {
        match explicit {
            Some((assignment_id, found)) => Self::usable(assignment_id, found, at),
            None => Err(ResolutionError::AssignmentRequired),
        }
    }

    fn usable(
        assignment_id: EntityId,
        found: Option<CommissionAssignment>,
        at: DateTime<Utc>,
    ) -> Result<ResolvedAssignment, ResolutionError> {
        match found {
            Some(a) if a.is_usable_at(at) => Ok(ResolvedAssignment::from_assignment(a)),
            _ => Err(ResolutionError::UnusableAssignment { assignment_id }),
        }
    }
}
