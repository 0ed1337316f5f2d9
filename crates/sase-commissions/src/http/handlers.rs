//! Route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::{ApiError, AppState};
use crate::application::dto::*;
use crate::domain::aggregates::{CommissionAssignment, RecurringCommissionTracking};
use crate::domain::services::ValidationResult;
use crate::domain::value_objects::{EntityId, OrganizationId};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
}

pub async fn health() -> &'static str {
    "OK"
}

/// Recorded and not-due outcomes both return 200
pub async fn record_event(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(command): Json<RecordCommissionableEventCommand>,
) -> ApiResult<CommissionOutcome> {
    let org = OrganizationId::new(org);
    let outcome = state.commissions.record_commissionable_event(&org, command).await?;
    Ok(Json(outcome))
}

pub async fn update_tracking_status(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Json(command): Json<UpdateTrackingStatusCommand>,
) -> ApiResult<RecurringCommissionTracking> {
    let tracking = state
        .commissions
        .update_recurring_tracking_status(&OrganizationId::new(org), &EntityId::from_string(id), command)
        .await?;
    Ok(Json(tracking))
}

pub async fn validate(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<ValidationResult> {
    let result = state
        .reviews
        .validate_commission(&OrganizationId::new(org), &EntityId::from_string(id))
        .await?;
    Ok(Json(result))
}

pub async fn approve(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Json(command): Json<ApproveCommissionCommand>,
) -> ApiResult<ActionResponse> {
    let success = state
        .reviews
        .approve_commission(&OrganizationId::new(org), &EntityId::from_string(id), command)
        .await?;
    Ok(Json(ActionResponse { success }))
}

pub async fn override_validation(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Json(command): Json<OverrideValidationCommand>,
) -> ApiResult<ActionResponse> {
    let success = state
        .reviews
        .override_validation(&OrganizationId::new(org), &EntityId::from_string(id), command)
        .await?;
    Ok(Json(ActionResponse { success }))
}

pub async fn create_assignment(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(command): Json<CreateAssignmentCommand>,
) -> Result<(StatusCode, Json<CommissionAssignment>), ApiError> {
    let assignment = state
        .assignments
        .create_assignment(&OrganizationId::new(org), command)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn deactivate_assignment(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<CommissionAssignment> {
    let assignment = state
        .assignments
        .deactivate_assignment(&OrganizationId::new(org), &EntityId::from_string(id))
        .await?;
    Ok(Json(assignment))
}
