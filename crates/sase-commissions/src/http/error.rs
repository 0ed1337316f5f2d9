//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::value_objects::EntityId;
use crate::ports::inbound::UseCaseError;

/// Use-case error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub UseCaseError);

impl From<UseCaseError> for ApiError {
    fn from(err: UseCaseError) -> Self {
        Self(err)
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<EntityId>,
}

impl ApiError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            UseCaseError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            UseCaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            UseCaseError::NoActiveRuleFound { .. } => (StatusCode::NOT_FOUND, "NO_ACTIVE_RULE"),
            UseCaseError::NoAssignmentFound(_) => (StatusCode::NOT_FOUND, "NO_ASSIGNMENT"),
            UseCaseError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            UseCaseError::InvalidTransition(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TRANSITION"),
            UseCaseError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let existing_id = match &self.0 {
            UseCaseError::Conflict { existing_id, .. } => existing_id.clone(),
            _ => None,
        };
        let body = ErrorResponse { error: self.0.to_string(), code, existing_id };

        (status, Json(body)).into_response()
    }
}
