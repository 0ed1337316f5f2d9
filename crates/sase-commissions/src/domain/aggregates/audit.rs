//! Validation Audit
//!
//! One row per validation run. Rows are appended, never replaced; only the
//! approval and override fields are filled in afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, OrganizationId};

/// Overall verdict of a validation run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Warning,
    Failed,
    Override,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Override => "override",
        }
    }
}

/// Outcome of a single check. Ordered by severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
}

impl From<CheckStatus> for ValidationStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Passed => ValidationStatus::Passed,
            CheckStatus::Warning => ValidationStatus::Warning,
            CheckStatus::Failed => ValidationStatus::Failed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl ValidationCheck {
    pub fn passed(name: &str, message: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: CheckStatus::Passed, message: message.into() }
    }

    pub fn warning(name: &str, message: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: CheckStatus::Warning, message: message.into() }
    }

    pub fn failed(name: &str, message: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: CheckStatus::Failed, message: message.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
}

/// Validation audit row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationAudit {
    id: EntityId,
    organization_id: OrganizationId,
    commission_record_id: EntityId,
    validation_status: ValidationStatus,
    checks_performed: Vec<ValidationCheck>,
    requires_approval: bool,
    approval_status: Option<ApprovalStatus>,
    approved_by: Option<EntityId>,
    approval_date: Option<DateTime<Utc>>,
    approval_notes: Option<String>,
    override_by: Option<EntityId>,
    override_reason: Option<String>,
    override_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ValidationAudit {
    /// Snapshot a validation run
    pub fn record(
        organization_id: OrganizationId,
        commission_record_id: EntityId,
        validation_status: ValidationStatus,
        checks_performed: Vec<ValidationCheck>,
        requires_approval: bool,
    ) -> Self {
        Self {
            id: EntityId::new(),
            organization_id,
            commission_record_id,
            validation_status,
            checks_performed,
            requires_approval,
            approval_status: requires_approval.then_some(ApprovalStatus::Pending),
            approved_by: None,
            approval_date: None,
            approval_notes: None,
            override_by: None,
            override_reason: None,
            override_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn organization_id(&self) -> &OrganizationId { &self.organization_id }
    pub fn commission_record_id(&self) -> &EntityId { &self.commission_record_id }
    pub fn validation_status(&self) -> ValidationStatus { self.validation_status }
    pub fn checks_performed(&self) -> &[ValidationCheck] { &self.checks_performed }
    pub fn requires_approval(&self) -> bool { self.requires_approval }
    pub fn approval_status(&self) -> Option<ApprovalStatus> { self.approval_status }
    pub fn approved_by(&self) -> Option<&EntityId> { self.approved_by.as_ref() }
    pub fn approval_date(&self) -> Option<DateTime<Utc>> { self.approval_date }
    pub fn approval_notes(&self) -> Option<&str> { self.approval_notes.as_deref() }
    pub fn override_by(&self) -> Option<&EntityId> { self.override_by.as_ref() }
    pub fn override_reason(&self) -> Option<&str> { self.override_reason.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Last write wins
    pub fn approve(&mut self, approver: EntityId, notes: Option<String>, at: DateTime<Utc>) {
        self.approval_status = Some(ApprovalStatus::Approved);
        self.approved_by = Some(approver);
        self.approval_date = Some(at);
        self.approval_notes = notes;
    }

    /// Unblocks a failed validation. Does not approve the commission.
    pub fn override_validation(&mut self, override_by: EntityId, reason: String, at: DateTime<Utc>) {
        self.validation_status = ValidationStatus::Override;
        self.override_by = Some(override_by);
        self.override_reason = Some(reason);
        self.override_date = Some(at);
    }
}
