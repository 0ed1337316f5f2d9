//! Validation, approval and override

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::application::dto::*;
use crate::domain::aggregates::{CommissionRecord, ProductCommissionRule, ValidationAudit, ValidationStatus};
use crate::domain::events::{DomainEvent, ValidationEvent};
use crate::domain::services::{CommissionValidator, ValidationContext, ValidationResult};
use crate::domain::value_objects::{EntityId, OrganizationId};
use crate::ports::inbound::{ReviewUseCases, UseCaseError};
use crate::ports::outbound::CommitBatch;
use crate::ports::CommissionPorts;

use super::commit_and_publish;

/// Review application service
pub struct ReviewService {
    ports: CommissionPorts,
}

impl ReviewService {
    pub fn new(ports: CommissionPorts) -> Self {
        Self { ports }
    }

    async fn record(&self, org: &OrganizationId, record_id: &EntityId) -> Result<CommissionRecord, UseCaseError> {
        self.ports
            .records
            .find_by_id(org, record_id)
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("commission record {record_id}")))
    }

    /// The rule the record was calculated under, else the product's current rule
    async fn rule_for(
        &self,
        org: &OrganizationId,
        record: &CommissionRecord,
        product_id: &EntityId,
    ) -> Result<Option<ProductCommissionRule>, UseCaseError> {
        if let Some(rule_id) = record.calculation_details().rule_id() {
            if let Some(rule) = self.ports.rules.find_by_id(org, rule_id).await? {
                return Ok(Some(rule));
            }
        }
        Ok(self.ports.rules.find_active_for_product(org, product_id).await?)
    }
}

#[async_trait]
impl ReviewUseCases for ReviewService {
    #[tracing::instrument(skip_all, fields(organization_id = %org, record_id = %record_id))]
    async fn validate_commission(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
    ) -> Result<ValidationResult, UseCaseError> {
        let record = self.record(org, record_id).await?;
        let event = self
            .ports
            .events
            .find_by_id(org, record.event_id())
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("commission event {}", record.event_id())))?;
        let product = self.ports.catalog.find_product(org, event.product_id()).await?;
        let rule = self.rule_for(org, &record, event.product_id()).await?;
        let siblings = self.ports.records.find_by_event(org, event.id()).await?;

        let result = CommissionValidator::validate(&ValidationContext {
            record: &record,
            event: &event,
            product: product.as_ref(),
            rule: rule.as_ref(),
            other_records: &siblings,
        });

        let audit = ValidationAudit::record(
            org.clone(),
            record_id.clone(),
            result.status,
            result.checks.clone(),
            result.requires_approval,
        );
        let domain_events = vec![DomainEvent::Validation(ValidationEvent::Completed {
            record_id: record_id.clone(),
            audit_id: audit.id().clone(),
            status: result.status.as_str().to_string(),
        })];
        let batch = CommitBatch { new_audits: vec![audit], ..Default::default() };
        commit_and_publish(&self.ports, batch, domain_events).await?;

        info!(
            status = result.status.as_str(),
            requires_approval = result.requires_approval,
            checks = result.checks.len(),
            "commission validated"
        );

        Ok(result)
    }

    #[tracing::instrument(skip_all, fields(organization_id = %org, record_id = %record_id))]
    async fn approve_commission(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
        command: ApproveCommissionCommand,
    ) -> Result<bool, UseCaseError> {
        let mut record = self.record(org, record_id).await?;

        // A failed verdict blocks payout until it is overridden
        if let Some(latest) = self.ports.audits.latest_for_record(org, record_id).await? {
            if latest.validation_status() == ValidationStatus::Failed {
                warn!(audit_id = %latest.id(), "approval blocked by failed validation");
                return Err(UseCaseError::InvalidTransition(format!(
                    "latest validation of commission {record_id} failed; override it before approving"
                )));
            }
        }

        let now = Utc::now();
        record.approve(command.approver_id.clone(), now)?;

        let mut updated_audits = vec![];
        if let Some(mut audit) = self.ports.audits.latest_requiring_approval(org, record_id).await? {
            audit.approve(command.approver_id.clone(), command.notes, now);
            updated_audits.push(audit);
        }

        let batch = CommitBatch {
            updated_records: vec![record.clone()],
            updated_audits,
            ..Default::default()
        };
        commit_and_publish(&self.ports, batch, record.take_events()).await?;

        info!(approver_id = %command.approver_id, "commission approved");
        Ok(true)
    }

    #[tracing::instrument(skip_all, fields(organization_id = %org, record_id = %record_id))]
    async fn override_validation(
        &self,
        org: &OrganizationId,
        record_id: &EntityId,
        command: OverrideValidationCommand,
    ) -> Result<bool, UseCaseError> {
        let reason = command.reason.trim();
        if reason.is_empty() {
            return Err(UseCaseError::InvalidRequest("override reason is required".into()));
        }

        self.record(org, record_id).await?;
        let mut audit = self
            .ports
            .audits
            .latest_for_record(org, record_id)
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("validation audit for record {record_id}")))?;

        audit.override_validation(command.override_by.clone(), reason.to_string(), Utc::now());

        let domain_events = vec![DomainEvent::Validation(ValidationEvent::Overridden {
            record_id: record_id.clone(),
            audit_id: audit.id().clone(),
            override_by: command.override_by.clone(),
        })];
        let batch = CommitBatch { updated_audits: vec![audit], ..Default::default() };
        commit_and_publish(&self.ports, batch, domain_events).await?;

        info!(override_by = %command.override_by, "validation overridden");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::testing::Harness;
    use crate::domain::aggregates::{ApprovalStatus, CommissionStatus, TrackingStatus};
    use crate::domain::services::checks;
    use crate::domain::value_objects::Money;
    use crate::ports::inbound::CommissionUseCases;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn recorded(h: &Harness, amount: rust_decimal::Decimal) -> EntityId {
        let outcome = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&EntityId::new(), amount))
            .await
            .unwrap();
        outcome.records()[0].id().clone()
    }

    #[tokio::test]
    async fn test_validate_appends_audit_rows() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(100)).await;

        let first = h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        h.reviews.validate_commission(&h.org, &record_id).await.unwrap();

        assert_eq!(first.status, ValidationStatus::Passed);
        assert!(first.can_proceed);
        assert_eq!(h.audits(&record_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_minimum_sale_fails_validation() {
        let h = Harness::new();
        h.rule(|mut r| {
            r.min_sale_amount = Some(Money::new(dec!(100)).unwrap());
            r
        });
        h.product_assignment(dec!(0)).await;

        let below = recorded(&h, dec!(99.99)).await;
        let at = recorded(&h, dec!(100)).await;

        let result = h.reviews.validate_commission(&h.org, &below).await.unwrap();
        assert_eq!(result.status, ValidationStatus::Failed);
        assert!(!result.can_proceed);

        let result = h.reviews.validate_commission(&h.org, &at).await.unwrap();
        assert_ne!(result.status, ValidationStatus::Failed);
    }

    #[tokio::test]
    async fn test_failed_validation_blocks_approval_until_overridden() {
        let h = Harness::new();
        h.rule(|mut r| {
            r.min_sale_amount = Some(Money::new(dec!(100)).unwrap());
            r
        });
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(50)).await;
        let approve = || ApproveCommissionCommand { approver_id: EntityId::new(), notes: None };

        let result = h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        assert_eq!(result.status, ValidationStatus::Failed);

        let err = h.reviews.approve_commission(&h.org, &record_id, approve()).await.unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidTransition(_)));
        assert_eq!(h.record(&record_id).await.status(), CommissionStatus::Pending);

        h.reviews
            .override_validation(
                &h.org,
                &record_id,
                OverrideValidationCommand { override_by: EntityId::new(), reason: "signed contract".into() },
            )
            .await
            .unwrap();

        assert!(h.reviews.approve_commission(&h.org, &record_id, approve()).await.unwrap());
        assert_eq!(h.record(&record_id).await.status(), CommissionStatus::Approved);
    }

    #[tokio::test]
    async fn test_revalidation_after_override_blocks_again() {
        let h = Harness::new();
        h.rule(|mut r| {
            r.min_sale_amount = Some(Money::new(dec!(100)).unwrap());
            r
        });
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(50)).await;

        h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        h.reviews
            .override_validation(
                &h.org,
                &record_id,
                OverrideValidationCommand { override_by: EntityId::new(), reason: "signed contract".into() },
            )
            .await
            .unwrap();
        h.reviews.validate_commission(&h.org, &record_id).await.unwrap();

        let err = h
            .reviews
            .approve_commission(
                &h.org,
                &record_id,
                ApproveCommissionCommand { approver_id: EntityId::new(), notes: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_retiring_rule_keeps_historical_verdict() {
        use crate::ports::outbound::ProductRuleRepository;

        let h = Harness::new();
        let rule_id = h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(100)).await;
        assert_eq!(h.reviews.validate_commission(&h.org, &record_id).await.unwrap().status, ValidationStatus::Passed);

        let mut rule = ProductRuleRepository::find_by_id(h.store.as_ref(), &h.org, &rule_id)
            .await
            .unwrap()
            .unwrap();
        rule.is_active = false;
        ProductRuleRepository::save(h.store.as_ref(), &rule).await.unwrap();

        let result = h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        assert_ne!(result.status, ValidationStatus::Failed);
        assert_eq!(
            result.check(checks::PRODUCT_RULE).map(|c| c.status),
            Some(crate::domain::aggregates::CheckStatus::Warning)
        );
        assert!(h
            .reviews
            .approve_commission(
                &h.org,
                &record_id,
                ApproveCommissionCommand { approver_id: EntityId::new(), notes: None },
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_product_created_after_sale_fails_availability() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let mut command = h.subscription_charge(&EntityId::new(), dec!(100));
        command.event_date = Some(h.product.created_at - Duration::days(7));
        let outcome = h.commissions.record_commissionable_event(&h.org, command).await.unwrap();

        let result = h
            .reviews
            .validate_commission(&h.org, outcome.records()[0].id())
            .await
            .unwrap();

        assert_eq!(result.status, ValidationStatus::Failed);
        assert_eq!(
            result.check(checks::PRODUCT_AVAILABILITY).map(|c| c.status),
            Some(crate::domain::aggregates::CheckStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_approve_updates_record_and_pending_audit() {
        let h = Harness::new();
        h.rule(|mut r| {
            r.requires_manager_approval = true;
            r
        });
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(100)).await;

        let result = h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        assert!(result.requires_approval);

        let approver = EntityId::new();
        let approved = h
            .reviews
            .approve_commission(
                &h.org,
                &record_id,
                ApproveCommissionCommand { approver_id: approver.clone(), notes: Some("ok".into()) },
            )
            .await
            .unwrap();
        assert!(approved);

        let record = h.record(&record_id).await;
        assert_eq!(record.status(), CommissionStatus::Approved);
        assert_eq!(record.approved_by(), Some(&approver));

        let audit = h.audits(&record_id).await.pop().unwrap();
        assert_eq!(audit.approval_status(), Some(ApprovalStatus::Approved));
        assert_eq!(audit.approval_notes(), Some("ok"));
    }

    #[tokio::test]
    async fn test_paid_record_cannot_be_approved() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let outcome = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&EntityId::new(), dec!(100)))
            .await
            .unwrap();
        let tracking_id = outcome.tracking().unwrap().id().clone();
        h.commissions
            .update_recurring_tracking_status(
                &h.org,
                &tracking_id,
                UpdateTrackingStatusCommand { status: TrackingStatus::Paid, earned_date: None },
            )
            .await
            .unwrap();

        let err = h
            .reviews
            .approve_commission(
                &h.org,
                outcome.records()[0].id(),
                ApproveCommissionCommand { approver_id: EntityId::new(), notes: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_override_requires_reason_and_audit() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let record_id = recorded(&h, dec!(100)).await;
        let command = |reason: &str| OverrideValidationCommand { override_by: EntityId::new(), reason: reason.into() };

        let err = h.reviews.override_validation(&h.org, &record_id, command("  ")).await.unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidRequest(_)));

        let err = h.reviews.override_validation(&h.org, &record_id, command("contract")).await.unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound(_)));

        h.reviews.validate_commission(&h.org, &record_id).await.unwrap();
        assert!(h.reviews.override_validation(&h.org, &record_id, command("contract")).await.unwrap());

        let audit = h.audits(&record_id).await.pop().unwrap();
        assert_eq!(audit.validation_status(), ValidationStatus::Override);
        assert_eq!(audit.override_reason(), Some("contract"));
        assert_eq!(h.record(&record_id).await.status(), CommissionStatus::Pending);
    }
}
