//! Commission recording
//!
//! Turns a monetizable event into records and tracking rows in one commit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::application::dto::*;
use crate::config::EngineConfig;
use crate::domain::aggregates::{
    BillingPeriod, CalculationDetails, CommissionAssignment, CommissionEvent, CommissionRecord, CommissionType,
    EventSource, NewCommissionEvent, PipelineStage, ProductCommissionRule, RecordOwner, RecurringCommissionTracking,
    TrackingStatus, TrackingType, CALCULATION_DETAILS_VERSION,
};
use crate::domain::events::{DomainEvent, SubscriptionEvent};
use crate::domain::services::{
    AssignmentResolver, RecurringTierCalculator, ResolvedAssignment, SubscriptionLifecycleTracker, TierDecision,
};
use crate::domain::value_objects::{EntityId, Money, OrganizationId, Rate};
use crate::ports::inbound::{CommissionUseCases, UseCaseError};
use crate::ports::outbound::CommitBatch;
use crate::ports::CommissionPorts;

use super::commit_and_publish;

/// Commission application service
pub struct CommissionService {
    ports: CommissionPorts,
    tier: RecurringTierCalculator,
    default_period: Duration,
}

impl CommissionService {
    pub fn new(ports: CommissionPorts, engine: &EngineConfig) -> Result<Self, UseCaseError> {
        Ok(Self {
            ports,
            tier: RecurringTierCalculator::new(engine.trailing_rate_factor)?,
            default_period: Duration::days(i64::from(engine.default_period_days)),
        })
    }

    async fn active_rule(
        &self,
        org: &OrganizationId,
        product_id: &EntityId,
    ) -> Result<ProductCommissionRule, UseCaseError> {
        self.ports
            .rules
            .find_active_for_product(org, product_id)
            .await?
            .ok_or_else(|| UseCaseError::NoActiveRuleFound { product_id: product_id.clone() })
    }

    async fn explicit_assignment(
        &self,
        org: &OrganizationId,
        assignment_id: Option<&EntityId>,
    ) -> Result<Option<(EntityId, Option<CommissionAssignment>)>, UseCaseError> {
        match assignment_id {
            Some(id) => {
                let found = self.ports.assignments.find_by_id(org, id).await?;
                Ok(Some((id.clone(), found)))
            }
            None => Ok(None),
        }
    }

    fn billing_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<BillingPeriod, UseCaseError> {
        let start = start.unwrap_or(now);
        let end = match end {
            Some(end) => end,
            None => start
                .checked_add_signed(self.default_period)
                .ok_or_else(|| UseCaseError::InvalidRequest(format!("period_start {start} is out of range")))?,
        };
        Ok(BillingPeriod::new(start, end)?)
    }

    fn owner(event: &CommissionEvent, resolved: &ResolvedAssignment) -> RecordOwner {
        RecordOwner {
            organization_id: event.organization_id().clone(),
            event_id: event.id().clone(),
            assignment_id: resolved.assignment.id().clone(),
            user_id: resolved.assignment.user_id().clone(),
        }
    }

    // =========================================================================
    // Subscription charges
    // =========================================================================

    async fn record_subscription(
        &self,
        org: &OrganizationId,
        event: CommissionEvent,
        command: &RecordCommissionableEventCommand,
        now: DateTime<Utc>,
    ) -> Result<CommissionOutcome, UseCaseError> {
        let subscription_id = event
            .subscription_id()
            .cloned()
            .ok_or_else(|| UseCaseError::InvalidRequest("subscription_id is required".into()))?;
        let product_id = event.product_id().clone();

        let rule = self.active_rule(org, &product_id).await?;

        let explicit = self.explicit_assignment(org, command.assignment_id.as_ref()).await?;
        let product_level = match explicit {
            Some(_) => vec![],
            None => self.ports.assignments.find_for_product(org, &product_id).await?,
        };
        let resolved = AssignmentResolver::resolve_subscription(explicit, product_level, &product_id, now)?;

        let history = self.ports.lifecycle.history(org, &subscription_id).await?;
        let period_number = SubscriptionLifecycleTracker::period_number(&history);
        let lifecycle_event = SubscriptionLifecycleTracker::next_event(
            org.clone(),
            subscription_id.clone(),
            &history,
            event.event_amount(),
            now,
        );

        let (rate, tracking_type) = match self.tier.decide(&rule, period_number) {
            TierDecision::Due { rate, tracking_type } => (rate, tracking_type),
            TierDecision::NotDue(reason) => {
                let batch = CommitBatch { lifecycle: vec![lifecycle_event], ..Default::default() };
                let domain_events = vec![DomainEvent::Subscription(SubscriptionEvent::CommissionNotDue {
                    subscription_id: subscription_id.clone(),
                    period_number,
                    reason: reason.message().to_string(),
                })];
                commit_and_publish(&self.ports, batch, domain_events).await?;

                info!(
                    organization_id = %org,
                    subscription_id = %subscription_id,
                    period_number,
                    reason = ?reason,
                    "subscription period earns no commission"
                );
                return Ok(CommissionOutcome::NotDue {
                    reason,
                    period_number,
                    message: reason.message().to_string(),
                });
            }
        };

        let details = CalculationDetails::RecurringSubscription {
            version: CALCULATION_DETAILS_VERSION,
            rule_id: rule.id.clone(),
            subscription_id: subscription_id.clone(),
            period_number,
            tracking_type,
            trailing_rate_factor: (tracking_type == TrackingType::Trailing).then(|| self.tier.trailing_rate_factor()),
        };
        let mut record =
            CommissionRecord::calculated(Self::owner(&event, &resolved), event.event_amount(), rate, details)?;

        let period = self.billing_period(command.period_start, command.period_end, now)?;
        let mut tracking = RecurringCommissionTracking::open(
            &record,
            subscription_id.clone(),
            product_id,
            tracking_type,
            period,
            period_number,
        );

        let mut domain_events = record.take_events();
        domain_events.extend(tracking.take_events());

        let batch = CommitBatch {
            events: vec![event.clone()],
            new_records: vec![record.clone()],
            new_tracking: vec![tracking.clone()],
            lifecycle: vec![lifecycle_event],
            ..Default::default()
        };
        commit_and_publish(&self.ports, batch, domain_events).await?;

        info!(
            organization_id = %org,
            subscription_id = %subscription_id,
            record_id = %record.id(),
            period_number,
            tracking_type = ?tracking_type,
            commission_amount = %record.commission_amount(),
            "subscription commission recorded"
        );

        Ok(CommissionOutcome::Recorded { event, records: vec![record], tracking: Some(tracking) })
    }

    // =========================================================================
    // Opportunity sales
    // =========================================================================

    async fn record_opportunity(
        &self,
        org: &OrganizationId,
        event: CommissionEvent,
        command: &RecordCommissionableEventCommand,
        now: DateTime<Utc>,
    ) -> Result<CommissionOutcome, UseCaseError> {
        let opportunity_id = event
            .opportunity_id()
            .cloned()
            .ok_or_else(|| UseCaseError::InvalidRequest("opportunity_id is required".into()))?;

        let rule = self.active_rule(org, event.product_id()).await?;

        let mut candidates = self.ports.assignments.find_for_opportunity(org, &opportunity_id).await?;
        if let Some(assignment_id) = &command.assignment_id {
            candidates.retain(|a| a.id() == assignment_id);
        }

        let current_stage = match &command.current_stage_id {
            Some(stage_id) => self.ports.pipelines.find_stage(org, stage_id).await?,
            None => None,
        };
        let mut required_stages: HashMap<EntityId, PipelineStage> = HashMap::new();
        for gate in candidates.iter().filter_map(|a| a.stage_gate()) {
            if required_stages.contains_key(&gate.required_stage_id) {
                continue;
            }
            if let Some(stage) = self.ports.pipelines.find_stage(org, &gate.required_stage_id).await? {
                required_stages.insert(stage.id.clone(), stage);
            }
        }

        let resolved = AssignmentResolver::resolve_opportunity(
            candidates,
            &opportunity_id,
            current_stage.as_ref(),
            &required_stages,
            now,
        );

        let mut records = Vec::with_capacity(resolved.len());
        for assignment in &resolved {
            records.push(self.opportunity_record(&event, &rule, assignment, &opportunity_id, command)?);
        }

        let domain_events = records.iter_mut().flat_map(|r| r.take_events()).collect();
        let batch = CommitBatch {
            events: vec![event.clone()],
            new_records: records.clone(),
            ..Default::default()
        };
        commit_and_publish(&self.ports, batch, domain_events).await?;

        if records.is_empty() {
            debug!(
                organization_id = %org,
                opportunity_id = %opportunity_id,
                "no assignment earns on this opportunity event"
            );
        }
        info!(
            organization_id = %org,
            opportunity_id = %opportunity_id,
            event_id = %event.id(),
            records = records.len(),
            "opportunity commissions recorded"
        );

        Ok(CommissionOutcome::Recorded { event, records, tracking: None })
    }

    fn opportunity_record(
        &self,
        event: &CommissionEvent,
        rule: &ProductCommissionRule,
        resolved: &ResolvedAssignment,
        opportunity_id: &EntityId,
        command: &RecordCommissionableEventCommand,
    ) -> Result<CommissionRecord, UseCaseError> {
        let commission_type = resolved.assignment.commission_type();
        let details = CalculationDetails::Opportunity {
            version: CALCULATION_DETAILS_VERSION,
            rule_id: Some(rule.id.clone()),
            opportunity_id: opportunity_id.clone(),
            commission_type,
            stage_id: command.current_stage_id.clone(),
            margin_percentage: match commission_type {
                CommissionType::PercentageProfit => rule.estimated_margin_percentage,
                _ => None,
            },
        };
        let owner = Self::owner(event, resolved);
        let sale = event.event_amount();

        let record = match commission_type {
            CommissionType::PercentageGross => {
                CommissionRecord::calculated(owner, sale, Rate::new(resolved.base_rate)?, details)?
            }
            CommissionType::PercentageProfit => {
                let base = match rule.estimated_margin_percentage {
                    Some(margin) => sale.multiply(margin / Decimal::ONE_HUNDRED)?.rounded(),
                    None => {
                        warn!(
                            rule_id = %rule.id,
                            assignment_id = %resolved.assignment.id(),
                            "profit commission without an estimated margin, using gross amount"
                        );
                        sale
                    }
                };
                CommissionRecord::calculated(owner, base, Rate::new(resolved.base_rate)?, details)?
            }
            CommissionType::FixedAmount => {
                CommissionRecord::fixed(owner, sale, Money::new(resolved.base_rate)?, details)?
            }
        };
        Ok(record)
    }

    // =========================================================================
    // Manual bonuses
    // =========================================================================

    async fn record_manual(
        &self,
        org: &OrganizationId,
        event: CommissionEvent,
        command: &RecordCommissionableEventCommand,
        now: DateTime<Utc>,
    ) -> Result<CommissionOutcome, UseCaseError> {
        let explicit = self.explicit_assignment(org, command.assignment_id.as_ref()).await?;
        let resolved = AssignmentResolver::resolve_manual(explicit, now)?;

        let details = CalculationDetails::ManualBonus {
            version: CALCULATION_DETAILS_VERSION,
            note: command.note.clone(),
        };
        let mut record = CommissionRecord::fixed(
            Self::owner(&event, &resolved),
            event.event_amount(),
            event.event_amount(),
            details,
        )?;

        let batch = CommitBatch {
            events: vec![event.clone()],
            new_records: vec![record.clone()],
            ..Default::default()
        };
        commit_and_publish(&self.ports, batch, record.take_events()).await?;

        info!(
            organization_id = %org,
            record_id = %record.id(),
            user_id = %record.user_id(),
            commission_amount = %record.commission_amount(),
            "manual bonus recorded"
        );

        Ok(CommissionOutcome::Recorded { event, records: vec![record], tracking: None })
    }
}

#[async_trait]
impl CommissionUseCases for CommissionService {
    #[tracing::instrument(skip_all, fields(organization_id = %org, event_source = ?command.event_source))]
    async fn record_commissionable_event(
        &self,
        org: &OrganizationId,
        command: RecordCommissionableEventCommand,
    ) -> Result<CommissionOutcome, UseCaseError> {
        let product_id = command
            .product_id
            .clone()
            .ok_or_else(|| UseCaseError::InvalidRequest("product_id is required".into()))?;
        let amount = command
            .amount
            .ok_or_else(|| UseCaseError::InvalidRequest("amount is required".into()))?;

        let now = Utc::now();
        let event = CommissionEvent::record(NewCommissionEvent {
            organization_id: org.clone(),
            event_source: command.event_source,
            event_type: command.event_type.clone(),
            product_id,
            subscription_id: command.subscription_id.clone(),
            opportunity_id: command.opportunity_id.clone(),
            contact_id: command.contact_id.clone(),
            event_amount: Money::new(amount)?.rounded(),
            event_date: command.event_date.unwrap_or(now),
            event_data: command.event_data.clone(),
        })?;

        match event.event_source() {
            EventSource::Subscription => self.record_subscription(org, event, &command, now).await,
            EventSource::Opportunity => self.record_opportunity(org, event, &command, now).await,
            EventSource::Manual => self.record_manual(org, event, &command, now).await,
        }
    }

    #[tracing::instrument(skip_all, fields(organization_id = %org, tracking_id = %tracking_id))]
    async fn update_recurring_tracking_status(
        &self,
        org: &OrganizationId,
        tracking_id: &EntityId,
        command: UpdateTrackingStatusCommand,
    ) -> Result<RecurringCommissionTracking, UseCaseError> {
        let mut tracking = self
            .ports
            .tracking
            .find_by_id(org, tracking_id)
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("recurring tracking {tracking_id}")))?;
        let mut record = self
            .ports
            .records
            .find_by_id(org, tracking.commission_record_id())
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("commission record {}", tracking.commission_record_id())))?;

        let now = Utc::now();
        let previous = tracking.transition_to(command.status, now, command.earned_date)?;

        let mut updated_records = vec![];
        match command.status {
            TrackingStatus::Earned => {
                record.mark_due(now)?;
                updated_records.push(record.clone());
            }
            TrackingStatus::Paid => {
                record.mark_paid(now)?;
                updated_records.push(record.clone());
            }
            TrackingStatus::Scheduled | TrackingStatus::Pending => {}
        }

        let mut domain_events = tracking.take_events();
        domain_events.extend(record.take_events());
        let batch = CommitBatch {
            updated_tracking: vec![tracking.clone()],
            updated_records,
            ..Default::default()
        };
        commit_and_publish(&self.ports, batch, domain_events).await?;

        info!(
            from = previous.as_str(),
            to = tracking.status().as_str(),
            record_id = %record.id(),
            "recurring tracking status updated"
        );

        Ok(tracking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::testing::Harness;
    use crate::domain::aggregates::{CommissionStatus, MrrCommissionType, StageGate, StageRequirement};
    use crate::domain::services::NotDueReason;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_trailing_schedule_end_to_end() {
        let h = Harness::new();
        h.rule(|r| r.with_mrr_policy(MrrCommissionType::Trailing, 3, 2));
        h.product_assignment(dec!(0)).await;
        let sub = EntityId::new();

        let mut paid = vec![];
        for _ in 1..=6 {
            let outcome = h
                .commissions
                .record_commissionable_event(&h.org, h.subscription_charge(&sub, dec!(100)))
                .await
                .unwrap();
            paid.push(outcome.records().first().map(|r| r.commission_amount().amount()));
        }

        assert_eq!(
            paid,
            vec![Some(dec!(10)), Some(dec!(5)), Some(dec!(5)), Some(dec!(2.50)), Some(dec!(2.50)), None]
        );
        assert_eq!(h.store.lifecycle_len(&h.org, &sub), 6);

        let tracking = h.store_tracking(&sub).await;
        let types: Vec<TrackingType> = tracking.iter().map(|t| t.tracking_type()).collect();
        assert_eq!(
            types,
            vec![
                TrackingType::Initial,
                TrackingType::Renewal,
                TrackingType::Renewal,
                TrackingType::Trailing,
                TrackingType::Trailing
            ]
        );
        assert!(tracking.iter().all(|t| t.status() == TrackingStatus::Pending));
    }

    #[tokio::test]
    async fn test_not_due_outcome_carries_reason() {
        let h = Harness::new();
        h.rule(|r| r.with_mrr_policy(MrrCommissionType::FirstPaymentOnly, 0, 0));
        h.product_assignment(dec!(0)).await;
        let sub = EntityId::new();

        h.commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&sub, dec!(100)))
            .await
            .unwrap();
        let outcome = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&sub, dec!(100)))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CommissionOutcome::NotDue { reason: NotDueReason::FirstPaymentOnly, period_number: 2, .. }
        ));
        assert!(h.publisher.event_types().contains(&"commission.not_due"));
    }

    #[tokio::test]
    async fn test_missing_rule_and_assignment() {
        let h = Harness::new();
        let sub = EntityId::new();

        let err = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&sub, dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NoActiveRuleFound { .. }));

        h.rule(|r| r);
        let err = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&sub, dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NoAssignmentFound(_)));
        assert_eq!(h.store.lifecycle_len(&h.org, &sub), 0);
    }

    #[tokio::test]
    async fn test_missing_amount_is_invalid() {
        let h = Harness::new();
        let mut command = h.subscription_charge(&EntityId::new(), dec!(100));
        command.amount = None;

        let err = h.commissions.record_commissionable_event(&h.org, command).await.unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_amount_overflow_is_invalid() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let subscription_id = EntityId::new();

        let err = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&subscription_id, Decimal::MAX))
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
        assert_eq!(h.store.lifecycle_len(&h.org, &subscription_id), 0);
    }

    #[tokio::test]
    async fn test_period_start_out_of_range_is_invalid() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let mut command = h.subscription_charge(&EntityId::new(), dec!(100));
        command.period_start = Some(DateTime::<Utc>::MAX_UTC);

        let err = h.commissions.record_commissionable_event(&h.org, command).await.unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    /// Lifecycle reader that always returns the history as it was before
    /// any charge, like a second request that read before the first committed
    struct StaleHistory;

    #[async_trait::async_trait]
    impl crate::ports::outbound::SubscriptionLifecycleRepository for StaleHistory {
        async fn history(
            &self,
            _org: &OrganizationId,
            _subscription_id: &EntityId,
        ) -> Result<Vec<crate::domain::aggregates::SubscriptionLifecycleEvent>, crate::ports::outbound::RepositoryError>
        {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_second_charge_priced_from_same_history_conflicts() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;

        let mut ports = h.store.ports(h.publisher.clone());
        ports.lifecycle = std::sync::Arc::new(StaleHistory);
        let service = CommissionService::new(ports, &EngineConfig::default()).unwrap();
        let subscription_id = EntityId::new();

        let first = service
            .record_commissionable_event(&h.org, h.subscription_charge(&subscription_id, dec!(100)))
            .await
            .unwrap();
        assert_eq!(first.tracking().map(|t| t.period_number()), Some(1));

        let err = service
            .record_commissionable_event(&h.org, h.subscription_charge(&subscription_id, dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::Conflict { .. }));
        assert_eq!(h.store.lifecycle_len(&h.org, &subscription_id), 1);
        assert_eq!(h.store_tracking(&subscription_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_stage_gated_opportunity_end_to_end() {
        let h = Harness::new();
        h.rule(|r| r);
        let stages = h.pipeline(4);
        let opportunity = EntityId::new();
        h.opportunity_assignment(
            &opportunity,
            CommissionType::PercentageGross,
            dec!(10),
            Some(StageGate { required_stage_id: stages[2].id.clone(), requirement: StageRequirement::Reached }),
        )
        .await;

        let mut earned = vec![];
        for stage in &stages[1..] {
            let outcome = h
                .commissions
                .record_commissionable_event(&h.org, h.opportunity_sale(&opportunity, Some(&stage.id), dec!(1000)))
                .await
                .unwrap();
            earned.push(outcome.records().len());
        }

        assert_eq!(earned, vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn test_opportunity_commission_types() {
        let h = Harness::new();
        h.rule(|mut r| {
            r.estimated_margin_percentage = Some(dec!(40));
            r
        });
        let opportunity = EntityId::new();
        h.opportunity_assignment(&opportunity, CommissionType::PercentageGross, dec!(5), None).await;
        h.opportunity_assignment(&opportunity, CommissionType::PercentageProfit, dec!(10), None).await;
        h.opportunity_assignment(&opportunity, CommissionType::FixedAmount, dec!(250), None).await;

        let outcome = h
            .commissions
            .record_commissionable_event(&h.org, h.opportunity_sale(&opportunity, None, dec!(1000)))
            .await
            .unwrap();

        let mut amounts: Vec<Decimal> = outcome.records().iter().map(|r| r.commission_amount().amount()).collect();
        amounts.sort();
        assert_eq!(amounts, vec![dec!(40), dec!(50), dec!(250)]);
        assert!(outcome.records().iter().all(|r| r.amount_matches_rate()));
    }

    #[tokio::test]
    async fn test_manual_bonus_requires_assignment() {
        let h = Harness::new();
        let mut command = h.subscription_charge(&EntityId::new(), dec!(75));
        command.event_source = EventSource::Manual;
        command.event_type = "challenge_bonus".into();
        command.subscription_id = None;

        let err = h.commissions.record_commissionable_event(&h.org, command.clone()).await.unwrap_err();
        assert!(matches!(err, UseCaseError::NoAssignmentFound(_)));

        command.assignment_id = Some(h.product_assignment(dec!(0)).await);
        let outcome = h.commissions.record_commissionable_event(&h.org, command).await.unwrap();
        assert_eq!(outcome.records()[0].commission_amount().amount(), dec!(75));
    }

    #[tokio::test]
    async fn test_tracking_cascade() {
        let h = Harness::new();
        h.rule(|r| r);
        h.product_assignment(dec!(0)).await;
        let outcome = h
            .commissions
            .record_commissionable_event(&h.org, h.subscription_charge(&EntityId::new(), dec!(100)))
            .await
            .unwrap();
        let tracking_id = outcome.tracking().unwrap().id().clone();
        let record_id = outcome.records()[0].id().clone();

        let earned = h
            .commissions
            .update_recurring_tracking_status(
                &h.org,
                &tracking_id,
                UpdateTrackingStatusCommand { status: TrackingStatus::Earned, earned_date: None },
            )
            .await
            .unwrap();
        assert!(earned.earned_date().is_some());
        let record = h.record(&record_id).await;
        assert!(record.is_due_for_payout());
        assert_eq!(record.status(), CommissionStatus::Pending);

        h.commissions
            .update_recurring_tracking_status(
                &h.org,
                &tracking_id,
                UpdateTrackingStatusCommand { status: TrackingStatus::Paid, earned_date: None },
            )
            .await
            .unwrap();
        let record = h.record(&record_id).await;
        assert_eq!(record.status(), CommissionStatus::Paid);
        assert!(!record.is_due_for_payout());

        let err = h
            .commissions
            .update_recurring_tracking_status(
                &h.org,
                &tracking_id,
                UpdateTrackingStatusCommand { status: TrackingStatus::Earned, earned_date: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_unknown_tracking_is_not_found() {
        let h = Harness::new();
        let err = h
            .commissions
            .update_recurring_tracking_status(
                &h.org,
                &EntityId::new(),
                UpdateTrackingStatusCommand { status: TrackingStatus::Earned, earned_date: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound(_)));
    }
}
