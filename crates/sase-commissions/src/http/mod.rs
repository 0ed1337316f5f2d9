//! HTTP API
//!
//! Thin axum adapter over the inbound ports. The organization id is the
//! first path segment of every route.

mod error;
mod handlers;

pub use error::{ApiError, ErrorResponse};

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::{AssignmentService, CommissionService, ReviewService};
use crate::config::EngineConfig;
use crate::ports::inbound::{AssignmentUseCases, CommissionUseCases, ReviewUseCases, UseCaseError};
use crate::ports::CommissionPorts;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub commissions: Arc<dyn CommissionUseCases>,
    pub reviews: Arc<dyn ReviewUseCases>,
    pub assignments: Arc<dyn AssignmentUseCases>,
}

impl AppState {
    /// Wire the application services over one set of ports
    pub fn from_ports(ports: CommissionPorts, engine: &EngineConfig) -> Result<Self, UseCaseError> {
        Ok(Self {
            commissions: Arc::new(CommissionService::new(ports.clone(), engine)?),
            reviews: Arc::new(ReviewService::new(ports.clone())),
            assignments: Arc::new(AssignmentService::new(ports)),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/organizations/:org/commission-events", post(handlers::record_event))
        .route(
            "/api/organizations/:org/recurring-tracking/:id/status",
            put(handlers::update_tracking_status),
        )
        .route("/api/organizations/:org/commissions/:id/validate", post(handlers::validate))
        .route("/api/organizations/:org/commissions/:id/approve", post(handlers::approve))
        .route("/api/organizations/:org/commissions/:id/override", post(handlers::override_validation))
        .route("/api/organizations/:org/assignments", post(handlers::create_assignment))
        .route("/api/organizations/:org/assignments/:id", delete(handlers::deactivate_assignment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::domain::aggregates::{MrrCommissionType, Product, ProductCommissionRule};
    use crate::domain::value_objects::{EntityId, OrganizationId, Rate};
    use crate::infrastructure::{InMemoryCommissionStore, NoOpEventPublisher};

    const ORG: &str = "org-http";

    struct TestApp {
        app: Router,
        store: Arc<InMemoryCommissionStore>,
        product_id: EntityId,
    }

    fn test_app() -> TestApp {
        let store = Arc::new(InMemoryCommissionStore::new());
        let ports = store.ports(Arc::new(NoOpEventPublisher));
        let product_id = EntityId::new();
        store.seed_product(Product {
            id: product_id.clone(),
            organization_id: OrganizationId::new(ORG),
            name: "Secure Edge".into(),
            is_active: true,
            created_at: Utc::now() - Duration::days(30),
        });

        let state = AppState::from_ports(ports, &EngineConfig::default()).unwrap();
        TestApp { app: router(state), store, product_id }
    }

    impl TestApp {
        fn seed_rule(&self, policy: Option<MrrCommissionType>) {
            let mut rule = ProductCommissionRule::new(
                OrganizationId::new(ORG),
                self.product_id.clone(),
                Rate::new(dec!(10)).unwrap(),
                Rate::new(dec!(5)).unwrap(),
            );
            if let Some(kind) = policy {
                rule = rule.with_mrr_policy(kind, 0, 0);
            }
            self.store.seed_rule(rule);
        }

        async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
                .unwrap();

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn product_assignment(&self) {
            let (status, _) = self
                .send(
                    "POST",
                    &format!("/api/organizations/{ORG}/assignments"),
                    Some(json!({
                        "user_id": EntityId::new(),
                        "target": { "type": "product", "id": self.product_id },
                        "commission_type": "percentage_gross",
                        "base_rate": "0",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        fn charge(&self, subscription_id: &EntityId) -> Value {
            json!({
                "event_source": "subscription",
                "event_type": "subscription_payment",
                "product_id": self.product_id,
                "contact_id": EntityId::new(),
                "amount": "100.00",
                "subscription_id": subscription_id,
            })
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_record_then_not_due() {
        let app = test_app();
        app.seed_rule(Some(MrrCommissionType::FirstPaymentOnly));
        app.product_assignment().await;
        let subscription_id = EntityId::new();
        let uri = format!("/api/organizations/{ORG}/commission-events");

        let (status, body) = app.send("POST", &uri, Some(app.charge(&subscription_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "recorded");
        assert_eq!(body["records"].as_array().map(Vec::len), Some(1));

        let (status, body) = app.send("POST", &uri, Some(app.charge(&subscription_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "not_due");
        assert_eq!(body["period_number"], 2);
    }

    #[tokio::test]
    async fn test_configured_reference_data_records_commissions() {
        let config = crate::config::AppConfig::from_toml(&format!(
            r#"
            [[reference.products]]
            id = "edge-gateway"
            organization_id = "{ORG}"
            name = "Edge Gateway"
            is_active = true
            created_at = "2024-01-01T00:00:00Z"

            [[reference.rules]]
            organization_id = "{ORG}"
            product_id = "edge-gateway"
            initial_sale_rate = "10"
            renewal_rate = "5"
            "#
        ))
        .unwrap();

        let store = Arc::new(InMemoryCommissionStore::new());
        store.load_reference(&config.reference);
        let ports = store.ports(Arc::new(NoOpEventPublisher));
        let app = TestApp {
            app: router(AppState::from_ports(ports, &config.engine).unwrap()),
            store,
            product_id: EntityId::from_string("edge-gateway"),
        };
        app.product_assignment().await;

        let (status, body) = app
            .send(
                "POST",
                &format!("/api/organizations/{ORG}/commission-events"),
                Some(app.charge(&EntityId::new())),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "recorded");
        let amount = body["records"][0]["commission_amount"].as_str().unwrap();
        assert_eq!(amount.parse::<rust_decimal::Decimal>().unwrap(), dec!(10));

        let record_id = body["records"][0]["id"].as_str().unwrap().to_string();
        let (status, body) = app
            .send("POST", &format!("/api/organizations/{ORG}/commissions/{record_id}/validate"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "passed");
    }

    #[tokio::test]
    async fn test_missing_rule_is_not_found() {
        let app = test_app();
        let (status, body) = app
            .send(
                "POST",
                &format!("/api/organizations/{ORG}/commission-events"),
                Some(app.charge(&EntityId::new())),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NO_ACTIVE_RULE");
    }

    #[tokio::test]
    async fn test_duplicate_assignment_conflicts() {
        let app = test_app();
        let uri = format!("/api/organizations/{ORG}/assignments");
        let body = json!({
            "user_id": EntityId::new(),
            "target": { "type": "opportunity", "id": EntityId::new() },
            "commission_type": "fixed_amount",
            "base_rate": "250",
        });

        let (status, created) = app.send("POST", &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err) = app.send("POST", &uri, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["existing_id"], created["id"]);
    }

    #[tokio::test]
    async fn test_backward_tracking_move_is_unprocessable() {
        let app = test_app();
        app.seed_rule(None);
        app.product_assignment().await;

        let (_, body) = app
            .send(
                "POST",
                &format!("/api/organizations/{ORG}/commission-events"),
                Some(app.charge(&EntityId::new())),
            )
            .await;
        let tracking_id = body["tracking"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/organizations/{ORG}/recurring-tracking/{tracking_id}/status");

        let (status, body) = app.send("PUT", &uri, Some(json!({ "status": "earned" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "earned");

        let (status, body) = app.send("PUT", &uri, Some(json!({ "status": "pending" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_blank_override_reason_is_bad_request() {
        let app = test_app();
        let uri = format!("/api/organizations/{ORG}/commissions/{}/override", EntityId::new());
        let (status, body) = app
            .send("POST", &uri, Some(json!({ "override_by": EntityId::new(), "reason": " " })))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let app = test_app();
        let uri = format!("/api/organizations/{ORG}/commissions/{}/validate", EntityId::new());
        let (status, _) = app.send("POST", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
