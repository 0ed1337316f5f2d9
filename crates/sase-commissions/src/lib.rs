//! OpenSASE Commissions Engine
//!
//! Attributes monetizable events (subscription charges, won opportunities,
//! manual bonuses) to the sales reps assigned to them and computes what each
//! rep has earned, including recurring commission on subscription renewals.
//!
//! ## Architecture
//!
//! - **Domain Layer**: aggregates, value objects, domain events and the
//!   resolver, tier calculator, lifecycle tracker and validator services
//! - **Application Layer**: use case orchestration, DTOs
//! - **Ports Layer**: hexagonal interfaces, all scoped by organization
//! - **Infrastructure Layer**: in-memory store and event publishers
//! - **HTTP**: axum adapter over the inbound ports

pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod infrastructure;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use application::{AssignmentService, CommissionService, ReviewService};
pub use config::{AppConfig, ConfigError};
pub use domain::aggregates::{CommissionAssignment, CommissionRecord, RecurringCommissionTracking};
pub use domain::events::DomainEvent;
pub use domain::value_objects::{EntityId, Money, OrganizationId, Rate};
pub use ports::inbound::{AssignmentUseCases, CommissionUseCases, ReviewUseCases, UseCaseError};
pub use ports::outbound::RepositoryError;
