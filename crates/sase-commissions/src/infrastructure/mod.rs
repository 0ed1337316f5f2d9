//! Infrastructure layer
//!
//! Adapters implementing the outbound ports.

pub mod persistence;

pub use persistence::{InMemoryCommissionStore, InMemoryEventPublisher, NoOpEventPublisher};
