//! Application layer
//!
//! Orchestrates use cases and coordinates domain objects.

pub mod commands;
pub mod dto;

pub use commands::{AssignmentService, CommissionService, ReviewService};
pub use dto::*;
