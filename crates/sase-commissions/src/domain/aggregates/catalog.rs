//! Reference data owned by other bounded contexts.
//!
//! Products come from the catalog, pipeline stages from the CRM. The engine
//! only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, OrganizationId};

/// Catalog product as seen by the commission engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A stage in a sales pipeline. Lower positions come first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: EntityId,
    pub organization_id: OrganizationId,
    pub pipeline_id: EntityId,
    pub name: String,
    pub position: u32,
}

impl PipelineStage {
    /// True when `self` is at or past `other` in the same pipeline.
    pub fn has_reached(&self, other: &PipelineStage) -> bool {
        self.pipeline_id == other.pipeline_id && self.position >= other.position
    }
}
