//! Command handlers
//!
//! Application services that orchestrate use cases.

mod assignment;
mod commission;
mod review;

pub use assignment::AssignmentService;
pub use commission::CommissionService;
pub use review::ReviewService;

use tracing::warn;

use crate::domain::DomainEvent;
use crate::ports::inbound::UseCaseError;
use crate::ports::outbound::CommitBatch;
use crate::ports::CommissionPorts;

/// Commit the batch, then hand the raised events to the publisher.
/// Publishing happens after the commit and never fails the use case.
async fn commit_and_publish(
    ports: &CommissionPorts,
    batch: CommitBatch,
    events: Vec<DomainEvent>,
) -> Result<(), UseCaseError> {
    if !batch.is_empty() {
        if let Err(err) = ports.unit_of_work.commit(batch).await {
            warn!(error = %err, "commit rejected");
            return Err(err.into());
        }
    }

    if !events.is_empty() {
        if let Err(err) = ports.publisher.publish(events).await {
            warn!(error = %err, "failed to publish domain events");
        }
    }

    Ok(())
}
