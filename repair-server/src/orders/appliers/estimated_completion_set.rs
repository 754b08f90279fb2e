//! EstimatedCompletionSet event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// EstimatedCompletionSet applier
pub struct EstimatedCompletionSetApplier;

impl EventApplier for EstimatedCompletionSetApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::EstimatedCompletionSet {
            estimated_completion,
        } = &event.payload
        {
            snapshot.estimated_completion = Some(*estimated_completion);
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
