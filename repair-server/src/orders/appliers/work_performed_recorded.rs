//! WorkPerformedRecorded event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// WorkPerformedRecorded applier
pub struct WorkPerformedRecordedApplier;

impl EventApplier for WorkPerformedRecordedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::WorkPerformedRecorded { work_performed } = &event.payload {
            snapshot.work_performed = Some(work_performed.clone());
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
