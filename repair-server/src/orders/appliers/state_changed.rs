//! StateChanged event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderState};

/// StateChanged applier
pub struct StateChangedApplier;

impl EventApplier for StateChangedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::StateChanged { to, .. } = &event.payload {
            snapshot.state = *to;
            if *to == OrderState::PaidAndDelivered {
                snapshot.completed_at = Some(event.timestamp);
            }
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
