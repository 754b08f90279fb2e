//! QuoteRevised event applier

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// QuoteRevised applier
pub struct QuoteRevisedApplier;

impl EventApplier for QuoteRevisedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::QuoteRevised { quoted_cost, .. } = &event.payload {
            snapshot.quoted_cost = Some(*quoted_cost);
            money::recalculate_totals(snapshot);
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
