//! DiagnosisRecorded event applier
//!
//! Stores the technician's findings and quote, then reprices the order.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// DiagnosisRecorded applier
pub struct DiagnosisRecordedApplier;

impl EventApplier for DiagnosisRecordedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::DiagnosisRecorded {
            diagnosis,
            quoted_cost,
        } = &event.payload
        {
            snapshot.diagnosis = Some(diagnosis.clone());
            snapshot.quoted_cost = Some(*quoted_cost);

            money::recalculate_totals(snapshot);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
