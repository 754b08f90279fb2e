//! OrderCreated event applier
//!
//! Applies the OrderCreated event to create initial snapshot state.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderState};

/// OrderCreated applier
pub struct OrderCreatedApplier;

impl EventApplier for OrderCreatedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCreated {
            folio,
            service_kind,
            branch,
            reported_problem,
            client_id,
            equipment_id,
            technician_id,
            line_items,
            diagnosis_fee,
        } = &event.payload
        {
            // Set order_id from event (important for replay scenarios)
            snapshot.order_id = event.order_id.clone();
            snapshot.folio = folio.clone();
            snapshot.state = OrderState::AwaitingInitialization;
            snapshot.service_kind = *service_kind;
            snapshot.branch = branch.clone();
            snapshot.reported_problem = reported_problem.clone();
            snapshot.client_id = client_id.clone();
            snapshot.equipment_id = equipment_id.clone();
            snapshot.technician_id = technician_id.clone();
            snapshot.line_items = line_items.clone();
            snapshot.diagnosis_fee = *diagnosis_fee;
            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;

            money::recalculate_totals(snapshot);
        }
    }
}
