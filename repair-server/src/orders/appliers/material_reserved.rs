//! MaterialReserved event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, ReservationRef};

/// MaterialReserved applier
pub struct MaterialReservedApplier;

impl EventApplier for MaterialReservedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::MaterialReserved {
            reservation_id,
            product_id,
            branch,
            quantity,
            ..
        } = &event.payload
        {
            snapshot.open_reservations.push(ReservationRef {
                reservation_id: reservation_id.clone(),
                product_id: product_id.clone(),
                branch: branch.clone(),
                quantity: *quantity,
            });
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
