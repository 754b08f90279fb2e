//! ReservationsConsumed / ReservationsReleased event appliers
//!
//! Both drop the listed reservations from the order's open set; the stock
//! side was already settled by the inventory store.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

fn close_reservations(snapshot: &mut OrderSnapshot, event: &OrderEvent, ids: &[String]) {
    snapshot
        .open_reservations
        .retain(|r| !ids.contains(&r.reservation_id));
    snapshot.updated_at = event.timestamp;
    snapshot.last_sequence = event.sequence;
}

/// ReservationsConsumed applier
pub struct ReservationsConsumedApplier;

impl EventApplier for ReservationsConsumedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ReservationsConsumed { reservation_ids } = &event.payload {
            close_reservations(snapshot, event, reservation_ids);
        }
    }
}

/// ReservationsReleased applier
pub struct ReservationsReleasedApplier;

impl EventApplier for ReservationsReleasedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ReservationsReleased { reservation_ids } = &event.payload {
            close_reservations(snapshot, event, reservation_ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{OrderEventType, ReservationRef};

    #[test]
    fn test_consumed_removes_only_listed() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        for id in ["r-1", "r-2"] {
            snapshot.open_reservations.push(ReservationRef {
                reservation_id: id.to_string(),
                product_id: "PART-SSD".to_string(),
                branch: "CENTRO".to_string(),
                quantity: 1,
            });
        }

        let event = OrderEvent::new(
            9,
            "order-1".to_string(),
            "tech-1".to_string(),
            "Tech".to_string(),
            "cmd-9".to_string(),
            None,
            OrderEventType::ReservationsConsumed,
            EventPayload::ReservationsConsumed {
                reservation_ids: vec!["r-1".to_string()],
            },
        );
        ReservationsConsumedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.open_reservations.len(), 1);
        assert_eq!(snapshot.open_reservations[0].reservation_id, "r-2");
        assert_eq!(snapshot.last_sequence, 9);
    }
}
