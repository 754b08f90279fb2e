//! PaymentRecorded event applier
//!
//! Applies the PaymentRecorded event to add a payment to the snapshot.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, PaymentRecord};

/// PaymentRecorded applier
pub struct PaymentRecordedApplier;

impl EventApplier for PaymentRecordedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PaymentRecorded {
            payment_id,
            method,
            amount,
            note,
        } = &event.payload
        {
            snapshot.payments.push(PaymentRecord {
                payment_id: payment_id.clone(),
                method: *method,
                amount: *amount,
                timestamp: event.timestamp,
                recorded_by: event.actor_id.clone(),
                note: note.clone(),
            });

            // Update amount_paid and balance using Decimal for precision
            money::recalculate_totals(snapshot);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{OrderEventType, PaymentMethod, ServiceKind};

    fn payment_event(seq: u64, amount: f64) -> OrderEvent {
        OrderEvent::new(
            seq,
            "order-1".to_string(),
            "rec-1".to_string(),
            "Reception".to_string(),
            format!("cmd-{seq}"),
            None,
            OrderEventType::PaymentRecorded,
            EventPayload::PaymentRecorded {
                payment_id: format!("pay-{seq}"),
                method: PaymentMethod::Card,
                amount,
                note: None,
            },
        )
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.service_kind = ServiceKind::Diagnosis;
        snapshot.quoted_cost = Some(800.0);
        money::recalculate_totals(&mut snapshot);

        PaymentRecordedApplier.apply(&mut snapshot, &payment_event(5, 300.0));
        assert_eq!(snapshot.amount_paid, 300.0);
        assert_eq!(snapshot.balance, 500.0);
        assert_eq!(snapshot.payments[0].recorded_by, "rec-1");

        PaymentRecordedApplier.apply(&mut snapshot, &payment_event(6, 500.0));
        assert_eq!(snapshot.balance, 0.0);
        assert!(snapshot.is_fully_paid());
        assert_eq!(snapshot.last_sequence, 6);
    }
}
