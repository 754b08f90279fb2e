//! LineItemsAdded event applier
//!
//! Appends priced lines and reprices the order.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// LineItemsAdded applier
pub struct LineItemsAddedApplier;

impl EventApplier for LineItemsAddedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::LineItemsAdded { items } = &event.payload {
            snapshot.line_items.extend(items.iter().cloned());

            money::recalculate_totals(snapshot);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{LineItem, LineItemKind, OrderEventType, ServiceKind};

    fn part(price: f64, qty: i32) -> LineItem {
        LineItem {
            line_id: uuid::Uuid::new_v4().to_string(),
            kind: LineItemKind::Part,
            sku: None,
            description: "Keyboard".to_string(),
            unit_price: price,
            unit_cost: price / 2.0,
            quantity: qty,
            warranty_days: 90,
        }
    }

    #[test]
    fn test_items_are_priced_on_top_of_quote() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.service_kind = ServiceKind::Diagnosis;
        snapshot.quoted_cost = Some(800.0);
        money::recalculate_totals(&mut snapshot);
        assert_eq!(snapshot.total, 800.0);

        let event = OrderEvent::new(
            4,
            "order-1".to_string(),
            "tech-1".to_string(),
            "Tech".to_string(),
            "cmd-4".to_string(),
            None,
            OrderEventType::LineItemsAdded,
            EventPayload::LineItemsAdded {
                items: vec![part(450.0, 2)],
            },
        );
        LineItemsAddedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.line_items.len(), 1);
        assert_eq!(snapshot.total, 1700.0);
        assert_eq!(snapshot.last_sequence, 4);
    }
}
