//! AddLineItems command handler

use async_trait::async_trait;

use super::line_items::resolve_line_items;
use crate::orders::state_machine::authorize_in_place;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, LineItemInput, OrderEvent, OrderEventType, WorkflowAction};

/// AddLineItems action
#[derive(Debug, Clone)]
pub struct AddLineItemsAction {
    pub order_id: String,
    pub items: Vec<LineItemInput>,
}

#[async_trait]
impl CommandHandler for AddLineItemsAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        authorize_in_place(metadata.role, &snapshot, WorkflowAction::AddLineItems)?;

        if self.items.is_empty() {
            return Err(OrderError::InvalidOperation("no items to add".to_string()));
        }
        let items = resolve_line_items(ctx, &self.items)?;

        tracing::debug!(order_id = %self.order_id, count = items.len(), "Adding line items");

        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::LineItemsAdded,
            EventPayload::LineItemsAdded { items },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::money;
    use crate::orders::storage::OrderStorage;
    use shared::order::{
        LineItemKind, OrderSnapshot, OrderState, PaymentMethod, PaymentRecord, Role, ServiceKind,
    };

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "tech-1".to_string(),
            actor_name: "Tech".to_string(),
            role: Role::Technician,
            timestamp: 1234567890,
        }
    }

    fn quoted_order(paid: f64) -> OrderSnapshot {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.state = OrderState::Approved;
        snapshot.service_kind = ServiceKind::Diagnosis;
        snapshot.quoted_cost = Some(800.0);
        if paid > 0.0 {
            snapshot.payments.push(PaymentRecord {
                payment_id: "p-1".to_string(),
                method: PaymentMethod::Cash,
                amount: paid,
                timestamp: 0,
                recorded_by: "rec-1".to_string(),
                note: None,
            });
        }
        money::recalculate_totals(&mut snapshot);
        snapshot
    }

    #[tokio::test]
    async fn test_add_manual_items() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &quoted_order(0.0)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AddLineItemsAction {
            order_id: "order-1".to_string(),
            items: vec![LineItemInput::manual(LineItemKind::Part, "Hinge", 250.0, 2)],
        };
        let events = action.execute(&mut ctx, &create_test_metadata()).await.unwrap();

        if let EventPayload::LineItemsAdded { items } = &events[0].payload {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].quantity, 2);
        } else {
            panic!("Expected LineItemsAdded payload");
        }
    }

    #[tokio::test]
    async fn test_items_on_paid_order_raise_total() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = quoted_order(800.0);
        storage.store_snapshot(&txn, &snapshot).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AddLineItemsAction {
            order_id: "order-1".to_string(),
            items: vec![LineItemInput::manual(LineItemKind::Part, "Screw", 5.0, 1)],
        };
        let events = action.execute(&mut ctx, &create_test_metadata()).await.unwrap();

        if let EventPayload::LineItemsAdded { items } = &events[0].payload {
            snapshot.line_items.extend(items.iter().cloned());
        }
        money::recalculate_totals(&mut snapshot);
        assert_eq!(snapshot.total, 805.0);
        assert_eq!(snapshot.balance, 5.0);
    }

    #[tokio::test]
    async fn test_empty_item_list_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &quoted_order(0.0)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AddLineItemsAction {
            order_id: "order-1".to_string(),
            items: vec![],
        };
        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }
}
