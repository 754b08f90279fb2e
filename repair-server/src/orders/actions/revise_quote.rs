//! ReviseQuote command handler
//!
//! Lets the technician correct the quoted cost while the client has not yet
//! approved it. A revision may not drop the total below what was paid.

use async_trait::async_trait;

use crate::orders::ledger;
use crate::orders::money;
use crate::orders::state_machine::authorize_in_place;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, WorkflowAction};

/// ReviseQuote action
#[derive(Debug, Clone)]
pub struct ReviseQuoteAction {
    pub order_id: String,
    pub quoted_cost: f64,
    pub reason: Option<String>,
}

#[async_trait]
impl CommandHandler for ReviseQuoteAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        authorize_in_place(metadata.role, &snapshot, WorkflowAction::ReviseQuote)?;

        if !money::is_valid_quote(self.quoted_cost) {
            return Err(OrderError::InvalidOperation(format!(
                "quoted_cost must be greater than zero, got {}",
                self.quoted_cost
            )));
        }

        let new_total = money::total_with(&snapshot, &snapshot.line_items, Some(self.quoted_cost));
        ledger::check_total_covers_paid(&snapshot, new_total, snapshot.state, ctx.policy())?;

        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::QuoteRevised,
            EventPayload::QuoteRevised {
                previous_cost: snapshot.quoted_cost,
                quoted_cost: self.quoted_cost,
                reason: self.reason.clone(),
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::order::{OrderSnapshot, OrderState, PaymentMethod, PaymentRecord, Role, ServiceKind};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "tech-1".to_string(),
            actor_name: "Tech".to_string(),
            role: Role::Technician,
            timestamp: 1234567890,
        }
    }

    fn awaiting_approval(paid: f64) -> OrderSnapshot {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.state = OrderState::AwaitingApproval;
        snapshot.service_kind = ServiceKind::Diagnosis;
        snapshot.quoted_cost = Some(800.0);
        snapshot.payments.push(PaymentRecord {
            payment_id: "p-1".to_string(),
            method: PaymentMethod::Transfer,
            amount: paid,
            timestamp: 0,
            recorded_by: "rec-1".to_string(),
            note: None,
        });
        money::recalculate_totals(&mut snapshot);
        snapshot
    }

    fn action(cost: f64) -> ReviseQuoteAction {
        ReviseQuoteAction {
            order_id: "order-1".to_string(),
            quoted_cost: cost,
            reason: Some("part price changed".to_string()),
        }
    }

    #[tokio::test]
    async fn test_revise_quote_upward() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &awaiting_approval(300.0)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(950.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            events[0].payload,
            EventPayload::QuoteRevised { previous_cost: Some(p), quoted_cost: q, .. }
                if p == 800.0 && q == 950.0
        ));
    }

    #[tokio::test]
    async fn test_revise_below_paid_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &awaiting_approval(500.0)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(400.0).execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }
}
