//! RecordPayment command handler
//!
//! Adds a payment to an open order. Payments never push Σ payments over the
//! order total.

use async_trait::async_trait;

use crate::orders::ledger;
use crate::orders::money;
use crate::orders::state_machine::authorize_in_place;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, PaymentInput, WorkflowAction};

/// RecordPayment action
#[derive(Debug, Clone)]
pub struct RecordPaymentAction {
    pub order_id: String,
    pub payment: PaymentInput,
}

#[async_trait]
impl CommandHandler for RecordPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 2. Role and state
        authorize_in_place(metadata.role, &snapshot, WorkflowAction::RecordPayment)?;

        // 3. Validate payment input (finite, positive, within bounds)
        money::validate_payment(&self.payment)?;

        // 4. Overpayment guard
        ledger::check_payment(&snapshot, self.payment.amount, ctx.policy())?;

        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::PaymentRecorded,
            EventPayload::PaymentRecorded {
                payment_id: uuid::Uuid::new_v4().to_string(),
                method: self.payment.method,
                amount: self.payment.amount,
                note: self.payment.note.clone(),
            },
        );

        Ok(vec![event])
    }
}
