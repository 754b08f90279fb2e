//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{OrderCommand, OrderCommandPayload, OrderEvent};

mod add_line_items;
mod apply_transition;
mod create_order;
mod line_items;
mod record_payment;
mod reserve_material;
mod revise_quote;

pub use add_line_items::AddLineItemsAction;
pub use apply_transition::ApplyTransitionAction;
pub use create_order::CreateOrderAction;
pub use record_payment::RecordPaymentAction;
pub use reserve_material::ReserveMaterialAction;
pub use revise_quote::ReviseQuoteAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    ApplyTransition(ApplyTransitionAction),
    RecordPayment(RecordPaymentAction),
    ReserveMaterial(ReserveMaterialAction),
    AddLineItems(AddLineItemsAction),
    ReviseQuote(ReviseQuoteAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::ApplyTransition(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::ReserveMaterial(action) => action.execute(ctx, metadata).await,
            CommandAction::AddLineItems(action) => action.execute(ctx, metadata).await,
            CommandAction::ReviseQuote(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert OrderCommand reference to CommandAction
///
/// This is the ONLY place with a match on OrderCommandPayload.
impl From<&OrderCommand> for CommandAction {
    fn from(cmd: &OrderCommand) -> Self {
        match &cmd.payload {
            OrderCommandPayload::CreateOrder {
                branch,
                service_kind,
                reported_problem,
                client_id,
                equipment_id,
                technician_id,
                items,
            } => CommandAction::CreateOrder(CreateOrderAction {
                branch: branch.clone(),
                service_kind: *service_kind,
                reported_problem: reported_problem.clone(),
                client_id: client_id.clone(),
                equipment_id: equipment_id.clone(),
                technician_id: technician_id.clone(),
                items: items.clone(),
            }),
            OrderCommandPayload::ApplyTransition {
                order_id,
                target_state,
                payload,
            } => CommandAction::ApplyTransition(ApplyTransitionAction {
                order_id: order_id.clone(),
                target_state: *target_state,
                payload: payload.clone(),
            }),
            OrderCommandPayload::RecordPayment { order_id, payment } => {
                CommandAction::RecordPayment(RecordPaymentAction {
                    order_id: order_id.clone(),
                    payment: payment.clone(),
                })
            }
            OrderCommandPayload::ReserveMaterial {
                order_id,
                reservation,
            } => CommandAction::ReserveMaterial(ReserveMaterialAction {
                order_id: order_id.clone(),
                reservation: reservation.clone(),
            }),
            OrderCommandPayload::AddLineItems { order_id, items } => {
                CommandAction::AddLineItems(AddLineItemsAction {
                    order_id: order_id.clone(),
                    items: items.clone(),
                })
            }
            OrderCommandPayload::ReviseQuote {
                order_id,
                quoted_cost,
                reason,
            } => CommandAction::ReviseQuote(ReviseQuoteAction {
                order_id: order_id.clone(),
                quoted_cost: *quoted_cost,
                reason: reason.clone(),
            }),
        }
    }
}
