//! ReserveMaterial command handler
//!
//! Holds stock for the order through the inventory service. The hold is
//! written in the same transaction as the event, so both land or neither.

use async_trait::async_trait;

use crate::inventory::ReserveRequest;
use crate::orders::state_machine::authorize_in_place;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, ReservationInput, WorkflowAction};

/// ReserveMaterial action
#[derive(Debug, Clone)]
pub struct ReserveMaterialAction {
    pub order_id: String,
    pub reservation: ReservationInput,
}

#[async_trait]
impl CommandHandler for ReserveMaterialAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        authorize_in_place(metadata.role, &snapshot, WorkflowAction::ReserveMaterial)?;

        let product_id = self.reservation.product_id.trim();
        if product_id.is_empty() {
            return Err(OrderError::InvalidOperation(
                "product_id is required".to_string(),
            ));
        }
        // Stock is held at the order's branch unless another one is named
        let branch = self
            .reservation
            .branch
            .as_deref()
            .map(|b| b.trim().to_uppercase())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| snapshot.branch.clone());

        let reservation = ctx.reserve(ReserveRequest {
            order_id: self.order_id.clone(),
            product_id: product_id.to_string(),
            branch,
            quantity: self.reservation.quantity,
            created_by: metadata.actor_id.clone(),
            estimated_use_at: self.reservation.estimated_use_at,
        })?;

        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::MaterialReserved,
            EventPayload::MaterialReserved {
                reservation_id: reservation.reservation_id,
                product_id: reservation.product_id,
                branch: reservation.branch,
                quantity: reservation.quantity,
                estimated_use_at: reservation.estimated_use_at,
            },
        );

        Ok(vec![event])
    }
}
