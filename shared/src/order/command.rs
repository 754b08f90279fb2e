//! Order commands - requests to change an order

use super::state::{OrderState, ServiceKind};
use super::types::{Actor, LineItemInput, PaymentInput, ReservationInput, TransitionPayload};
use super::workflow::WorkflowAction;
use serde::{Deserialize, Serialize};

/// Order command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    /// Command unique ID, used for idempotency
    pub command_id: String,
    /// Who issued it
    pub actor: Actor,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Snapshot version the client last saw; mismatch is a conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    pub payload: OrderCommandPayload,
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommandPayload {
    CreateOrder {
        branch: String,
        service_kind: ServiceKind,
        reported_problem: String,
        client_id: String,
        equipment_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        technician_id: Option<String>,
        #[serde(default)]
        items: Vec<LineItemInput>,
    },

    ApplyTransition {
        order_id: String,
        target_state: OrderState,
        #[serde(default)]
        payload: TransitionPayload,
    },

    RecordPayment {
        order_id: String,
        payment: PaymentInput,
    },

    ReserveMaterial {
        order_id: String,
        reservation: ReservationInput,
    },

    AddLineItems {
        order_id: String,
        items: Vec<LineItemInput>,
    },

    ReviseQuote {
        order_id: String,
        quoted_cost: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl OrderCommandPayload {
    /// Order the command targets, `None` for creation
    pub fn order_id(&self) -> Option<&str> {
        match self {
            OrderCommandPayload::CreateOrder { .. } => None,
            OrderCommandPayload::ApplyTransition { order_id, .. }
            | OrderCommandPayload::RecordPayment { order_id, .. }
            | OrderCommandPayload::ReserveMaterial { order_id, .. }
            | OrderCommandPayload::AddLineItems { order_id, .. }
            | OrderCommandPayload::ReviseQuote { order_id, .. } => Some(order_id),
        }
    }

    /// Workflow action for in-place commands; transitions resolve theirs from the edge table
    pub fn in_place_action(&self) -> Option<WorkflowAction> {
        match self {
            OrderCommandPayload::RecordPayment { .. } => Some(WorkflowAction::RecordPayment),
            OrderCommandPayload::ReserveMaterial { .. } => Some(WorkflowAction::ReserveMaterial),
            OrderCommandPayload::AddLineItems { .. } => Some(WorkflowAction::AddLineItems),
            OrderCommandPayload::ReviseQuote { .. } => Some(WorkflowAction::ReviseQuote),
            OrderCommandPayload::CreateOrder { .. }
            | OrderCommandPayload::ApplyTransition { .. } => None,
        }
    }
}

impl OrderCommand {
    /// Create a command with a fresh ID and the current time
    pub fn new(actor: Actor, payload: OrderCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            actor,
            timestamp: chrono::Utc::now().timestamp_millis(),
            expected_version: None,
            payload,
        }
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::workflow::Role;

    #[test]
    fn test_transition_payload_defaults_when_absent() {
        let json = serde_json::json!({
            "type": "APPLY_TRANSITION",
            "order_id": "o-1",
            "target_state": "APPROVED"
        });
        let payload: OrderCommandPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.order_id(), Some("o-1"));
        assert!(payload.in_place_action().is_none());
    }

    #[test]
    fn test_new_command_has_unique_id() {
        let actor = Actor::new("u-1", "Ana", Role::Reception);
        let payload = OrderCommandPayload::RecordPayment {
            order_id: "o-1".to_string(),
            payment: PaymentInput::new(super::super::types::PaymentMethod::Cash, 10.0),
        };
        let a = OrderCommand::new(actor.clone(), payload.clone());
        let b = OrderCommand::new(actor, payload);
        assert_ne!(a.command_id, b.command_id);
        assert_eq!(
            a.payload.in_place_action(),
            Some(WorkflowAction::RecordPayment)
        );
    }
}
