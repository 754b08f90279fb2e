//! Order events - immutable facts recorded after command processing

use super::state::{OrderState, ServiceKind};
use super::types::{LineItem, PaymentMethod};
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Server timestamp (Unix milliseconds), authoritative for state evolution
    pub timestamp: i64,
    /// Client timestamp (Unix milliseconds), kept for audit only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Actor who triggered this event
    pub actor_id: String,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: OrderEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    // Lifecycle
    OrderCreated,
    StateChanged,
    EstimatedCompletionSet,

    // Diagnosis / quote
    DiagnosisRecorded,
    QuoteRevised,
    WorkPerformedRecorded,

    // Items
    LineItemsAdded,

    // Payments
    PaymentRecorded,

    // Inventory
    MaterialReserved,
    ReservationsConsumed,
    ReservationsReleased,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::StateChanged => write!(f, "STATE_CHANGED"),
            OrderEventType::EstimatedCompletionSet => write!(f, "ESTIMATED_COMPLETION_SET"),
            OrderEventType::DiagnosisRecorded => write!(f, "DIAGNOSIS_RECORDED"),
            OrderEventType::QuoteRevised => write!(f, "QUOTE_REVISED"),
            OrderEventType::WorkPerformedRecorded => write!(f, "WORK_PERFORMED_RECORDED"),
            OrderEventType::LineItemsAdded => write!(f, "LINE_ITEMS_ADDED"),
            OrderEventType::PaymentRecorded => write!(f, "PAYMENT_RECORDED"),
            OrderEventType::MaterialReserved => write!(f, "MATERIAL_RESERVED"),
            OrderEventType::ReservationsConsumed => write!(f, "RESERVATIONS_CONSUMED"),
            OrderEventType::ReservationsReleased => write!(f, "RESERVATIONS_RELEASED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    OrderCreated {
        /// Server-generated folio (always present)
        folio: String,
        service_kind: ServiceKind,
        branch: String,
        reported_problem: String,
        client_id: String,
        equipment_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        technician_id: Option<String>,
        #[serde(default)]
        line_items: Vec<LineItem>,
        /// Branch diagnosis fee in force at intake (zero for specific-service orders)
        #[serde(default)]
        diagnosis_fee: f64,
    },

    StateChanged {
        from: OrderState,
        to: OrderState,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },

    EstimatedCompletionSet {
        estimated_completion: i64,
    },

    // ========== Diagnosis / quote ==========
    DiagnosisRecorded {
        diagnosis: String,
        quoted_cost: f64,
    },

    QuoteRevised {
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_cost: Option<f64>,
        quoted_cost: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    WorkPerformedRecorded {
        work_performed: String,
    },

    // ========== Items ==========
    LineItemsAdded {
        items: Vec<LineItem>,
    },

    // ========== Payments ==========
    PaymentRecorded {
        payment_id: String,
        method: PaymentMethod,
        amount: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },

    // ========== Inventory ==========
    MaterialReserved {
        reservation_id: String,
        product_id: String,
        branch: String,
        quantity: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        estimated_use_at: Option<i64>,
    },

    ReservationsConsumed {
        reservation_ids: Vec<String>,
    },

    ReservationsReleased {
        reservation_ids: Vec<String>,
    },
}

impl OrderEvent {
    /// Create a new event
    ///
    /// # Arguments
    /// * `sequence` - Global sequence number (authoritative ordering)
    /// * `order_id` - Order this event belongs to
    /// * `actor_id` - Actor who triggered this event
    /// * `actor_name` - Actor name (snapshot for audit)
    /// * `command_id` - Command that triggered this event
    /// * `client_timestamp` - Client-provided timestamp (for audit, may have clock skew)
    /// * `event_type` - Event type
    /// * `payload` - Event payload
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        order_id: String,
        actor_id: String,
        actor_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: OrderEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            client_timestamp,
            actor_id,
            actor_name,
            command_id,
            event_type,
            payload,
        }
    }

    /// Create event from command (extracts actor and client timestamp)
    pub fn from_command(
        sequence: u64,
        order_id: String,
        command: &super::OrderCommand,
        event_type: OrderEventType,
        payload: EventPayload,
    ) -> Self {
        Self::new(
            sequence,
            order_id,
            command.actor.id.clone(),
            command.actor.name.clone(),
            command.command_id.clone(),
            Some(command.timestamp),
            event_type,
            payload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_tagged() {
        let payload = EventPayload::StateChanged {
            from: OrderState::InRepair,
            to: OrderState::RepairCompleted,
            note: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "STATE_CHANGED");
        assert_eq!(json["to"], "REPAIR_COMPLETED");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_event_type_display_matches_serde() {
        let ty = OrderEventType::ReservationsConsumed;
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, format!("\"{}\"", ty));
    }
}
