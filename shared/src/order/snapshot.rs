//! Order snapshot - computed state from event stream

use super::state::{OrderState, ServiceKind, Stage};
use super::types::{LineItem, PaymentRecord};
use serde::{Deserialize, Serialize};

/// Open reservation held by an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationRef {
    pub reservation_id: String,
    pub product_id: String,
    pub branch: String,
    pub quantity: u32,
}

/// Service order snapshot - computed from event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Order ID (assigned by server)
    pub order_id: String,
    /// Human-readable folio, `{BRANCH}-{NNNNNN}`
    pub folio: String,
    pub state: OrderState,
    pub service_kind: ServiceKind,
    pub branch: String,
    pub reported_problem: String,
    /// Technician findings, set when diagnosis completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Quoted repair cost, diagnosis-kind orders only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_cost: Option<f64>,
    /// Diagnosis fee charged at intake, stands in for the quote until one exists
    #[serde(default)]
    pub diagnosis_fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<String>,
    pub client_id: String,
    pub equipment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_performed: Option<String>,
    /// Priced lines
    pub line_items: Vec<LineItem>,
    /// Payment records
    pub payments: Vec<PaymentRecord>,
    /// Stock held for this order and not yet consumed or released
    #[serde(default)]
    pub open_reservations: Vec<ReservationRef>,
    /// Total amount
    pub total: f64,
    /// Amount paid
    #[serde(default)]
    pub amount_paid: f64,
    /// total - amount_paid
    #[serde(default)]
    pub balance: f64,
    /// Creation timestamp
    pub created_at: i64,
    /// Last update timestamp
    pub updated_at: i64,
    /// Last applied event sequence, doubles as the optimistic-concurrency version
    pub last_sequence: u64,
}

impl OrderSnapshot {
    /// Create a new empty order
    pub fn new(order_id: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            order_id,
            folio: String::new(),
            state: OrderState::AwaitingInitialization,
            service_kind: ServiceKind::Diagnosis,
            branch: String::new(),
            reported_problem: String::new(),
            diagnosis: None,
            quoted_cost: None,
            diagnosis_fee: 0.0,
            technician_id: None,
            client_id: String::new(),
            equipment_id: String::new(),
            estimated_completion: None,
            completed_at: None,
            work_performed: None,
            line_items: Vec::new(),
            payments: Vec::new(),
            open_reservations: Vec::new(),
            total: 0.0,
            amount_paid: 0.0,
            balance: 0.0,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Check if fully paid
    pub fn is_fully_paid(&self) -> bool {
        self.balance <= 0.0
    }
}
