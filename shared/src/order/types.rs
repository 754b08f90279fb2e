//! Shared types for service orders

use super::state::OrderState;
use super::workflow::{AllowedAction, Role};
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};

// ============================================================================
// Actor
// ============================================================================

/// Who is asking. Identity and role come from the external auth layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

// ============================================================================
// Line Items
// ============================================================================

/// 明细类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemKind {
    #[default]
    Service,
    Part,
    Package,
}

/// Priced line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Server-generated line ID
    pub line_id: String,
    pub kind: LineItemKind,
    /// Catalog SKU, absent for manually priced lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub description: String,
    pub unit_price: f64,
    /// Unit cost, for margin reporting
    #[serde(default)]
    pub unit_cost: f64,
    pub quantity: i32,
    #[serde(default)]
    pub warranty_days: u32,
}

/// Line item input - either a catalog SKU or a manually priced line
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LineItemInput {
    /// Catalog SKU; price, cost and warranty come from the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<LineItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    pub quantity: i32,
}

impl LineItemInput {
    /// Catalog line
    pub fn sku(sku: impl Into<String>, quantity: i32) -> Self {
        Self {
            sku: Some(sku.into()),
            quantity,
            ..Default::default()
        }
    }

    /// Manually priced line
    pub fn manual(
        kind: LineItemKind,
        description: impl Into<String>,
        unit_price: f64,
        quantity: i32,
    ) -> Self {
        Self {
            sku: None,
            kind: Some(kind),
            description: Some(description.into()),
            unit_price: Some(unit_price),
            unit_cost: None,
            quantity,
        }
    }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Check,
}

/// Payment input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PaymentInput {
    pub fn new(method: PaymentMethod, amount: f64) -> Self {
        Self {
            method,
            amount,
            note: None,
        }
    }
}

/// Payment record in snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub method: PaymentMethod,
    pub amount: f64,
    pub timestamp: i64,
    /// Actor who recorded the payment
    pub recorded_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Per-method payment totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSummaryItem {
    pub method: PaymentMethod,
    pub amount: f64,
}

// ============================================================================
// Transition payload
// ============================================================================

/// Data supplied with a transition request
///
/// Which fields are required depends on the edge being taken.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransitionPayload {
    /// Estimated completion (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_cost: Option<f64>,
    /// Description of the work performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_performed: Option<String>,
    /// Payment captured at delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============================================================================
// Inventory reservations
// ============================================================================

/// Material request for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationInput {
    pub product_id: String,
    pub quantity: u32,
    /// Branch holding the stock; defaults to the order's branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// When the technician expects to use it (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_use_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Open,
    Consumed,
    Released,
}

/// A hold against stock tied to one order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub reservation_id: String,
    pub order_id: String,
    pub product_id: String,
    pub branch: String,
    pub quantity: u32,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_use_at: Option<i64>,
    pub status: ReservationStatus,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl Reservation {
    pub fn is_open(&self) -> bool {
        self.status == ReservationStatus::Open
    }
}

/// Stock position of one product at one branch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StockLevel {
    pub on_hand: u32,
    /// Held by open reservations
    pub reserved: u32,
}

impl StockLevel {
    pub fn available(&self) -> u32 {
        self.on_hand.saturating_sub(self.reserved)
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Derived financial view of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerSummary {
    pub total: f64,
    pub advance_required: f64,
    pub amount_paid: f64,
    pub balance: f64,
    /// Σ unit_cost × quantity of line items
    pub cost: f64,
    pub margin: f64,
    /// Advance already covered by payments
    pub advance_satisfied: bool,
}

// ============================================================================
// Command responses
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// State after the command, when it touched an order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<OrderState>,
    /// Next actions for the issuing actor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_actions: Vec<AllowedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, order_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            order_id,
            state: None,
            allowed_actions: Vec::new(),
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            order_id: None,
            state: None,
            allowed_actions: Vec::new(),
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self::success(command_id, None)
    }

    pub fn with_next_step(mut self, state: OrderState, allowed: Vec<AllowedAction>) -> Self {
        self.state = Some(state);
        self.allowed_actions = allowed;
        self
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
