//! Core traits for the action/applier architecture
//!
//! - [`CommandHandler`]: turns a command into events, may touch inventory
//! - [`EventApplier`]: folds one event into a snapshot (pure)
//! - [`CommandContext`]: everything a handler can see inside the write transaction

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::error::ErrorCode;
use shared::order::{
    OrderEvent, OrderSnapshot, OrderState, Reservation, Role, WorkflowAction,
};
use std::collections::HashMap;
use thiserror::Error;

use super::ledger::LedgerPolicy;
use super::storage::{OrderStorage, StorageError};
use crate::catalog::{CatalogEntry, CatalogProvider};
use crate::inventory::{InventoryError, InventoryService, ReserveRequest};

/// Domain errors raised while handling a command
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("{role} may not {action} an order in {state}")]
    Forbidden {
        role: Role,
        state: OrderState,
        action: WorkflowAction,
    },

    #[error("Invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: OrderState,
        to: OrderState,
        reason: String,
    },

    #[error(
        "Insufficient stock for {product_id} at {branch}: requested {requested}, available {available}"
    )]
    StockInsufficient {
        product_id: String,
        branch: String,
        requested: u32,
        available: u32,
    },

    #[error("Payment {amount:.2} exceeds outstanding balance {balance:.2}")]
    Overpayment { amount: f64, balance: f64 },

    #[error("Order {order_id} changed concurrently: expected version {expected}, found {actual}")]
    PersistenceConflict {
        order_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation {0} is no longer open")]
    ReservationClosed(String),

    #[error("Catalog item not found: {0}")]
    CatalogItemNotFound(String),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderError {
    /// Invalid transition out of `from`, with a human-readable reason
    pub fn transition(from: OrderState, to: OrderState, reason: impl Into<String>) -> Self {
        OrderError::InvalidTransition {
            from,
            to,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::Forbidden { .. } => ErrorCode::PermissionDenied,
            OrderError::InvalidTransition { from, .. } if from.is_terminal() => {
                ErrorCode::OrderTerminal
            }
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            OrderError::StockInsufficient { .. } => ErrorCode::StockInsufficient,
            OrderError::Overpayment { .. } => ErrorCode::Overpayment,
            OrderError::PersistenceConflict { .. } => ErrorCode::PersistenceConflict,
            OrderError::ReservationNotFound(_) => ErrorCode::ReservationNotFound,
            OrderError::ReservationClosed(_) => ErrorCode::ReservationClosed,
            OrderError::CatalogItemNotFound(_) => ErrorCode::CatalogItemNotFound,
            OrderError::InvalidAmount => ErrorCode::InvalidAmount,
            OrderError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            OrderError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            other => OrderError::Storage(other.to_string()),
        }
    }
}

impl From<InventoryError> for OrderError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::StockInsufficient {
                product_id,
                branch,
                requested,
                available,
            } => OrderError::StockInsufficient {
                product_id,
                branch,
                requested,
                available,
            },
            InventoryError::ReservationNotFound(id) => OrderError::ReservationNotFound(id),
            InventoryError::ReservationClosed(id) => OrderError::ReservationClosed(id),
            InventoryError::InvalidQuantity => {
                OrderError::InvalidOperation("quantity must be positive".to_string())
            }
            InventoryError::Storage(e) => OrderError::Storage(e.to_string()),
        }
    }
}

/// Who issued the command and when
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub role: Role,
    /// Client timestamp (Unix millis)
    pub timestamp: i64,
}

/// Command handler - validates a command and produces events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError>;
}

/// Event applier - folds one event into a snapshot
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent);
}

/// Execution context handed to command handlers
///
/// Holds the open write transaction. Snapshots loaded or saved here are
/// cached until the manager persists them; inventory calls write straight
/// into the transaction, so an error anywhere discards them together.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    inventory: Option<&'a dyn InventoryService>,
    catalog: Option<&'a dyn CatalogProvider>,
    policy: LedgerPolicy,
    sequence: u64,
    snapshots: HashMap<String, OrderSnapshot>,
    modified: Vec<String>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            inventory: None,
            catalog: None,
            policy: LedgerPolicy::default(),
            sequence: current_sequence,
            snapshots: HashMap::new(),
            modified: Vec::new(),
        }
    }

    pub fn with_inventory(mut self, inventory: &'a dyn InventoryService) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_catalog(mut self, catalog: &'a dyn CatalogProvider) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    // ========== Sequence ==========

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    // ========== Snapshots ==========

    /// Load a snapshot, preferring the copy already modified in this command
    pub fn load_snapshot(&self, order_id: &str) -> Result<OrderSnapshot, OrderError> {
        if let Some(snapshot) = self.snapshots.get(order_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_snapshot_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub fn save_snapshot(&mut self, snapshot: OrderSnapshot) {
        if !self.modified.contains(&snapshot.order_id) {
            self.modified.push(snapshot.order_id.clone());
        }
        self.snapshots.insert(snapshot.order_id.clone(), snapshot);
    }

    /// Snapshots touched by this command, in first-touch order
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.modified.iter().filter_map(|id| self.snapshots.get(id))
    }

    // ========== Folio ==========

    pub fn next_folio(&self, branch: &str) -> Result<String, OrderError> {
        Ok(self.storage.next_folio(self.txn, branch)?)
    }

    // ========== Catalog ==========

    pub fn lookup_catalog(&self, sku: &str) -> Result<CatalogEntry, OrderError> {
        self.catalog
            .and_then(|c| c.lookup(sku))
            .ok_or_else(|| OrderError::CatalogItemNotFound(sku.to_string()))
    }

    // ========== Inventory ==========

    fn inventory(&self) -> Result<&'a dyn InventoryService, OrderError> {
        self.inventory.ok_or_else(|| {
            OrderError::InvalidOperation("inventory service not configured".to_string())
        })
    }

    pub fn reserve(&self, request: ReserveRequest) -> Result<Reservation, OrderError> {
        Ok(self.inventory()?.reserve(self.txn, request)?)
    }

    /// Consume every open reservation of an order, returning their IDs
    pub fn consume_open_reservations(&self, order_id: &str) -> Result<Vec<String>, OrderError> {
        let Some(inventory) = self.inventory else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for reservation in inventory.open_reservations(self.txn, order_id)? {
            inventory.consume(self.txn, &reservation.reservation_id)?;
            ids.push(reservation.reservation_id);
        }
        Ok(ids)
    }

    /// Release every open reservation of an order, returning their IDs
    pub fn release_open_reservations(&self, order_id: &str) -> Result<Vec<String>, OrderError> {
        let Some(inventory) = self.inventory else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for reservation in inventory.open_reservations(self.txn, order_id)? {
            inventory.release(self.txn, &reservation.reservation_id)?;
            ids.push(reservation.reservation_id);
        }
        Ok(ids)
    }
}
