//! Inventory reservation interface
//!
//! The order engine holds, consumes and releases stock through
//! [`InventoryService`]. Every call takes the caller's write transaction so
//! stock movements commit or roll back together with the order change that
//! caused them.

mod store;

pub use shared::order::{Reservation, ReservationStatus, StockLevel};
pub use store::InventoryStore;

use crate::orders::storage::StorageError;
use redb::WriteTransaction;
use thiserror::Error;

/// Inventory errors
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(
        "Insufficient stock for {product_id} at {branch}: requested {requested}, available {available}"
    )]
    StockInsufficient {
        product_id: String,
        branch: String,
        requested: u32,
        available: u32,
    },

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation {0} is no longer open")]
    ReservationClosed(String),

    #[error("Quantity must be positive")]
    InvalidQuantity,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Request to hold stock for an order
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub order_id: String,
    pub product_id: String,
    pub branch: String,
    pub quantity: u32,
    pub created_by: String,
    pub estimated_use_at: Option<i64>,
}

/// Stock holds against an order, run inside the caller's transaction
///
/// `reserve` must be atomic against concurrent reservations on the same
/// product and branch: two holds may never jointly exceed available stock.
pub trait InventoryService: Send + Sync {
    /// Hold `quantity` units, failing when `on_hand - reserved` is short
    fn reserve(&self, txn: &WriteTransaction, request: ReserveRequest)
    -> InventoryResult<Reservation>;

    /// Take reserved units out of stock and close the reservation
    fn consume(&self, txn: &WriteTransaction, reservation_id: &str)
    -> InventoryResult<Reservation>;

    /// Close the reservation and return its units to available stock
    fn release(&self, txn: &WriteTransaction, reservation_id: &str)
    -> InventoryResult<Reservation>;

    /// Reservations of an order that are still open
    fn open_reservations(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> InventoryResult<Vec<Reservation>>;
}
