//! redb-backed inventory store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `inventory_stock` | `(product_id, branch)` | `StockLevel` | On-hand and reserved units |
//! | `inventory_reservations` | `reservation_id` | `Reservation` | All holds, any status |
//! | `order_reservations` | `(order_id, reservation_id)` | `()` | Per-order index |
//!
//! Shares the order database. redb runs one write transaction at a time, so
//! the availability check and the increment of `reserved` in [`reserve`]
//! cannot interleave with another reservation.
//!
//! [`reserve`]: InventoryService::reserve

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::{Reservation, ReservationStatus, StockLevel};
use std::sync::Arc;

use super::{InventoryError, InventoryResult, InventoryService, ReserveRequest};
use crate::orders::storage::{StorageError, StorageResult};

const STOCK_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("inventory_stock");

const RESERVATIONS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("inventory_reservations");

const ORDER_RESERVATIONS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("order_reservations");

/// Inventory persisted next to the orders
#[derive(Clone)]
pub struct InventoryStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryStore").finish_non_exhaustive()
    }
}

impl InventoryStore {
    /// Attach to an open database, creating the inventory tables if missing
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(STOCK_TABLE)?;
            let _ = txn.open_table(RESERVATIONS_TABLE)?;
            let _ = txn.open_table(ORDER_RESERVATIONS_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    // ========== Table helpers ==========

    fn load_level(
        txn: &WriteTransaction,
        product_id: &str,
        branch: &str,
    ) -> StorageResult<StockLevel> {
        let table = txn.open_table(STOCK_TABLE)?;
        match table.get((product_id, branch))? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(StockLevel::default()),
        }
    }

    fn store_level(
        txn: &WriteTransaction,
        product_id: &str,
        branch: &str,
        level: &StockLevel,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        let value = serde_json::to_vec(level)?;
        table.insert((product_id, branch), value.as_slice())?;
        Ok(())
    }

    fn load_reservation(
        txn: &WriteTransaction,
        reservation_id: &str,
    ) -> StorageResult<Option<Reservation>> {
        let table = txn.open_table(RESERVATIONS_TABLE)?;
        match table.get(reservation_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn store_reservation(txn: &WriteTransaction, reservation: &Reservation) -> StorageResult<()> {
        let mut table = txn.open_table(RESERVATIONS_TABLE)?;
        let value = serde_json::to_vec(reservation)?;
        table.insert(reservation.reservation_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Close an open reservation, adjusting stock for the given outcome
    fn close(
        &self,
        txn: &WriteTransaction,
        reservation_id: &str,
        status: ReservationStatus,
    ) -> InventoryResult<Reservation> {
        let mut reservation = Self::load_reservation(txn, reservation_id)?
            .ok_or_else(|| InventoryError::ReservationNotFound(reservation_id.to_string()))?;
        if !reservation.is_open() {
            return Err(InventoryError::ReservationClosed(reservation_id.to_string()));
        }

        let mut level = Self::load_level(txn, &reservation.product_id, &reservation.branch)?;
        level.reserved = level.reserved.saturating_sub(reservation.quantity);
        if status == ReservationStatus::Consumed {
            level.on_hand = level.on_hand.saturating_sub(reservation.quantity);
        }
        Self::store_level(txn, &reservation.product_id, &reservation.branch, &level)?;

        reservation.status = status;
        reservation.closed_at = Some(shared::util::now_millis());
        Self::store_reservation(txn, &reservation)?;

        tracing::debug!(
            reservation_id = %reservation_id,
            product_id = %reservation.product_id,
            branch = %reservation.branch,
            quantity = reservation.quantity,
            status = ?status,
            "Reservation closed"
        );
        Ok(reservation)
    }

    // ========== Stock ==========

    /// Add received units to on-hand stock
    pub fn receive_stock(
        &self,
        product_id: &str,
        branch: &str,
        quantity: u32,
    ) -> InventoryResult<StockLevel> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let mut level = Self::load_level(&txn, product_id, branch)?;
        level.on_hand = level.on_hand.saturating_add(quantity);
        Self::store_level(&txn, product_id, branch, &level)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            product_id = %product_id,
            branch = %branch,
            received = quantity,
            on_hand = level.on_hand,
            "Stock received"
        );
        Ok(level)
    }

    /// Current stock position (read-only)
    pub fn stock_level(&self, product_id: &str, branch: &str) -> StorageResult<StockLevel> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        match table.get((product_id, branch))? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(StockLevel::default()),
        }
    }

    // ========== Queries ==========

    /// Every reservation ever made for an order
    pub fn reservations_for_order(&self, order_id: &str) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_RESERVATIONS_TABLE)?;
        let table = read_txn.open_table(RESERVATIONS_TABLE)?;

        let mut reservations = Vec::new();
        for result in index.range((order_id, "")..)? {
            let (key, _) = result?;
            let (owner, reservation_id) = key.value();
            if owner != order_id {
                break;
            }
            if let Some(value) = table.get(reservation_id)? {
                reservations.push(serde_json::from_slice::<Reservation>(value.value())?);
            }
        }

        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    /// Reservations against one product at one branch, across orders
    pub fn reservations_for_product(
        &self,
        product_id: &str,
        branch: &str,
    ) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESERVATIONS_TABLE)?;

        let mut reservations = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let reservation: Reservation = serde_json::from_slice(value.value())?;
            if reservation.product_id == product_id && reservation.branch == branch {
                reservations.push(reservation);
            }
        }

        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }
}

impl InventoryService for InventoryStore {
    fn reserve(
        &self,
        txn: &WriteTransaction,
        request: ReserveRequest,
    ) -> InventoryResult<Reservation> {
        if request.quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }

        let mut level = Self::load_level(txn, &request.product_id, &request.branch)?;
        let available = level.available();
        if request.quantity > available {
            return Err(InventoryError::StockInsufficient {
                product_id: request.product_id,
                branch: request.branch,
                requested: request.quantity,
                available,
            });
        }
        level.reserved += request.quantity;
        Self::store_level(txn, &request.product_id, &request.branch, &level)?;

        let reservation = Reservation {
            reservation_id: uuid::Uuid::new_v4().to_string(),
            order_id: request.order_id,
            product_id: request.product_id,
            branch: request.branch,
            quantity: request.quantity,
            created_by: request.created_by,
            estimated_use_at: request.estimated_use_at,
            status: ReservationStatus::Open,
            created_at: shared::util::now_millis(),
            closed_at: None,
        };
        Self::store_reservation(txn, &reservation)?;
        {
            let mut index = txn
                .open_table(ORDER_RESERVATIONS_TABLE)
                .map_err(StorageError::from)?;
            index
                .insert(
                    (
                        reservation.order_id.as_str(),
                        reservation.reservation_id.as_str(),
                    ),
                    (),
                )
                .map_err(StorageError::from)?;
        }

        tracing::debug!(
            reservation_id = %reservation.reservation_id,
            order_id = %reservation.order_id,
            product_id = %reservation.product_id,
            quantity = reservation.quantity,
            remaining = level.available(),
            "Stock reserved"
        );
        Ok(reservation)
    }

    fn consume(&self, txn: &WriteTransaction, reservation_id: &str) -> InventoryResult<Reservation> {
        self.close(txn, reservation_id, ReservationStatus::Consumed)
    }

    fn release(&self, txn: &WriteTransaction, reservation_id: &str) -> InventoryResult<Reservation> {
        self.close(txn, reservation_id, ReservationStatus::Released)
    }

    fn open_reservations(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> InventoryResult<Vec<Reservation>> {
        let ids: Vec<String> = {
            let index = txn
                .open_table(ORDER_RESERVATIONS_TABLE)
                .map_err(StorageError::from)?;
            let mut ids = Vec::new();
            for result in index.range((order_id, "")..).map_err(StorageError::from)? {
                let (key, _) = result.map_err(StorageError::from)?;
                let (owner, reservation_id) = key.value();
                if owner != order_id {
                    break;
                }
                ids.push(reservation_id.to_string());
            }
            ids
        };

        let mut open = Vec::new();
        for id in ids {
            if let Some(reservation) = Self::load_reservation(txn, &id)?
                && reservation.is_open()
            {
                open.push(reservation);
            }
        }
        open.sort_by_key(|r| r.created_at);
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;

    fn setup() -> (OrderStorage, InventoryStore) {
        let storage = OrderStorage::open_in_memory().unwrap();
        let inventory = InventoryStore::new(storage.database()).unwrap();
        (storage, inventory)
    }

    fn request(order_id: &str, quantity: u32) -> ReserveRequest {
        ReserveRequest {
            order_id: order_id.to_string(),
            product_id: "PART-SSD".to_string(),
            branch: "CENTRO".to_string(),
            quantity,
            created_by: "tech-1".to_string(),
            estimated_use_at: None,
        }
    }

    #[test]
    fn test_reserve_within_availability() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 5).unwrap();

        let txn = storage.begin_write().unwrap();
        let reservation = inventory.reserve(&txn, request("o-1", 3)).unwrap();
        txn.commit().unwrap();

        assert!(reservation.is_open());
        let level = inventory.stock_level("PART-SSD", "CENTRO").unwrap();
        assert_eq!(level.on_hand, 5);
        assert_eq!(level.reserved, 3);
        assert_eq!(level.available(), 2);
    }

    #[test]
    fn test_reserve_rejects_overbooking() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 5).unwrap();

        let txn = storage.begin_write().unwrap();
        inventory.reserve(&txn, request("o-1", 5)).unwrap();
        let err = inventory.reserve(&txn, request("o-2", 1)).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::StockInsufficient { requested: 1, available: 0, .. }
        ));
    }

    #[test]
    fn test_consume_decrements_on_hand() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 5).unwrap();

        let txn = storage.begin_write().unwrap();
        let r = inventory.reserve(&txn, request("o-1", 2)).unwrap();
        let consumed = inventory.consume(&txn, &r.reservation_id).unwrap();
        assert_eq!(consumed.status, ReservationStatus::Consumed);
        assert!(inventory.open_reservations(&txn, "o-1").unwrap().is_empty());
        txn.commit().unwrap();

        let level = inventory.stock_level("PART-SSD", "CENTRO").unwrap();
        assert_eq!(level.on_hand, 3);
        assert_eq!(level.reserved, 0);
    }

    #[test]
    fn test_release_returns_units() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 5).unwrap();

        let txn = storage.begin_write().unwrap();
        let r = inventory.reserve(&txn, request("o-1", 4)).unwrap();
        inventory.release(&txn, &r.reservation_id).unwrap();
        let err = inventory.release(&txn, &r.reservation_id).unwrap_err();
        assert!(matches!(err, InventoryError::ReservationClosed(_)));
        txn.commit().unwrap();

        let level = inventory.stock_level("PART-SSD", "CENTRO").unwrap();
        assert_eq!(level.on_hand, 5);
        assert_eq!(level.available(), 5);
    }

    #[test]
    fn test_open_reservations_scoped_to_order() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        inventory.reserve(&txn, request("o-1", 1)).unwrap();
        inventory.reserve(&txn, request("o-1", 2)).unwrap();
        inventory.reserve(&txn, request("o-10", 3)).unwrap();
        assert_eq!(inventory.open_reservations(&txn, "o-1").unwrap().len(), 2);
        txn.commit().unwrap();

        assert_eq!(inventory.reservations_for_order("o-10").unwrap().len(), 1);
        assert_eq!(
            inventory
                .reservations_for_product("PART-SSD", "CENTRO")
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_aborted_reserve_leaves_stock_untouched() {
        let (storage, inventory) = setup();
        inventory.receive_stock("PART-SSD", "CENTRO", 5).unwrap();
        {
            let txn = storage.begin_write().unwrap();
            inventory.reserve(&txn, request("o-1", 5)).unwrap();
        }
        assert_eq!(
            inventory.stock_level("PART-SSD", "CENTRO").unwrap().available(),
            5
        );
        assert!(inventory.reservations_for_order("o-1").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_reservation() {
        let (storage, inventory) = setup();
        let txn = storage.begin_write().unwrap();
        assert!(matches!(
            inventory.consume(&txn, "nope"),
            Err(InventoryError::ReservationNotFound(_))
        ));
    }
}
