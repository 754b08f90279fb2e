//! Inventory API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::order::{Reservation, Role, StockLevel};

use crate::api::ActorHeaders;
use crate::core::ServerState;
use crate::inventory::InventoryError;
use crate::orders::{ManagerError, OrderError, StorageError};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ReceiveStockRequest {
    pub product_id: String,
    pub branch: String,
    pub quantity: u32,
}

/// Stock position plus the reservations holding it
#[derive(Debug, Serialize)]
pub struct StockView {
    pub product_id: String,
    pub branch: String,
    pub on_hand: u32,
    pub reserved: u32,
    pub available: u32,
    pub open_reservations: Vec<Reservation>,
}

fn inventory_error(err: InventoryError) -> AppError {
    match err {
        InventoryError::InvalidQuantity => AppError::validation(err.to_string()),
        InventoryError::Storage(e) => ManagerError::Storage(e).into(),
        other => ManagerError::from(OrderError::from(other)).into(),
    }
}

/// Add received units to a branch's stock
pub async fn receive_stock(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Json(req): Json<ReceiveStockRequest>,
) -> AppResult<Json<StockLevel>> {
    if actor.role == Role::Technician {
        return Err(AppError::forbidden("technicians cannot receive stock"));
    }
    let branch = req.branch.trim().to_uppercase();
    if req.product_id.trim().is_empty() || branch.is_empty() {
        return Err(AppError::validation("product_id and branch are required"));
    }

    let inventory = state.orders.inventory().clone();
    let product_id = req.product_id.trim().to_string();
    let level = tokio::task::spawn_blocking(move || {
        inventory.receive_stock(&product_id, &branch, req.quantity)
    })
    .await
    .map_err(|e| AppError::internal(format!("inventory task failed: {e}")))?
    .map_err(inventory_error)?;

    tracing::info!(actor_id = %actor.id, product_id = %req.product_id, "Stock received via API");
    Ok(Json(level))
}

/// Current stock of one product at one branch
pub async fn stock_level(
    State(state): State<ServerState>,
    ActorHeaders(_actor): ActorHeaders,
    Path((product, branch)): Path<(String, String)>,
) -> AppResult<Json<StockView>> {
    let inventory = state.orders.inventory().clone();
    let branch = branch.trim().to_uppercase();
    let (product_id, branch_key) = (product.clone(), branch.clone());
    let (level, reservations) = tokio::task::spawn_blocking(move || {
        let level = inventory.stock_level(&product_id, &branch_key)?;
        let reservations = inventory.reservations_for_product(&product_id, &branch_key)?;
        Ok::<_, StorageError>((level, reservations))
    })
    .await
    .map_err(|e| AppError::internal(format!("inventory task failed: {e}")))?
    .map_err(|e| AppError::from(ManagerError::from(e)))?;

    Ok(Json(StockView {
        product_id: product,
        branch,
        on_hand: level.on_hand,
        reserved: level.reserved,
        available: level.available(),
        open_reservations: reservations.into_iter().filter(Reservation::is_open).collect(),
    }))
}
