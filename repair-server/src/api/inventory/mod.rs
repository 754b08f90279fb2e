//! Inventory API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/inventory/stock | POST | 入库 (管理员/前台) |
//! | /api/inventory/{product}/{branch} | GET | 库存与预留 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Inventory router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/inventory", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/stock", post(handler::receive_stock))
        .route("/{product}/{branch}", get(handler::stock_level))
}
