//! Service Order API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | POST | 开单 |
//! | /api/orders | GET | 进行中的订单 |
//! | /api/orders/{id} | GET | 订单、账本和可执行操作 |
//! | /api/orders/{id}/transitions | POST | 状态流转 |
//! | /api/orders/{id}/payments | POST | 收款 |
//! | /api/orders/{id}/items | POST | 追加明细 |
//! | /api/orders/{id}/quote | POST | 修改报价 |
//! | /api/orders/{id}/reservations | POST | 预留物料 |
//! | /api/orders/{id}/actions | GET | 当前角色可执行操作 |
//! | /api/orders/{id}/events | GET | 事件流 (审计) |
//!
//! All mutations go through OrderOrchestrator.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list_active))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/transitions", post(handler::transition))
        .route("/{id}/payments", post(handler::record_payment))
        .route("/{id}/items", post(handler::add_items))
        .route("/{id}/quote", post(handler::revise_quote))
        .route("/{id}/reservations", post(handler::reserve_material))
        .route("/{id}/actions", get(handler::allowed_actions))
        .route("/{id}/events", get(handler::events))
}
