//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/health | GET | 健康检查 | 无 |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "sequence": 42, "active_orders": 3 }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | degraded)
    status: &'static str,
    version: &'static str,
    /// 全局事件序号 (数据库不可读时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_orders: Option<usize>,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let orders = state.orders.clone();
    let check = tokio::task::spawn_blocking(move || {
        let sequence = orders.get_current_sequence()?;
        let active = orders.get_active_orders()?.len();
        Ok::<_, crate::orders::ManagerError>((sequence, active))
    })
    .await;

    let (status, sequence, active_orders) = match check {
        Ok(Ok((sequence, active))) => ("ok", Some(sequence), Some(active)),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Health check failed");
            ("degraded", None, None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check task failed");
            ("degraded", None, None)
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        sequence,
        active_orders,
    })
}
