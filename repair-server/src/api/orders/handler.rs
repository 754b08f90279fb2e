//! Order API Handlers
//!
//! The orchestrator runs synchronous redb transactions, so every call is
//! moved onto the blocking pool.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::order::{
    AllowedAction, LineItemInput, OrderEvent, OrderSnapshot, OrderState, PaymentInput,
    ReservationInput, ServiceKind, TransitionPayload,
};

use crate::api::ActorHeaders;
use crate::core::ServerState;
use crate::orders::{ManagerResult, NewOrder, OrderOrchestrator, TransitionOutcome};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Run an orchestrator call on the blocking pool
async fn run_blocking<T, F>(state: &ServerState, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&OrderOrchestrator) -> ManagerResult<T> + Send + 'static,
{
    let orders = state.orders.clone();
    tokio::task::spawn_blocking(move || f(&orders))
        .await
        .map_err(|e| AppError::internal(format!("order task failed: {e}")))?
        .map_err(AppError::from)
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Defaults to the configured branch
    #[serde(default)]
    pub branch: Option<String>,
    pub service_kind: ServiceKind,
    pub reported_problem: String,
    pub client_id: String,
    pub equipment_id: String,
    #[serde(default)]
    pub technician_id: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

/// Open a new order
pub async fn create(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<Json<TransitionOutcome>> {
    let branch = req
        .branch
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| state.config.default_branch.clone());
    let order = NewOrder {
        branch,
        service_kind: req.service_kind,
        reported_problem: req.reported_problem,
        client_id: req.client_id,
        equipment_id: req.equipment_id,
        technician_id: req.technician_id,
        items: req.items,
    };
    let outcome = run_blocking(&state, move |o| o.create_order(&actor, order)).await?;
    Ok(Json(outcome))
}

/// Active (non-terminal) orders
pub async fn list_active(
    State(state): State<ServerState>,
    ActorHeaders(_actor): ActorHeaders,
) -> AppResult<Json<Vec<OrderSnapshot>>> {
    let orders = run_blocking(&state, |o| o.get_active_orders()).await?;
    Ok(Json(orders))
}

/// Order with its ledger and the caller's allowed actions
pub async fn get_by_id(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = run_blocking(&state, move |o| o.view_order(&id, actor.role)).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target_state: OrderState,
    #[serde(default, flatten)]
    pub payload: TransitionPayload,
    /// Snapshot version the caller last saw
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Move an order to another state
pub async fn transition(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = run_blocking(&state, move |o| {
        o.apply_transition(&id, &actor, req.target_state, req.payload, req.expected_version)
    })
    .await?;
    Ok(Json(outcome))
}

pub async fn record_payment(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
    Json(payment): Json<PaymentInput>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = run_blocking(&state, move |o| o.record_payment(&id, &actor, payment)).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<LineItemInput>,
}

pub async fn add_items(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> AppResult<Json<TransitionOutcome>> {
    if req.items.is_empty() {
        return Err(AppError::validation("items must not be empty"));
    }
    let outcome = run_blocking(&state, move |o| o.add_line_items(&id, &actor, req.items)).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ReviseQuoteRequest {
    pub quoted_cost: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn revise_quote(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
    Json(req): Json<ReviseQuoteRequest>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = run_blocking(&state, move |o| {
        o.revise_quote(&id, &actor, req.quoted_cost, req.reason)
    })
    .await?;
    Ok(Json(outcome))
}

pub async fn reserve_material(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
    Json(reservation): Json<ReservationInput>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome =
        run_blocking(&state, move |o| o.reserve_material(&id, &actor, reservation)).await?;
    Ok(Json(outcome))
}

pub async fn allowed_actions(
    State(state): State<ServerState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<AllowedAction>>> {
    let actions = run_blocking(&state, move |o| o.allowed_actions_for(&id, actor.role)).await?;
    Ok(Json(actions))
}

/// Event stream of one order, oldest first
pub async fn events(
    State(state): State<ServerState>,
    ActorHeaders(_actor): ActorHeaders,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<OrderEvent>>> {
    let order_id = id.clone();
    let events = run_blocking(&state, move |o| o.get_events_for_order(&order_id)).await?;
    if events.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::OrderNotFound,
            format!("Order not found: {id}"),
        ));
    }
    Ok(Json(events))
}
