//! Order state machine guards
//!
//! The edge table lives in `shared::order::workflow`; this module resolves a
//! requested move against it and checks the actor's role. Payload guards
//! that depend on the edge live in the transition action.

use shared::order::{
    OrderSnapshot, OrderState, Role, Transition, WorkflowAction, find_transition, is_permitted,
    role_may,
};

use super::traits::OrderError;

/// Resolve `snapshot.state -> target` to an edge of the machine
///
/// Terminal sources, same-state moves and skipped states all fail with
/// `InvalidTransition`; no move is ever silently ignored.
pub fn resolve_transition(
    snapshot: &OrderSnapshot,
    target: OrderState,
) -> Result<&'static Transition, OrderError> {
    let from = snapshot.state;
    if from.is_terminal() {
        return Err(OrderError::transition(
            from,
            target,
            format!("order {} is closed", snapshot.folio),
        ));
    }
    if from == target {
        return Err(OrderError::transition(from, target, "order is already in that state"));
    }
    find_transition(snapshot.service_kind, from, target).ok_or_else(|| {
        OrderError::transition(
            from,
            target,
            format!("no such edge for {} orders", snapshot.service_kind),
        )
    })
}

/// Role check for an edge that is already known to exist
pub fn authorize_transition(role: Role, transition: &Transition) -> Result<(), OrderError> {
    if !role_may(role, transition.action) {
        return Err(OrderError::Forbidden {
            role,
            state: transition.from,
            action: transition.action,
        });
    }
    Ok(())
}

/// Role and state check for an in-place action
///
/// Terminal orders reject every in-place action as `InvalidTransition`, so
/// callers see the same error whichever way they try to touch a closed order.
pub fn authorize_in_place(
    role: Role,
    snapshot: &OrderSnapshot,
    action: WorkflowAction,
) -> Result<(), OrderError> {
    if snapshot.state.is_terminal() {
        return Err(OrderError::transition(
            snapshot.state,
            snapshot.state,
            format!("order {} is closed", snapshot.folio),
        ));
    }
    if !role_may(role, action) {
        return Err(OrderError::Forbidden {
            role,
            state: snapshot.state,
            action,
        });
    }
    if !is_permitted(role, snapshot.state, snapshot.service_kind, action) {
        return Err(OrderError::InvalidOperation(format!(
            "{action} is not available while the order is {}",
            snapshot.state
        )));
    }
    Ok(())
}

/// Non-blank text supplied for a required field
pub fn require_text(
    value: Option<&str>,
    from: OrderState,
    to: OrderState,
    field: &str,
) -> Result<String, OrderError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(OrderError::transition(from, to, format!("{field} is required"))),
    }
}
