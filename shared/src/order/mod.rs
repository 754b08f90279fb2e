//! Service Order Event Sourcing Module
//!
//! This module provides types for the service order workflow:
//! - States: Lifecycle states and service kinds
//! - Workflow: Role-gated transition table and allowed actions
//! - Commands: Requests from clients to modify orders
//! - Events: Immutable facts recorded after command processing
//! - Snapshots: Computed order state from event stream

pub mod command;
pub mod event;
pub mod snapshot;
pub mod state;
pub mod types;
pub mod workflow;

// Re-exports
pub use command::{OrderCommand, OrderCommandPayload};
pub use event::{EventPayload, OrderEvent, OrderEventType};
pub use snapshot::{OrderSnapshot, ReservationRef};
pub use state::{OrderState, ServiceKind, Stage};
pub use types::*;
pub use workflow::{
    AllowedAction, Role, TRANSITIONS, Transition, WorkflowAction, allowed_actions,
    find_transition, is_permitted, role_may,
};
