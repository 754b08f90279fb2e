//! Service Order Module
//!
//! Event-sourced lifecycle of repair orders:
//!
//! - **state_machine**: Edge resolution and role checks over the workflow table
//! - **actions**: Command handlers that validate and emit events
//! - **appliers**: Event handlers that fold events into snapshots
//! - **ledger**: Totals, advances, balances and payment guards
//! - **manager**: OrderOrchestrator, the single entry point for changes
//! - **storage**: redb persistence for events, snapshots and indices
//!
//! # Architecture
//!
//! ```text
//! OrderCommand → OrderOrchestrator → OrderEvent(s) → Storage (redb)
//!                       │                 │
//!                 InventoryStore     Snapshot update
//!                 (same txn)              │
//!                                     Broadcast → NotificationWorker
//! ```

// enum_dispatch registers `EventApplier` here before `appliers` names it
pub mod traits;

pub mod actions;
pub mod appliers;
pub mod ledger;
pub mod manager;
pub mod money;
pub mod state_machine;
pub mod storage;

// Re-exports
pub use ledger::{BranchPolicies, LedgerPolicy};
pub use manager::{ManagerError, ManagerResult, NewOrder, OrderOrchestrator, TransitionOutcome};
pub use storage::{OrderStorage, StorageError};
pub use traits::OrderError;

// Re-export shared types for convenience
pub use shared::order::{
    Actor, CommandError, CommandResponse, EventPayload, OrderCommand, OrderCommandPayload,
    OrderEvent, OrderEventType, OrderSnapshot, OrderState, Role, ServiceKind, TransitionPayload,
};
