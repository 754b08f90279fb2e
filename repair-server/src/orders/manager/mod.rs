//! OrderOrchestrator - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional, inventory included)
//! - Snapshot updates
//! - Event broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Load target order, check expected_version
//!     ├─ 4. Create CommandContext (inventory, catalog, branch policy)
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events and snapshots
//!     ├─ 8. Mark command processed
//!     ├─ 9. Commit transaction
//!     ├─ 10. Broadcast event(s)
//!     └─ 11. Return response
//! ```
//!
//! Any error before step 9 drops the write transaction, which discards the
//! order change together with every stock movement it made.

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::{self, EventAction};
use super::ledger::{self, BranchPolicies, LedgerPolicy};
use super::storage::{OrderStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier, OrderError};
use crate::catalog::{CatalogProvider, InMemoryCatalog};
use crate::inventory::{InventoryStore, Reservation};
use parking_lot::RwLock;
use serde::Serialize;
use shared::order::{
    Actor, AllowedAction, CommandResponse, LedgerSummary, LineItemInput, OrderCommand,
    OrderCommandPayload, OrderEvent, OrderEventType, OrderSnapshot, OrderState, PaymentInput,
    ReservationInput, Role, ServiceKind, TransitionPayload, allowed_actions,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// What a caller sees after a successful change
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub order: OrderSnapshot,
    pub ledger: LedgerSummary,
    /// Actions the same actor may take next
    pub allowed_actions: Vec<AllowedAction>,
}

/// Intake data for a new order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub branch: String,
    pub service_kind: ServiceKind,
    pub reported_problem: String,
    pub client_id: String,
    pub equipment_id: String,
    pub technician_id: Option<String>,
    pub items: Vec<LineItemInput>,
}

/// Result of a committed command
struct Processed {
    response: CommandResponse,
    events: Vec<OrderEvent>,
    order: Option<OrderSnapshot>,
}

/// OrderOrchestrator for command processing
#[derive(Clone)]
pub struct OrderOrchestrator {
    storage: OrderStorage,
    inventory: InventoryStore,
    catalog: Arc<dyn CatalogProvider>,
    policies: Arc<RwLock<BranchPolicies>>,
    event_tx: broadcast::Sender<OrderEvent>,
}

impl std::fmt::Debug for OrderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderOrchestrator")
            .field("storage", &"<OrderStorage>")
            .field("inventory", &self.inventory)
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl OrderOrchestrator {
    /// Create an orchestrator backed by the database at `db_path`
    pub fn new(
        db_path: impl AsRef<Path>,
        catalog: Arc<dyn CatalogProvider>,
        policies: BranchPolicies,
    ) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        let orchestrator = Self::assemble(storage, catalog, policies)?;
        tracing::info!("OrderOrchestrator started");
        Ok(orchestrator)
    }

    /// Create an orchestrator with existing storage and an empty catalog
    pub fn with_storage(storage: OrderStorage) -> ManagerResult<Self> {
        Self::assemble(
            storage,
            Arc::new(InMemoryCatalog::new()),
            BranchPolicies::default(),
        )
    }

    fn assemble(
        storage: OrderStorage,
        catalog: Arc<dyn CatalogProvider>,
        policies: BranchPolicies,
    ) -> ManagerResult<Self> {
        let inventory = InventoryStore::new(storage.database())?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            storage,
            inventory,
            catalog,
            policies: Arc::new(RwLock::new(policies)),
            event_tx,
        })
    }

    /// Replace the catalog used to price new line items
    pub fn set_catalog(&mut self, catalog: Arc<dyn CatalogProvider>) {
        self.catalog = catalog;
    }

    /// Override the ledger policy of one branch
    pub fn set_branch_policy(&self, branch: &str, policy: LedgerPolicy) {
        self.policies.write().set(branch, policy);
    }

    pub fn policy_for(&self, branch: &str) -> LedgerPolicy {
        self.policies.read().for_branch(branch)
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    /// Get the inventory store sharing this orchestrator's database
    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    // ========== Commands ==========

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: OrderCommand) -> CommandResponse {
        let command_id = cmd.command_id.clone();
        match self.process_command(cmd) {
            Ok(processed) => {
                self.broadcast(processed.events);
                processed.response
            }
            Err(err) => {
                tracing::debug!(command_id = %command_id, error = %err, "Command rejected");
                CommandResponse::error(command_id, err.into())
            }
        }
    }

    /// Run a command for one of the typed entry points below
    fn submit(&self, cmd: OrderCommand) -> ManagerResult<TransitionOutcome> {
        let role = cmd.actor.role;
        let target = cmd.payload.order_id().map(str::to_string);
        let processed = self.process_command(cmd)?;
        self.broadcast(processed.events);

        let order = match (processed.order, target) {
            (Some(order), _) => order,
            // Duplicate command: report the order as it stands
            (None, Some(order_id)) => self
                .storage
                .get_snapshot(&order_id)?
                .ok_or(OrderError::OrderNotFound(order_id))?,
            (None, None) => {
                return Err(ManagerError::Order(OrderError::InvalidOperation(
                    "command was already processed".to_string(),
                )));
            }
        };
        Ok(self.outcome(order, role))
    }

    fn broadcast(&self, events: Vec<OrderEvent>) {
        // Broadcast events after successful commit
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::trace!("Event broadcast skipped: no active receivers");
                break;
            }
        }
    }

    fn outcome(&self, order: OrderSnapshot, role: Role) -> TransitionOutcome {
        let policy = self.policy_for(&order.branch);
        TransitionOutcome {
            ledger: ledger::summarize(&order, &policy),
            allowed_actions: allowed_actions(role, order.state, order.service_kind),
            order,
        }
    }

    /// Process command and return response with events
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically
    fn process_command(&self, cmd: OrderCommand) -> ManagerResult<Processed> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok(Processed {
                response: CommandResponse::duplicate(cmd.command_id),
                events: vec![],
                order: None,
            });
        }

        // 2. Begin write transaction (redb admits one writer at a time)
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok(Processed {
                response: CommandResponse::duplicate(cmd.command_id),
                events: vec![],
                order: None,
            });
        }

        // 3. Load the target order and check the version the caller saw
        let branch = match &cmd.payload {
            OrderCommandPayload::CreateOrder { branch, .. } => branch.clone(),
            other => {
                let order_id = other.order_id().unwrap_or_default();
                let snapshot = self
                    .storage
                    .get_snapshot_txn(&txn, order_id)?
                    .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
                if let Some(expected) = cmd.expected_version
                    && expected != snapshot.last_sequence
                {
                    return Err(OrderError::PersistenceConflict {
                        order_id: order_id.to_string(),
                        expected,
                        actual: snapshot.last_sequence,
                    }
                    .into());
                }
                snapshot.branch
            }
        };

        // 4. Create context and metadata
        let current_sequence = self.storage.current_sequence_txn(&txn)?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence)
            .with_inventory(&self.inventory)
            .with_catalog(self.catalog.as_ref())
            .with_policy(self.policy_for(&branch));
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            actor_id: cmd.actor.id.clone(),
            actor_name: cmd.actor.name.clone(),
            role: cmd.actor.role,
            timestamp: cmd.timestamp,
        };

        // 5. Convert to action and execute
        let action: CommandAction = (&cmd).into();
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))?;

        // 6. Apply events to snapshots
        for event in &events {
            let mut snapshot = snapshot_for_event(&ctx, event)?;

            // Apply event using EventApplier
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);

            // Save updated snapshot to context
            ctx.save_snapshot(snapshot);
        }

        // 7. Persist events
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }

        // 8. Persist snapshots and update active order tracking
        let mut order = None;
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(&txn, snapshot)?;
            if snapshot.is_terminal() {
                self.storage.mark_order_inactive(&txn, &snapshot.order_id)?;
            } else {
                self.storage.mark_order_active(&txn, &snapshot.order_id)?;
            }
            order = Some(snapshot.clone());
        }
        drop(ctx);

        // 9. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 10. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 11. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        // 12. Return response
        let order_id = events.first().map(|e| e.order_id.clone());
        tracing::info!(command_id = %cmd.command_id, order_id = ?order_id, event_count = events.len(), "Command processed successfully");

        let mut response = CommandResponse::success(cmd.command_id, order_id);
        if let Some(order) = &order {
            response = response.with_next_step(
                order.state,
                allowed_actions(cmd.actor.role, order.state, order.service_kind),
            );
        }
        Ok(Processed {
            response,
            events,
            order,
        })
    }

    // ========== Typed entry points ==========

    /// Open a new order in `AwaitingInitialization`
    pub fn create_order(&self, actor: &Actor, order: NewOrder) -> ManagerResult<TransitionOutcome> {
        let payload = OrderCommandPayload::CreateOrder {
            branch: order.branch,
            service_kind: order.service_kind,
            reported_problem: order.reported_problem,
            client_id: order.client_id,
            equipment_id: order.equipment_id,
            technician_id: order.technician_id,
            items: order.items,
        };
        self.submit(OrderCommand::new(actor.clone(), payload))
    }

    /// Move an order to `target_state`
    ///
    /// Checks run in order: version, edge, role, payload guards. On success
    /// the returned outcome carries the new snapshot, its ledger and what the
    /// same actor may do next.
    pub fn apply_transition(
        &self,
        order_id: &str,
        actor: &Actor,
        target_state: OrderState,
        payload: TransitionPayload,
        expected_version: Option<u64>,
    ) -> ManagerResult<TransitionOutcome> {
        let mut cmd = OrderCommand::new(
            actor.clone(),
            OrderCommandPayload::ApplyTransition {
                order_id: order_id.to_string(),
                target_state,
                payload,
            },
        );
        cmd.expected_version = expected_version;
        self.submit(cmd)
    }

    pub fn record_payment(
        &self,
        order_id: &str,
        actor: &Actor,
        payment: PaymentInput,
    ) -> ManagerResult<TransitionOutcome> {
        self.submit(OrderCommand::new(
            actor.clone(),
            OrderCommandPayload::RecordPayment {
                order_id: order_id.to_string(),
                payment,
            },
        ))
    }

    pub fn reserve_material(
        &self,
        order_id: &str,
        actor: &Actor,
        reservation: ReservationInput,
    ) -> ManagerResult<TransitionOutcome> {
        self.submit(OrderCommand::new(
            actor.clone(),
            OrderCommandPayload::ReserveMaterial {
                order_id: order_id.to_string(),
                reservation,
            },
        ))
    }

    pub fn add_line_items(
        &self,
        order_id: &str,
        actor: &Actor,
        items: Vec<LineItemInput>,
    ) -> ManagerResult<TransitionOutcome> {
        self.submit(OrderCommand::new(
            actor.clone(),
            OrderCommandPayload::AddLineItems {
                order_id: order_id.to_string(),
                items,
            },
        ))
    }

    pub fn revise_quote(
        &self,
        order_id: &str,
        actor: &Actor,
        quoted_cost: f64,
        reason: Option<String>,
    ) -> ManagerResult<TransitionOutcome> {
        self.submit(OrderCommand::new(
            actor.clone(),
            OrderCommandPayload::ReviseQuote {
                order_id: order_id.to_string(),
                quoted_cost,
                reason,
            },
        ))
    }

    // ========== Public Query Methods ==========

    /// Get a snapshot by order ID
    pub fn get_order(&self, order_id: &str) -> ManagerResult<Option<OrderSnapshot>> {
        Ok(self.storage.get_snapshot(order_id)?)
    }

    /// Snapshot, ledger and allowed actions of an order as seen by `role`
    pub fn view_order(&self, order_id: &str, role: Role) -> ManagerResult<TransitionOutcome> {
        let order = self
            .storage
            .get_snapshot(order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        Ok(self.outcome(order, role))
    }

    /// Actions `role` may take on the order right now
    pub fn allowed_actions_for(
        &self,
        order_id: &str,
        role: Role,
    ) -> ManagerResult<Vec<AllowedAction>> {
        let order = self
            .storage
            .get_snapshot(order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        Ok(allowed_actions(role, order.state, order.service_kind))
    }

    /// Get all active order snapshots
    pub fn get_active_orders(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        Ok(self.storage.get_active_orders()?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get all events for a specific order
    pub fn get_events_for_order(&self, order_id: &str) -> ManagerResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_for_order(order_id)?)
    }

    /// Every reservation ever made for an order, open or closed
    pub fn get_reservations(&self, order_id: &str) -> ManagerResult<Vec<Reservation>> {
        Ok(self.inventory.reservations_for_order(order_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    ///
    /// Uses EventApplier to apply each event to build the snapshot.
    pub fn rebuild_snapshot(&self, order_id: &str) -> ManagerResult<OrderSnapshot> {
        let events = self.storage.get_events_for_order(order_id)?;
        if events.is_empty() {
            return Err(OrderError::OrderNotFound(order_id.to_string()).into());
        }
        Ok(appliers::replay(order_id, &events))
    }
}

/// Snapshot an event applies to
///
/// Only `OrderCreated` may start from a blank snapshot; any other failure to
/// load (missing order, unreadable row) aborts the command.
fn snapshot_for_event(
    ctx: &CommandContext<'_>,
    event: &OrderEvent,
) -> Result<OrderSnapshot, OrderError> {
    match ctx.load_snapshot(&event.order_id) {
        Ok(snapshot) => Ok(snapshot),
        Err(OrderError::OrderNotFound(_)) if event.event_type == OrderEventType::OrderCreated => {
            Ok(OrderSnapshot::new(event.order_id.clone()))
        }
        Err(e) => Err(e),
    }
}
