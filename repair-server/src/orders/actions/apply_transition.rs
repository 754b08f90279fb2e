//! ApplyTransition command handler
//!
//! Moves an order along one edge of the state machine. Checks run in a
//! fixed order: edge exists, role may take it, payload guards. Side-effect
//! events (estimated completion, diagnosis, final payment, reservation
//! consumption/release) are emitted before the `StateChanged` event.

use async_trait::async_trait;

use crate::orders::appliers::EventAction;
use crate::orders::ledger;
use crate::orders::money;
use crate::orders::state_machine::{authorize_transition, require_text, resolve_transition};
use crate::orders::traits::{
    CommandContext, CommandHandler, CommandMetadata, EventApplier, OrderError,
};
use shared::order::{
    EventPayload, OrderEvent, OrderEventType, OrderSnapshot, OrderState, TransitionPayload,
};

/// ApplyTransition action
#[derive(Debug, Clone)]
pub struct ApplyTransitionAction {
    pub order_id: String,
    pub target_state: OrderState,
    pub payload: TransitionPayload,
}

/// Collects events and keeps a working copy of the order in step with them,
/// so later guards see the effect of earlier events in the same command.
struct EventBuffer<'m> {
    metadata: &'m CommandMetadata,
    working: OrderSnapshot,
    events: Vec<OrderEvent>,
}

impl<'m> EventBuffer<'m> {
    fn push(
        &mut self,
        ctx: &mut CommandContext<'_>,
        event_type: OrderEventType,
        payload: EventPayload,
    ) {
        let event = OrderEvent::new(
            ctx.next_sequence(),
            self.working.order_id.clone(),
            self.metadata.actor_id.clone(),
            self.metadata.actor_name.clone(),
            self.metadata.command_id.clone(),
            Some(self.metadata.timestamp),
            event_type,
            payload,
        );
        EventAction::from(&event).apply(&mut self.working, &event);
        self.events.push(event);
    }
}

impl ApplyTransitionAction {
    /// Estimated completion from the payload, falling back to the stored one
    fn require_estimated_completion(
        &self,
        buffer: &mut EventBuffer<'_>,
        ctx: &mut CommandContext<'_>,
        from: OrderState,
    ) -> Result<(), OrderError> {
        match self.payload.estimated_completion {
            Some(ts) if ts > 0 => {
                buffer.push(
                    ctx,
                    OrderEventType::EstimatedCompletionSet,
                    EventPayload::EstimatedCompletionSet {
                        estimated_completion: ts,
                    },
                );
                Ok(())
            }
            Some(ts) => Err(OrderError::transition(
                from,
                self.target_state,
                format!("estimated_completion must be a positive timestamp, got {ts}"),
            )),
            None if buffer.working.estimated_completion.is_some() => Ok(()),
            None => Err(OrderError::transition(
                from,
                self.target_state,
                "estimated_completion is required",
            )),
        }
    }

    /// Work-performed description, then consume the order's reserved stock
    fn complete_work(
        &self,
        buffer: &mut EventBuffer<'_>,
        ctx: &mut CommandContext<'_>,
        from: OrderState,
    ) -> Result<(), OrderError> {
        let supplied = self.payload.work_performed.as_deref();
        let work = require_text(
            supplied.or(buffer.working.work_performed.as_deref()),
            from,
            self.target_state,
            "work_performed",
        )?;
        if supplied.is_some() {
            buffer.push(
                ctx,
                OrderEventType::WorkPerformedRecorded,
                EventPayload::WorkPerformedRecorded {
                    work_performed: work,
                },
            );
        }

        let consumed = ctx.consume_open_reservations(&self.order_id)?;
        if !consumed.is_empty() {
            buffer.push(
                ctx,
                OrderEventType::ReservationsConsumed,
                EventPayload::ReservationsConsumed {
                    reservation_ids: consumed,
                },
            );
        }
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for ApplyTransitionAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        let from = snapshot.state;
        let to = self.target_state;

        // 2. Edge must exist, then the role must be allowed to take it
        let transition = resolve_transition(&snapshot, to)?;
        authorize_transition(metadata.role, transition)?;

        let policy = *ctx.policy();
        let mut buffer = EventBuffer {
            metadata,
            working: snapshot,
            events: Vec::new(),
        };

        // 3. Edge-specific guards and side effects
        match to {
            OrderState::InDiagnosis | OrderState::InRepair => {
                self.require_estimated_completion(&mut buffer, ctx, from)?;
            }
            OrderState::DiagnosisCompleted => {
                let diagnosis = require_text(
                    self.payload
                        .diagnosis
                        .as_deref()
                        .or(buffer.working.diagnosis.as_deref()),
                    from,
                    to,
                    "diagnosis",
                )?;
                let quoted_cost = self
                    .payload
                    .quoted_cost
                    .or(buffer.working.quoted_cost)
                    .ok_or_else(|| OrderError::transition(from, to, "quoted_cost is required"))?;
                if !money::is_valid_quote(quoted_cost) {
                    return Err(OrderError::transition(
                        from,
                        to,
                        format!("quoted_cost must be greater than zero, got {quoted_cost}"),
                    ));
                }
                self.require_estimated_completion(&mut buffer, ctx, from)?;

                let new_total = money::total_with(
                    &buffer.working,
                    &buffer.working.line_items,
                    Some(quoted_cost),
                );
                ledger::check_total_covers_paid(&buffer.working, new_total, to, &policy)?;

                buffer.push(
                    ctx,
                    OrderEventType::DiagnosisRecorded,
                    EventPayload::DiagnosisRecorded {
                        diagnosis,
                        quoted_cost,
                    },
                );
            }
            OrderState::RepairCompleted => {
                self.complete_work(&mut buffer, ctx, from)?;
            }
            // Specific-service orders finish their work straight from diagnosis
            OrderState::ReadyForDelivery if from == OrderState::InDiagnosis => {
                self.complete_work(&mut buffer, ctx, from)?;
            }
            OrderState::PaidAndDelivered => {
                if let Some(payment) = &self.payload.payment {
                    money::validate_payment(payment)?;
                    ledger::check_payment(&buffer.working, payment.amount, &policy)?;
                    buffer.push(
                        ctx,
                        OrderEventType::PaymentRecorded,
                        EventPayload::PaymentRecorded {
                            payment_id: uuid::Uuid::new_v4().to_string(),
                            method: payment.method,
                            amount: payment.amount,
                            note: payment.note.clone(),
                        },
                    );
                }
                if !ledger::is_settled(&buffer.working, &policy) {
                    return Err(OrderError::transition(
                        from,
                        to,
                        format!(
                            "balance of {:.2} must be paid in full before delivery",
                            money::to_f64(money::balance_of(&buffer.working))
                        ),
                    ));
                }
            }
            OrderState::Cancelled => {
                let released = ctx.release_open_reservations(&self.order_id)?;
                if !released.is_empty() {
                    buffer.push(
                        ctx,
                        OrderEventType::ReservationsReleased,
                        EventPayload::ReservationsReleased {
                            reservation_ids: released,
                        },
                    );
                }
            }
            _ => {}
        }

        // 4. The state change itself
        buffer.push(
            ctx,
            OrderEventType::StateChanged,
            EventPayload::StateChanged {
                from,
                to,
                note: self.payload.note.clone(),
            },
        );

        Ok(buffer.events)
    }
}
