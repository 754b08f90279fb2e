//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

mod diagnosis_recorded;
mod estimated_completion_set;
mod line_items_added;
mod material_reserved;
mod order_created;
mod payment_recorded;
mod quote_revised;
mod reservations_closed;
mod state_changed;
mod work_performed_recorded;

pub use diagnosis_recorded::DiagnosisRecordedApplier;
pub use estimated_completion_set::EstimatedCompletionSetApplier;
pub use line_items_added::LineItemsAddedApplier;
pub use material_reserved::MaterialReservedApplier;
pub use order_created::OrderCreatedApplier;
pub use payment_recorded::PaymentRecordedApplier;
pub use quote_revised::QuoteRevisedApplier;
pub use reservations_closed::{ReservationsConsumedApplier, ReservationsReleasedApplier};
pub use state_changed::StateChangedApplier;
pub use work_performed_recorded::WorkPerformedRecordedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    OrderCreated(OrderCreatedApplier),
    StateChanged(StateChangedApplier),
    EstimatedCompletionSet(EstimatedCompletionSetApplier),
    DiagnosisRecorded(DiagnosisRecordedApplier),
    QuoteRevised(QuoteRevisedApplier),
    WorkPerformedRecorded(WorkPerformedRecordedApplier),
    LineItemsAdded(LineItemsAddedApplier),
    PaymentRecorded(PaymentRecordedApplier),
    MaterialReserved(MaterialReservedApplier),
    ReservationsConsumed(ReservationsConsumedApplier),
    ReservationsReleased(ReservationsReleasedApplier),
}

/// Convert OrderEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&OrderEvent> for EventAction {
    fn from(event: &OrderEvent) -> Self {
        match &event.payload {
            EventPayload::OrderCreated { .. } => EventAction::OrderCreated(OrderCreatedApplier),
            EventPayload::StateChanged { .. } => EventAction::StateChanged(StateChangedApplier),
            EventPayload::EstimatedCompletionSet { .. } => {
                EventAction::EstimatedCompletionSet(EstimatedCompletionSetApplier)
            }
            EventPayload::DiagnosisRecorded { .. } => {
                EventAction::DiagnosisRecorded(DiagnosisRecordedApplier)
            }
            EventPayload::QuoteRevised { .. } => EventAction::QuoteRevised(QuoteRevisedApplier),
            EventPayload::WorkPerformedRecorded { .. } => {
                EventAction::WorkPerformedRecorded(WorkPerformedRecordedApplier)
            }
            EventPayload::LineItemsAdded { .. } => {
                EventAction::LineItemsAdded(LineItemsAddedApplier)
            }
            EventPayload::PaymentRecorded { .. } => {
                EventAction::PaymentRecorded(PaymentRecordedApplier)
            }
            EventPayload::MaterialReserved { .. } => {
                EventAction::MaterialReserved(MaterialReservedApplier)
            }
            EventPayload::ReservationsConsumed { .. } => {
                EventAction::ReservationsConsumed(ReservationsConsumedApplier)
            }
            EventPayload::ReservationsReleased { .. } => {
                EventAction::ReservationsReleased(ReservationsReleasedApplier)
            }
        }
    }
}

/// Rebuild a snapshot by folding events in sequence order
pub fn replay(order_id: &str, events: &[OrderEvent]) -> OrderSnapshot {
    let mut snapshot = OrderSnapshot::new(order_id.to_string());
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    snapshot
}
