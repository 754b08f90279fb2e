//! Workflow authorization table
//!
//! Single source of truth for which edges exist and which role may drive
//! them. The server validates every request against it and clients use
//! [`allowed_actions`] to decide which buttons to render.
//!
//! | Action | From | To | Kinds | Roles |
//! |--------|------|----|-------|-------|
//! | StartDiagnosis | AwaitingInitialization | InDiagnosis | all | Technician |
//! | CompleteDiagnosis | InDiagnosis | DiagnosisCompleted | Diagnosis | Technician |
//! | RequestApproval | DiagnosisCompleted | AwaitingApproval | Diagnosis | Reception |
//! | Approve | DiagnosisCompleted, AwaitingApproval | Approved | Diagnosis | Reception |
//! | StartRepair | Approved | InRepair | Diagnosis | Technician |
//! | CompleteRepair | InRepair | RepairCompleted | Diagnosis | Technician |
//! | MarkReadyForDelivery | RepairCompleted | ReadyForDelivery | Diagnosis | Technician |
//! | MarkReadyForDelivery | InDiagnosis | ReadyForDelivery | SpecificService | Technician |
//! | Deliver | ReadyForDelivery | PaidAndDelivered | all | Reception |
//! | Cancel | any pre-RepairCompleted | Cancelled | all | Reception |
//!
//! Admin inherits every action.

use super::state::{OrderState, ServiceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actor role, resolved outside the engine and passed with every request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Reception,
    Technician,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("ADMIN"),
            Role::Reception => f.write_str("RECEPTION"),
            Role::Technician => f.write_str("TECHNICIAN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "RECEPTION" => Ok(Role::Reception),
            "TECHNICIAN" => Ok(Role::Technician),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Everything an actor can ask the engine to do with an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    // Transitions
    StartDiagnosis,
    CompleteDiagnosis,
    RequestApproval,
    Approve,
    StartRepair,
    CompleteRepair,
    MarkReadyForDelivery,
    Deliver,
    Cancel,

    // In-place actions
    RecordPayment,
    ReserveMaterial,
    AddLineItems,
    ReviseQuote,
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowAction::StartDiagnosis => "START_DIAGNOSIS",
            WorkflowAction::CompleteDiagnosis => "COMPLETE_DIAGNOSIS",
            WorkflowAction::RequestApproval => "REQUEST_APPROVAL",
            WorkflowAction::Approve => "APPROVE",
            WorkflowAction::StartRepair => "START_REPAIR",
            WorkflowAction::CompleteRepair => "COMPLETE_REPAIR",
            WorkflowAction::MarkReadyForDelivery => "MARK_READY_FOR_DELIVERY",
            WorkflowAction::Deliver => "DELIVER",
            WorkflowAction::Cancel => "CANCEL",
            WorkflowAction::RecordPayment => "RECORD_PAYMENT",
            WorkflowAction::ReserveMaterial => "RESERVE_MATERIAL",
            WorkflowAction::AddLineItems => "ADD_LINE_ITEMS",
            WorkflowAction::ReviseQuote => "REVISE_QUOTE",
        };
        f.write_str(s)
    }
}

/// One entry of the allowed-actions list returned to callers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowedAction {
    pub action: WorkflowAction,
    /// Target state for transitions, `None` for in-place actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_state: Option<OrderState>,
}

/// A legal edge of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: WorkflowAction,
    pub from: OrderState,
    pub to: OrderState,
    pub kinds: &'static [ServiceKind],
}

const ALL_KINDS: &[ServiceKind] = &[ServiceKind::Diagnosis, ServiceKind::SpecificService];
const DIAGNOSIS_ONLY: &[ServiceKind] = &[ServiceKind::Diagnosis];
const SPECIFIC_ONLY: &[ServiceKind] = &[ServiceKind::SpecificService];

const fn edge(
    action: WorkflowAction,
    from: OrderState,
    to: OrderState,
    kinds: &'static [ServiceKind],
) -> Transition {
    Transition {
        action,
        from,
        to,
        kinds,
    }
}

/// The transition table
pub const TRANSITIONS: &[Transition] = &[
    edge(
        WorkflowAction::StartDiagnosis,
        OrderState::AwaitingInitialization,
        OrderState::InDiagnosis,
        ALL_KINDS,
    ),
    edge(
        WorkflowAction::CompleteDiagnosis,
        OrderState::InDiagnosis,
        OrderState::DiagnosisCompleted,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::RequestApproval,
        OrderState::DiagnosisCompleted,
        OrderState::AwaitingApproval,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::Approve,
        OrderState::DiagnosisCompleted,
        OrderState::Approved,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::Approve,
        OrderState::AwaitingApproval,
        OrderState::Approved,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::StartRepair,
        OrderState::Approved,
        OrderState::InRepair,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::CompleteRepair,
        OrderState::InRepair,
        OrderState::RepairCompleted,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::MarkReadyForDelivery,
        OrderState::RepairCompleted,
        OrderState::ReadyForDelivery,
        DIAGNOSIS_ONLY,
    ),
    // Catalog-priced work skips the quotation and repair states
    edge(
        WorkflowAction::MarkReadyForDelivery,
        OrderState::InDiagnosis,
        OrderState::ReadyForDelivery,
        SPECIFIC_ONLY,
    ),
    edge(
        WorkflowAction::Deliver,
        OrderState::ReadyForDelivery,
        OrderState::PaidAndDelivered,
        ALL_KINDS,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::AwaitingInitialization,
        OrderState::Cancelled,
        ALL_KINDS,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::InDiagnosis,
        OrderState::Cancelled,
        ALL_KINDS,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::DiagnosisCompleted,
        OrderState::Cancelled,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::AwaitingApproval,
        OrderState::Cancelled,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::Approved,
        OrderState::Cancelled,
        DIAGNOSIS_ONLY,
    ),
    edge(
        WorkflowAction::Cancel,
        OrderState::InRepair,
        OrderState::Cancelled,
        DIAGNOSIS_ONLY,
    ),
];

/// In-place actions, in the order they are listed to callers
const IN_PLACE_ACTIONS: &[WorkflowAction] = &[
    WorkflowAction::RecordPayment,
    WorkflowAction::ReserveMaterial,
    WorkflowAction::AddLineItems,
    WorkflowAction::ReviseQuote,
];

/// Roles that may perform an action (Admin is implicit)
fn roles_for(action: WorkflowAction) -> &'static [Role] {
    match action {
        WorkflowAction::StartDiagnosis
        | WorkflowAction::CompleteDiagnosis
        | WorkflowAction::StartRepair
        | WorkflowAction::CompleteRepair
        | WorkflowAction::MarkReadyForDelivery
        | WorkflowAction::ReviseQuote => &[Role::Technician],
        WorkflowAction::RequestApproval
        | WorkflowAction::Approve
        | WorkflowAction::Deliver
        | WorkflowAction::Cancel
        | WorkflowAction::RecordPayment => &[Role::Reception],
        WorkflowAction::ReserveMaterial | WorkflowAction::AddLineItems => {
            &[Role::Technician, Role::Reception]
        }
    }
}

/// Whether `role` may perform `action` at all, ignoring state
pub fn role_may(role: Role, action: WorkflowAction) -> bool {
    role == Role::Admin || roles_for(action).contains(&role)
}

/// Whether an in-place action applies to an order in `state` of `kind`
fn in_place_available(action: WorkflowAction, state: OrderState, kind: ServiceKind) -> bool {
    match action {
        WorkflowAction::RecordPayment => state.is_active(),
        WorkflowAction::ReserveMaterial | WorkflowAction::AddLineItems => {
            state.is_pre_repair_completion()
        }
        WorkflowAction::ReviseQuote => {
            kind == ServiceKind::Diagnosis
                && matches!(
                    state,
                    OrderState::DiagnosisCompleted | OrderState::AwaitingApproval
                )
        }
        _ => false,
    }
}

/// Look up the edge `from -> to` for an order of `kind`
pub fn find_transition(
    kind: ServiceKind,
    from: OrderState,
    to: OrderState,
) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.to == to && t.kinds.contains(&kind))
}

/// Actions `role` may take on an order in `state` of `kind`
///
/// Pure and table-driven: the same call backs UI affordances and server-side
/// validation.
pub fn allowed_actions(role: Role, state: OrderState, kind: ServiceKind) -> Vec<AllowedAction> {
    let transitions = TRANSITIONS
        .iter()
        .filter(|t| t.from == state && t.kinds.contains(&kind) && role_may(role, t.action))
        .map(|t| AllowedAction {
            action: t.action,
            target_state: Some(t.to),
        });

    let in_place = IN_PLACE_ACTIONS
        .iter()
        .filter(|a| in_place_available(**a, state, kind) && role_may(role, **a))
        .map(|a| AllowedAction {
            action: *a,
            target_state: None,
        });

    transitions.chain(in_place).collect()
}

/// Whether `role` may perform `action` on an order in `state` of `kind`
pub fn is_permitted(
    role: Role,
    state: OrderState,
    kind: ServiceKind,
    action: WorkflowAction,
) -> bool {
    allowed_actions(role, state, kind)
        .iter()
        .any(|a| a.action == action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(role: Role, state: OrderState, kind: ServiceKind) -> Vec<WorkflowAction> {
        allowed_actions(role, state, kind)
            .into_iter()
            .map(|a| a.action)
            .collect()
    }

    #[test]
    fn test_technician_starts_diagnosis() {
        let allowed = allowed_actions(
            Role::Technician,
            OrderState::AwaitingInitialization,
            ServiceKind::Diagnosis,
        );
        assert!(allowed.contains(&AllowedAction {
            action: WorkflowAction::StartDiagnosis,
            target_state: Some(OrderState::InDiagnosis),
        }));
        // Technicians never cancel
        assert!(!allowed.iter().any(|a| a.action == WorkflowAction::Cancel));
    }

    #[test]
    fn test_reception_cannot_start_diagnosis() {
        assert!(!is_permitted(
            Role::Reception,
            OrderState::AwaitingInitialization,
            ServiceKind::Diagnosis,
            WorkflowAction::StartDiagnosis
        ));
    }

    #[test]
    fn test_admin_inherits_every_role() {
        for state in OrderState::ALL {
            for kind in [ServiceKind::Diagnosis, ServiceKind::SpecificService] {
                let admin = actions(Role::Admin, state, kind);
                for role in [Role::Technician, Role::Reception] {
                    for action in actions(role, state, kind) {
                        assert!(
                            admin.contains(&action),
                            "admin missing {action} in {state} ({kind})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_offer_nothing() {
        for state in [OrderState::PaidAndDelivered, OrderState::Cancelled] {
            for kind in [ServiceKind::Diagnosis, ServiceKind::SpecificService] {
                assert!(allowed_actions(Role::Admin, state, kind).is_empty());
            }
        }
    }

    #[test]
    fn test_specific_service_skips_quotation() {
        let allowed = actions(
            Role::Technician,
            OrderState::InDiagnosis,
            ServiceKind::SpecificService,
        );
        assert!(allowed.contains(&WorkflowAction::MarkReadyForDelivery));
        assert!(!allowed.contains(&WorkflowAction::CompleteDiagnosis));

        assert!(find_transition(
            ServiceKind::Diagnosis,
            OrderState::InDiagnosis,
            OrderState::ReadyForDelivery
        )
        .is_none());
    }

    #[test]
    fn test_no_cancel_after_repair_completed() {
        for state in [
            OrderState::RepairCompleted,
            OrderState::ReadyForDelivery,
        ] {
            assert!(find_transition(ServiceKind::Diagnosis, state, OrderState::Cancelled).is_none());
        }
    }

    #[test]
    fn test_skipping_states_is_not_an_edge() {
        assert!(find_transition(
            ServiceKind::Diagnosis,
            OrderState::InDiagnosis,
            OrderState::RepairCompleted
        )
        .is_none());
    }

    #[test]
    fn test_revise_quote_only_while_quoting() {
        assert!(is_permitted(
            Role::Technician,
            OrderState::AwaitingApproval,
            ServiceKind::Diagnosis,
            WorkflowAction::ReviseQuote
        ));
        assert!(!is_permitted(
            Role::Technician,
            OrderState::InRepair,
            ServiceKind::Diagnosis,
            WorkflowAction::ReviseQuote
        ));
    }

    #[test]
    fn test_payments_by_reception_in_active_states() {
        assert!(is_permitted(
            Role::Reception,
            OrderState::AwaitingInitialization,
            ServiceKind::Diagnosis,
            WorkflowAction::RecordPayment
        ));
        assert!(!is_permitted(
            Role::Technician,
            OrderState::ReadyForDelivery,
            ServiceKind::Diagnosis,
            WorkflowAction::RecordPayment
        ));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("technician".parse::<Role>(), Ok(Role::Technician));
        assert!("janitor".parse::<Role>().is_err());
    }
}
