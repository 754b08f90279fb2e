//! Order lifecycle states and service kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical lifecycle state of a service order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Received at the counter, no technician work yet
    #[default]
    AwaitingInitialization,
    InDiagnosis,
    DiagnosisCompleted,
    /// Quote sent, waiting for the client's answer
    AwaitingApproval,
    Approved,
    InRepair,
    RepairCompleted,
    ReadyForDelivery,
    /// Terminal success
    PaidAndDelivered,
    /// Terminal failure
    Cancelled,
}

/// Coarse grouping of states for listings and dashboards
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Intake,
    Diagnosis,
    Quotation,
    Repair,
    Delivery,
    Closed,
}

impl OrderState {
    pub const ALL: [OrderState; 10] = [
        OrderState::AwaitingInitialization,
        OrderState::InDiagnosis,
        OrderState::DiagnosisCompleted,
        OrderState::AwaitingApproval,
        OrderState::Approved,
        OrderState::InRepair,
        OrderState::RepairCompleted,
        OrderState::ReadyForDelivery,
        OrderState::PaidAndDelivered,
        OrderState::Cancelled,
    ];

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::PaidAndDelivered | OrderState::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// States in which repair material may still be reserved or cancelled
    ///
    /// Once repair is completed the reserved stock has been consumed.
    pub fn is_pre_repair_completion(&self) -> bool {
        matches!(
            self,
            OrderState::AwaitingInitialization
                | OrderState::InDiagnosis
                | OrderState::DiagnosisCompleted
                | OrderState::AwaitingApproval
                | OrderState::Approved
                | OrderState::InRepair
        )
    }

    /// Derived classification of the state
    pub fn stage(&self) -> Stage {
        match self {
            OrderState::AwaitingInitialization => Stage::Intake,
            OrderState::InDiagnosis => Stage::Diagnosis,
            OrderState::DiagnosisCompleted | OrderState::AwaitingApproval => Stage::Quotation,
            OrderState::Approved | OrderState::InRepair | OrderState::RepairCompleted => {
                Stage::Repair
            }
            OrderState::ReadyForDelivery => Stage::Delivery,
            OrderState::PaidAndDelivered | OrderState::Cancelled => Stage::Closed,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderState::AwaitingInitialization => "AWAITING_INITIALIZATION",
            OrderState::InDiagnosis => "IN_DIAGNOSIS",
            OrderState::DiagnosisCompleted => "DIAGNOSIS_COMPLETED",
            OrderState::AwaitingApproval => "AWAITING_APPROVAL",
            OrderState::Approved => "APPROVED",
            OrderState::InRepair => "IN_REPAIR",
            OrderState::RepairCompleted => "REPAIR_COMPLETED",
            OrderState::ReadyForDelivery => "READY_FOR_DELIVERY",
            OrderState::PaidAndDelivered => "PAID_AND_DELIVERED",
            OrderState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// How an order is priced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    /// Price unknown until a technician inspects the equipment and quotes
    #[default]
    Diagnosis,
    /// Price known upfront from catalog items
    SpecificService,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Diagnosis => f.write_str("DIAGNOSIS"),
            ServiceKind::SpecificService => f.write_str("SPECIFIC_SERVICE"),
        }
    }
}
