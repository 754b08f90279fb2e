//! Financial ledger
//!
//! The ledger is derived, never stored on its own: totals live in the
//! snapshot (kept current by the appliers through `money::recalculate_totals`)
//! and the advance comes from the injected [`LedgerPolicy`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::order::{LedgerSummary, OrderSnapshot, OrderState, ServiceKind};
use std::collections::HashMap;

use super::money::{compute_cost, to_decimal, to_f64};
use super::traits::OrderError;

/// Business constants for advances and payment tolerance
///
/// Loaded from configuration and overridable per branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    /// Flat fee charged upfront for a diagnosis
    pub diagnosis_fee: f64,
    /// Percent of the quoted total required upfront on diagnosis orders
    pub diagnosis_advance_percent: f64,
    /// Percent of the catalog total required upfront on specific-service orders
    pub specific_service_advance_percent: f64,
    /// Rounding slack accepted on payment checks
    pub tolerance: f64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            diagnosis_fee: 0.0,
            diagnosis_advance_percent: 100.0,
            specific_service_advance_percent: 50.0,
            tolerance: 0.01,
        }
    }
}

impl LedgerPolicy {
    fn tolerance(&self) -> Decimal {
        to_decimal(self.tolerance)
    }

    /// Advance required for an order in its current pricing state
    pub fn advance_required(&self, snapshot: &OrderSnapshot) -> Decimal {
        let total = to_decimal(snapshot.total);
        let percent = match snapshot.service_kind {
            ServiceKind::Diagnosis => {
                if snapshot.quoted_cost.is_none() {
                    // Not quoted yet: the fee captured at intake is all we can ask for
                    return to_decimal(snapshot.diagnosis_fee);
                }
                self.diagnosis_advance_percent
            }
            ServiceKind::SpecificService => self.specific_service_advance_percent,
        };
        total * to_decimal(percent) / Decimal::ONE_HUNDRED
    }
}

/// Default policy plus per-branch overrides
#[derive(Debug, Clone, Default)]
pub struct BranchPolicies {
    default: LedgerPolicy,
    overrides: HashMap<String, LedgerPolicy>,
}

impl BranchPolicies {
    pub fn new(default: LedgerPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, branch: &str, policy: LedgerPolicy) -> Self {
        self.set(branch, policy);
        self
    }

    /// Install or replace a branch override (branch keys are case-insensitive)
    pub fn set(&mut self, branch: &str, policy: LedgerPolicy) {
        self.overrides.insert(branch.trim().to_uppercase(), policy);
    }

    pub fn default_policy(&self) -> LedgerPolicy {
        self.default
    }

    pub fn for_branch(&self, branch: &str) -> LedgerPolicy {
        self.overrides
            .get(&branch.trim().to_uppercase())
            .copied()
            .unwrap_or(self.default)
    }
}

/// Financial view of an order under `policy`
pub fn summarize(snapshot: &OrderSnapshot, policy: &LedgerPolicy) -> LedgerSummary {
    let total = to_decimal(snapshot.total);
    let paid = to_decimal(snapshot.amount_paid);
    let cost = compute_cost(&snapshot.line_items);
    let margin = if snapshot.line_items.is_empty() {
        Decimal::ZERO
    } else {
        total - cost
    };
    let advance = policy.advance_required(snapshot);

    LedgerSummary {
        total: to_f64(total),
        advance_required: to_f64(advance),
        amount_paid: to_f64(paid),
        balance: to_f64((total - paid).max(Decimal::ZERO)),
        cost: to_f64(cost),
        margin: to_f64(margin),
        advance_satisfied: paid >= advance - policy.tolerance(),
    }
}

/// Reject a payment that would push Σ payments over the total
///
/// Tolerance absorbs rounding on the payment that settles the balance; once
/// settled, nothing more is accepted.
pub fn check_payment(
    snapshot: &OrderSnapshot,
    amount: f64,
    policy: &LedgerPolicy,
) -> Result<(), OrderError> {
    let balance = to_decimal(snapshot.total) - to_decimal(snapshot.amount_paid);
    let settled = balance <= Decimal::ZERO;
    if settled || to_decimal(amount) > balance + policy.tolerance() {
        return Err(OrderError::Overpayment {
            amount,
            balance: to_f64(balance.max(Decimal::ZERO)),
        });
    }
    Ok(())
}

/// Whether the balance is settled within tolerance
pub fn is_settled(snapshot: &OrderSnapshot, policy: &LedgerPolicy) -> bool {
    to_decimal(snapshot.total) - to_decimal(snapshot.amount_paid) <= policy.tolerance()
}

/// Reject a repricing that would drop the total under what was already paid
///
/// There is no credit flow, so money received must stay covered.
pub fn check_total_covers_paid(
    snapshot: &OrderSnapshot,
    new_total: Decimal,
    target: OrderState,
    policy: &LedgerPolicy,
) -> Result<(), OrderError> {
    let paid = to_decimal(snapshot.amount_paid);
    if new_total + policy.tolerance() < paid {
        return Err(OrderError::transition(
            snapshot.state,
            target,
            format!(
                "new total {:.2} is below the {:.2} already paid",
                to_f64(new_total),
                to_f64(paid)
            ),
        ));
    }
    Ok(())
}
