//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use crate::orders::traits::OrderError;
use rust_decimal::prelude::*;
use shared::order::{LineItem, OrderSnapshot, PaymentInput, PaymentRecord, ServiceKind};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price / quoted cost
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed payment amount
const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), OrderError> {
    if !value.is_finite() {
        return Err(OrderError::InvalidOperation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a resolved line item before it enters an order
pub fn validate_line_item(item: &LineItem) -> Result<(), OrderError> {
    require_finite(item.unit_price, "unit_price")?;
    require_finite(item.unit_cost, "unit_cost")?;
    if item.unit_price < 0.0 || item.unit_cost < 0.0 {
        return Err(OrderError::InvalidOperation(format!(
            "prices must be non-negative, got price {} cost {}",
            item.unit_price, item.unit_cost
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(OrderError::InvalidOperation(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.unit_price
        )));
    }
    if item.quantity <= 0 {
        return Err(OrderError::InvalidOperation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(OrderError::InvalidOperation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    Ok(())
}

/// Validate a PaymentInput before processing
pub fn validate_payment(payment: &PaymentInput) -> Result<(), OrderError> {
    require_finite(payment.amount, "payment amount")?;
    if payment.amount <= 0.0 {
        return Err(OrderError::InvalidAmount);
    }
    if payment.amount > MAX_PAYMENT_AMOUNT {
        return Err(OrderError::InvalidOperation(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, payment.amount
        )));
    }
    Ok(())
}

/// A quoted cost must be a finite, strictly positive amount
pub fn is_valid_quote(cost: f64) -> bool {
    cost.is_finite() && cost > 0.0 && cost <= MAX_PRICE
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// unit_price × quantity
pub fn line_total(item: &LineItem) -> Decimal {
    to_decimal(item.unit_price) * Decimal::from(item.quantity)
}

/// unit_cost × quantity
pub fn line_cost(item: &LineItem) -> Decimal {
    to_decimal(item.unit_cost) * Decimal::from(item.quantity)
}

/// Order total from its pricing inputs
///
/// Specific-service orders are priced by their lines. A diagnosis order is
/// priced by its quote plus any lines added on top; before the quote the
/// diagnosis fee stands in for it.
pub fn compute_total(
    kind: ServiceKind,
    line_items: &[LineItem],
    quoted_cost: Option<f64>,
    diagnosis_fee: f64,
) -> Decimal {
    let lines: Decimal = line_items.iter().map(line_total).sum();
    match kind {
        ServiceKind::Diagnosis => to_decimal(quoted_cost.unwrap_or(diagnosis_fee)) + lines,
        ServiceKind::SpecificService => lines,
    }
}

/// Total of a snapshot after swapping in new lines and/or a new quote
pub fn total_with(
    snapshot: &OrderSnapshot,
    line_items: &[LineItem],
    quoted_cost: Option<f64>,
) -> Decimal {
    compute_total(
        snapshot.service_kind,
        line_items,
        quoted_cost,
        snapshot.diagnosis_fee,
    )
}

/// Σ unit_cost × quantity
pub fn compute_cost(line_items: &[LineItem]) -> Decimal {
    line_items.iter().map(line_cost).sum()
}

/// Sum payment amounts with precise arithmetic
pub fn sum_payments(payments: &[PaymentRecord]) -> Decimal {
    payments.iter().map(|p| to_decimal(p.amount)).sum()
}

/// Outstanding balance of a snapshot as stored
pub fn balance_of(snapshot: &OrderSnapshot) -> Decimal {
    (to_decimal(snapshot.total) - to_decimal(snapshot.amount_paid)).max(Decimal::ZERO)
}

/// Recalculate total, amount_paid and balance from line items, quote and payments
pub fn recalculate_totals(snapshot: &mut OrderSnapshot) {
    let total = total_with(snapshot, &snapshot.line_items, snapshot.quoted_cost);
    let paid = sum_payments(&snapshot.payments);
    let balance = (total - paid).max(Decimal::ZERO);

    snapshot.total = to_f64(total);
    snapshot.amount_paid = to_f64(paid);
    snapshot.balance = to_f64(balance);
}

/// Check if payment is sufficient (with small tolerance for edge cases)
///
/// Returns true if paid >= required - 0.01
pub fn is_payment_sufficient(paid: f64, required: f64) -> bool {
    to_decimal(paid) >= to_decimal(required) - MONEY_TOLERANCE
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}
