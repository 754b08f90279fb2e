//! Line item resolution shared by CreateOrder and AddLineItems
//!
//! Catalog lines take price, cost, kind and warranty from the catalog; an
//! explicit `unit_price` on the input overrides the catalog price. Manual
//! lines must carry a description and a price.

use crate::orders::money;
use crate::orders::traits::{CommandContext, OrderError};
use shared::order::{LineItem, LineItemInput};

/// Resolve inputs into priced, validated line items
pub(super) fn resolve_line_items(
    ctx: &CommandContext<'_>,
    inputs: &[LineItemInput],
) -> Result<Vec<LineItem>, OrderError> {
    inputs.iter().map(|input| resolve_one(ctx, input)).collect()
}

fn resolve_one(ctx: &CommandContext<'_>, input: &LineItemInput) -> Result<LineItem, OrderError> {
    let item = match input.sku.as_deref() {
        Some(sku) => {
            let entry = ctx.lookup_catalog(sku)?;
            LineItem {
                line_id: uuid::Uuid::new_v4().to_string(),
                kind: input.kind.unwrap_or(entry.kind),
                sku: Some(entry.sku),
                description: input.description.clone().unwrap_or(entry.name),
                unit_price: input.unit_price.unwrap_or(entry.price),
                unit_cost: input.unit_cost.unwrap_or(entry.cost),
                quantity: input.quantity,
                warranty_days: entry.warranty_days,
            }
        }
        None => {
            let description = input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .ok_or_else(|| {
                    OrderError::InvalidOperation(
                        "manual line items need a description".to_string(),
                    )
                })?;
            let unit_price = input.unit_price.ok_or_else(|| {
                OrderError::InvalidOperation(format!("line '{description}' has no price"))
            })?;
            LineItem {
                line_id: uuid::Uuid::new_v4().to_string(),
                kind: input.kind.unwrap_or_default(),
                sku: None,
                description: description.to_string(),
                unit_price,
                unit_cost: input.unit_cost.unwrap_or_default(),
                quantity: input.quantity,
                warranty_days: 0,
            }
        }
    };
    money::validate_line_item(&item)?;
    Ok(item)
}
