//! Checkout type conversion functions.

use heedless_core::{LineItem, Quantity, line_title};
use tracing::warn;

use crate::shopify::{ShopifyError, types::Checkout};

use super::super::queries::{CheckoutNode, LineItemInput, UserError};
use super::products::convert_money;

/// Convert a checkout and its line items.
///
/// Lines whose variant has been deleted, or whose quantity is not positive,
/// are skipped.
///
/// # Errors
///
/// Returns [`ShopifyError::InvalidData`] if a price is not a decimal.
pub fn convert_checkout(checkout: CheckoutNode) -> Result<Checkout, ShopifyError> {
    let mut line_items = Vec::new();

    for node in checkout.line_items.into_nodes() {
        let Some(variant) = node.variant else {
            warn!(title = %node.title, "Checkout line has no variant, skipping");
            continue;
        };
        let Ok(quantity) = Quantity::try_from(node.quantity) else {
            warn!(variant_id = %variant.id, quantity = node.quantity, "Checkout line has invalid quantity, skipping");
            continue;
        };

        line_items.push(LineItem {
            variant_id: variant.id,
            quantity,
            title: Some(line_title(&node.title, &variant.title)),
            price: variant.price.as_ref().map(convert_money).transpose()?,
        });
    }

    Ok(Checkout {
        id: checkout.id,
        web_url: checkout.web_url,
        email: checkout.email,
        line_items,
    })
}

/// Fold mutation user errors into a single [`ShopifyError::UserError`].
///
/// # Errors
///
/// Returns an error when `errors` is non-empty.
pub fn convert_user_errors(errors: Vec<UserError>) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }

    Err(ShopifyError::UserError(
        errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                _ => e.message,
            })
            .collect::<Vec<_>>()
            .join("; "),
    ))
}

/// Line items as `CheckoutLineItemInput`s.
pub fn line_item_inputs(items: &[LineItem]) -> Vec<LineItemInput> {
    items
        .iter()
        .map(|item| LineItemInput {
            variant_id: item.variant_id.clone(),
            quantity: item.quantity.get(),
        })
        .collect()
}
