//! Cart and line items.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{CheckoutId, VariantId};
use super::price::Price;
use super::quantity::{Quantity, QuantityError};

/// A cart entry referencing a variant and a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub variant_id: VariantId,
    pub quantity: Quantity,
    /// Display title, filled in once the variant is matched.
    #[serde(default)]
    pub title: Option<String>,
    /// Unit price, filled in once the variant is matched.
    #[serde(default)]
    pub price: Option<Price>,
}

impl LineItem {
    /// A bare line item with no display fields.
    #[must_use]
    pub const fn new(variant_id: VariantId, quantity: Quantity) -> Self {
        Self {
            variant_id,
            quantity,
            title: None,
            price: None,
        }
    }

    /// Unit price times quantity, when the unit price is known.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.map(|price| price.times(self.quantity))
    }
}

/// Add `quantity` of `variant_id` to `items`.
///
/// An existing line for the variant is incremented in place; otherwise a new
/// line is appended. A variant never appears on two lines.
///
/// # Errors
///
/// Returns [`QuantityError::Overflow`] if the combined quantity overflows.
pub fn merge_line_item(
    items: &mut Vec<LineItem>,
    variant_id: &VariantId,
    quantity: Quantity,
) -> Result<(), QuantityError> {
    if let Some(existing) = items.iter_mut().find(|item| &item.variant_id == variant_id) {
        existing.quantity = existing.quantity.checked_add(quantity)?;
    } else {
        items.push(LineItem::new(variant_id.clone(), quantity));
    }
    Ok(())
}

/// The shopper's cart, mirrored from the remote checkout.
///
/// `total_count` and `total_cost` are derived from `line_items` and are only
/// ever set through [`Cart::replace_line_items`], so they cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CheckoutId,
    /// Shopify-hosted checkout page.
    pub web_url: String,
    #[serde(default)]
    line_items: Vec<LineItem>,
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    total_cost: Option<Price>,
    #[serde(default)]
    pub email: Option<Email>,
}

impl Cart {
    /// An empty cart for a freshly created checkout.
    #[must_use]
    pub const fn new(id: CheckoutId, web_url: String) -> Self {
        Self {
            id,
            web_url,
            line_items: Vec::new(),
            total_count: 0,
            total_cost: None,
            email: None,
        }
    }

    /// Replace every line and recompute the totals.
    pub fn replace_line_items(&mut self, line_items: Vec<LineItem>) {
        self.total_count = line_items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum();
        self.total_cost = line_items
            .iter()
            .filter_map(LineItem::line_total)
            .fold(None, |acc: Option<Price>, line| match acc {
                None => Some(line),
                Some(sum) => Some(sum.checked_add(line).unwrap_or(sum)),
            });
        self.line_items = line_items;
    }

    #[must_use]
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Sum of all line quantities.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Sum of all priced lines, or `None` when no line has a known price.
    #[must_use]
    pub const fn total_cost(&self) -> Option<Price> {
        self.total_cost
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}
