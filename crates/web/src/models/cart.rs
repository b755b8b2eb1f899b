//! Pre-order cart domain types.

use chrono::{DateTime, Utc};

use teamspirit_core::{
    CartId, CartLineId, Price, PricedLine, ProductId, Quantity, Size, UserId, line_amount,
};

/// A member's pre-order cart. Each user has at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

/// One product selection in a cart, with the product facts needed to
/// display and price it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Option<Price>,
    pub is_free: bool,
    pub quantity: Quantity,
    pub size: Size,
}

impl CartLine {
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine {
            unit_price: self.unit_price,
            is_free: self.is_free,
            quantity: self.quantity,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn amount(&self) -> i64 {
        line_amount(self.unit_price, self.is_free, self.quantity)
    }
}

/// Result of asking to drop a cart line.
///
/// Only `Dropped` changes anything; the other outcomes are reported so the
/// caller can log them, never surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Dropped,
    /// The line belongs to another member's cart.
    NotOwner,
    /// No such line.
    NotFound,
}
