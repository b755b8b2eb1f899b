//! Pre-order (shopping cart) values and arithmetic.
//!
//! A cart line records a product, a [`Quantity`] between 1 and 5, and a
//! garment [`Size`]. The cart total is the sum of each line's unit price
//! times its quantity. Free products and products without a price count as
//! zero.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::price::Price;
use super::validation::ValidationErrors;

/// Garment size offered for catalog products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl Size {
    /// All sizes, smallest first.
    pub const ALL: [Self; 5] = [Self::Xs, Self::S, Self::M, Self::L, Self::Xl];

    /// The stored and displayed code (`"XS"` .. `"XL"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xs => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a size outside the fixed list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown size '{0}' (expected one of XS, S, M, L, XL)")]
pub struct SizeError(pub String);

impl FromStr for Size {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(code))
            .ok_or_else(|| SizeError(code.to_owned()))
    }
}

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The value is not a whole number.
    #[error("quantity must be a whole number")]
    NotANumber,
    /// The value is outside `1..=5`.
    #[error("quantity must be between {min} and {max} (got {got})")]
    OutOfRange {
        /// Smallest accepted quantity.
        min: u8,
        /// Largest accepted quantity.
        max: u8,
        /// Rejected value.
        got: i64,
    },
}

/// Number of items on a cart line, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u8);

impl Quantity {
    /// Smallest quantity on a line.
    pub const MIN: u8 = 1;
    /// Largest quantity on a line.
    pub const MAX: u8 = 5;

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::OutOfRange` outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(QuantityError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            })
    }

    /// The quantity as an integer.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber)?;
        Self::new(value)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        Self::from(quantity.0)
    }
}

/// Amount owed for one line: unit price times quantity.
///
/// A free product, or one without a price, contributes nothing.
#[must_use]
pub fn line_amount(unit_price: Option<Price>, is_free: bool, quantity: Quantity) -> i64 {
    if is_free {
        return 0;
    }
    let price = unit_price.unwrap_or(Price::ZERO);
    i64::from(price.amount()) * i64::from(quantity.get())
}

/// The pricing facts of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Option<Price>,
    pub is_free: bool,
    pub quantity: Quantity,
}

impl PricedLine {
    /// See [`line_amount`].
    #[must_use]
    pub fn amount(&self) -> i64 {
        line_amount(self.unit_price, self.is_free, self.quantity)
    }
}

/// Total of a cart: the sum of its line amounts.
#[must_use]
pub fn cart_total<'a, I>(lines: I) -> i64
where
    I: IntoIterator<Item = &'a PricedLine>,
{
    lines.into_iter().map(PricedLine::amount).sum()
}

/// "Add to cart" form, as submitted.
///
/// Fields stay as raw strings so a malformed value becomes a field error on
/// the form instead of a request rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddLineRequest {
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub size: String,
}

/// A validated cart line choice, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpec {
    pub quantity: Quantity,
    pub size: Size,
}

impl AddLineRequest {
    /// Validate the submitted quantity and size.
    ///
    /// # Errors
    ///
    /// Returns every rejected field; nothing is persisted either way.
    pub fn validate(&self) -> Result<LineSpec, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let quantity = errors.check("quantity", self.quantity.parse::<Quantity>());
        let size = errors.check("size", self.size.parse::<Size>());

        match (quantity, size) {
            (Some(quantity), Some(size)) => Ok(LineSpec { quantity, size }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(amount: i32) -> Option<Price> {
        Some(Price::new(amount).unwrap())
    }

    fn line(amount: i32, quantity: i64) -> PricedLine {
        PricedLine {
            unit_price: price(amount),
            is_free: false,
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(6).is_err());
        assert!(Quantity::new(-3).is_err());
        for q in 1..=5 {
            assert_eq!(i64::from(Quantity::new(q).unwrap()), q);
        }
        assert_eq!(Quantity::default().get(), 1);
    }

    #[test]
    fn test_quantity_from_str() {
        assert_eq!("3".parse::<Quantity>().unwrap().get(), 3);
        assert_eq!("abc".parse::<Quantity>(), Err(QuantityError::NotANumber));
        assert!(matches!(
            "9".parse::<Quantity>(),
            Err(QuantityError::OutOfRange { got: 9, .. })
        ));
    }

    #[test]
    fn test_size_parse() {
        assert_eq!("m".parse::<Size>(), Ok(Size::M));
        assert_eq!(" XL ".parse::<Size>(), Ok(Size::Xl));
        assert!("XXL".parse::<Size>().is_err());
        for size in Size::ALL {
            assert_eq!(size.as_str().parse::<Size>(), Ok(size));
        }
    }

    #[test]
    fn test_size_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Size::Xs).unwrap(), "\"XS\"");
        assert_eq!(serde_json::from_str::<Size>("\"XL\"").unwrap(), Size::Xl);
    }

    #[test]
    fn test_adding_a_line_increases_total_by_price_times_quantity() {
        let mut lines = vec![line(12, 1)];
        for q in 1..=5 {
            let before = cart_total(&lines);
            lines.push(line(25, q));
            assert_eq!(cart_total(&lines) - before, 25 * q);
        }
    }

    #[test]
    fn test_cart_total_examples() {
        let mut lines = vec![line(25, 2)];
        assert_eq!(cart_total(&lines), 50);
        lines.push(line(30, 1));
        assert_eq!(cart_total(&lines), 80);
        assert_eq!(cart_total(&[]), 0);
    }

    #[test]
    fn test_free_and_unpriced_lines_count_as_zero() {
        let qty = Quantity::new(4).unwrap();
        assert_eq!(line_amount(price(40), true, qty), 0);
        assert_eq!(line_amount(None, false, qty), 0);
        assert_eq!(line_amount(price(40), false, qty), 160);
    }

    #[test]
    fn test_add_line_request_validation() {
        let ok = AddLineRequest {
            quantity: "2".into(),
            size: "M".into(),
        };
        assert_eq!(
            ok.validate().unwrap(),
            LineSpec {
                quantity: Quantity::new(2).unwrap(),
                size: Size::M,
            }
        );

        let bad = AddLineRequest {
            quantity: "6".into(),
            size: "XXL".into(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.for_field("quantity").is_some());
        assert!(errors.for_field("size").is_some());
    }
}
