//! Cart lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Image shown for products without one.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Product data captured when an item is added to the cart.
///
/// This is everything a line carries except its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    #[serde(default = "placeholder_image")]
    pub image: String,
    #[serde(default)]
    pub in_stock: bool,
}

impl CartLineInput {
    /// Input with just an id, name and price; remaining metadata defaulted.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, unit_price: Price) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            brand: String::new(),
            part_number: String::new(),
            unit_price,
            image: placeholder_image(),
            in_stock: true,
        }
    }

    /// Turn the input into a line with the given quantity.
    #[must_use]
    pub fn into_line(self, quantity: u32) -> CartLine {
        CartLine {
            input: self,
            quantity,
        }
    }
}

/// Largest quantity a line can hold. Remote rows store quantities as a
/// 32-bit signed integer.
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// One product's presence in the cart.
///
/// Serializes flat (`id`, `name`, ..., `quantity`), which is the shape
/// anonymous carts are stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    input: CartLineInput,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line from captured product data and a quantity.
    #[must_use]
    pub const fn new(input: CartLineInput, quantity: u32) -> Self {
        Self { input, quantity }
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.input.product_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.input.name
    }

    #[must_use]
    pub fn brand(&self) -> &str {
        &self.input.brand
    }

    #[must_use]
    pub fn part_number(&self) -> &str {
        &self.input.part_number
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.input.unit_price
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.input.image
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.input.in_stock
    }

    /// The captured product data.
    #[must_use]
    pub const fn input(&self) -> &CartLineInput {
        &self.input
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.input
            .unit_price
            .amount()
            .saturating_mul(Decimal::from(self.quantity))
    }
}

fn placeholder_image() -> String {
    PLACEHOLDER_IMAGE.to_owned()
}
