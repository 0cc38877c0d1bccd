//! Cart actions and the pure reducer.
//!
//! [`reduce`] is a deterministic transition from `(CartState, CartAction)` to a
//! new `CartState`. It performs no I/O and never mutates its input, so the same
//! sequence of actions applied to the same initial state always produces the
//! same result.

use thiserror::Error;

use super::line::{CartLine, CartLineInput, MAX_QUANTITY};
use super::state::CartState;
use crate::types::ProductId;

/// A requested cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product, appending a line if it is not in the cart.
    Add(CartLineInput),
    /// Remove a product's line. Absent products are ignored.
    Remove(ProductId),
    /// Set a product's quantity exactly. Zero removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },
    /// Empty the cart.
    Clear,
    /// Replace every line wholesale.
    Load(Vec<CartLine>),
}

impl CartAction {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::SetQuantity { .. } => "set_quantity",
            Self::Clear => "clear",
            Self::Load(_) => "load",
        }
    }
}

/// Reasons the reducer rejects an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// A quantity below zero was requested.
    #[error("quantity for {product_id} cannot be negative (got {quantity})")]
    NegativeQuantity { product_id: ProductId, quantity: i64 },

    /// The resulting quantity does not fit in a line.
    #[error("quantity for {product_id} exceeds the maximum of {max}")]
    QuantityOverflow { product_id: ProductId, max: u32 },
}

/// Apply `action` to `state`.
///
/// # Errors
///
/// Returns `CartError::NegativeQuantity` for `SetQuantity` below zero and
/// `CartError::QuantityOverflow` when a quantity would exceed [`MAX_QUANTITY`]. The
/// input state is untouched in both cases.
pub fn reduce(state: &CartState, action: &CartAction) -> Result<CartState, CartError> {
    match action {
        CartAction::Add(input) => add(state, input),
        CartAction::Remove(product_id) => Ok(remove(state, product_id)),
        CartAction::SetQuantity {
            product_id,
            quantity,
        } => set_quantity(state, product_id, *quantity),
        CartAction::Clear => Ok(CartState::empty()),
        CartAction::Load(lines) => Ok(CartState::from_lines(lines.clone())),
    }
}

fn add(state: &CartState, input: &CartLineInput) -> Result<CartState, CartError> {
    let mut lines = state.lines().to_vec();
    match lines
        .iter_mut()
        .find(|line| line.product_id() == &input.product_id)
    {
        // Metadata captured on the first add wins.
        Some(line) => {
            if line.quantity >= MAX_QUANTITY {
                return Err(CartError::QuantityOverflow {
                    product_id: input.product_id.clone(),
                    max: MAX_QUANTITY,
                });
            }
            line.quantity += 1;
        }
        None => lines.push(input.clone().into_line(1)),
    }
    Ok(CartState::with_lines(lines))
}

fn remove(state: &CartState, product_id: &ProductId) -> CartState {
    let lines = state
        .lines()
        .iter()
        .filter(|line| line.product_id() != product_id)
        .cloned()
        .collect();
    CartState::with_lines(lines)
}

fn set_quantity(
    state: &CartState,
    product_id: &ProductId,
    quantity: i64,
) -> Result<CartState, CartError> {
    if quantity < 0 {
        return Err(CartError::NegativeQuantity {
            product_id: product_id.clone(),
            quantity,
        });
    }
    if quantity == 0 {
        return Ok(remove(state, product_id));
    }
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|quantity| *quantity <= MAX_QUANTITY)
        .ok_or_else(|| CartError::QuantityOverflow {
            product_id: product_id.clone(),
            max: MAX_QUANTITY,
        })?;

    let lines = state
        .lines()
        .iter()
        .map(|line| {
            if line.product_id() == product_id {
                CartLine::new(line.input().clone(), quantity)
            } else {
                line.clone()
            }
        })
        .collect();
    Ok(CartState::with_lines(lines))
}
