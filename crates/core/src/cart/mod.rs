//! Shopping cart domain.
//!
//! - [`line`] - `CartLine` and the product data captured at add time
//! - [`state`] - `CartState` with derived totals
//! - [`reducer`] - `CartAction` and the pure `reduce` function

pub mod line;
pub mod reducer;
pub mod state;

pub use line::{CartLine, CartLineInput, MAX_QUANTITY, PLACEHOLDER_IMAGE};
pub use reducer::{CartAction, CartError, reduce};
pub use state::CartState;
