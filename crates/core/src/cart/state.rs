//! The cart aggregate.

use rust_decimal::Decimal;

use super::line::{CartLine, MAX_QUANTITY};
use crate::types::{Price, ProductId};

/// Lines in insertion order plus totals derived from them.
///
/// Totals are recomputed whenever the line list is replaced and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    lines: Vec<CartLine>,
    subtotal: Decimal,
    item_count: u64,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a state from lines, recomputing totals.
    ///
    /// Lines are normalized so that product ids stay unique: a repeated product
    /// keeps the first line's metadata and the summed quantity, and lines with
    /// a zero quantity are dropped. Quantities are capped at [`MAX_QUANTITY`].
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut unique: Vec<CartLine> = Vec::with_capacity(lines.len());
        for mut line in lines {
            if line.quantity == 0 {
                continue;
            }
            line.quantity = line.quantity.min(MAX_QUANTITY);
            match unique
                .iter_mut()
                .find(|existing| existing.product_id() == line.product_id())
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .saturating_add(line.quantity)
                        .min(MAX_QUANTITY);
                }
                None => unique.push(line),
            }
        }
        Self::with_lines(unique)
    }

    /// Recompute totals for lines that are already unique and non-zero.
    pub(crate) fn with_lines(lines: Vec<CartLine>) -> Self {
        // Saturates instead of panicking on absurd prices.
        let subtotal = lines
            .iter()
            .fold(Decimal::ZERO, |total, line| total.saturating_add(line.line_total()));
        let item_count = lines.iter().map(|line| u64::from(line.quantity)).sum();
        Self {
            lines,
            subtotal,
            item_count,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the state and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Subtotal as a displayable price.
    #[must_use]
    pub fn subtotal_price(&self) -> Price {
        Price::new(self.subtotal).unwrap_or(Price::ZERO)
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Number of distinct products.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::line::CartLineInput;

    fn line(id: &str, cents: i64, quantity: u32) -> CartLine {
        CartLineInput::new(id, id, Price::from_cents(cents).unwrap()).into_line(quantity)
    }

    #[test]
    fn test_from_lines_recomputes_totals() {
        let state = CartState::from_lines(vec![line("P1", 1000, 2), line("P2", 1550, 1)]);
        assert_eq!(state.subtotal(), Decimal::new(3550, 2));
        assert_eq!(state.item_count(), 3);
        assert_eq!(state.line_count(), 2);
    }

    #[test]
    fn test_from_lines_merges_duplicates() {
        let state = CartState::from_lines(vec![line("P1", 1000, 1), line("P1", 9999, 3)]);

        assert_eq!(state.line_count(), 1);
        let merged = state.line(&ProductId::new("P1")).unwrap();
        assert_eq!(merged.quantity, 4);
        assert_eq!(merged.unit_price(), Price::from_cents(1000).unwrap());
        assert_eq!(state.subtotal(), Decimal::new(4000, 2));
    }

    #[test]
    fn test_from_lines_drops_zero_quantity() {
        let state = CartState::from_lines(vec![line("P1", 1000, 0), line("P2", 500, 1)]);
        assert_eq!(state.line_count(), 1);
        assert!(state.line(&ProductId::new("P1")).is_none());
    }

    #[test]
    fn test_from_lines_caps_quantity() {
        let state = CartState::from_lines(vec![
            line("P1", 100, u32::MAX),
            line("P2", 100, MAX_QUANTITY),
            line("P2", 100, 5),
        ]);
        assert!(state.lines().iter().all(|l| l.quantity == MAX_QUANTITY));
    }

    #[test]
    fn test_subtotal_saturates_instead_of_overflowing() {
        let huge = CartLineInput::new("P1", "P1", Price::new(Decimal::MAX).unwrap()).into_line(3);
        let state = CartState::from_lines(vec![huge, line("P2", 100, 1)]);
        assert_eq!(state.subtotal(), Decimal::MAX);
    }

    #[test]
    fn test_empty_state() {
        let state = CartState::empty();
        assert!(state.is_empty());
        assert_eq!(state.subtotal(), Decimal::ZERO);
        assert_eq!(state.item_count(), 0);
        assert_eq!(state.subtotal_price().display(), "$0.00");
    }
}
