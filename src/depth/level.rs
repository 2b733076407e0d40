//! One aggregated price level of the depth projection.

use crate::depth::error::DepthError;
use serde::Serialize;

/// Sentinel price of an unoccupied window slot.
pub const INVALID_PRICE: f64 = 0.0;

/// An aggregated level: price, number of resting orders and their total
/// visible quantity, stamped with the change id of its last mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthLevel {
    price: f64,
    order_count: u32,
    aggregate_qty: f64,
    is_hidden: bool,
    last_change: u64,
}

impl DepthLevel {
    /// An unoccupied slot.
    pub(crate) const EMPTY: DepthLevel = DepthLevel {
        price: INVALID_PRICE,
        order_count: 0,
        aggregate_qty: 0.0,
        is_hidden: false,
        last_change: 0,
    };

    /// The level's price; [`INVALID_PRICE`] for an empty slot.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Number of resting orders aggregated here.
    #[must_use]
    pub fn order_count(&self) -> u32 {
        self.order_count
    }

    /// Total visible quantity at this price.
    #[must_use]
    pub fn aggregate_qty(&self) -> f64 {
        self.aggregate_qty
    }

    /// `true` while the level lives in overflow storage.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    /// Change id of the last mutation.
    #[must_use]
    pub fn last_change(&self) -> u64 {
        self.last_change
    }

    /// Whether the level changed since the given publication mark.
    #[must_use]
    pub fn changed_since(&self, last_published_change: u64) -> bool {
        self.last_change > last_published_change
    }

    /// `true` for an unoccupied window slot.
    #[must_use]
    pub fn is_empty_slot(&self) -> bool {
        self.price == INVALID_PRICE
    }

    pub(crate) fn init(&mut self, price: f64, is_hidden: bool) {
        self.price = price;
        self.order_count = 0;
        self.aggregate_qty = 0.0;
        self.is_hidden = is_hidden;
    }

    pub(crate) fn set_hidden(&mut self, is_hidden: bool) {
        self.is_hidden = is_hidden;
    }

    pub(crate) fn set_last_change(&mut self, change_id: u64) {
        self.last_change = change_id;
    }

    pub(crate) fn add_order(&mut self, qty: f64) {
        self.order_count += 1;
        self.aggregate_qty += qty;
    }

    pub(crate) fn increase_qty(&mut self, qty: f64) {
        self.aggregate_qty += qty;
    }

    pub(crate) fn decrease_qty(&mut self, qty: f64) {
        self.aggregate_qty -= qty;
    }

    /// Removes one order and `qty` from the level. Returns `true` when
    /// the last order left and the level is now empty; the remaining
    /// aggregate rides out with the last order regardless of `qty`.
    pub(crate) fn close_order(&mut self, qty: f64) -> Result<bool, DepthError> {
        if self.order_count == 0 {
            return Err(DepthError::OrderCountUnderflow { price: self.price });
        }
        if self.order_count == 1 {
            self.order_count = 0;
            self.aggregate_qty = 0.0;
            return Ok(true);
        }
        self.order_count -= 1;
        if self.aggregate_qty >= qty {
            self.aggregate_qty -= qty;
            Ok(false)
        } else {
            Err(DepthError::QtyUnderflow {
                price: self.price,
                qty,
                aggregate: self.aggregate_qty,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_order_accumulates() {
        let mut level = DepthLevel::EMPTY;
        level.init(100.0, false);
        level.add_order(1.0);
        level.add_order(2.5);
        assert_eq!(level.order_count(), 2);
        assert!((level.aggregate_qty() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_close_last_order_empties_level() {
        let mut level = DepthLevel::EMPTY;
        level.init(100.0, false);
        level.add_order(1.0);
        assert!(level.close_order(1.0).unwrap());
        assert_eq!(level.order_count(), 0);
        assert_eq!(level.aggregate_qty(), 0.0);
    }

    #[test]
    fn test_close_on_empty_level_is_a_fault() {
        let mut level = DepthLevel::EMPTY;
        level.init(100.0, false);
        assert!(matches!(
            level.close_order(1.0),
            Err(DepthError::OrderCountUnderflow { .. })
        ));
    }

    #[test]
    fn test_close_with_excess_qty_is_a_fault() {
        let mut level = DepthLevel::EMPTY;
        level.init(100.0, false);
        level.add_order(1.0);
        level.add_order(1.0);
        assert!(matches!(
            level.close_order(5.0),
            Err(DepthError::QtyUnderflow { .. })
        ));
    }

    #[test]
    fn test_changed_since() {
        let mut level = DepthLevel::EMPTY;
        level.set_last_change(7);
        assert!(level.changed_since(6));
        assert!(!level.changed_since(7));
    }
}
