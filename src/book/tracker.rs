//! Per-order fill state owned by the book.

use crate::book::error::BookError;
use crate::book::order::Order;
use crate::book::price::BookPrice;
use crate::constants::{MIN_ORDER_FUNDS, MIN_ORDER_QTY, TRADE_QTY_INCREMENT};
use serde::Serialize;
use std::sync::Arc;

/// Mutable lifecycle state derived from an [`Order`] on acceptance.
///
/// Carries the immutable side, price and bounds copied from the order,
/// plus the running `filled_qty`, `filled_cost` and volume-weighted
/// `avg_price`.
#[derive(Debug, Clone, Serialize)]
pub struct Tracker {
    order: Arc<Order>,
    is_bid: bool,
    price: f64,
    qty: f64,
    funds: f64,
    filled_qty: f64,
    filled_cost: f64,
    avg_price: f64,
}

impl Tracker {
    /// Derives a fresh tracker from an order.
    #[must_use]
    pub fn new(order: Arc<Order>) -> Self {
        Self {
            is_bid: order.is_bid(),
            price: order.price(),
            qty: order.qty(),
            funds: order.funds(),
            filled_qty: 0.0,
            filled_cost: 0.0,
            avg_price: 0.0,
            order,
        }
    }

    /// The underlying order.
    #[must_use]
    pub fn order(&self) -> &Arc<Order> {
        &self.order
    }

    /// The order's identifier.
    #[must_use]
    pub fn order_id(&self) -> crate::order_id::OrderId {
        self.order.order_id()
    }

    /// The owning user.
    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.order.user_id()
    }

    /// `true` for buys.
    #[must_use]
    pub fn is_bid(&self) -> bool {
        self.is_bid
    }

    /// Limit price; zero denotes a market order.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Current quantity bound (replace operations adjust it).
    #[must_use]
    pub fn qty(&self) -> f64 {
        self.qty
    }

    /// Funds bound.
    #[must_use]
    pub fn funds(&self) -> f64 {
        self.funds
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub fn filled_qty(&self) -> f64 {
        self.filled_qty
    }

    /// Cumulative cost of all fills.
    #[must_use]
    pub fn filled_cost(&self) -> f64 {
        self.filled_cost
    }

    /// Volume-weighted average fill price; zero before the first fill.
    #[must_use]
    pub fn avg_price(&self) -> f64 {
        self.avg_price
    }

    /// The side container key for this tracker.
    #[must_use]
    pub fn book_price(&self) -> BookPrice {
        BookPrice::new(self.is_bid, self.price)
    }

    /// Records a fill, updating the running average price.
    ///
    /// # Errors
    /// [`BookError::OverSpend`] if the cost would exceed the funds bound,
    /// [`BookError::OverFill`] if the quantity would exceed the quantity
    /// bound. Both indicate a protocol fault in the caller.
    pub fn fill(&mut self, fill_qty: f64, fill_cost: f64) -> Result<(), BookError> {
        if self.funds != 0.0 && fill_cost + self.filled_cost > self.funds {
            return Err(BookError::OverSpend {
                order_id: self.order_id(),
                fill_cost,
            });
        }
        if self.qty != 0.0 && fill_qty + self.filled_qty > self.qty {
            return Err(BookError::OverFill {
                order_id: self.order_id(),
                fill_qty,
            });
        }

        self.avg_price =
            (self.avg_price * self.filled_qty + fill_cost) / (self.filled_qty + fill_qty);
        self.filled_cost += fill_cost;
        self.filled_qty += fill_qty;
        Ok(())
    }

    /// Whether the remaining bound is below the fill threshold.
    #[must_use]
    pub fn filled(&self) -> bool {
        if self.funds != 0.0 {
            self.funds - self.filled_cost < MIN_ORDER_FUNDS
        } else {
            self.qty - self.filled_qty < MIN_ORDER_QTY
        }
    }

    /// Quantity visible on the book: zero for market orders, the open
    /// quantity otherwise.
    #[must_use]
    pub fn qty_on_book(&self) -> f64 {
        if self.price == 0.0 {
            0.0
        } else {
            self.qty - self.filled_qty
        }
    }

    /// Open quantity of a quantity-bound order.
    #[must_use]
    pub fn open_qty(&self) -> f64 {
        debug_assert!(self.qty != 0.0);
        self.qty - self.filled_qty
    }

    /// Largest quantity this order can trade at `price`, honoring both
    /// the quantity and the funds bound. The funds-derived quantity is
    /// rounded down to [`TRADE_QTY_INCREMENT`] so a fill never
    /// overspends.
    #[must_use]
    pub fn tradable_qty(&self, price: f64) -> f64 {
        if self.funds == 0.0 {
            return self.qty - self.filled_qty;
        }
        let by_funds =
            ((self.funds - self.filled_cost) / price / TRADE_QTY_INCREMENT).floor()
                * TRADE_QTY_INCREMENT;
        if self.qty == 0.0 {
            by_funds
        } else {
            (self.qty - self.filled_qty).min(by_funds)
        }
    }

    /// Adjusts the quantity bound by `delta`.
    ///
    /// Pre-condition: `delta >= 0` or `-delta` does not exceed the open
    /// quantity; the caller clamps.
    pub fn change_open_qty(&mut self, delta: f64) {
        debug_assert!(self.qty != 0.0);
        debug_assert!(delta >= 0.0 || -delta <= self.qty - self.filled_qty);
        self.qty += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_id::OrderId;

    fn tracker(is_bid: bool, price: f64, qty: f64, funds: f64) -> Tracker {
        let mut order = Order::limit(OrderId::new(0, 9), 1, is_bid, price, qty);
        if funds > 0.0 {
            order = order.with_funds(funds);
        }
        Tracker::new(Arc::new(order))
    }

    #[test]
    fn test_fill_accumulates_and_averages() {
        let mut t = tracker(true, 100.0, 3.0, 0.0);
        t.fill(1.0, 100.0).unwrap();
        t.fill(2.0, 220.0).unwrap();
        assert_eq!(t.filled_qty(), 3.0);
        assert_eq!(t.filled_cost(), 320.0);
        assert!((t.avg_price() - 320.0 / 3.0).abs() < 1e-12);
        assert!(t.filled());
    }

    #[test]
    fn test_fill_rejects_overfill() {
        let mut t = tracker(true, 100.0, 1.0, 0.0);
        assert!(matches!(
            t.fill(1.5, 150.0),
            Err(BookError::OverFill { .. })
        ));
    }

    #[test]
    fn test_fill_rejects_overspend() {
        let mut t = tracker(true, 0.0, 0.0, 100.0);
        assert!(matches!(
            t.fill(2.0, 150.0),
            Err(BookError::OverSpend { .. })
        ));
    }

    #[test]
    fn test_funds_bound_tradable_qty_is_quantized() {
        let t = tracker(true, 0.0, 0.0, 100.0);
        let q = t.tradable_qty(333.0);
        // never overspends and lands on the quantization grid
        assert!(q * 333.0 <= 100.0);
        let steps = q / TRADE_QTY_INCREMENT;
        assert!((steps - steps.round()).abs() < 1e-6);
    }

    #[test]
    fn test_both_bounds_take_the_minimum() {
        let t = tracker(true, 100.0, 5.0, 100.0);
        // funds allow 1.0 at price 100, qty allows 5.0
        assert!((t.tradable_qty(100.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_market_order_has_no_qty_on_book() {
        let t = tracker(false, 0.0, 1.0, 0.0);
        assert_eq!(t.qty_on_book(), 0.0);
    }

    #[test]
    fn test_filled_uses_funds_threshold_for_funds_bound() {
        let mut t = tracker(true, 0.0, 0.0, 100.0);
        t.fill(1.0, 99.995).unwrap();
        assert!(t.filled());
    }

    #[test]
    fn test_change_open_qty() {
        let mut t = tracker(true, 100.0, 2.0, 0.0);
        t.change_open_qty(-1.5);
        assert!((t.qty() - 0.5).abs() < 1e-12);
        assert!((t.qty_on_book() - 0.5).abs() < 1e-12);
    }
}
