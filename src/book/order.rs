//! The externally-owned order record.
//!
//! An [`Order`] is immutable input: the book keeps a shared reference
//! while the order rests and releases it on full fill or cancel. All
//! mutable fill state lives in the book-owned
//! [`Tracker`](crate::book::Tracker).

use crate::book::plugins::self_trade::SelfTradePolicy;
use crate::order_id::OrderId;
use serde::{Deserialize, Serialize};

/// An order as submitted by the hosting process.
///
/// Invariant: at least one of `qty` and `funds` is nonzero, and for a
/// priced order `funds` is only meaningful as an additional cap. A price
/// of zero denotes a market order; a market buy may be bound by `funds`
/// alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    user_id: u64,
    is_bid: bool,
    price: f64,
    qty: f64,
    funds: f64,
    stp: SelfTradePolicy,
    post_only: bool,
    reduce_only: bool,
    stop_price: f64,
}

impl Order {
    /// Creates a limit order.
    #[must_use]
    pub fn limit(order_id: OrderId, user_id: u64, is_bid: bool, price: f64, qty: f64) -> Self {
        Self {
            order_id,
            user_id,
            is_bid,
            price,
            qty,
            funds: 0.0,
            stp: SelfTradePolicy::default(),
            post_only: false,
            reduce_only: false,
            stop_price: 0.0,
        }
    }

    /// Creates a quantity-bound market order.
    #[must_use]
    pub fn market_qty(order_id: OrderId, user_id: u64, is_bid: bool, qty: f64) -> Self {
        Self::limit(order_id, user_id, is_bid, 0.0, qty)
    }

    /// Creates a funds-bound market buy.
    #[must_use]
    pub fn market_funds(order_id: OrderId, user_id: u64, funds: f64) -> Self {
        Self {
            order_id,
            user_id,
            is_bid: true,
            price: 0.0,
            qty: 0.0,
            funds,
            stp: SelfTradePolicy::default(),
            post_only: false,
            reduce_only: false,
            stop_price: 0.0,
        }
    }

    /// Sets an additional funds cap on a priced order.
    #[must_use]
    pub fn with_funds(mut self, funds: f64) -> Self {
        self.funds = funds;
        self
    }

    /// Sets the self-trade prevention policy.
    #[must_use]
    pub fn with_stp(mut self, stp: SelfTradePolicy) -> Self {
        self.stp = stp;
        self
    }

    /// Marks the order post-only.
    #[must_use]
    pub fn with_post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    /// Marks the order reduce-only.
    #[must_use]
    pub fn with_reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    /// Parks the order off-book until the market price crosses
    /// `stop_price`.
    #[must_use]
    pub fn with_stop_price(mut self, stop_price: f64) -> Self {
        self.stop_price = stop_price;
        self
    }

    /// The opaque 128-bit identifier.
    #[must_use]
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The owning user.
    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.user_id
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

    /// Quantity bound; zero for purely funds-bound orders.
    #[must_use]
    pub fn qty(&self) -> f64 {
        self.qty
    }

    /// Funds bound; zero for purely quantity-bound orders.
    #[must_use]
    pub fn funds(&self) -> f64 {
        self.funds
    }

    /// The self-trade prevention policy.
    #[must_use]
    pub fn stp(&self) -> SelfTradePolicy {
        self.stp
    }

    /// `true` if the order must never trade on entry.
    #[must_use]
    pub fn post_only(&self) -> bool {
        self.post_only
    }

    /// `true` if the order may only reduce the user's position.
    #[must_use]
    pub fn reduce_only(&self) -> bool {
        self.reduce_only
    }

    /// Stop trigger price; zero for non-stop orders.
    #[must_use]
    pub fn stop_price(&self) -> f64 {
        self.stop_price
    }
}
