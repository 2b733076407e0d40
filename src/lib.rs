//! # Continuous-Trading Matching Engine Core
//!
//! A single-instrument order book that accepts incoming orders, matches
//! them against resting liquidity under price-time priority, and emits a
//! strictly ordered callback stream describing every state change. A
//! fixed set of policy modules composes additively around the matching
//! loop:
//!
//! - **Self-trade prevention**: cancel taker, maker or both when an
//!   order would match its own user's resting order.
//! - **Post-only**: cancel takers that would trade on entry.
//! - **Reduce-only**: orders that may only shrink their user's
//!   position, downsized or cancelled as the position moves.
//! - **Positions**: per-user signed position with volume-weighted base
//!   price, emitting open/update/close events.
//! - **Stop orders**: parked off-book until the market price crosses
//!   the stop, then re-submitted through the normal matching path.
//! - **Routable**: matches against registered market-maker orders are
//!   diverted into asynchronous routing requests against external
//!   venues and replayed as callbacks when the venue answers.
//!
//! The [`depth::DepthBook`] projection maintains the aggregated top-N
//! levels per side purely from the flushed callback batches.
//!
//! ## Concurrency model
//!
//! Single-threaded cooperative: one logical owner drives the engine and
//! every public entry point runs to completion before the next. All I/O
//! boundaries are modeled as listener callbacks invoked synchronously;
//! listeners never re-enter the book.
//!
//! ## Example
//!
//! ```
//! use matchbook_rs::prelude::*;
//! use std::sync::Arc;
//!
//! struct Sink;
//! impl BookListener for Sink {
//!     fn on_callbacks(&mut self, batch: &[Callback]) {
//!         for cb in batch {
//!             println!("{cb}");
//!         }
//!     }
//! }
//!
//! let mut book = OrderBook::new(1, Sink);
//! let maker = Arc::new(Order::limit(OrderId::new(0, 1), 10, false, 1000.0, 1.0));
//! let taker = Arc::new(Order::limit(OrderId::new(0, 2), 20, true, 1000.0, 1.0));
//! book.add(maker).unwrap();
//! let matched = book.add(taker).unwrap();
//! assert!(matched);
//! ```

pub mod book;
pub mod constants;
pub mod depth;
pub mod prelude;

mod order_id;

pub use book::{
    BookError, BookListener, BookPrice, Callback, CallbackKind, CallbackScope, CancelReason,
    CancelRejectReason, FillFlags, InsertRejectReason, Order, OrderBook, OrderBookBuilder, Reason,
    ReplaceRejectReason, RoutingOutcome, SideMap, Tracker,
};
pub use book::plugins::{Position, RoutingRequest, SelfTradePolicy};
pub use depth::{Depth, DepthBook, DepthError, DepthLevel, INVALID_PRICE};
pub use order_id::OrderId;
