//! Prelude re-exporting the commonly used types.
//!
//! ```
//! use matchbook_rs::prelude::*;
//! ```

pub use crate::book::plugins::{Position, RoutingRequest, SelfTradePolicy};
pub use crate::book::{
    BookError, BookListener, BookPrice, Callback, CallbackKind, CallbackScope, CancelReason,
    CancelRejectReason, FillFlags, InsertRejectReason, Order, OrderBook, OrderBookBuilder, Reason,
    ReplaceRejectReason, RoutingOutcome, SideMap, Tracker,
};
pub use crate::constants::{
    DEPTH_SIZE, EPSILON, MIN_ORDER_FUNDS, MIN_ORDER_QTY, TRADE_QTY_INCREMENT,
};
pub use crate::depth::{Depth, DepthBook, DepthError, DepthLevel, INVALID_PRICE};
pub use crate::order_id::OrderId;
