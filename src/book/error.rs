//! Order book error types.
//!
//! User-level rejections are never errors; they are reported through
//! callback records. [`BookError`] is reserved for protocol faults that
//! indicate a broken invariant and for misuse of the routing entry
//! points.

use crate::order_id::OrderId;
use thiserror::Error;

/// Errors that can occur within the order book.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookError {
    /// A fill would exceed the order's quantity.
    #[error("fill qty {fill_qty} would overfill order {order_id}")]
    OverFill {
        /// The order that would be overfilled.
        order_id: OrderId,
        /// The offending fill quantity.
        fill_qty: f64,
    },

    /// A fill would spend more than the order's funds.
    #[error("fill cost {fill_cost} would overspend funds of order {order_id}")]
    OverSpend {
        /// The order whose funds would be exceeded.
        order_id: OrderId,
        /// The offending fill cost.
        fill_cost: f64,
    },

    /// A routing response referenced an id that is not pending.
    #[error("unknown routing request {request_id}")]
    UnknownRoutingRequest {
        /// The id carried by the response.
        request_id: u64,
    },

    /// A routing operation was invoked on a book built without the
    /// routable module.
    #[error("routing module is not enabled on this book")]
    RoutingDisabled,
}
