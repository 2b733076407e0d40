//! Depth projection error types.
//!
//! All of these indicate a protocol fault in the callback stream that
//! drives the projection; a conforming engine never produces them.

use thiserror::Error;

/// Errors raised by the depth projection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DepthError {
    /// A close was reported for a level with no orders left.
    #[error("close at price {price}: order count already zero")]
    OrderCountUnderflow {
        /// The level's price.
        price: f64,
    },

    /// A close would remove more quantity than the level aggregates.
    #[error("close at price {price}: qty {qty} exceeds aggregate {aggregate}")]
    QtyUnderflow {
        /// The level's price.
        price: f64,
        /// The quantity reported by the close.
        qty: f64,
        /// The level's aggregate quantity.
        aggregate: f64,
    },

    /// A skip-fill was registered while one was still pending.
    #[error("skip fill of {pending} already pending (bid side: {is_bid})")]
    SkipFillPending {
        /// The quantity still pending.
        pending: f64,
        /// Which side the pending skip is on.
        is_bid: bool,
    },
}
