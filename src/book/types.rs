//! Wire-stable reason and scope taxonomies.
//!
//! Every enum here carries an explicit `#[repr(u8)]` discriminant that is
//! part of the external protocol and must never be renumbered. Rejections
//! and cancellations travel inside [`crate::book::Callback`] records, so
//! none of these are error types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an incoming order was rejected at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum InsertRejectReason {
    /// No rejection; the order is accepted.
    #[default]
    DontReject = 0,
    /// Rejected without a specific reason (malformed input).
    NoReason = 1,
    /// A reduce-only order would open or increase a position.
    ReduceOnlyIncrease = 2,
    /// A reduce-only order is larger than the position it reduces.
    ReduceOnlyReverse = 3,
    /// The user's held funds do not cover the order.
    InsufficientFunds = 4,
    /// Quantity below [`crate::constants::MIN_ORDER_QTY`].
    QtyTooSmall = 5,
    /// Funds below [`crate::constants::MIN_ORDER_FUNDS`].
    FundsTooSmall = 6,
    /// The client order id is already in use.
    DuplicateClientOrderId = 7,
}

/// Why a resting or incoming order was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CancelReason {
    /// No cancellation.
    #[default]
    DontCancel = 0,
    /// Explicit cancel requested by the user.
    UserCancel = 1,
    /// Silently removed pending an external routing round trip.
    TemporaryCancel = 2,
    /// A market order found no liquidity to match.
    NoLiquidity = 3,
    /// Self-trade prevention fired.
    SelfTrade = 4,
    /// The engine is shutting down.
    EngineShutdown = 5,
    /// A replace reduced the open quantity below the minimum.
    ReplacedAllQty = 6,
    /// A post-only order would have traded on entry.
    PostOnly = 7,
    /// A reduce-only maker could not trade within its position bound.
    ReduceOnlyMatch = 8,
    /// The owning position closed while the reduce-only order rested.
    ReduceOnlyClose = 9,
    /// The maker is a market-maker order already being routed.
    MmRouted = 10,
    /// The external venue rejected the routed quantity.
    RoutingFailure = 11,
}

/// Why a cancel request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CancelRejectReason {
    /// No rejection.
    #[default]
    DontCancelReject = 0,
    /// The order is not resting on the book.
    NotFound = 1,
}

/// Why a replace request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReplaceRejectReason {
    /// No rejection.
    #[default]
    DontReplaceReject = 0,
    /// The order is not resting on the book.
    NotFound = 1,
    /// The order has no open quantity left to change.
    NoQty = 2,
    /// The user's held funds do not cover the increase.
    InsufficientFunds = 3,
}

/// Routing scope of a callback record.
///
/// The routable module rewrites scopes post-hoc on records already in the
/// batch; downstream consumers filter on it. The depth projection
/// processes `InternalOnly` and `BroadcastAll`; the external tape
/// processes `ExternalOnly` and `BroadcastAll`; hold updaters skip
/// `Suppress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallbackScope {
    /// Invisible to every consumer.
    Suppress = 0,
    /// Internal consumers only (depth projection).
    InternalOnly = 1,
    /// External consumers only (trade tape, users).
    ExternalOnly = 2,
    /// Everyone.
    #[default]
    BroadcastAll = 3,
}

/// Typed reason slot of a callback record.
///
/// A callback carries at most one reason, drawn from the taxonomy that
/// matches its kind; `code` recovers the wire integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reason {
    /// No reason attached.
    #[default]
    None,
    /// Admission rejection.
    Insert(InsertRejectReason),
    /// Cancellation.
    Cancel(CancelReason),
    /// Cancel-request rejection.
    CancelReject(CancelRejectReason),
    /// Replace-request rejection.
    ReplaceReject(ReplaceRejectReason),
}

impl Reason {
    /// The wire-stable integer code of the underlying reason.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Reason::None => 0,
            Reason::Insert(r) => *r as u8,
            Reason::Cancel(r) => *r as u8,
            Reason::CancelReject(r) => *r as u8,
            Reason::ReplaceReject(r) => *r as u8,
        }
    }
}

impl fmt::Display for InsertRejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsertRejectReason::DontReject => "DontReject",
            InsertRejectReason::NoReason => "NoReason",
            InsertRejectReason::ReduceOnlyIncrease => "ReduceOnlyIncrease",
            InsertRejectReason::ReduceOnlyReverse => "ReduceOnlyReverse",
            InsertRejectReason::InsufficientFunds => "InsufficientFunds",
            InsertRejectReason::QtyTooSmall => "QtyTooSmall",
            InsertRejectReason::FundsTooSmall => "FundsTooSmall",
            InsertRejectReason::DuplicateClientOrderId => "DuplicateClientOrderId",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CancelReason::DontCancel => "DontCancel",
            CancelReason::UserCancel => "UserCancel",
            CancelReason::TemporaryCancel => "TemporaryCancel",
            CancelReason::NoLiquidity => "NoLiquidity",
            CancelReason::SelfTrade => "SelfTrade",
            CancelReason::EngineShutdown => "EngineShutdown",
            CancelReason::ReplacedAllQty => "ReplacedAllQty",
            CancelReason::PostOnly => "PostOnly",
            CancelReason::ReduceOnlyMatch => "ReduceOnlyMatch",
            CancelReason::ReduceOnlyClose => "ReduceOnlyClose",
            CancelReason::MmRouted => "MmRouted",
            CancelReason::RoutingFailure => "RoutingFailure",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for CallbackScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackScope::Suppress => "Suppress",
            CallbackScope::InternalOnly => "InternalOnly",
            CallbackScope::ExternalOnly => "ExternalOnly",
            CallbackScope::BroadcastAll => "BroadcastAll",
        };
        write!(f, "{name}")
    }
}
