//! Callback records describing every observable state change.
//!
//! Each public operation appends records to a batch that is flushed once
//! to the listener. The record is flat on purpose: a tagged kind, the
//! involved order references, and a handful of numeric slots whose
//! meaning depends on the kind. Slot conventions:
//!
//! - trade: `qty`/`price` are the fill, `avg_price` the taker's running
//!   average, `generic_1` the maker's, `generic_2`/`generic_3` the two
//!   cumulative filled quantities.
//! - cancel: `qty` is the filled quantity, `generic_1` the quantity that
//!   was still on the book.
//! - replace: `generic_1` is the effective delta, `generic_2` the open
//!   quantity before the change.

use crate::book::order::Order;
use crate::book::types::{
    CallbackScope, CancelReason, CancelRejectReason, InsertRejectReason, Reason,
    ReplaceRejectReason,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Discriminant of a callback record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallbackKind {
    /// An order passed admission. `qty`/`avg_price` reflect the totals
    /// after the matching that happened on entry.
    Accept = 1,
    /// An order failed admission.
    Reject = 2,
    /// An order left the book (or an incoming order was discarded).
    Cancel = 3,
    /// A cancel request failed.
    CancelReject = 4,
    /// An order's open quantity changed.
    Replace = 5,
    /// A replace request failed.
    ReplaceReject = 6,
    /// Two orders traded.
    Trade = 7,
    /// Marks the end of the book mutations of one operation.
    BookUpdate = 8,
    /// A position opened for a user.
    PositionOpen = 9,
    /// A position changed size for a user.
    PositionUpdate = 10,
    /// A position closed for a user.
    PositionClose = 11,
    /// A parked stop order entered the matching path.
    StopTrigger = 12,
}

bitflags! {
    /// Which participants were completely filled by a trade.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FillFlags: u8 {
        /// The incoming order is fully filled.
        const TAKER_FILLED = 0b01;
        /// The resting order is fully filled.
        const MAKER_FILLED = 0b10;
    }
}

/// One observable event, routed to consumers according to its scope.
#[derive(Debug, Clone, Serialize)]
pub struct Callback {
    /// What happened.
    pub kind: CallbackKind,
    /// The primary order (the taker for trades).
    pub order: Option<Arc<Order>>,
    /// The resting counterparty of a trade.
    pub maker_order: Option<Arc<Order>>,
    /// Kind-dependent quantity slot.
    pub qty: f64,
    /// Trade price.
    pub price: f64,
    /// Kind-dependent average-price slot.
    pub avg_price: f64,
    /// First generic numeric slot.
    pub generic_1: f64,
    /// Second generic numeric slot.
    pub generic_2: f64,
    /// Third generic numeric slot.
    pub generic_3: f64,
    /// User the record concerns, for position events.
    pub user_id: u64,
    /// Typed reason slot.
    pub reason: Reason,
    /// Fill flags of a trade.
    pub flags: FillFlags,
    /// Consumer routing scope.
    pub scope: CallbackScope,
}

impl Callback {
    fn blank(kind: CallbackKind) -> Self {
        Self {
            kind,
            order: None,
            maker_order: None,
            qty: 0.0,
            price: 0.0,
            avg_price: 0.0,
            generic_1: 0.0,
            generic_2: 0.0,
            generic_3: 0.0,
            user_id: 0,
            reason: Reason::None,
            flags: FillFlags::empty(),
            scope: CallbackScope::BroadcastAll,
        }
    }

    /// An admission record. `qty` and `avg_price` are patched in place
    /// after the matching on entry completes.
    #[must_use]
    pub fn accept(order: Arc<Order>) -> Self {
        let mut cb = Self::blank(CallbackKind::Accept);
        cb.order = Some(order);
        cb
    }

    /// An admission rejection.
    #[must_use]
    pub fn reject(order: Arc<Order>, reason: InsertRejectReason) -> Self {
        let mut cb = Self::blank(CallbackKind::Reject);
        cb.order = Some(order);
        cb.reason = Reason::Insert(reason);
        cb
    }

    /// A trade between `taker` and `maker`.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn trade(
        taker: Arc<Order>,
        maker: Arc<Order>,
        fill_qty: f64,
        price: f64,
        taker_avg_price: f64,
        maker_avg_price: f64,
        taker_filled_qty: f64,
        maker_filled_qty: f64,
        flags: FillFlags,
    ) -> Self {
        let mut cb = Self::blank(CallbackKind::Trade);
        cb.order = Some(taker);
        cb.maker_order = Some(maker);
        cb.qty = fill_qty;
        cb.price = price;
        cb.avg_price = taker_avg_price;
        cb.generic_1 = maker_avg_price;
        cb.generic_2 = taker_filled_qty;
        cb.generic_3 = maker_filled_qty;
        cb.flags = flags;
        cb
    }

    /// A cancellation. `qty_on_book` feeds the depth projection.
    #[must_use]
    pub fn cancel(
        order: Arc<Order>,
        qty_on_book: f64,
        filled_qty: f64,
        avg_price: f64,
        reason: CancelReason,
    ) -> Self {
        let mut cb = Self::blank(CallbackKind::Cancel);
        cb.order = Some(order);
        cb.qty = filled_qty;
        cb.avg_price = avg_price;
        cb.generic_1 = qty_on_book;
        cb.reason = Reason::Cancel(reason);
        cb
    }

    /// A cancel-request rejection.
    #[must_use]
    pub fn cancel_reject(
        order: Arc<Order>,
        filled_qty: f64,
        avg_price: f64,
        reason: CancelRejectReason,
    ) -> Self {
        let mut cb = Self::blank(CallbackKind::CancelReject);
        cb.order = Some(order);
        cb.qty = filled_qty;
        cb.avg_price = avg_price;
        cb.reason = Reason::CancelReject(reason);
        cb
    }

    /// A replace. `effective_delta` is the applied (clamped) change,
    /// `open_qty` the on-book quantity before it.
    #[must_use]
    pub fn replace(
        order: Arc<Order>,
        effective_delta: f64,
        open_qty: f64,
        filled_qty: f64,
        avg_price: f64,
    ) -> Self {
        let mut cb = Self::blank(CallbackKind::Replace);
        cb.order = Some(order);
        cb.generic_1 = effective_delta;
        cb.generic_2 = open_qty;
        cb.qty = filled_qty;
        cb.avg_price = avg_price;
        cb
    }

    /// A replace-request rejection.
    #[must_use]
    pub fn replace_reject(
        order: Arc<Order>,
        filled_qty: f64,
        avg_price: f64,
        reason: ReplaceRejectReason,
    ) -> Self {
        let mut cb = Self::blank(CallbackKind::ReplaceReject);
        cb.order = Some(order);
        cb.qty = filled_qty;
        cb.avg_price = avg_price;
        cb.reason = Reason::ReplaceReject(reason);
        cb
    }

    /// The end-of-operation marker.
    #[must_use]
    pub fn book_update() -> Self {
        Self::blank(CallbackKind::BookUpdate)
    }

    /// A position opened at `qty` (signed) and `base_price`.
    #[must_use]
    pub fn position_open(user_id: u64, qty: f64, base_price: f64) -> Self {
        let mut cb = Self::blank(CallbackKind::PositionOpen);
        cb.user_id = user_id;
        cb.qty = qty;
        cb.avg_price = base_price;
        cb
    }

    /// A position changed to `qty` (signed) at `base_price`.
    #[must_use]
    pub fn position_update(user_id: u64, qty: f64, base_price: f64) -> Self {
        let mut cb = Self::blank(CallbackKind::PositionUpdate);
        cb.user_id = user_id;
        cb.qty = qty;
        cb.avg_price = base_price;
        cb
    }

    /// A position closed.
    #[must_use]
    pub fn position_close(user_id: u64) -> Self {
        let mut cb = Self::blank(CallbackKind::PositionClose);
        cb.user_id = user_id;
        cb
    }

    /// A parked stop order was triggered and re-submitted.
    #[must_use]
    pub fn stop_trigger(order: Arc<Order>) -> Self {
        let mut cb = Self::blank(CallbackKind::StopTrigger);
        cb.order = Some(order);
        cb
    }

    /// Id of the primary order, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<crate::order_id::OrderId> {
        self.order.as_ref().map(|o| o.order_id())
    }

    /// Id of the maker order, if any.
    #[must_use]
    pub fn maker_order_id(&self) -> Option<crate::order_id::OrderId> {
        self.maker_order.as_ref().map(|o| o.order_id())
    }

    /// The cancel reason, if this is a cancel record.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self.reason {
            Reason::Cancel(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallbackKind::Trade => {
                write!(f, "[TRADE] {} @ {} [{}]", self.qty, self.price, self.scope)
            }
            CallbackKind::Cancel => match &self.order {
                Some(order) => write!(
                    f,
                    "[CANCEL] reason {} order {} [{}]",
                    self.reason.code(),
                    order.order_id(),
                    self.scope
                ),
                None => write!(f, "[CANCEL] reason {} [{}]", self.reason.code(), self.scope),
            },
            _ => write!(f, "[{:?}] [{}]", self.kind, self.scope),
        }
    }
}
