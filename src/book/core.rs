//! Shared book state handed to plugin hooks.
//!
//! [`BookCore`] owns everything the matching loop and the policy modules
//! mutate together: the two side containers, the per-operation callback
//! batch, the market price and the queues that defer re-entrant work
//! (routing requests) until the current hook dispatch returns. Plugin
//! hooks receive `&mut BookCore`, never the whole book, so a hook can
//! cancel or resize resting orders but cannot re-enter the matching
//! loop.

use crate::book::callback::{Callback, CallbackKind};
use crate::book::order::Order;
use crate::book::price::BookPrice;
use crate::book::tracker::Tracker;
use crate::book::types::{CancelReason, CancelRejectReason, ReplaceRejectReason};
use crate::constants::MIN_ORDER_QTY;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// One side of the book: price levels ordered best-first, FIFO queues of
/// trackers inside each level.
pub type SideMap = BTreeMap<BookPrice, VecDeque<Tracker>>;

/// The book state shared between the matching loop and plugin hooks.
pub struct BookCore {
    pub(crate) symbol_id: u32,
    pub(crate) market_price: f64,
    pub(crate) bids: SideMap,
    pub(crate) asks: SideMap,
    pub(crate) callbacks: Vec<Callback>,
    pub(crate) is_taker_cancelled: bool,
    /// Routing requests finalized by a hook, drained by the book once
    /// the dispatch returns.
    pub(crate) routing_outbox: VecDeque<u64>,
}

impl BookCore {
    pub(crate) fn new(symbol_id: u32) -> Self {
        Self {
            symbol_id,
            market_price: 0.0,
            bids: SideMap::new(),
            asks: SideMap::new(),
            callbacks: Vec::with_capacity(20),
            is_taker_cancelled: false,
            routing_outbox: VecDeque::new(),
        }
    }

    /// The instrument this book trades.
    #[must_use]
    pub fn symbol_id(&self) -> u32 {
        self.symbol_id
    }

    /// Price of the last trade; zero before the first trade.
    #[must_use]
    pub fn market_price(&self) -> f64 {
        self.market_price
    }

    /// Resting buy orders, best price first.
    #[must_use]
    pub fn bids(&self) -> &SideMap {
        &self.bids
    }

    /// Resting sell orders, best price first.
    #[must_use]
    pub fn asks(&self) -> &SideMap {
        &self.asks
    }

    pub(crate) fn side_mut(&mut self, is_bid: bool) -> &mut SideMap {
        if is_bid { &mut self.bids } else { &mut self.asks }
    }

    /// Appends a record to the current batch.
    pub fn emit(&mut self, callback: Callback) {
        self.callbacks.push(callback);
    }

    /// Appends a cancel record for `tracker` with the standard slot
    /// layout.
    pub fn emit_cancel(&mut self, tracker: &Tracker, reason: CancelReason) {
        self.emit(Callback::cancel(
            tracker.order().clone(),
            tracker.qty_on_book(),
            tracker.filled_qty(),
            tracker.avg_price(),
            reason,
        ));
    }

    /// The records emitted so far in the current operation. Scope
    /// rewriting by the routable module goes through this.
    pub fn callbacks_mut(&mut self) -> &mut Vec<Callback> {
        &mut self.callbacks
    }

    /// Index of the most recent accept record in the batch, or zero.
    #[must_use]
    pub fn latest_accept_index(&self) -> usize {
        self.callbacks
            .iter()
            .rposition(|cb| cb.kind == CallbackKind::Accept)
            .unwrap_or(0)
    }

    /// Key of the best level on one side.
    pub(crate) fn best_key(&self, is_bid: bool) -> Option<BookPrice> {
        let side = if is_bid { &self.bids } else { &self.asks };
        side.keys().next().copied()
    }

    /// Removes and returns the front tracker of the level at `key`.
    pub(crate) fn pop_front(&mut self, is_bid: bool, key: BookPrice) -> Option<Tracker> {
        let side = self.side_mut(is_bid);
        let queue = side.get_mut(&key)?;
        let tracker = queue.pop_front();
        if queue.is_empty() {
            side.remove(&key);
        }
        tracker
    }

    /// Restores a tracker to the front of its level, preserving time
    /// priority.
    pub(crate) fn push_front(&mut self, is_bid: bool, key: BookPrice, tracker: Tracker) {
        self.side_mut(is_bid).entry(key).or_default().push_front(tracker);
    }

    /// Rests a tracker at the back of its level.
    pub(crate) fn insert_tracker(&mut self, tracker: Tracker) {
        let key = tracker.book_price();
        self.side_mut(tracker.is_bid())
            .entry(key)
            .or_default()
            .push_back(tracker);
    }

    /// Locates and removes a resting tracker by its order.
    pub(crate) fn remove_tracker(&mut self, order: &Order) -> Option<Tracker> {
        let key = BookPrice::new(order.is_bid(), order.price());
        let side = self.side_mut(order.is_bid());
        let queue = side.get_mut(&key)?;
        let index = queue
            .iter()
            .position(|t| t.order_id() == order.order_id())?;
        let tracker = queue.remove(index);
        if queue.is_empty() {
            side.remove(&key);
        }
        tracker
    }

    /// Quantity a resting order still shows on the book, zero if it is
    /// not resting.
    #[must_use]
    pub fn resting_qty(&self, order: &Order) -> f64 {
        let key = BookPrice::new(order.is_bid(), order.price());
        let side = if order.is_bid() { &self.bids } else { &self.asks };
        side.get(&key)
            .and_then(|queue| queue.iter().find(|t| t.order_id() == order.order_id()))
            .map_or(0.0, Tracker::qty_on_book)
    }

    /// Removes an order from the book, emitting a cancel record.
    ///
    /// A cancel for an order that is not resting is only reported back
    /// when the user asked for it explicitly; plugins cancel
    /// opportunistically and an already-gone order is not an error.
    pub fn do_cancel(&mut self, order: &Arc<Order>, reason: CancelReason) {
        match self.remove_tracker(order) {
            Some(tracker) => {
                trace!(order_id = %tracker.order_id(), %reason, "cancelling resting order");
                self.emit_cancel(&tracker, reason);
            }
            None if reason == CancelReason::UserCancel => {
                self.emit(Callback::cancel_reject(
                    order.clone(),
                    0.0,
                    0.0,
                    CancelRejectReason::NotFound,
                ));
            }
            None => {}
        }
    }

    /// Adjusts the open quantity of a resting order by `delta` (clamped
    /// to the open quantity on the downside), emitting replace records
    /// and cancelling the order outright when nothing tradable remains.
    pub fn do_replace(&mut self, order: &Arc<Order>, delta: f64) {
        enum Outcome {
            NotFound,
            NoQty { filled_qty: f64, avg_price: f64 },
            Replaced {
                effective_delta: f64,
                open_qty: f64,
                filled_qty: f64,
                avg_price: f64,
                drained: bool,
            },
        }

        let key = BookPrice::new(order.is_bid(), order.price());
        let outcome = {
            let side = self.side_mut(order.is_bid());
            let tracker = side
                .get_mut(&key)
                .and_then(|q| q.iter_mut().find(|t| t.order_id() == order.order_id()));
            match tracker {
                None => Outcome::NotFound,
                Some(tracker) => {
                    let open_qty = tracker.qty_on_book();
                    if open_qty == 0.0 {
                        Outcome::NoQty {
                            filled_qty: tracker.filled_qty(),
                            avg_price: tracker.avg_price(),
                        }
                    } else {
                        let mut effective_delta = delta;
                        if effective_delta < 0.0 && -effective_delta > open_qty {
                            effective_delta = -open_qty;
                        }
                        tracker.change_open_qty(effective_delta);
                        Outcome::Replaced {
                            effective_delta,
                            open_qty,
                            filled_qty: tracker.filled_qty(),
                            avg_price: tracker.avg_price(),
                            drained: tracker.qty_on_book() < MIN_ORDER_QTY,
                        }
                    }
                }
            }
        };

        match outcome {
            Outcome::NotFound => {
                self.emit(Callback::replace_reject(
                    order.clone(),
                    0.0,
                    0.0,
                    ReplaceRejectReason::NotFound,
                ));
            }
            Outcome::NoQty {
                filled_qty,
                avg_price,
            } => {
                self.emit(Callback::replace_reject(
                    order.clone(),
                    filled_qty,
                    avg_price,
                    ReplaceRejectReason::NoQty,
                ));
            }
            Outcome::Replaced {
                effective_delta,
                open_qty,
                filled_qty,
                avg_price,
                drained,
            } => {
                trace!(order_id = %order.order_id(), effective_delta, "replacing resting order");
                self.emit(Callback::replace(
                    order.clone(),
                    effective_delta,
                    open_qty,
                    filled_qty,
                    avg_price,
                ));
                if drained {
                    if let Some(tracker) = self.remove_tracker(order) {
                        self.emit_cancel(&tracker, CancelReason::ReplacedAllQty);
                    }
                }
                self.emit(Callback::book_update());
            }
        }
    }

    /// Replace semantics applied to a tracker currently held outside the
    /// side containers (the maker in flight during a match cycle).
    pub fn replace_in_hand(&mut self, tracker: &mut Tracker, delta: f64) {
        let open_qty = tracker.qty_on_book();
        if open_qty == 0.0 {
            self.emit(Callback::replace_reject(
                tracker.order().clone(),
                tracker.filled_qty(),
                tracker.avg_price(),
                ReplaceRejectReason::NoQty,
            ));
            return;
        }
        let mut effective_delta = delta;
        if effective_delta < 0.0 && -effective_delta > open_qty {
            effective_delta = -open_qty;
        }
        tracker.change_open_qty(effective_delta);
        self.emit(Callback::replace(
            tracker.order().clone(),
            effective_delta,
            open_qty,
            tracker.filled_qty(),
            tracker.avg_price(),
        ));
        self.emit(Callback::book_update());
    }
}
