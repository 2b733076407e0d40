//! The hook surface and its fixed dispatch order.
//!
//! Policy modules are composed as orthogonal state, not a hierarchy:
//! [`PluginSet`] holds one optional instance of each module and invokes
//! their hooks in a fixed declaration order. Hooks receive `&mut
//! BookCore`, so a module can emit callbacks and cancel or resize
//! resting orders, but cannot re-enter the matching loop; work that
//! needs the full book (stop resubmission, routing delivery) goes
//! through queues the book drains after the dispatch returns.
//!
//! | Hook | When | Modules |
//! |---|---|---|
//! | `should_add` | before the accept record | reduce-only |
//! | `try_park` | before matching | stop orders |
//! | `should_trade` | before each candidate trade | self-trade, post-only, reduce-only, routable |
//! | `after_trade` | after each executed fill | positions (then reduce-only close-outs), routable |
//! | `after_add_tracker` | after the matching loop settles | routable |
//! | `on_market_price_change` | after the market price moves | stop orders |
//!
//! Cross-module dependencies are explicit: reduce-only consumes the
//! positions module's `get`/close notifications instead of keeping its
//! own accounting.

use crate::book::core::BookCore;
use crate::book::plugins::positions::PositionsModule;
use crate::book::plugins::post_only::PostOnlyModule;
use crate::book::plugins::reduce_only::ReduceOnlyModule;
use crate::book::plugins::routable::RoutableModule;
use crate::book::plugins::self_trade::SelfTradePolicyModule;
use crate::book::plugins::stop_orders::StopOrdersModule;
use crate::book::tracker::Tracker;
use crate::book::types::{CancelReason, InsertRejectReason};

/// The enabled policy modules of one book.
#[derive(Default)]
pub(crate) struct PluginSet {
    pub(crate) self_trade: Option<SelfTradePolicyModule>,
    pub(crate) post_only: Option<PostOnlyModule>,
    pub(crate) reduce_only: Option<ReduceOnlyModule>,
    pub(crate) positions: Option<PositionsModule>,
    pub(crate) stops: Option<StopOrdersModule>,
    pub(crate) routable: Option<RoutableModule>,
}

impl PluginSet {
    /// Admission gate. Any module that sets a reason other than
    /// `DontReject` rejects the order.
    pub(crate) fn should_add(&mut self, taker: &Tracker, reason: &mut InsertRejectReason) {
        if let Some(reduce_only) = self.reduce_only.as_mut() {
            if let Some(positions) = self.positions.as_ref() {
                reduce_only.should_add(positions, taker, reason);
            }
        }
    }

    /// Offers the tracker to modules that take custody before matching.
    /// Returns `None` when a module kept it.
    pub(crate) fn try_park(&mut self, core: &BookCore, taker: Tracker) -> Option<Tracker> {
        match self.stops.as_mut() {
            Some(stops) => stops.try_park(core.market_price(), taker),
            None => Some(taker),
        }
    }

    /// Pre-trade gate. A maker reason cancels and skips the maker, a
    /// taker reason cancels the taker and ends the matching loop. The
    /// routable module runs last so a routing hold overrides the
    /// others' taker verdict.
    pub(crate) fn should_trade(
        &mut self,
        core: &mut BookCore,
        taker: &Tracker,
        maker: &mut Tracker,
        taker_reason: &mut CancelReason,
        maker_reason: &mut CancelReason,
    ) {
        if let Some(self_trade) = self.self_trade.as_ref() {
            self_trade.should_trade(taker, maker, taker_reason, maker_reason);
        }
        if let Some(post_only) = self.post_only.as_ref() {
            post_only.should_trade(taker, taker_reason);
        }
        if let Some(reduce_only) = self.reduce_only.as_mut() {
            if let Some(positions) = self.positions.as_ref() {
                reduce_only.should_trade(core, positions, maker, maker_reason);
            }
        }
        if let Some(routable) = self.routable.as_ref() {
            routable.should_trade(maker, taker_reason, maker_reason);
        }
    }

    /// Post-fill bookkeeping: positions first (their close events feed
    /// the reduce-only module within the same operation), then routing
    /// accumulation.
    pub(crate) fn after_trade(
        &mut self,
        core: &mut BookCore,
        taker: &Tracker,
        maker: &Tracker,
        maker_is_bid: bool,
        qty: f64,
        price: f64,
    ) {
        if let Some(positions) = self.positions.as_mut() {
            let closed = positions.after_trade(core, taker, maker, maker_is_bid, qty, price);
            if let Some(reduce_only) = self.reduce_only.as_mut() {
                for user_id in closed {
                    reduce_only.on_position_close(core, user_id);
                }
            }
        }
        if let Some(routable) = self.routable.as_mut() {
            routable.after_trade(taker, maker, maker_is_bid, qty, price);
        }
    }

    /// Settles the taker step: the routable module finalizes any
    /// building request here.
    pub(crate) fn after_add_tracker(&mut self, core: &mut BookCore, taker: &Tracker) {
        if let Some(routable) = self.routable.as_mut() {
            routable.after_add_tracker(core, taker);
        }
    }

    /// Market price moved; stop orders may trigger.
    pub(crate) fn on_market_price_change(&mut self, prev_price: f64, new_price: f64) {
        if let Some(stops) = self.stops.as_mut() {
            stops.on_market_price_change(prev_price, new_price);
        }
    }
}
