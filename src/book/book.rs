//! The order book and its matching loop.
//!
//! One public operation (`add`, `cancel`, `replace`, `set_market_price`,
//! a routing response) runs to completion, appending callback records to
//! a batch that is flushed exactly once to the listener at the end of
//! the operation. The engine is single-threaded and never re-enters
//! itself from a listener; a listener that wants to answer a routing
//! request synchronously returns the outcome from `on_routing_request`
//! and the book folds the response into the current operation.

use crate::book::callback::{Callback, CallbackKind, FillFlags};
use crate::book::core::{BookCore, SideMap};
use crate::book::error::BookError;
use crate::book::order::Order;
use crate::book::plugin::PluginSet;
use crate::book::plugins::positions::{Position, PositionsModule};
use crate::book::plugins::post_only::PostOnlyModule;
use crate::book::plugins::reduce_only::ReduceOnlyModule;
use crate::book::plugins::routable::{RoutableModule, RoutingRequest};
use crate::book::plugins::self_trade::SelfTradePolicyModule;
use crate::book::plugins::stop_orders::StopOrdersModule;
use crate::book::tracker::Tracker;
use crate::book::types::{CallbackScope, CancelReason, InsertRejectReason};
use crate::constants::{MIN_ORDER_FUNDS, MIN_ORDER_QTY};
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of a synchronously answered routing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// The external venue executed the routed quantity.
    Success,
    /// The external venue rejected the routed quantity.
    Failure,
}

/// Outbound seam of the book, supplied by the hosting process.
pub trait BookListener {
    /// Receives the callback batch of one public operation.
    fn on_callbacks(&mut self, batch: &[Callback]);

    /// Receives a finalized routing request. Returning `Some` resolves
    /// the request within the current operation; returning `None`
    /// defers to [`OrderBook::on_routing_success`] /
    /// [`OrderBook::on_routing_failure`].
    fn on_routing_request(&mut self, _request: &RoutingRequest) -> Option<RoutingOutcome> {
        None
    }
}

struct AddOutcome {
    matched: bool,
    filled_qty: f64,
    avg_price: f64,
}

/// A price-time-priority order book for a single instrument.
pub struct OrderBook<L: BookListener> {
    core: BookCore,
    plugins: PluginSet,
    listener: L,
}

/// Configures which policy modules a book is built with.
#[derive(Debug, Clone, Default)]
pub struct OrderBookBuilder {
    symbol_id: u32,
    self_trade: bool,
    post_only: bool,
    positions: bool,
    reduce_only: bool,
    stops: bool,
    routing: bool,
}

impl OrderBookBuilder {
    /// Starts a builder for the given instrument.
    #[must_use]
    pub fn new(symbol_id: u32) -> Self {
        Self {
            symbol_id,
            ..Self::default()
        }
    }

    /// Enables self-trade prevention.
    #[must_use]
    pub fn with_self_trade_policy(mut self) -> Self {
        self.self_trade = true;
        self
    }

    /// Enables post-only enforcement.
    #[must_use]
    pub fn with_post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    /// Enables position accounting.
    #[must_use]
    pub fn with_positions(mut self) -> Self {
        self.positions = true;
        self
    }

    /// Enables reduce-only orders. Implies position accounting.
    #[must_use]
    pub fn with_reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self.positions = true;
        self
    }

    /// Enables stop orders.
    #[must_use]
    pub fn with_stop_orders(mut self) -> Self {
        self.stops = true;
        self
    }

    /// Enables external-venue routing.
    #[must_use]
    pub fn with_routing(mut self) -> Self {
        self.routing = true;
        self
    }

    /// Builds the book around the given listener.
    pub fn build<L: BookListener>(self, listener: L) -> OrderBook<L> {
        let plugins = PluginSet {
            self_trade: self.self_trade.then(SelfTradePolicyModule::default),
            post_only: self.post_only.then(PostOnlyModule::default),
            reduce_only: self.reduce_only.then(ReduceOnlyModule::default),
            positions: self.positions.then(PositionsModule::default),
            stops: self.stops.then(StopOrdersModule::default),
            routable: self.routing.then(RoutableModule::default),
        };
        OrderBook {
            core: BookCore::new(self.symbol_id),
            plugins,
            listener,
        }
    }
}

impl<L: BookListener> OrderBook<L> {
    /// Creates a book with no policy modules.
    pub fn new(symbol_id: u32, listener: L) -> Self {
        OrderBookBuilder::new(symbol_id).build(listener)
    }

    /// The instrument this book trades.
    #[must_use]
    pub fn symbol_id(&self) -> u32 {
        self.core.symbol_id()
    }

    /// Price of the last trade; zero before the first trade.
    #[must_use]
    pub fn market_price(&self) -> f64 {
        self.core.market_price()
    }

    /// Resting buy orders, best price first.
    #[must_use]
    pub fn bids(&self) -> &SideMap {
        self.core.bids()
    }

    /// Resting sell orders, best price first.
    #[must_use]
    pub fn asks(&self) -> &SideMap {
        self.core.asks()
    }

    /// The current position of a user, when position accounting is
    /// enabled and the user has one open.
    #[must_use]
    pub fn position(&self, user_id: u64) -> Option<Position> {
        self.plugins.positions.as_ref().and_then(|p| p.get(user_id))
    }

    /// Number of parked (untriggered) stop orders on one side.
    #[must_use]
    pub fn parked_stop_orders(&self, is_bid: bool) -> usize {
        self.plugins.stops.as_ref().map_or(0, |s| s.parked(is_bid))
    }

    /// The listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// The listener, mutably.
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Binds a market-maker user to an external venue.
    ///
    /// # Errors
    /// [`BookError::RoutingDisabled`] when the book was built without
    /// the routable module.
    pub fn register_market_maker(
        &mut self,
        user_id: u64,
        exchange_id: u32,
    ) -> Result<(), BookError> {
        self.plugins
            .routable
            .as_mut()
            .ok_or(BookError::RoutingDisabled)?
            .register_market_maker(user_id, exchange_id);
        Ok(())
    }

    /// Accepts an incoming order, matching it against resting liquidity
    /// and resting the remainder. Returns whether any fill happened.
    ///
    /// # Errors
    /// Only protocol faults surface as errors; user-level rejections are
    /// reported through the callback batch.
    pub fn add(&mut self, order: Arc<Order>) -> Result<bool, BookError> {
        trace!(
            order_id = %order.order_id(),
            user_id = order.user_id(),
            is_bid = order.is_bid(),
            price = order.price(),
            qty = order.qty(),
            "add order"
        );

        if let Some(reason) = Self::validate(&order) {
            self.core.emit(Callback::reject(order, reason));
            self.flush();
            return Ok(false);
        }

        let taker = Tracker::new(order.clone());
        let mut reason = InsertRejectReason::DontReject;
        self.plugins.should_add(&taker, &mut reason);
        if reason != InsertRejectReason::DontReject {
            self.core.emit(Callback::reject(order, reason));
            self.flush();
            return Ok(false);
        }

        let accept_index = self.core.callbacks.len();
        self.core.emit(Callback::accept(order));

        let outcome = self.add_tracker(taker)?;

        // the accept record always reflects the post-match totals
        if let Some(accept) = self.core.callbacks.get_mut(accept_index) {
            accept.qty = outcome.filled_qty;
            accept.avg_price = outcome.avg_price;
        }

        self.core.emit(Callback::book_update());
        self.flush();
        Ok(outcome.matched)
    }

    /// Cancels a resting order. An explicit user cancel of an unknown
    /// order reports `cancel_reject(not_found)`.
    pub fn cancel(&mut self, order: &Arc<Order>, reason: CancelReason) {
        trace!(order_id = %order.order_id(), %reason, "cancel order");
        self.core.do_cancel(order, reason);
        self.core.emit(Callback::book_update());
        self.flush();
    }

    /// Adjusts the open quantity of a resting order by `delta`.
    pub fn replace(&mut self, order: &Arc<Order>, delta: f64) {
        trace!(order_id = %order.order_id(), delta, "replace order");
        self.core.do_replace(order, delta);
        self.flush();
    }

    /// Sets the market price directly, firing any stop orders the move
    /// triggers.
    ///
    /// # Errors
    /// Propagates protocol faults from re-submitted stop orders.
    pub fn set_market_price(&mut self, price: f64) -> Result<(), BookError> {
        let prev_price = self.core.market_price;
        self.core.market_price = price;
        self.plugins.on_market_price_change(prev_price, price);
        self.drain_stop_triggers()?;
        if !self.core.callbacks.is_empty() {
            self.core.emit(Callback::book_update());
            self.flush();
        }
        Ok(())
    }

    /// Resolves a deferred routing request as executed.
    ///
    /// # Errors
    /// [`BookError::UnknownRoutingRequest`] when no such request is
    /// pending.
    pub fn on_routing_success(&mut self, request_id: u64) -> Result<(), BookError> {
        self.handle_routing_success(request_id)?;
        if !self.core.callbacks.is_empty() {
            self.flush();
        }
        Ok(())
    }

    /// Resolves a deferred routing request as rejected.
    ///
    /// # Errors
    /// [`BookError::UnknownRoutingRequest`] when no such request is
    /// pending.
    pub fn on_routing_failure(&mut self, request_id: u64) -> Result<(), BookError> {
        self.handle_routing_failure(request_id)?;
        if !self.core.callbacks.is_empty() {
            self.flush();
        }
        Ok(())
    }

    fn validate(order: &Order) -> Option<InsertRejectReason> {
        if order.price() < 0.0 || order.qty() < 0.0 || order.funds() < 0.0 {
            return Some(InsertRejectReason::NoReason);
        }
        if order.qty() < MIN_ORDER_QTY && order.funds() < MIN_ORDER_FUNDS {
            return Some(if order.funds() > 0.0 {
                InsertRejectReason::FundsTooSmall
            } else {
                InsertRejectReason::QtyTooSmall
            });
        }
        None
    }

    /// Runs a tracker through parking, matching and resting, then
    /// settles deferred routing and stop work. Also the re-entry point
    /// for stop triggers and routing continuations.
    fn add_tracker(&mut self, taker: Tracker) -> Result<AddOutcome, BookError> {
        let mut taker = match self.plugins.try_park(&self.core, taker) {
            Some(taker) => taker,
            None => {
                // parked as a stop order, off-book until triggered
                return Ok(AddOutcome {
                    matched: false,
                    filled_qty: 0.0,
                    avg_price: 0.0,
                });
            }
        };

        let matched = self.match_loop(&mut taker)?;

        let outcome = AddOutcome {
            matched,
            filled_qty: taker.filled_qty(),
            avg_price: taker.avg_price(),
        };

        if !taker.filled() && !self.core.is_taker_cancelled {
            if taker.price() == 0.0 {
                self.core.emit_cancel(&taker, CancelReason::NoLiquidity);
                self.plugins.after_add_tracker(&mut self.core, &taker);
            } else {
                let resting = taker.clone();
                self.core.insert_tracker(taker);
                self.plugins.after_add_tracker(&mut self.core, &resting);
            }
        } else {
            self.plugins.after_add_tracker(&mut self.core, &taker);
        }
        self.core.is_taker_cancelled = false;

        self.drain_routing()?;
        self.drain_stop_triggers()?;

        Ok(outcome)
    }

    /// Consumes resting liquidity while the best opposite level crosses
    /// the taker's price. Same-price makers trade in insertion order.
    fn match_loop(&mut self, taker: &mut Tracker) -> Result<bool, BookError> {
        let mut matched = false;
        let maker_is_bid = !taker.is_bid();

        while !taker.filled() {
            let Some(best_key) = self.core.best_key(maker_is_bid) else {
                break;
            };
            if !best_key.matches(taker.price()) {
                break;
            }
            let Some(mut maker) = self.core.pop_front(maker_is_bid, best_key) else {
                break;
            };

            let mut taker_reason = CancelReason::DontCancel;
            let mut maker_reason = CancelReason::DontCancel;
            self.plugins.should_trade(
                &mut self.core,
                taker,
                &mut maker,
                &mut taker_reason,
                &mut maker_reason,
            );

            let mut maker_slot = Some(maker);
            if maker_reason != CancelReason::DontCancel {
                if let Some(cancelled) = maker_slot.take() {
                    self.core.emit_cancel(&cancelled, maker_reason);
                }
            }
            if taker_reason != CancelReason::DontCancel {
                self.core.emit_cancel(taker, taker_reason);
                self.core.is_taker_cancelled = true;
                if let Some(kept) = maker_slot.take() {
                    self.core.push_front(maker_is_bid, best_key, kept);
                }
                break;
            }
            let Some(mut maker) = maker_slot else {
                continue;
            };

            let traded = self.trade(taker, &mut maker)?;
            if traded > 0.0 {
                matched = true;
                if !maker.filled() {
                    self.core.push_front(maker_is_bid, best_key, maker);
                }
            } else if maker.tradable_qty(best_key.price()) <= 0.0 {
                // the maker's funds bound leaves nothing tradable at its
                // own price; it counts as filled and leaves the book
                continue;
            } else {
                // the taker cannot trade at this or any worse price
                self.core.push_front(maker_is_bid, best_key, maker);
                break;
            }
        }

        Ok(matched)
    }

    /// Executes one fill between the taker and the maker at the maker's
    /// price.
    fn trade(&mut self, taker: &mut Tracker, maker: &mut Tracker) -> Result<f64, BookError> {
        let xprice = maker.price();
        debug_assert!(xprice > 0.0);

        let fill_qty = taker.tradable_qty(xprice).min(maker.tradable_qty(xprice));
        if fill_qty <= 0.0 {
            return Ok(0.0);
        }
        let fill_cost = fill_qty * xprice;

        taker.fill(fill_qty, fill_cost)?;
        maker.fill(fill_qty, fill_cost)?;

        let mut flags = FillFlags::empty();
        if taker.filled() {
            flags |= FillFlags::TAKER_FILLED;
        }
        if maker.filled() {
            flags |= FillFlags::MAKER_FILLED;
        }

        self.core.emit(Callback::trade(
            taker.order().clone(),
            maker.order().clone(),
            fill_qty,
            xprice,
            taker.avg_price(),
            maker.avg_price(),
            taker.filled_qty(),
            maker.filled_qty(),
            flags,
        ));

        self.update_market_price(xprice);
        self.plugins
            .after_trade(&mut self.core, taker, maker, maker.is_bid(), fill_qty, xprice);

        Ok(fill_qty)
    }

    fn update_market_price(&mut self, price: f64) {
        let prev_price = self.core.market_price;
        self.core.market_price = price;
        self.plugins.on_market_price_change(prev_price, price);
    }

    /// Delivers finalized routing requests to the listener, folding any
    /// synchronous outcome back into the current operation.
    fn drain_routing(&mut self) -> Result<(), BookError> {
        while let Some(request_id) = self.core.routing_outbox.pop_front() {
            let outcome = match self
                .plugins
                .routable
                .as_ref()
                .and_then(|routable| routable.request(request_id))
            {
                Some(request) => self.listener.on_routing_request(request),
                None => None,
            };
            match outcome {
                Some(RoutingOutcome::Success) => self.handle_routing_success(request_id)?,
                Some(RoutingOutcome::Failure) => self.handle_routing_failure(request_id)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Re-submits triggered stop orders through the matching path until
    /// no further triggers fire.
    fn drain_stop_triggers(&mut self) -> Result<(), BookError> {
        loop {
            let pending = self
                .plugins
                .stops
                .as_mut()
                .and_then(StopOrdersModule::pop_pending);
            let Some(tracker) = pending else {
                return Ok(());
            };
            let order = tracker.order().clone();
            debug!(order_id = %order.order_id(), stop_price = order.stop_price(), "stop triggered");
            self.add_tracker(tracker)?;
            self.core.emit(Callback::stop_trigger(order));
        }
    }

    fn handle_routing_success(&mut self, request_id: u64) -> Result<(), BookError> {
        let request = self
            .plugins
            .routable
            .as_mut()
            .ok_or(BookError::RoutingDisabled)?
            .take_request(request_id)
            .ok_or(BookError::UnknownRoutingRequest { request_id })?;
        debug!(request_id, "routing success");

        for buffered in &request.callbacks {
            let mut replay = buffered.clone();
            replay.scope = CallbackScope::ExternalOnly;
            self.core.emit(replay);
        }

        if request.cancel_reason == CancelReason::DontCancel && !request.taker.filled() {
            // re-submit the residual; the suppressed accept marks it as
            // a continuation of the original order, not a new one
            self.add_tracker(request.taker.clone())?;
            let mut accept = Callback::accept(request.taker.order().clone());
            accept.scope = CallbackScope::Suppress;
            self.core.emit(accept);
        }

        if let Some(routable) = self.plugins.routable.as_mut() {
            routable.forget_maker(request.maker.order_id());
        }
        Ok(())
    }

    fn handle_routing_failure(&mut self, request_id: u64) -> Result<(), BookError> {
        let request = self
            .plugins
            .routable
            .as_mut()
            .ok_or(BookError::RoutingDisabled)?
            .take_request(request_id)
            .ok_or(BookError::UnknownRoutingRequest { request_id })?;
        debug!(request_id, exchange_id = request.exchange_id, "routing failure");

        let failed_mm_user = self
            .plugins
            .routable
            .as_ref()
            .and_then(|routable| routable.mm_user_for_exchange(request.exchange_id));

        for buffered in &request.callbacks {
            // the failed venue's fill never happened
            let maker_user = buffered.maker_order.as_ref().map(|maker| maker.user_id());
            if buffered.kind == CallbackKind::Trade && maker_user == failed_mm_user {
                continue;
            }
            let mut replay = buffered.clone();
            replay.scope = CallbackScope::ExternalOnly;
            self.core.emit(replay);
        }

        let taker = &request.taker;
        let residual = self.core.resting_qty(taker.order());
        let mut cancel = Callback::cancel(
            taker.order().clone(),
            taker.qty_on_book(),
            taker.filled_qty(),
            taker.avg_price(),
            CancelReason::RoutingFailure,
        );
        cancel.scope = CallbackScope::ExternalOnly;
        // the failed quantity never filled; generic_1 carries the total
        // quantity whose hold the upstream manager must release
        cancel.qty -= request.qty;
        cancel.generic_1 = request.qty + residual;
        self.core.emit(cancel);

        if let Some(routable) = self.plugins.routable.as_mut() {
            routable.forget_maker(request.maker.order_id());
        }
        Ok(())
    }

    fn flush(&mut self) {
        let batch = std::mem::take(&mut self.core.callbacks);
        self.listener.on_callbacks(&batch);
        self.core.callbacks = batch;
        self.core.callbacks.clear();
    }
}
