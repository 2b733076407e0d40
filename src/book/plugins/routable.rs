//! External-venue routing of market-maker liquidity.
//!
//! Users registered as market makers (MM) stand for liquidity that
//! actually lives on another venue. A taker step that consumes MM orders
//! accumulates one [`RoutingRequest`] per venue: each MM fill is
//! re-scoped to `internal_only` (the depth projection already saw it)
//! and buffered on the request, the taker is temporarily cancelled, and
//! the request is handed to the listener. On success the buffered trades
//! replay as `external_only` and the taker's residual re-enters the
//! matching path as a continuation; on failure the taker is cancelled
//! with `routing_failure` and the failed venue's fills are dropped from
//! the replay.

use crate::book::callback::{Callback, CallbackKind};
use crate::book::core::BookCore;
use crate::book::tracker::Tracker;
use crate::book::types::{CallbackScope, CancelReason};
use crate::order_id::OrderId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A finalized request to execute aggregated quantity on an external
/// venue. `price` is the worst (last) price traded during the taker
/// step; `callbacks` are the buffered trade records to replay once the
/// venue answers.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingRequest {
    /// Monotonically increasing request identifier.
    pub request_id: u64,
    /// Target venue.
    pub exchange_id: u32,
    /// Instrument being routed.
    pub symbol_id: u32,
    /// Aggregated quantity across the buffered fills.
    pub qty: f64,
    /// Worst price traded during the step.
    pub price: f64,
    /// Side of the routed (taker) order.
    pub is_bid: bool,
    /// Reserved cancel slot, `DontCancel` on emission.
    pub cancel_reason: CancelReason,
    /// Snapshot of the taker at the last buffered fill.
    pub taker: Tracker,
    /// Snapshot of the last MM maker consumed.
    pub maker: Tracker,
    /// Trade records to replay on response.
    pub callbacks: Vec<Callback>,
}

impl RoutingRequest {
    /// Serializes the request for transport.
    ///
    /// # Errors
    /// Returns the underlying `serde_json` error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug)]
struct RequestBuilder {
    exchange_id: u32,
    qty: f64,
    price: f64,
    is_bid: bool,
    taker: Tracker,
    maker: Tracker,
}

/// The routing state machine, driven by the matching hooks.
#[derive(Debug, Default)]
pub(crate) struct RoutableModule {
    next: Option<RequestBuilder>,
    next_request_id: u64,
    pending: HashMap<u64, RoutingRequest>,
    pending_maker_order_ids: HashSet<OrderId>,
    mm_to_exchange: HashMap<u64, u32>,
    exchange_to_mm: HashMap<u32, u64>,
}

impl RoutableModule {
    /// Binds a market-maker user to an external venue.
    pub(crate) fn register_market_maker(&mut self, user_id: u64, exchange_id: u32) {
        self.mm_to_exchange.insert(user_id, exchange_id);
        self.exchange_to_mm.insert(exchange_id, user_id);
    }

    fn exchange_for(&self, user_id: u64) -> Option<u32> {
        self.mm_to_exchange.get(&user_id).copied()
    }

    pub(crate) fn mm_user_for_exchange(&self, exchange_id: u32) -> Option<u64> {
        self.exchange_to_mm.get(&exchange_id).copied()
    }

    pub(crate) fn take_request(&mut self, request_id: u64) -> Option<RoutingRequest> {
        self.pending.remove(&request_id)
    }

    pub(crate) fn request(&self, request_id: u64) -> Option<&RoutingRequest> {
        self.pending.get(&request_id)
    }

    pub(crate) fn forget_maker(&mut self, order_id: OrderId) {
        self.pending_maker_order_ids.remove(&order_id);
    }

    /// Gate the next candidate trade. Runs after the other modules, so
    /// a routing hold overrides their taker verdict: user liquidity and
    /// foreign venues are never touched while a request is building.
    pub(crate) fn should_trade(
        &self,
        maker: &Tracker,
        taker_reason: &mut CancelReason,
        maker_reason: &mut CancelReason,
    ) {
        let Some(exchange_id) = self.exchange_for(maker.user_id()) else {
            // user liquidity: flush the building request before touching it
            if self.next.is_some() {
                *taker_reason = CancelReason::TemporaryCancel;
            }
            return;
        };

        if self.pending_maker_order_ids.contains(&maker.order_id()) {
            // this maker is already out on the wire
            *maker_reason = CancelReason::MmRouted;
        }

        if let Some(builder) = &self.next {
            if builder.exchange_id != exchange_id {
                *taker_reason = CancelReason::TemporaryCancel;
            }
        }
    }

    /// Accumulates MM fills into the building request.
    pub(crate) fn after_trade(
        &mut self,
        taker: &Tracker,
        maker: &Tracker,
        maker_is_bid: bool,
        qty: f64,
        price: f64,
    ) {
        let Some(exchange_id) = self.exchange_for(maker.user_id()) else {
            return;
        };

        self.pending_maker_order_ids.insert(maker.order_id());

        match &mut self.next {
            Some(builder) => {
                builder.exchange_id = exchange_id;
                builder.qty += qty;
                // each fill trades at a worse level, keep the last price
                builder.price = price;
                builder.is_bid = !maker_is_bid;
                builder.taker = taker.clone();
                builder.maker = maker.clone();
            }
            None => {
                self.next = Some(RequestBuilder {
                    exchange_id,
                    qty,
                    price,
                    is_bid: !maker_is_bid,
                    taker: taker.clone(),
                    maker: maker.clone(),
                });
            }
        }
    }

    /// Finalizes the building request once the taker step settles:
    /// cancels the live taker, claims its MM trade records out of the
    /// batch, and queues the request for delivery.
    pub(crate) fn after_add_tracker(&mut self, core: &mut BookCore, taker: &Tracker) {
        let Some(builder) = self.next.take() else {
            return;
        };

        core.do_cancel(taker.order(), CancelReason::TemporaryCancel);

        let taker_id = builder.taker.order_id();
        let mut buffered = Vec::new();
        let start = core.latest_accept_index();
        for cb in core.callbacks_mut().iter_mut().skip(start) {
            // records already claimed, replayed or suppressed keep their scope
            if cb.scope != CallbackScope::BroadcastAll {
                continue;
            }
            if cb.order_id() != Some(taker_id) {
                continue;
            }
            match cb.kind {
                CallbackKind::Trade => {
                    let maker_is_mm = cb
                        .maker_order
                        .as_ref()
                        .is_some_and(|maker| self.mm_to_exchange.contains_key(&maker.user_id()));
                    if maker_is_mm {
                        cb.scope = CallbackScope::InternalOnly;
                        buffered.push(cb.clone());
                    }
                }
                CallbackKind::Cancel => {
                    cb.scope = CallbackScope::Suppress;
                }
                _ => {}
            }
        }

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        debug!(
            request_id,
            exchange_id = builder.exchange_id,
            qty = builder.qty,
            price = builder.price,
            "routing request finalized"
        );
        self.pending.insert(
            request_id,
            RoutingRequest {
                request_id,
                exchange_id: builder.exchange_id,
                symbol_id: core.symbol_id(),
                qty: builder.qty,
                price: builder.price,
                is_bid: builder.is_bid,
                cancel_reason: CancelReason::DontCancel,
                taker: builder.taker,
                maker: builder.maker,
                callbacks: buffered,
            },
        );
        core.routing_outbox.push_back(request_id);
    }
}
