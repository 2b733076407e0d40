//! Shared fixtures: a recording listener and order constructors.

#![allow(dead_code)]

use matchbook_rs::prelude::*;
use std::sync::Arc;

/// Listener that records every flushed batch and every routing request,
/// optionally answering requests synchronously.
#[derive(Default)]
pub struct Recorder {
    pub batches: Vec<Vec<Callback>>,
    pub requests: Vec<RoutingRequest>,
    /// When set, every routing request is answered inline with this
    /// outcome, reproducing a venue that responds before the operation
    /// finishes.
    pub outcome: Option<RoutingOutcome>,
}

impl BookListener for Recorder {
    fn on_callbacks(&mut self, batch: &[Callback]) {
        self.batches.push(batch.to_vec());
    }

    fn on_routing_request(&mut self, request: &RoutingRequest) -> Option<RoutingOutcome> {
        self.requests.push(request.clone());
        self.outcome
    }
}

impl Recorder {
    pub fn last_batch(&self) -> &[Callback] {
        self.batches.last().map_or(&[], Vec::as_slice)
    }

    /// All recorded callbacks in flush order, flattened across batches.
    pub fn flattened(&self) -> Vec<Callback> {
        self.batches.iter().flatten().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
        self.requests.clear();
    }
}

pub fn oid(lo: u64) -> OrderId {
    OrderId::new(1, lo)
}

pub fn limit(id: u64, user_id: u64, is_bid: bool, price: f64, qty: f64) -> Arc<Order> {
    Arc::new(Order::limit(oid(id), user_id, is_bid, price, qty))
}

pub fn market_qty(id: u64, user_id: u64, is_bid: bool, qty: f64) -> Arc<Order> {
    Arc::new(Order::market_qty(oid(id), user_id, is_bid, qty))
}

pub fn market_funds(id: u64, user_id: u64, funds: f64) -> Arc<Order> {
    Arc::new(Order::market_funds(oid(id), user_id, funds))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub fn kinds(batch: &[Callback]) -> Vec<CallbackKind> {
    batch.iter().map(|cb| cb.kind).collect()
}

/// Total resting quantity at `price` on one side of the book.
pub fn level_qty(side: &SideMap, is_bid: bool, price: f64) -> f64 {
    side.get(&BookPrice::new(is_bid, price))
        .map_or(0.0, |queue| queue.iter().map(Tracker::qty_on_book).sum())
}
