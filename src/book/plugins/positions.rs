//! Per-user position accounting.
//!
//! Every executed fill updates the positions of both participants
//! independently: same-direction fills extend the position with a
//! volume-weighted base price, opposite-direction fills reduce it, and a
//! fill that crosses zero closes the position and immediately reopens it
//! on the other side at the trade price.

use crate::book::callback::Callback;
use crate::book::core::BookCore;
use crate::book::tracker::Tracker;
use serde::Serialize;
use std::collections::HashMap;

/// A user's open position: signed quantity (long positive) and the
/// volume-weighted opening price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    /// Signed size; positive is long.
    pub qty: f64,
    /// Volume-weighted price at which the position was built.
    pub base_price: f64,
}

/// Maintains [`Position`]s and emits position callbacks on every trade.
#[derive(Debug, Default)]
pub(crate) struct PositionsModule {
    positions: HashMap<u64, Position>,
}

impl PositionsModule {
    /// The current position of `user_id`, if one is open.
    pub(crate) fn get(&self, user_id: u64) -> Option<Position> {
        self.positions.get(&user_id).copied()
    }

    /// Updates both participants after a fill. The maker is updated
    /// first. Returns the users whose positions closed, so dependent
    /// modules can react within the same operation.
    pub(crate) fn after_trade(
        &mut self,
        core: &mut BookCore,
        taker: &Tracker,
        maker: &Tracker,
        maker_is_bid: bool,
        qty: f64,
        price: f64,
    ) -> Vec<u64> {
        let mut closed = Vec::new();
        self.update(core, maker.user_id(), maker_is_bid, qty, price, &mut closed);
        self.update(core, taker.user_id(), !maker_is_bid, qty, price, &mut closed);
        closed
    }

    fn update(
        &mut self,
        core: &mut BookCore,
        user_id: u64,
        is_bid: bool,
        qty: f64,
        price: f64,
        closed: &mut Vec<u64>,
    ) {
        let signed_qty = if is_bid { qty } else { -qty };
        let current = self.positions.get(&user_id).copied().unwrap_or_default();
        let new_qty = current.qty + signed_qty;

        if current.qty == 0.0 || is_bid == (current.qty > 0.0) {
            // opening or extending, never crossing zero
            let base_price =
                (current.base_price * current.qty + price * signed_qty) / (signed_qty + current.qty);
            self.positions.insert(
                user_id,
                Position {
                    qty: new_qty,
                    base_price,
                },
            );
            if current.qty == 0.0 {
                core.emit(Callback::position_open(user_id, new_qty, base_price));
            } else {
                core.emit(Callback::position_update(user_id, new_qty, base_price));
            }
        } else if new_qty == 0.0 || (new_qty > 0.0) != (current.qty > 0.0) {
            // closed, and possibly reversed past zero
            core.emit(Callback::position_close(user_id));
            closed.push(user_id);
            if new_qty != 0.0 {
                self.positions.insert(
                    user_id,
                    Position {
                        qty: new_qty,
                        base_price: price,
                    },
                );
                core.emit(Callback::position_open(user_id, new_qty, price));
            } else {
                self.positions.remove(&user_id);
            }
        } else {
            // partial reduction keeps the base price
            self.positions.insert(
                user_id,
                Position {
                    qty: new_qty,
                    base_price: current.base_price,
                },
            );
            core.emit(Callback::position_update(
                user_id,
                new_qty,
                current.base_price,
            ));
        }
    }
}
