//! Reduce-only orders.
//!
//! A reduce-only order may only shrink its user's position. Admission
//! rejects anything that would open, increase or reverse it; while the
//! order rests, matching keeps it inside the (possibly shrinking)
//! position bound by downsizing it with replace semantics; and when the
//! position closes, every tracked reduce-only order of that user is
//! cancelled.

use crate::book::core::BookCore;
use crate::book::order::Order;
use crate::book::plugins::positions::PositionsModule;
use crate::book::tracker::Tracker;
use crate::book::types::{CancelReason, InsertRejectReason};
use crate::constants::MIN_ORDER_QTY;
use std::collections::HashMap;
use std::sync::Arc;

/// Enforces the position bound on reduce-only orders.
#[derive(Debug, Default)]
pub(crate) struct ReduceOnlyModule {
    tracked: HashMap<u64, Vec<Arc<Order>>>,
}

impl ReduceOnlyModule {
    pub(crate) fn should_add(
        &mut self,
        positions: &PositionsModule,
        taker: &Tracker,
        reason: &mut InsertRejectReason,
    ) {
        if !taker.order().reduce_only() {
            return;
        }

        match positions.get(taker.user_id()) {
            // no position, or an order in the position's own direction
            None => *reason = InsertRejectReason::ReduceOnlyIncrease,
            Some(position) if (position.qty > 0.0) == taker.is_bid() => {
                *reason = InsertRejectReason::ReduceOnlyIncrease;
            }
            Some(position) if taker.open_qty() > position.qty.abs() => {
                *reason = InsertRejectReason::ReduceOnlyReverse;
            }
            Some(_) => {
                self.tracked
                    .entry(taker.user_id())
                    .or_default()
                    .push(taker.order().clone());
            }
        }
    }

    /// Keeps a reduce-only maker inside its position bound before it
    /// trades. Oversized makers are downsized in place and trade in the
    /// same cycle; once the position is too small to cover any fill the
    /// maker is cancelled instead.
    pub(crate) fn should_trade(
        &mut self,
        core: &mut BookCore,
        positions: &PositionsModule,
        maker: &mut Tracker,
        maker_reason: &mut CancelReason,
    ) {
        if !maker.order().reduce_only() {
            return;
        }

        let bound = match positions.get(maker.user_id()) {
            Some(position) => position.qty.abs(),
            // position vanished inside this same match cycle
            None => 0.0,
        };

        if maker.open_qty() > bound {
            if bound < MIN_ORDER_QTY {
                *maker_reason = CancelReason::ReduceOnlyMatch;
            } else {
                core.replace_in_hand(maker, bound - maker.open_qty());
            }
        }
    }

    /// Cancels every tracked reduce-only order of a user whose position
    /// just closed.
    pub(crate) fn on_position_close(&mut self, core: &mut BookCore, user_id: u64) {
        if let Some(orders) = self.tracked.remove(&user_id) {
            for order in orders {
                core.do_cancel(&order, CancelReason::ReduceOnlyClose);
            }
        }
    }
}
