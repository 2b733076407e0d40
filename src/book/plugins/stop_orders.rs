//! Stop orders.
//!
//! Orders with a stop price are parked off-book until the market price
//! crosses the stop: buy stops trigger when the price rises to or above
//! the stop, sell stops when it falls to or below it. Triggered trackers
//! move to a pending queue that the book drains through the normal
//! matching path once the current operation settles, so one trigger's
//! trades can set off further triggers.

use crate::book::tracker::Tracker;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};

/// Ascending total order over stop prices.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StopPrice(f64);

impl Eq for StopPrice {}

impl PartialOrd for StopPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StopPrice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Parks untriggered stop orders and queues them when triggered.
#[derive(Debug, Default)]
pub(crate) struct StopOrdersModule {
    stop_bids: BTreeMap<StopPrice, VecDeque<Tracker>>,
    stop_asks: BTreeMap<StopPrice, VecDeque<Tracker>>,
    pending: VecDeque<Tracker>,
}

impl StopOrdersModule {
    /// Claims a tracker before matching. Returns `None` when the tracker
    /// was parked; a tracker without a stop price, or whose stop is
    /// already crossed, is handed back for normal matching.
    pub(crate) fn try_park(&mut self, market_price: f64, taker: Tracker) -> Option<Tracker> {
        let stop_price = taker.order().stop_price();
        if stop_price == 0.0 || Self::triggered(taker.is_bid(), stop_price, market_price) {
            return Some(taker);
        }

        let side = if taker.is_bid() {
            &mut self.stop_bids
        } else {
            &mut self.stop_asks
        };
        side.entry(StopPrice(stop_price)).or_default().push_back(taker);
        None
    }

    /// A market price of zero means no trade has happened yet; stops are
    /// treated as triggered rather than parked forever.
    fn triggered(is_bid: bool, stop_price: f64, market_price: f64) -> bool {
        if market_price == 0.0 {
            return true;
        }
        if is_bid {
            market_price >= stop_price
        } else {
            market_price <= stop_price
        }
    }

    /// Moves every stop inside the crossed interval to the pending
    /// queue. Rising prices fire buy stops lowest-first, falling prices
    /// fire sell stops highest-first, so the whole interval drains in
    /// trigger order.
    pub(crate) fn on_market_price_change(&mut self, prev_price: f64, new_price: f64) {
        if prev_price == new_price {
            return;
        }

        if new_price > prev_price {
            loop {
                let Some(entry) = self.stop_bids.first_entry() else {
                    break;
                };
                if entry.key().0 > new_price {
                    break;
                }
                self.pending.extend(entry.remove());
            }
        } else {
            loop {
                let Some(entry) = self.stop_asks.last_entry() else {
                    break;
                };
                if entry.key().0 < new_price {
                    break;
                }
                self.pending.extend(entry.remove());
            }
        }
    }

    /// Next triggered tracker awaiting re-submission.
    pub(crate) fn pop_pending(&mut self) -> Option<Tracker> {
        self.pending.pop_front()
    }

    /// Number of parked stop orders on one side.
    pub(crate) fn parked(&self, is_bid: bool) -> usize {
        let side = if is_bid { &self.stop_bids } else { &self.stop_asks };
        side.values().map(VecDeque::len).sum()
    }
}
