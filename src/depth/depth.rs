//! Aggregated top-N depth with hidden overflow storage.
//!
//! Each side keeps an array of the best `SIZE` levels in price order;
//! levels pushed out of the window move to an overflow map and re-enter
//! when a window level empties. Mutations of in-window levels advance a
//! monotonic change id used to drive publication; hidden-level
//! mutations do not.

use crate::constants::{DEPTH_SIZE, EPSILON};
use crate::depth::error::DepthError;
use crate::depth::level::DepthLevel;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ascending total order over level prices for the overflow maps.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LevelPrice(f64);

impl Eq for LevelPrice {}

impl PartialOrd for LevelPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LevelPrice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The aggregated depth of one book, `SIZE` best levels per side.
pub struct Depth<const SIZE: usize = DEPTH_SIZE> {
    bids: [DepthLevel; SIZE],
    asks: [DepthLevel; SIZE],
    hidden_bids: BTreeMap<LevelPrice, DepthLevel>,
    hidden_asks: BTreeMap<LevelPrice, DepthLevel>,
    last_change: u64,
    last_published_change: u64,
    skip_bid_fill: f64,
    skip_ask_fill: f64,
}

impl<const SIZE: usize> Default for Depth<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> Depth<SIZE> {
    /// An empty depth.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bids: [DepthLevel::EMPTY; SIZE],
            asks: [DepthLevel::EMPTY; SIZE],
            hidden_bids: BTreeMap::new(),
            hidden_asks: BTreeMap::new(),
            last_change: 0,
            last_published_change: 0,
            skip_bid_fill: 0.0,
            skip_ask_fill: 0.0,
        }
    }

    /// In-window bid levels, best first. Unoccupied tail slots carry
    /// the invalid (zero) price.
    #[must_use]
    pub fn bids(&self) -> &[DepthLevel] {
        &self.bids
    }

    /// In-window ask levels, best first.
    #[must_use]
    pub fn asks(&self) -> &[DepthLevel] {
        &self.asks
    }

    /// The best bid level.
    #[must_use]
    pub fn best_bid(&self) -> &DepthLevel {
        &self.bids[0]
    }

    /// The best ask level.
    #[must_use]
    pub fn best_ask(&self) -> &DepthLevel {
        &self.asks[0]
    }

    /// Number of levels currently in overflow storage on one side.
    #[must_use]
    pub fn hidden_levels(&self, is_bid: bool) -> usize {
        if is_bid {
            self.hidden_bids.len()
        } else {
            self.hidden_asks.len()
        }
    }

    /// Current change id.
    #[must_use]
    pub fn last_change(&self) -> u64 {
        self.last_change
    }

    /// Change id of the last publication.
    #[must_use]
    pub fn last_published_change(&self) -> u64 {
        self.last_published_change
    }

    /// Whether anything visible changed since the last publication.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.last_change > self.last_published_change
    }

    /// Marks the projection as drained by its publisher.
    pub fn published(&mut self) {
        self.last_published_change = self.last_change;
    }

    /// Registers a resting order at `price`.
    pub fn add_order(&mut self, price: f64, qty: f64, is_bid: bool) {
        let change_id = self.last_change + 1;

        if let Some(index) = self.window_index(is_bid, price) {
            let level = &mut self.window_mut(is_bid)[index];
            level.add_order(qty);
            level.set_last_change(change_id);
            self.last_change = change_id;
            return;
        }

        if self.add_to_hidden(is_bid, price, qty) {
            return;
        }

        let insert_at = self
            .window(is_bid)
            .iter()
            .position(|level| level.is_empty_slot() || Self::better(is_bid, price, level.price()));
        match insert_at {
            Some(index) => {
                self.insert_before(is_bid, index, change_id, price);
                let level = &mut self.window_mut(is_bid)[index];
                level.add_order(qty);
                level.set_last_change(change_id);
                self.last_change = change_id;
            }
            None => {
                // worse than the whole window, straight to overflow
                let mut level = DepthLevel::EMPTY;
                level.init(price, true);
                level.add_order(qty);
                self.hidden_mut(is_bid).insert(LevelPrice(price), level);
            }
        }
    }

    /// Registers a one-shot suppressor: the next fills on this side
    /// totaling `qty` are absorbed instead of applied. Used when an
    /// accept represents an order that fully matched on entry, so the
    /// paired fills must not double-count.
    ///
    /// # Errors
    /// [`DepthError::SkipFillPending`] when a skip is already pending on
    /// this side.
    pub fn skip_fill(&mut self, qty: f64, is_bid: bool) -> Result<(), DepthError> {
        let pending = if is_bid {
            &mut self.skip_bid_fill
        } else {
            &mut self.skip_ask_fill
        };
        if *pending != 0.0 {
            return Err(DepthError::SkipFillPending {
                pending: *pending,
                is_bid,
            });
        }
        *pending = qty;
        Ok(())
    }

    /// Applies one fill at `price`: absorbed by a pending skip, a level
    /// close when the participant was completely filled, or a quantity
    /// reduction otherwise.
    ///
    /// # Errors
    /// Propagates level faults from the close path.
    pub fn fill_order(
        &mut self,
        price: f64,
        fill_qty: f64,
        filled: bool,
        is_bid: bool,
    ) -> Result<(), DepthError> {
        if is_bid && self.skip_bid_fill != 0.0 {
            self.skip_bid_fill -= fill_qty;
            if self.skip_bid_fill < EPSILON {
                self.skip_bid_fill = 0.0;
            }
        } else if !is_bid && self.skip_ask_fill != 0.0 {
            self.skip_ask_fill -= fill_qty;
            if self.skip_ask_fill < EPSILON {
                self.skip_ask_fill = 0.0;
            }
        } else if filled {
            self.close_order(price, fill_qty, is_bid)?;
        } else {
            self.change_qty_order(price, -fill_qty, is_bid);
        }
        Ok(())
    }

    /// Removes one order with `open_qty` remaining from the level at
    /// `price`. Returns `true` when the level emptied and was erased.
    ///
    /// # Errors
    /// Level faults per [`DepthError`].
    pub fn close_order(
        &mut self,
        price: f64,
        open_qty: f64,
        is_bid: bool,
    ) -> Result<bool, DepthError> {
        if let Some(index) = self.window_index(is_bid, price) {
            let emptied = self.window_mut(is_bid)[index].close_order(open_qty)?;
            if emptied {
                self.erase_window_level(is_bid, index);
                return Ok(true);
            }
            self.last_change += 1;
            let change_id = self.last_change;
            self.window_mut(is_bid)[index].set_last_change(change_id);
            return Ok(false);
        }

        let hidden = self.hidden_mut(is_bid);
        if let Some(level) = hidden.get_mut(&LevelPrice(price)) {
            let emptied = level.close_order(open_qty)?;
            if emptied {
                hidden.remove(&LevelPrice(price));
            }
            return Ok(emptied);
        }

        Ok(false)
    }

    /// Adjusts the aggregate at `price` by `qty_delta`.
    pub fn change_qty_order(&mut self, price: f64, qty_delta: f64, is_bid: bool) {
        if qty_delta == 0.0 {
            return;
        }

        if let Some(index) = self.window_index(is_bid, price) {
            self.last_change += 1;
            let change_id = self.last_change;
            let level = &mut self.window_mut(is_bid)[index];
            if qty_delta > 0.0 {
                level.increase_qty(qty_delta);
            } else {
                level.decrease_qty(-qty_delta);
            }
            level.set_last_change(change_id);
            return;
        }

        if let Some(level) = self.hidden_mut(is_bid).get_mut(&LevelPrice(price)) {
            if qty_delta > 0.0 {
                level.increase_qty(qty_delta);
            } else {
                level.decrease_qty(-qty_delta);
            }
        }
    }

    /// Applies a replace: a same-price replace adjusts the aggregate, a
    /// price move re-adds at the new price and closes at the old one.
    /// Returns `true` when the old level was erased.
    ///
    /// # Errors
    /// Level faults from the close path.
    pub fn replace_order(
        &mut self,
        current_price: f64,
        new_price: f64,
        current_qty_on_book: f64,
        effective_delta: f64,
        is_bid: bool,
    ) -> Result<bool, DepthError> {
        if current_price == new_price {
            self.change_qty_order(current_price, effective_delta, is_bid);
            Ok(false)
        } else {
            self.add_order(new_price, current_qty_on_book + effective_delta, is_bid);
            self.close_order(current_price, current_qty_on_book, is_bid)
        }
    }

    fn better(is_bid: bool, a: f64, b: f64) -> bool {
        if is_bid { a > b } else { a < b }
    }

    fn window(&self, is_bid: bool) -> &[DepthLevel; SIZE] {
        if is_bid { &self.bids } else { &self.asks }
    }

    fn window_mut(&mut self, is_bid: bool) -> &mut [DepthLevel; SIZE] {
        if is_bid { &mut self.bids } else { &mut self.asks }
    }

    fn hidden_mut(&mut self, is_bid: bool) -> &mut BTreeMap<LevelPrice, DepthLevel> {
        if is_bid {
            &mut self.hidden_bids
        } else {
            &mut self.hidden_asks
        }
    }

    fn window_index(&self, is_bid: bool, price: f64) -> Option<usize> {
        self.window(is_bid)
            .iter()
            .position(|level| !level.is_empty_slot() && level.price() == price)
    }

    fn add_to_hidden(&mut self, is_bid: bool, price: f64, qty: f64) -> bool {
        match self.hidden_mut(is_bid).get_mut(&LevelPrice(price)) {
            Some(level) => {
                level.add_order(qty);
                true
            }
            None => false,
        }
    }

    /// Opens the slot at `index` by evicting the worst in-window level
    /// to overflow storage and shifting the tail down.
    fn insert_before(&mut self, is_bid: bool, index: usize, change_id: u64, price: f64) {
        let last = self.window(is_bid)[SIZE - 1];
        if !last.is_empty_slot() {
            let mut evicted = last;
            evicted.set_hidden(true);
            self.hidden_mut(is_bid)
                .insert(LevelPrice(evicted.price()), evicted);
        }

        let window = self.window_mut(is_bid);
        let mut i = SIZE - 1;
        while i > index {
            window[i] = window[i - 1];
            if !window[i].is_empty_slot() {
                window[i].set_last_change(change_id);
            }
            i -= 1;
        }
        window[index].init(price, false);
    }

    /// Erases the in-window level at `index`, pulling the best hidden
    /// level into the freed tail slot.
    fn erase_window_level(&mut self, is_bid: bool, index: usize) {
        self.last_change += 1;
        let change_id = self.last_change;

        {
            let window = self.window_mut(is_bid);
            let mut i = index;
            while i + 1 < SIZE {
                window[i] = window[i + 1];
                if !window[i].is_empty_slot() || i == index {
                    window[i].set_last_change(change_id);
                }
                i += 1;
            }
        }

        let promoted = if is_bid {
            // best hidden bid is the highest price
            self.hidden_bids.pop_last()
        } else {
            self.hidden_asks.pop_first()
        };
        let window = self.window_mut(is_bid);
        match promoted {
            Some((_, mut level)) => {
                level.set_hidden(false);
                level.set_last_change(change_id);
                window[SIZE - 1] = level;
            }
            None => {
                window[SIZE - 1] = DepthLevel::EMPTY;
                window[SIZE - 1].set_last_change(change_id);
            }
        }
    }
}
