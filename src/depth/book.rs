//! Drives a [`Depth`] purely from flushed callback batches.
//!
//! The driver consumes only records scoped for internal consumers and
//! never calls back into the book. An accept whose order fully matched
//! on entry arms the skip-fill suppressor instead of adding a level, so
//! the paired trade records do not double-count.

use crate::book::{Callback, CallbackKind, CallbackScope, FillFlags};
use crate::constants::{DEPTH_SIZE, MIN_ORDER_QTY};
use crate::depth::depth::Depth;
use crate::depth::error::DepthError;

/// Callback-driven maintenance of an aggregated [`Depth`].
#[derive(Default)]
pub struct DepthBook<const SIZE: usize = DEPTH_SIZE> {
    depth: Depth<SIZE>,
}

impl<const SIZE: usize> DepthBook<SIZE> {
    /// An empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            depth: Depth::new(),
        }
    }

    /// The underlying depth.
    #[must_use]
    pub fn depth(&self) -> &Depth<SIZE> {
        &self.depth
    }

    /// Marks the projection as drained by its publisher.
    pub fn published(&mut self) {
        self.depth.published();
    }

    /// Whether anything visible changed since the last publication.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.depth.changed()
    }

    /// Applies one flushed batch.
    ///
    /// # Errors
    /// Propagates depth protocol faults; a conforming callback stream
    /// never produces them.
    pub fn apply_batch(&mut self, batch: &[Callback]) -> Result<(), DepthError> {
        for callback in batch {
            if !matches!(
                callback.scope,
                CallbackScope::InternalOnly | CallbackScope::BroadcastAll
            ) {
                continue;
            }
            match callback.kind {
                CallbackKind::Accept => self.on_accept(callback)?,
                CallbackKind::Trade => self.on_fill(callback)?,
                CallbackKind::Cancel => self.on_cancel(callback)?,
                CallbackKind::Replace => self.on_replace(callback),
                _ => {}
            }
        }
        Ok(())
    }

    fn on_accept(&mut self, callback: &Callback) -> Result<(), DepthError> {
        let Some(order) = &callback.order else {
            return Ok(());
        };
        if order.price() == 0.0 {
            return Ok(());
        }

        // callback.qty holds the quantity that matched on entry
        if order.qty() - callback.qty < MIN_ORDER_QTY {
            self.depth.skip_fill(callback.qty, order.is_bid())?;
        } else {
            self.depth.add_order(order.price(), order.qty(), order.is_bid());
        }
        Ok(())
    }

    fn on_fill(&mut self, callback: &Callback) -> Result<(), DepthError> {
        if let Some(maker) = &callback.maker_order {
            if maker.price() != 0.0 {
                self.depth.fill_order(
                    maker.price(),
                    callback.qty,
                    callback.flags.contains(FillFlags::MAKER_FILLED),
                    maker.is_bid(),
                )?;
            }
        }
        if let Some(taker) = &callback.order {
            if taker.price() != 0.0 {
                self.depth.fill_order(
                    taker.price(),
                    callback.qty,
                    callback.flags.contains(FillFlags::TAKER_FILLED),
                    taker.is_bid(),
                )?;
            }
        }
        Ok(())
    }

    fn on_cancel(&mut self, callback: &Callback) -> Result<(), DepthError> {
        let Some(order) = &callback.order else {
            return Ok(());
        };
        if order.price() == 0.0 {
            return Ok(());
        }
        // generic_1 carries the quantity that was still on the book
        self.depth
            .close_order(order.price(), callback.generic_1, order.is_bid())?;
        Ok(())
    }

    fn on_replace(&mut self, callback: &Callback) {
        let Some(order) = &callback.order else {
            return;
        };
        if order.price() == 0.0 {
            return;
        }
        // generic_1 carries the effective delta
        self.depth
            .change_qty_order(order.price(), callback.generic_1, order.is_bid());
    }
}
