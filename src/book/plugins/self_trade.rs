//! Self-trade prevention.
//!
//! When an incoming order would match a resting order from the same
//! user, the combined policy of the two orders decides who is cancelled.
//! The policies are bit sets: bit 1 cancels the taker, bit 2 the maker.

use crate::book::tracker::Tracker;
use crate::book::types::CancelReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-order self-trade policy.
///
/// The policies of the taker and the maker are OR-ed together before the
/// bits are applied, so either side can force the stricter outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelfTradePolicy {
    /// Cancel the incoming order.
    #[default]
    CancelTaker = 1,
    /// Cancel the resting order and keep matching.
    CancelMaker = 2,
    /// Cancel both.
    CancelBoth = 3,
}

impl fmt::Display for SelfTradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelfTradePolicy::CancelTaker => "CancelTaker",
            SelfTradePolicy::CancelMaker => "CancelMaker",
            SelfTradePolicy::CancelBoth => "CancelBoth",
        };
        write!(f, "{name}")
    }
}

/// Stateless module applying [`SelfTradePolicy`] in `should_trade`.
#[derive(Debug, Default)]
pub(crate) struct SelfTradePolicyModule;

impl SelfTradePolicyModule {
    pub(crate) fn should_trade(
        &self,
        taker: &Tracker,
        maker: &Tracker,
        taker_reason: &mut CancelReason,
        maker_reason: &mut CancelReason,
    ) {
        if taker.user_id() != maker.user_id() {
            return;
        }

        let combined = taker.order().stp() as u8 | maker.order().stp() as u8;
        if combined & SelfTradePolicy::CancelTaker as u8 != 0 {
            *taker_reason = CancelReason::SelfTrade;
        }
        if combined & SelfTradePolicy::CancelMaker as u8 != 0 {
            *maker_reason = CancelReason::SelfTrade;
        }
    }
}
