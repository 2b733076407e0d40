//! Post-only enforcement.
//!
//! A post-only order must provide liquidity, never take it. The module
//! only ever sees crossing takers, so the check is a single flag: a
//! post-only maker that does not cross never reaches `should_trade`.

use crate::book::tracker::Tracker;
use crate::book::types::CancelReason;

/// Cancels post-only takers before they can trade on entry.
#[derive(Debug, Default)]
pub(crate) struct PostOnlyModule;

impl PostOnlyModule {
    pub(crate) fn should_trade(&self, taker: &Tracker, taker_reason: &mut CancelReason) {
        if taker.order().post_only() {
            *taker_reason = CancelReason::PostOnly;
        }
    }
}
