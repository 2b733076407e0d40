//! Engine-wide thresholds and quantization constants.
//!
//! All quantities and prices are IEEE-754 doubles. Rather than comparing
//! against zero, the engine treats anything below these thresholds as
//! fully consumed.

/// Quantity below which a qty-bound order is considered fully filled.
pub const MIN_ORDER_QTY: f64 = 1e-6;

/// Remaining funds below which a funds-bound order is considered fully
/// filled.
pub const MIN_ORDER_FUNDS: f64 = 0.01;

/// Tradable quantity derived from remaining funds is rounded down to the
/// nearest multiple of this increment so a fill can never overspend.
pub const TRADE_QTY_INCREMENT: f64 = 1e-7;

/// Tolerance for residual floating-point dust.
pub const EPSILON: f64 = 1e-14;

/// Number of in-window price levels the depth projection keeps per side.
pub const DEPTH_SIZE: usize = 30;
