//! 128-bit order identifier.
//!
//! Order ids are opaque to the engine: it only needs equality, ordering
//! and a human-readable rendering. The id is backed by two 64-bit halves
//! and displays as 32 hex digits grouped every four digits with `-`
//! separators.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque 128-bit order identifier, stored as two 64-bit halves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct OrderId {
    /// Most significant 64 bits.
    pub hi: u64,
    /// Least significant 64 bits.
    pub lo: u64,
}

impl OrderId {
    /// The all-zero id. Used by hosts that have not assigned one yet.
    pub const ZERO: OrderId = OrderId { hi: 0, lo: 0 };

    /// Creates an id from its two 64-bit halves.
    #[must_use]
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// Creates an id from a native 128-bit integer.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            hi: (value >> 64) as u64,
            lo: value as u64,
        }
    }

    /// Returns the id as a native 128-bit integer.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }

    /// Returns `true` if both halves are zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.hi == 0 && self.lo == 0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = format!("{:032x}", self.as_u128());
        for (i, chunk) in digits.as_bytes().chunks(4).enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            // chunks of an ASCII hex string are valid UTF-8
            f.write_str(std::str::from_utf8(chunk).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self::from_u128(uuid.as_u128())
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        Uuid::from_u128(id.as_u128())
    }
}

impl From<u128> for OrderId {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}
