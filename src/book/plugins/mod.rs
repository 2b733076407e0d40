//! Policy modules composed around the matching loop.
//!
//! Each module is a self-contained piece of state with hook
//! implementations; none of them alters the ordering or invariants of
//! the base matching loop. The hook surface and the fixed dispatch
//! order live in the book's plugin dispatcher.

pub mod positions;
pub mod post_only;
pub mod reduce_only;
pub mod routable;
pub mod self_trade;
pub mod stop_orders;

pub use self::positions::Position;
pub use self::routable::RoutingRequest;
pub use self::self_trade::SelfTradePolicy;
