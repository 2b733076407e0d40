//! The matching engine: order book, tracker lifecycle, callback batch
//! and policy modules.

mod book;
mod callback;
mod core;
mod error;
mod order;
mod plugin;
pub mod plugins;
mod price;
mod tracker;
mod types;

pub use self::book::{BookListener, OrderBook, OrderBookBuilder, RoutingOutcome};
pub use self::callback::{Callback, CallbackKind, FillFlags};
pub use self::core::{BookCore, SideMap};
pub use self::error::BookError;
pub use self::order::Order;
pub use self::price::BookPrice;
pub use self::tracker::Tracker;
pub use self::types::{
    CallbackScope, CancelReason, CancelRejectReason, InsertRejectReason, Reason,
    ReplaceRejectReason,
};
