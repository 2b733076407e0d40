//! Post-only enforcement.

mod common;

use common::*;
use matchbook_rs::prelude::*;
use std::sync::Arc;

fn book() -> OrderBook<Recorder> {
    OrderBookBuilder::new(1)
        .with_post_only()
        .build(Recorder::default())
}

fn post_only(id: u64, user_id: u64, is_bid: bool, price: f64, qty: f64) -> Arc<Order> {
    Arc::new(Order::limit(oid(id), user_id, is_bid, price, qty).with_post_only())
}

#[test]
fn non_crossing_post_only_rests() {
    let mut book = book();
    book.add(limit(1, 1, false, 1001.0, 1.0)).unwrap();
    book.add(post_only(2, 2, true, 999.0, 1.0)).unwrap();

    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![CallbackKind::Accept, CallbackKind::BookUpdate]
    );
    assert_eq!(book.bids().len(), 1);
}

#[test]
fn crossing_post_only_is_cancelled_before_trading() {
    let mut book = book();
    book.add(limit(1, 1, false, 1000.0, 1.0)).unwrap();
    let matched = book.add(post_only(2, 2, true, 1000.0, 1.0)).unwrap();
    assert!(!matched);

    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![
            CallbackKind::Accept,
            CallbackKind::Cancel,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(batch[1].cancel_reason(), Some(CancelReason::PostOnly));
    assert_eq!(batch[1].order_id(), Some(oid(2)));

    // the maker is untouched
    assert_eq!(level_qty(book.asks(), false, 1000.0), 1.0);
    assert_eq!(book.bids().len(), 0);
}

#[test]
fn post_only_maker_trades_normally_once_resting() {
    let mut book = book();
    book.add(post_only(1, 1, true, 1000.0, 1.0)).unwrap();
    let matched = book.add(limit(2, 2, false, 1000.0, 1.0)).unwrap();
    assert!(matched);

    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(book.bids().len(), 0);
}
