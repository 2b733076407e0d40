//! Routing of market-maker liquidity to external venues.

mod common;

use common::*;
use matchbook_rs::prelude::*;

const MM1: u64 = 1000;
const MM1_EXCHANGE: u32 = 2;
const MM2: u64 = 1001;
const MM2_EXCHANGE: u32 = 3;

fn book(outcome: Option<RoutingOutcome>) -> OrderBook<Recorder> {
    let mut book = OrderBookBuilder::new(1)
        .with_self_trade_policy()
        .with_routing()
        .build(Recorder {
            outcome,
            ..Recorder::default()
        });
    book.register_market_maker(MM1, MM1_EXCHANGE).unwrap();
    book.register_market_maker(MM2, MM2_EXCHANGE).unwrap();
    book
}

fn scopes(batch: &[Callback]) -> Vec<CallbackScope> {
    batch.iter().map(|cb| cb.scope).collect()
}

#[test]
fn non_mm_flow_is_untouched() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, 1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, 2, true, 1000.0, 1.0)).unwrap();

    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(batch[1].scope, CallbackScope::BroadcastAll);
    assert!(book.listener().requests.is_empty());
}

#[test]
fn exact_match_against_one_mm_order_routes_synchronously() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(2, 1, true, 1000.0, 1.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::BookUpdate
        ]
    );
    // depth-facing record first, user-facing replay second
    assert_eq!(flat[1].scope, CallbackScope::InternalOnly);
    assert_eq!(flat[2].scope, CallbackScope::ExternalOnly);

    let request = &book.listener().requests[0];
    assert_eq!(request.exchange_id, MM1_EXCHANGE);
    assert_eq!(request.symbol_id, 1);
    assert!(request.is_bid);
    assert_eq!(request.qty, 1.0);
    assert_eq!(request.price, 1000.0);
    assert_eq!(request.cancel_reason, CancelReason::DontCancel);

    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 0);
}

#[test]
fn deferred_response_leaves_the_mm_order_busy() {
    let mut book = book(None);
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(2, 1, true, 1000.0, 1.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(flat[1].scope, CallbackScope::InternalOnly);
    assert_eq!(book.listener().requests.len(), 1);

    // a second taker finds no liquidity to touch and rests
    book.add(limit(3, 1, true, 1000.0, 1.0)).unwrap();
    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![CallbackKind::Accept, CallbackKind::BookUpdate]
    );
    assert_eq!(book.bids().len(), 1);

    // the deferred success replays the fill externally
    let request_id = book.listener().requests[0].request_id;
    book.on_routing_success(request_id).unwrap();
    let batch = book.listener().last_batch();
    assert_eq!(kinds(batch), vec![CallbackKind::Trade]);
    assert_eq!(batch[0].scope, CallbackScope::ExternalOnly);
}

#[test]
fn partial_mm_match_resubmits_the_residual() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, MM1, false, 2000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(3, 1, true, 1000.0, 2.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Trade,
            CallbackKind::Accept,
            CallbackKind::BookUpdate
        ]
    );
    // the taker's resting remainder is silently pulled while routing
    assert_eq!(flat[2].scope, CallbackScope::Suppress);
    assert_eq!(
        flat[2].cancel_reason(),
        Some(CancelReason::TemporaryCancel)
    );
    assert_eq!(flat[3].scope, CallbackScope::ExternalOnly);
    // the continuation accept is invisible to consumers
    assert_eq!(flat[4].scope, CallbackScope::Suppress);

    assert_eq!(book.listener().requests.len(), 1);
    let request = &book.listener().requests[0];
    assert_eq!(request.qty, 1.0);
    assert_eq!(request.price, 1000.0);

    // the residual rests again; the far MM ask is untouched
    assert_eq!(level_qty(book.bids(), true, 1000.0), 1.0);
    assert_eq!(book.asks().len(), 1);
}

#[test]
fn mm_then_user_then_mm_interleaving() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1232.0, 1.0)).unwrap();
    book.add(limit(2, 2, false, 1332.0, 1.0)).unwrap();
    book.add(limit(3, MM1, false, 1422.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(4, 1, true, 2000.0, 3.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Accept,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(
        scopes(&flat),
        vec![
            CallbackScope::BroadcastAll,
            CallbackScope::InternalOnly,
            CallbackScope::Suppress,
            CallbackScope::ExternalOnly,
            CallbackScope::BroadcastAll,
            CallbackScope::InternalOnly,
            CallbackScope::ExternalOnly,
            CallbackScope::Suppress,
            CallbackScope::BroadcastAll,
        ]
    );

    // first MM fill, then its replay
    assert_eq!(flat[1].maker_order_id(), Some(oid(1)));
    assert_eq!(flat[3].maker_order_id(), Some(oid(1)));
    // the user maker trades publicly in between
    assert_eq!(flat[4].maker_order_id(), Some(oid(2)));
    // second MM fill and replay
    assert_eq!(flat[5].maker_order_id(), Some(oid(3)));
    assert_eq!(flat[6].maker_order_id(), Some(oid(3)));

    let requests = &book.listener().requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].exchange_id, MM1_EXCHANGE);
    assert_eq!(requests[0].qty, 1.0);
    assert_eq!(requests[0].price, 1232.0);
    assert_eq!(requests[1].exchange_id, MM1_EXCHANGE);
    assert_eq!(requests[1].qty, 1.0);
    assert_eq!(requests[1].price, 1422.0);

    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 0);
}

#[test]
fn consecutive_mm_orders_aggregate_into_one_request() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1232.0, 1.0)).unwrap();
    book.add(limit(2, MM1, false, 1532.0, 1.0)).unwrap();
    book.add(limit(3, MM1, false, 1422.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(4, 1, true, 2000.0, 3.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(
        scopes(&flat)[1..7],
        [
            CallbackScope::InternalOnly,
            CallbackScope::InternalOnly,
            CallbackScope::InternalOnly,
            CallbackScope::ExternalOnly,
            CallbackScope::ExternalOnly,
            CallbackScope::ExternalOnly,
        ]
    );

    let requests = &book.listener().requests;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].qty, 3.0);
    // worst price of the step
    assert_eq!(requests[0].price, 1532.0);
}

#[test]
fn mm_orders_on_two_venues_split_into_two_requests() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, MM2, false, 2000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(3, 1, true, 2000.0, 2.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Trade,
            CallbackKind::Accept,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(flat[1].maker_order_id(), Some(oid(1)));
    assert_eq!(flat[3].maker_order_id(), Some(oid(1)));
    assert_eq!(flat[4].maker_order_id(), Some(oid(2)));
    assert_eq!(flat[4].scope, CallbackScope::InternalOnly);
    assert_eq!(flat[5].maker_order_id(), Some(oid(2)));
    assert_eq!(flat[5].scope, CallbackScope::ExternalOnly);

    let requests = &book.listener().requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].exchange_id, MM1_EXCHANGE);
    assert_eq!(requests[0].qty, 1.0);
    assert_eq!(requests[0].price, 1000.0);
    assert_eq!(requests[1].exchange_id, MM2_EXCHANGE);
    assert_eq!(requests[1].qty, 1.0);
    assert_eq!(requests[1].price, 2000.0);

    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 0);
}

#[test]
fn routing_failure_cancels_the_taker() {
    let mut book = book(Some(RoutingOutcome::Failure));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, MM1, false, 2000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(3, 1, true, 1000.0, 2.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Cancel,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(flat[1].scope, CallbackScope::InternalOnly);
    assert_eq!(flat[2].scope, CallbackScope::Suppress);

    let cancel = &flat[3];
    assert_eq!(cancel.cancel_reason(), Some(CancelReason::RoutingFailure));
    assert_eq!(cancel.scope, CallbackScope::ExternalOnly);
    assert_eq!(cancel.order_id(), Some(oid(3)));
    // the failed qty is folded out of the fill slot and reported for
    // hold release
    assert_eq!(cancel.qty, 0.0);
    assert_eq!(cancel.generic_1, 1.0);

    // the failed venue's fill is not replayed, the far ask survives
    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 1);
}

#[test]
fn failure_on_first_venue_stops_before_the_second() {
    let mut book = book(Some(RoutingOutcome::Failure));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, MM2, false, 2000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    book.add(limit(3, 1, true, 2000.0, 2.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Cancel,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(flat[3].cancel_reason(), Some(CancelReason::RoutingFailure));

    assert_eq!(book.listener().requests.len(), 1);
    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 1);
}

#[test]
fn busy_mm_maker_is_cancelled_not_rematched() {
    let mut book = book(None);
    book.add(limit(1, MM1, false, 1000.0, 2.0)).unwrap();
    book.listener_mut().clear();

    // partial fill leaves the MM order resting while routing is pending
    book.add(limit(2, 1, true, 1000.0, 1.0)).unwrap();
    assert_eq!(book.listener().requests.len(), 1);
    assert_eq!(level_qty(book.asks(), false, 1000.0), 1.0);

    // the next taker hits the busy MM order and knocks it out
    book.add(limit(3, 2, true, 1000.0, 1.0)).unwrap();
    let batch = book.listener().last_batch();
    assert_eq!(
        kinds(batch),
        vec![
            CallbackKind::Accept,
            CallbackKind::Cancel,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(batch[1].order_id(), Some(oid(1)));
    assert_eq!(batch[1].cancel_reason(), Some(CancelReason::MmRouted));
    assert_eq!(book.asks().len(), 0);
    assert_eq!(level_qty(book.bids(), true, 1000.0), 1.0);
}

#[test]
fn stp_cancel_fires_on_the_continuation() {
    let mut book = book(Some(RoutingOutcome::Success));
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, 1, false, 2000.0, 1.0)).unwrap();
    book.listener_mut().clear();

    // user 1 buys through the MM order into their own ask
    book.add(limit(3, 1, true, 2000.0, 2.0)).unwrap();

    let flat = book.listener().flattened();
    assert_eq!(
        kinds(&flat),
        vec![
            CallbackKind::Accept,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Trade,
            CallbackKind::Cancel,
            CallbackKind::Accept,
            CallbackKind::BookUpdate
        ]
    );
    assert_eq!(flat[2].scope, CallbackScope::Suppress);
    assert_eq!(flat[3].scope, CallbackScope::ExternalOnly);
    // the continuation hits the user's own resting ask
    assert_eq!(flat[4].cancel_reason(), Some(CancelReason::SelfTrade));
    assert_eq!(flat[4].scope, CallbackScope::BroadcastAll);
    assert_eq!(flat[5].scope, CallbackScope::Suppress);

    assert_eq!(book.bids().len(), 0);
    assert_eq!(book.asks().len(), 1);
}

#[test]
fn requests_serialize_for_transport() {
    let mut book = book(None);
    book.add(limit(1, MM1, false, 1000.0, 1.0)).unwrap();
    book.add(limit(2, 1, true, 1000.0, 1.0)).unwrap();

    let request = &book.listener().requests[0];
    let json = request.to_json().unwrap();
    assert!(json.contains("\"exchange_id\":2"));
    assert!(json.contains("\"qty\":1.0"));
}

#[test]
fn unknown_request_id_is_an_error() {
    let mut book = book(None);
    assert!(matches!(
        book.on_routing_success(42),
        Err(BookError::UnknownRoutingRequest { request_id: 42 })
    ));
}
