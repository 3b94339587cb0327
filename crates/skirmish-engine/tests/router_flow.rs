//! End-to-end routing through the in-memory broker.
//!
//! Each test seeds the inbound queue the way the classifier, the sensor nodes
//! and the evaluation relay would, closes it, runs the router to completion
//! and inspects what reached the evaluation queue and the fan-out exchange.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use skirmish_broker::{ChannelNames, MemoryBroker};
use skirmish_engine::{MessageRouter, RouterStats};
use skirmish_types::{EvalRequest, InboundMessage, MatchVitals, StateBroadcast};

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

async fn run(broker: &MemoryBroker, messages: &[&str]) -> (RouterStats, MessageRouter<MemoryBroker>) {
    let channels = ChannelNames::default();
    for message in messages {
        broker.inject(&channels.update_ge, *message);
    }
    broker.close(&channels.update_ge);

    let mut router = MessageRouter::new(broker.clone(), channels);
    let stats = router.run().await.unwrap();
    (stats, router)
}

#[tokio::test]
async fn action_publishes_eval_then_broadcast() {
    let broker = MemoryBroker::new();
    let (stats, router) = run(
        &broker,
        &[r#"{"action":true,"update":true,"player_id":1,"action_type":"gun","hit":true}"#],
    )
    .await;

    assert_eq!(stats.handled, 1);
    assert_eq!(broker.acked("update_ge_queue"), 1);

    let eval = broker.pending("update_eval_server_queue");
    assert_eq!(eval.len(), 1);
    let eval = json(&eval[0]);
    assert_eq!(eval["action"], "gun");
    assert_eq!(eval["player_id"], 1);
    assert_eq!(eval["game_state"]["p2"]["hp"], 95);
    assert_eq!(eval["game_state"]["p1"]["bullets"], 5);
    assert_eq!(eval["game_state"]["p1"]["opponent_hit"], true);

    let everyone = broker.fanout_messages("update_everyone_exchange");
    assert_eq!(everyone.len(), 1);
    let broadcast: StateBroadcast = serde_json::from_slice(&everyone[0]).unwrap();
    assert_eq!(broadcast.game_state.p2.hp, 95);
    assert!(broadcast.player_id.is_some());

    // Transient flags are cleared once published.
    assert!(!router.engine().snapshot().p1.opponent_hit);
}

#[tokio::test]
async fn publication_counts_per_event_kind() {
    let broker = MemoryBroker::new();
    let (stats, _) = run(
        &broker,
        &[
            r#"{"action":true,"player_id":2,"action_type":"shield"}"#,
            r#"{"update":true,"game_state":{"p1":{"opponent_in_rain_bomb":1}}}"#,
            r#"{"game_state":{"p2":{"leg_connected":true}}}"#,
        ],
    )
    .await;

    assert_eq!(stats.handled, 3);
    assert_eq!(broker.acked("update_ge_queue"), 3);
    assert_eq!(broker.pending("update_eval_server_queue").len(), 1);
    assert_eq!(broker.fanout_messages("update_everyone_exchange").len(), 2);

    let update = json(&broker.fanout_messages("update_everyone_exchange")[1]);
    assert!(update.get("action").is_none());
    assert_eq!(update["game_state"]["p1"]["opponent_in_rain_bomb"], 1);
    assert_eq!(update["game_state"]["p2"]["shield_hp"], 30);
}

#[tokio::test]
async fn events_are_applied_in_queue_order() {
    let broker = MemoryBroker::new();
    let (_, router) = run(
        &broker,
        &[
            r#"{"action":true,"player_id":1,"action_type":"shield"}"#,
            r#"{"action":true,"player_id":2,"action_type":"soccer"}"#,
            r#"{"action":true,"player_id":2,"action_type":"basket"}"#,
            r#"{"action":true,"player_id":2,"action_type":"volley"}"#,
        ],
    )
    .await;

    // 30 shield, then 30 damage: 10 + 10 + 10 all absorbed.
    let state = router.engine().snapshot();
    assert_eq!(state.p1.shield_hp, 0);
    assert_eq!(state.p1.hp, 100);

    let eval = broker.pending("update_eval_server_queue");
    assert_eq!(eval.len(), 4);
    let last = json(&eval[3]);
    assert_eq!(last["action"], "volley");
    assert_eq!(last["game_state"]["p2"]["opponent_shield_hit"], true);
    assert_eq!(last["game_state"]["p2"]["opponent_hit"], false);
}

#[tokio::test]
async fn invalid_and_rejected_messages_are_dropped_but_acked() {
    let broker = MemoryBroker::new();
    let (stats, router) = run(
        &broker,
        &[
            "not json",
            r#"{"action":true,"player_id":1,"action_type":"8"}"#,
            r#"{"action":true,"player_id":1,"action_type":"reload"}"#,
            r#"{"game_state":{"p1":{"login":false}}}"#,
            r#"{"action":true,"player_id":2,"action_type":"gun","hit":true}"#,
        ],
    )
    .await;

    assert_eq!(
        stats,
        RouterStats {
            handled: 1,
            invalid: 2,
            rejected: 2,
            unacked: 0,
            receive_errors: 0
        }
    );
    assert_eq!(broker.acked("update_ge_queue"), 5);
    assert!(broker.pending("update_eval_server_queue").is_empty());
    assert!(broker.fanout_messages("update_everyone_exchange").is_empty());
    assert_eq!(router.engine().snapshot().p1.hp, 100);
}

#[tokio::test]
async fn failed_publication_is_not_acked() {
    let broker = MemoryBroker::new();
    broker.reject_publishes(true);
    let (stats, _) = run(
        &broker,
        &[r#"{"action":true,"player_id":1,"action_type":"bomb"}"#],
    )
    .await;

    assert_eq!(stats.unacked, 1);
    assert_eq!(broker.delivered("update_ge_queue"), 1);
    assert_eq!(broker.acked("update_ge_queue"), 0);
}

#[tokio::test]
async fn eval_round_trip_through_the_inbound_queue() {
    let broker = MemoryBroker::new();
    let (_, _) = run(
        &broker,
        &[r#"{"action":true,"player_id":1,"action_type":"bomb"}"#],
    )
    .await;

    // What the relay would send to the evaluation server.
    let resolved = broker.pending("update_eval_server_queue");
    let request: EvalRequest = serde_json::from_slice(&resolved[0]).unwrap();
    assert_eq!(request.game_state.p2.hp, 95);
    assert_eq!(request.game_state.p1.bombs, 1);

    // The server disagrees: the bomb missed.
    let mut vitals: MatchVitals = request.game_state;
    vitals.p2.hp = 100;
    let correction = serde_json::to_string(&InboundMessage::correction(vitals)).unwrap();

    let second = MemoryBroker::new();
    let channels = ChannelNames::default();
    second.inject(&channels.update_ge, r#"{"action":true,"player_id":1,"action_type":"bomb"}"#);
    second.inject(&channels.update_ge, correction);
    second.close(&channels.update_ge);
    let mut router = MessageRouter::new(second.clone(), channels);
    router.run().await.unwrap();

    let state = router.engine().snapshot();
    assert_eq!(state.p2.hp, 100);
    assert_eq!(state.p1.bombs, 1);
    let everyone = second.fanout_messages("update_everyone_exchange");
    assert_eq!(everyone.len(), 2);
    assert_eq!(json(&everyone[1])["game_state"]["p2"]["hp"], 100);
}
