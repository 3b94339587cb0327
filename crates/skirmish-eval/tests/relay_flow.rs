//! Relay against a stand-in evaluation server on a loopback socket.
//!
//! The stand-in decrypts every client frame, checks the handshake, and answers
//! each request with the vitals it was sent, except that it keeps its own
//! count of p2's hp. A reply can be held back to force a timeout, and a
//! flaky variant hangs up once before serving normally.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use std::time::Duration;

use skirmish_broker::{ChannelNames, MemoryBroker};
use skirmish_eval::{
    Cipher, EvalRelay, EvalServerLink, FrameReader, HELLO, TcpConnector, encode_frame,
};
use skirmish_types::{ActionType, EvalRequest, MatchState, MatchVitals, PlayerId, ResolvedAction};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const KEY: &[u8] = b"0123456789abcdef";

fn open(cipher: &Cipher, sealed: &[u8]) -> String {
    cipher.decrypt(core::str::from_utf8(sealed).unwrap()).unwrap()
}

/// Accept one client, then answer requests. `delays[i]` holds back the reply
/// to request `i`. Every decrypted request is forwarded on `seen`.
async fn stand_in_server(
    listener: TcpListener,
    delays: Vec<Duration>,
    seen: mpsc::UnboundedSender<EvalRequest>,
) {
    let (stream, _) = listener.accept().await.unwrap();
    serve(stream, delays, seen).await;
}

/// Accept one client, take its first request and hang up without answering.
/// Then accept the reconnect and serve it normally.
async fn flaky_server(listener: TcpListener, seen: mpsc::UnboundedSender<EvalRequest>) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut frames = FrameReader::new(BufReader::new(stream));
    let cipher = Cipher::new(KEY).unwrap();
    assert_eq!(open(&cipher, &frames.next_frame().await.unwrap()), HELLO);
    let plaintext = open(&cipher, &frames.next_frame().await.unwrap());
    seen.send(serde_json::from_str(&plaintext).unwrap()).unwrap();
    drop(frames);

    let (stream, _) = listener.accept().await.unwrap();
    serve(stream, Vec::new(), seen).await;
}

async fn serve(
    stream: TcpStream,
    delays: Vec<Duration>,
    seen: mpsc::UnboundedSender<EvalRequest>,
) {
    let (read, mut write) = stream.into_split();
    let mut frames = FrameReader::new(BufReader::new(read));
    let cipher = Cipher::new(KEY).unwrap();

    assert_eq!(open(&cipher, &frames.next_frame().await.unwrap()), HELLO);

    let mut index = 0;
    while let Ok(sealed) = frames.next_frame().await {
        let request: EvalRequest = serde_json::from_str(&open(&cipher, &sealed)).unwrap();
        seen.send(request).unwrap();

        if let Some(delay) = delays.get(index) {
            tokio::time::sleep(*delay).await;
        }
        index += 1;

        // The server's own bookkeeping: it never agrees on p2's hp.
        let mut vitals = request.game_state;
        vitals.p2.hp = 100 - u32::try_from(index).unwrap();
        let reply = encode_frame(&serde_json::to_string(&vitals).unwrap());
        if write.write_all(&reply).await.is_err() {
            break;
        }
    }
}

fn resolved(action: ActionType) -> Vec<u8> {
    serde_json::to_vec(&ResolvedAction {
        game_state: MatchState::default(),
        action,
        player_id: PlayerId::Two,
    })
    .unwrap()
}

fn corrections(broker: &MemoryBroker) -> Vec<MatchVitals> {
    broker
        .pending("update_ge_queue")
        .iter()
        .map(|payload| {
            let update: serde_json::Value = serde_json::from_slice(payload).unwrap();
            assert_eq!(update["update"], true);
            serde_json::from_value(update["game_state"].clone()).unwrap()
        })
        .collect()
}

async fn link_to(listener: &TcpListener, read_timeout: Duration) -> EvalServerLink<TcpConnector> {
    let port = listener.local_addr().unwrap().port();
    let connector = TcpConnector::new("127.0.0.1".to_owned(), port, Duration::from_secs(5));
    EvalServerLink::connect(connector, Cipher::new(KEY).unwrap(), read_timeout)
        .await
        .unwrap()
}

async fn connect(
    delays: Vec<Duration>,
    read_timeout: Duration,
) -> (
    EvalServerLink<TcpConnector>,
    mpsc::UnboundedReceiver<EvalRequest>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let link = link_to(&listener, read_timeout).await;
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(stand_in_server(listener, delays, seen_tx));
    (link, seen_rx)
}

#[tokio::test]
async fn every_action_comes_back_as_a_correction() {
    let (link, mut seen) = connect(Vec::new(), Duration::from_secs(2)).await;
    let broker = MemoryBroker::new();
    let channels = ChannelNames::default();
    for action in [ActionType::Gun, ActionType::Shield, ActionType::Bomb] {
        broker.inject(&channels.update_eval_server, resolved(action));
    }
    broker.close(&channels.update_eval_server);

    let mut relay = EvalRelay::new(broker.clone(), channels, link);
    let stats = relay.run().await.unwrap();

    assert_eq!(stats.corrected, 3);
    assert_eq!(broker.acked("update_eval_server_queue"), 3);

    let hps: Vec<u32> = corrections(&broker).iter().map(|v| v.p2.hp).collect();
    assert_eq!(hps, vec![99, 98, 97]);

    let actions: Vec<ActionType> = (0..3).map(|_| seen.try_recv().unwrap().action).collect();
    assert_eq!(actions, vec![ActionType::Gun, ActionType::Shield, ActionType::Bomb]);
}

#[tokio::test]
async fn late_reply_is_drained_before_the_next_cycle() {
    let read_timeout = Duration::from_millis(200);
    let (link, _seen) = connect(vec![Duration::from_millis(300)], read_timeout).await;
    let broker = MemoryBroker::new();
    let channels = ChannelNames::default();
    broker.inject(&channels.update_eval_server, resolved(ActionType::Gun));
    broker.inject(&channels.update_eval_server, resolved(ActionType::Volley));
    broker.close(&channels.update_eval_server);

    let mut relay = EvalRelay::new(broker.clone(), channels, link);
    let stats = relay.run().await.unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.corrected, 1);

    // The late answer to the first request (99) was thrown away; the engine
    // only sees the answer to the second.
    let hps: Vec<u32> = corrections(&broker).iter().map(|v| v.p2.hp).collect();
    assert_eq!(hps, vec![98]);

    let link_stats = relay.link().stats().await;
    assert_eq!(link_stats.desync_debt, 0);
    assert_eq!(link_stats.frames_read, 2);
}

#[tokio::test]
async fn hangup_between_frames_is_survived_by_reconnecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let link = link_to(&listener, Duration::from_secs(2)).await;
    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    tokio::spawn(flaky_server(listener, seen_tx));

    let broker = MemoryBroker::new();
    let channels = ChannelNames::default();
    for action in [ActionType::Gun, ActionType::Shield, ActionType::Bomb] {
        broker.inject(&channels.update_eval_server, resolved(action));
    }
    broker.close(&channels.update_eval_server);

    let mut relay = EvalRelay::new(broker.clone(), channels, link);
    let stats = relay.run().await.unwrap();

    assert_eq!(stats.disconnects, 1);
    assert_eq!(stats.corrected, 2);
    assert_eq!(broker.acked("update_eval_server_queue"), 3);

    // The second connection keeps its own count from a fresh start.
    let hps: Vec<u32> = corrections(&broker).iter().map(|v| v.p2.hp).collect();
    assert_eq!(hps, vec![99, 98]);

    let link_stats = relay.link().stats().await;
    assert_eq!(link_stats.reconnects, 1);
    assert_eq!(link_stats.desync_debt, 0);

    let actions: Vec<ActionType> = (0..3).map(|_| seen.try_recv().unwrap().action).collect();
    assert_eq!(actions, vec![ActionType::Gun, ActionType::Shield, ActionType::Bomb]);
}
