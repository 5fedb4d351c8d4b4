//! Integration tests for the matchmaking system
//!
//! These tests run the real tracker serve loop and real client sessions
//! against each other over localhost UDP.

use client::engine::TrackerEngine;
use client::session::{PlayerIdentity, SessionOutcome, TrackerSession};
use shared::{Command, WireMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracker::dispatch::Dispatcher;
use tracker::server::TrackerServer;
use tracker::tracker::Tracker;

/// Starts a tracker with a fixed selection seed on an ephemeral port.
async fn spawn_tracker(seed: u64) -> SocketAddr {
    let dispatcher = Dispatcher::new(Tracker::with_seed(seed));
    let server = TrackerServer::bind("127.0.0.1:0", dispatcher)
        .await
        .expect("failed to bind tracker");
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let mut server = server;
        let _ = server.run().await;
    });

    addr
}

async fn connect(tracker: SocketAddr) -> TrackerSession {
    let engine = TrackerEngine::connect(tracker).await.unwrap();
    TrackerSession::new(engine)
}

fn identity(name: &str, peer_port: u16) -> PlayerIdentity {
    PlayerIdentity {
        name: name.to_string(),
        ip: "127.0.0.1".to_string(),
        tracker_port: 9000,
        peer_port,
    }
}

fn reply_text(outcome: SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Reply(text) => text,
        other => panic!("expected a tracker reply, got {:?}", other),
    }
}

/// WIRE-LEVEL TESTS
mod wire_tests {
    use super::*;

    /// A bare socket sending an encoded request gets a well-formed text
    /// reply back from the live serve loop.
    #[tokio::test]
    async fn raw_query_players_round_trip() {
        let tracker = spawn_tracker(1).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let data = WireMessage::new(Command::QueryPlayers, "")
            .encode()
            .unwrap();
        socket.send_to(&data, tracker).await.unwrap();

        let mut buffer = [0u8; shared::MAX_DATAGRAM_SIZE];
        let (len, source) = socket.recv_from(&mut buffer).await.unwrap();

        assert_eq!(source, tracker);
        assert_eq!(
            String::from_utf8_lossy(&buffer[..len]),
            "SUCCESS QUERY_PLAYERS 0"
        );
    }

    /// Undecodable datagrams are answered, not dropped, so a confused
    /// client still learns that something went wrong.
    #[tokio::test]
    async fn garbage_datagram_yields_unknown_command() {
        let tracker = spawn_tracker(1).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        socket.send_to(&[0xde, 0xad, 0xbe, 0xef], tracker).await.unwrap();

        let mut buffer = [0u8; shared::MAX_DATAGRAM_SIZE];
        let (len, _) = socket.recv_from(&mut buffer).await.unwrap();

        assert_eq!(
            String::from_utf8_lossy(&buffer[..len]),
            "FAILURE UnknownCommand"
        );
    }
}

/// END-TO-END SESSION TESTS
mod session_tests {
    use super::*;

    /// The full lifecycle: register two players, match them, play,
    /// end the game, and verify everyone is free again.
    #[tokio::test]
    async fn register_match_end_round_trip() {
        let tracker = spawn_tracker(7).await;
        let mut alice = connect(tracker).await;
        let mut bob = connect(tracker).await;

        let reply = reply_text(alice.register(identity("A", 9100)).await.unwrap());
        assert_eq!(reply, "SUCCESS REGISTER");

        let reply = reply_text(bob.register(identity("B", 9101)).await.unwrap());
        assert_eq!(reply, "SUCCESS REGISTER");

        // Only one free candidate exists, so B must be seated.
        let reply = reply_text(alice.start_game(1, 3).await.unwrap());
        assert_eq!(
            reply,
            "SUCCESS START_GAME 1 3 2 A 127.0.0.1 9100 B 127.0.0.1 9101"
        );
        assert_eq!(alice.peers().len(), 1);
        assert_eq!(alice.peers()[0].name, "B");

        // Neither participant can leave mid-game.
        let reply = reply_text(bob.deregister().await.unwrap());
        assert_eq!(reply, "FAILURE DEREGISTER Player is currently in a game");

        let reply = reply_text(alice.end_game(1).await.unwrap());
        assert_eq!(reply, "SUCCESS END_GAME");
        assert!(alice.peers().is_empty());

        let reply = reply_text(alice.query_players().await.unwrap());
        assert_eq!(
            reply,
            "SUCCESS QUERY_PLAYERS 2 A 127.0.0.1 9000 9100 free B 127.0.0.1 9000 9101 free"
        );
    }

    /// Registering a name that is already taken fails at the tracker and
    /// leaves exactly one record behind.
    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let tracker = spawn_tracker(7).await;
        let mut first = connect(tracker).await;
        let mut second = connect(tracker).await;

        reply_text(first.register(identity("A", 9100)).await.unwrap());

        let reply = reply_text(second.register(identity("A", 9102)).await.unwrap());
        assert_eq!(reply, "FAILURE REGISTER Player already registered");
        assert!(!second.is_registered());

        let reply = reply_text(first.query_players().await.unwrap());
        assert_eq!(reply, "SUCCESS QUERY_PLAYERS 1 A 127.0.0.1 9000 9100 free");
    }

    /// The session refuses a second register locally without sending a
    /// packet; the tracker's roster is untouched.
    #[tokio::test]
    async fn local_guard_blocks_double_register() {
        let tracker = spawn_tracker(7).await;
        let mut alice = connect(tracker).await;

        reply_text(alice.register(identity("A", 9100)).await.unwrap());
        let outcome = alice.register(identity("A", 9100)).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Refused(_)));
    }

    /// A dealer with no available opponents cannot start a game.
    #[tokio::test]
    async fn lonely_dealer_cannot_start() {
        let tracker = spawn_tracker(7).await;
        let mut alice = connect(tracker).await;

        reply_text(alice.register(identity("A", 9100)).await.unwrap());
        let reply = reply_text(alice.start_game(1, 3).await.unwrap());
        assert_eq!(reply, "FAILURE START_GAME Not enough registered players");
        assert!(alice.peers().is_empty());
    }

    /// Game ids keep increasing across intervening end_game calls.
    #[tokio::test]
    async fn game_ids_increase_across_games() {
        let tracker = spawn_tracker(7).await;
        let mut alice = connect(tracker).await;
        let mut bob = connect(tracker).await;

        reply_text(alice.register(identity("A", 9100)).await.unwrap());
        reply_text(bob.register(identity("B", 9101)).await.unwrap());

        let first = reply_text(alice.start_game(1, 3).await.unwrap());
        assert!(first.starts_with("SUCCESS START_GAME 1 "));
        reply_text(alice.end_game(1).await.unwrap());

        let second = reply_text(alice.start_game(1, 3).await.unwrap());
        assert!(second.starts_with("SUCCESS START_GAME 2 "));
        reply_text(alice.end_game(2).await.unwrap());

        let games = reply_text(alice.query_games().await.unwrap());
        assert_eq!(games, "SUCCESS QUERY_GAMES 0");
    }

    /// Only the dealer may end a game; the requester name travels in the
    /// payload, so another registered player is turned away.
    #[tokio::test]
    async fn non_dealer_cannot_end_game() {
        let tracker = spawn_tracker(7).await;
        let mut alice = connect(tracker).await;
        let mut bob = connect(tracker).await;

        reply_text(alice.register(identity("A", 9100)).await.unwrap());
        reply_text(bob.register(identity("B", 9101)).await.unwrap());
        reply_text(alice.start_game(1, 3).await.unwrap());

        let reply = reply_text(bob.end_game(1).await.unwrap());
        assert_eq!(reply, "FAILURE END_GAME Only the dealer can end the game");

        let reply = reply_text(bob.end_game(99).await.unwrap());
        assert_eq!(reply, "FAILURE END_GAME Game not found");
    }

    /// A client pointed at a dead address times out locally instead of
    /// hanging forever.
    #[tokio::test]
    async fn unreachable_tracker_times_out() {
        // Bind and immediately drop to get an address nobody answers on.
        let dead_addr = {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            socket.local_addr().unwrap()
        };

        let engine = TrackerEngine::connect(dead_addr).await.unwrap();
        let message = WireMessage::new(Command::QueryPlayers, "");
        let reply = engine
            .send_and_await(&message, Duration::from_millis(200))
            .await
            .unwrap();

        assert!(reply.is_none());
    }
}
