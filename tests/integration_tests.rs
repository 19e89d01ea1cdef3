//! Integration tests for the duel-room service
//!
//! These drive the arena engine through its handle the same way the
//! WebSocket layer does and observe what each player receives:
//! - Matchmaking order and queue notifications
//! - Full timed sessions and disconnect endings
//! - Relay direction, sample validation and stale messages
//! - Slow readers and stalled connections
//! - Cleanup and statistics

mod fixtures;

use duel_room::config::ArenaSettings;
use duel_room::connection::OUTBOX_CAPACITY;
use duel_room::protocol::{ClientMessage, ServerEvent};
use duel_room::types::{EndReason, PlayerStats};
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;

use fixtures::{settle, spawn_engine, TestClient};

fn default_engine() -> (duel_room::ArenaHandle, tokio::task::JoinHandle<()>) {
    let (handle, _metrics, task) = spawn_engine(ArenaSettings::default());
    (handle, task)
}

#[tokio::test(start_paused = true)]
async fn test_timed_session_higher_peak_wins() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "player_a").await;
    let mut b = TestClient::connect(&handle, "player_b").await;

    a.join().await;
    assert_eq!(a.next().await, ServerEvent::QueuePosition { position: 1 });
    b.join().await;

    assert_eq!(a.next().await, ServerEvent::SessionSetup);
    match a.next().await {
        ServerEvent::SessionStart {
            duration_ms,
            your_id,
            opponent_id,
            ..
        } => {
            assert_eq!(duration_ms, 30_000);
            assert_eq!(your_id, "player_a");
            assert_eq!(opponent_id, "player_b");
        }
        other => panic!("expected session-start, got {:?}", other),
    }
    b.expect("session-start").await;

    for value in [0.12, 0.42, 0.3] {
        a.sample(value).await;
    }
    for value in [0.39, 0.05] {
        b.sample(value).await;
    }

    let outcome = a.expect_session_end().await;
    assert_eq!(outcome.winner_id.as_deref(), Some("player_a"));
    assert_eq!(outcome.reason, EndReason::Timeout);
    assert_eq!(outcome.duration_ms, 30_000);

    let summary_a = &outcome.per_player_summary[0];
    assert_eq!(summary_a.player_id, "player_a");
    assert_eq!(summary_a.peak_intensity, 0.42);
    assert_eq!(summary_a.last_intensity, 0.3);
    assert_eq!(summary_a.sample_count, 3);
    assert_eq!(outcome.per_player_summary[1].peak_intensity, 0.39);

    assert_eq!(b.expect_session_end().await, outcome);

    // each side saw only the opponent's samples
    assert_eq!(a.count_of("opponent-intensity"), 2);
    assert_eq!(b.count_of("opponent-intensity"), 3);
    assert!(a.seen().iter().all(|e| !matches!(
        e,
        ServerEvent::OpponentIntensity { from_player_id, .. } if from_player_id == "player_a"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_ends_session_once() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "player_a").await;
    let b = TestClient::connect(&handle, "player_b").await;

    a.join().await;
    b.join().await;
    a.expect("session-start").await;

    // the leaver holds the higher peak and still loses
    b.sample(0.95).await;
    a.sample(0.1).await;
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    b.disconnect().await;

    assert!(matches!(
        a.expect("opponent-left").await,
        ServerEvent::OpponentLeft { .. }
    ));
    let outcome = a.next().await;
    match &outcome {
        ServerEvent::SessionEnd(outcome) => {
            assert_eq!(outcome.winner_id.as_deref(), Some("player_a"));
            assert_eq!(outcome.reason, EndReason::Disconnect);
            assert_eq!(outcome.duration_ms, 5_000);
        }
        other => panic!("expected session-end, got {:?}", other),
    }

    // run well past the original contest end
    tokio::time::sleep(Duration::from_millis(60_000)).await;
    settle(&handle).await;
    a.drain();
    assert_eq!(a.count_of("session-end"), 1);

    a.send(ClientMessage::GetStats).await;
    assert_eq!(
        a.expect("player-stats").await,
        ServerEvent::PlayerStats(PlayerStats {
            games_played: 1,
            wins: 1,
            total_time_ms: 5_000,
        })
    );
    assert_ok!(handle.verify_invariants().await);
}

#[tokio::test]
async fn test_fifo_pairing_across_sessions() {
    let (handle, _task) = default_engine();
    let mut clients = Vec::new();
    for i in 1..=4 {
        clients.push(TestClient::connect(&handle, &format!("p{}", i)).await);
    }
    for client in &clients {
        client.join().await;
    }

    let mut opponents = Vec::new();
    for client in clients.iter_mut() {
        match client.expect("session-start").await {
            ServerEvent::SessionStart { opponent_id, .. } => opponents.push(opponent_id),
            _ => unreachable!(),
        }
    }
    assert_eq!(opponents, vec!["p2", "p1", "p4", "p3"]);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.active_sessions, 2);
    assert_eq!(stats.queue_length, 0);
    assert_ok!(handle.verify_invariants().await);
}

#[tokio::test]
async fn test_invalid_samples_are_not_relayed() {
    let (handle, _task) = default_engine();
    let a = TestClient::connect(&handle, "a").await;
    let mut b = TestClient::connect(&handle, "b").await;
    a.join().await;
    b.join().await;
    b.expect("session-start").await;

    for raw in [json!(1.5), json!(-0.1), json!("high"), json!({"v": 0.5})] {
        a.send(ClientMessage::IntensitySample { value: raw }).await;
    }
    settle(&handle).await;
    assert!(b.drain().is_empty());

    a.sample(0.5).await;
    assert_eq!(
        b.expect("opponent-intensity").await.kind(),
        "opponent-intensity"
    );
}

#[tokio::test]
async fn test_queue_leave_and_rejoin() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "a").await;
    let b = TestClient::connect(&handle, "b").await;
    let mut c = TestClient::connect(&handle, "c").await;

    a.join().await;
    a.send(ClientMessage::LeaveQueue).await;
    assert_eq!(a.next().await, ServerEvent::QueuePosition { position: 1 });
    assert_eq!(a.next().await, ServerEvent::QueueLeft {});

    // a left, so b and c pair with each other
    b.join().await;
    c.join().await;
    match c.expect("session-start").await {
        ServerEvent::SessionStart { opponent_id, .. } => assert_eq!(opponent_id, "b"),
        _ => unreachable!(),
    }
    settle(&handle).await;
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn test_disconnect_while_queued_leaves_no_trace() {
    let (handle, _task) = default_engine();
    let a = TestClient::connect(&handle, "a").await;
    let b = TestClient::connect(&handle, "b").await;
    let mut c = TestClient::connect(&handle, "c").await;

    a.join().await;
    a.disconnect().await;
    b.join().await;
    c.join().await;

    match c.expect("session-start").await {
        ServerEvent::SessionStart { opponent_id, .. } => assert_eq!(opponent_id, "b"),
        _ => unreachable!(),
    }
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.current_players, 2);
    assert_eq!(stats.total_connections, 3);
    assert_eq!(stats.peak_players, 3);
    assert_ok!(handle.verify_invariants().await);
}

#[tokio::test]
async fn test_reconnect_with_same_id_after_disconnect() {
    let (handle, _task) = default_engine();
    let a = TestClient::connect(&handle, "a").await;
    a.disconnect().await;

    let again = TestClient::connect(&handle, "a").await;
    again.send(ClientMessage::GetStats).await;
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.current_players, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_sample_after_session_end_is_ignored() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "a").await;
    let mut b = TestClient::connect(&handle, "b").await;
    a.join().await;
    b.join().await;

    a.expect_session_end().await;
    b.expect_session_end().await;

    a.sample(0.9).await;
    settle(&handle).await;
    assert!(b.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_session_cleanup_allows_new_match() {
    let settings = ArenaSettings {
        session_duration_ms: 1_000,
        cleanup_grace_ms: 2_000,
        ..ArenaSettings::default()
    };
    let (handle, _metrics, _task) = spawn_engine(settings);
    let mut a = TestClient::connect(&handle, "a").await;
    let mut b = TestClient::connect(&handle, "b").await;

    a.join().await;
    b.join().await;
    let first = a.expect_session_end().await;
    assert_eq!(first.duration_ms, 1_000);
    // equal (empty) peaks draw
    assert_eq!(first.winner_id, None);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    settle(&handle).await;
    assert_ok!(handle.verify_invariants().await);

    a.join().await;
    b.join().await;
    let second = a.expect_session_end().await;
    assert_ne!(first.session_id, second.session_id);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.total_sessions, 2);
}

#[tokio::test]
async fn test_heartbeat_chat_and_ready() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "a").await;
    let mut b = TestClient::connect(&handle, "b").await;

    a.send(ClientMessage::Heartbeat {
        timestamp: json!("client-clock-1"),
    })
    .await;
    assert_eq!(
        a.next().await,
        ServerEvent::HeartbeatAck {
            timestamp: json!("client-clock-1")
        }
    );

    a.send(ClientMessage::MarkReady).await;
    a.join().await;
    b.join().await;
    b.expect("session-start").await;

    a.send(ClientMessage::ChatMessage {
        message: "  good luck  ".to_string(),
    })
    .await;
    match b.expect("chat-message").await {
        ServerEvent::ChatMessage {
            from_player_id,
            message,
            ..
        } => {
            assert_eq!(from_player_id, "a");
            assert_eq!(message, "good luck");
        }
        _ => unreachable!(),
    }
    settle(&handle).await;
    a.drain();
    assert_eq!(a.count_of("chat-message"), 0);
}

#[tokio::test]
async fn test_metrics_track_sessions() {
    let (handle, metrics, _task) = spawn_engine(ArenaSettings::default());
    let a = TestClient::connect(&handle, "a").await;
    let b = TestClient::connect(&handle, "b").await;
    a.join().await;
    b.join().await;
    a.sample(2.0).await;
    a.sample(0.5).await;
    b.disconnect().await;
    settle(&handle).await;

    let session = metrics.session();
    assert_eq!(session.sessions_created_total.get(), 1);
    assert_eq!(session.active_sessions.get(), 0);
    assert_eq!(
        session
            .sessions_finished_total
            .with_label_values(&["disconnect"])
            .get(),
        1
    );
    assert_eq!(
        session
            .intensity_samples_total
            .with_label_values(&["rejected"])
            .get(),
        1
    );
    assert_eq!(metrics.connection().connected_players.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_reader_misses_samples_not_results() {
    let (handle, _task) = default_engine();
    let a = TestClient::connect(&handle, "a").await;
    let mut b = TestClient::connect(&handle, "b").await;
    a.join().await;
    b.join().await;
    settle(&handle).await;

    // b reads nothing while a streams
    for i in 0..2_000u32 {
        a.sample(f64::from(i % 100) / 100.0).await;
    }
    settle(&handle).await;

    let outcome = b.expect_session_end().await;
    assert_eq!(outcome.per_player_summary[0].sample_count, 2_000);
    assert!(b.count_of("opponent-intensity") < OUTBOX_CAPACITY);
    assert_eq!(b.count_of("session-start"), 1);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.current_players, 2);
}

#[tokio::test]
async fn test_bare_heartbeat_frame_is_acknowledged() {
    let (handle, _task) = default_engine();
    let mut a = TestClient::connect(&handle, "a").await;

    let frame = duel_room::protocol::MessageUtils::parse_client_message(r#"{"type":"heartbeat"}"#);
    a.send(assert_ok!(frame)).await;
    assert_eq!(
        a.next().await,
        ServerEvent::HeartbeatAck {
            timestamp: serde_json::Value::Null
        }
    );
}
