//! Test fixtures for integration testing

#![allow(dead_code)]

use duel_room::config::ArenaSettings;
use duel_room::connection::OUTBOX_CAPACITY;
use duel_room::metrics::MetricsCollector;
use duel_room::protocol::{ClientMessage, ServerEvent};
use duel_room::service::ArenaEngine;
use duel_room::types::SessionOutcome;
use duel_room::ArenaHandle;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn an engine with the given contest rules
pub fn spawn_engine(settings: ArenaSettings) -> (ArenaHandle, Arc<MetricsCollector>, JoinHandle<()>) {
    let metrics = Arc::new(MetricsCollector::default());
    let (handle, task) = ArenaEngine::spawn(settings, metrics.clone());
    (handle, metrics, task)
}

/// A connected player capturing every event the server sends it
pub struct TestClient {
    pub id: String,
    handle: ArenaHandle,
    events: mpsc::Receiver<ServerEvent>,
    seen: Vec<ServerEvent>,
}

impl TestClient {
    /// Register with the engine and consume the connection ack
    pub async fn connect(handle: &ArenaHandle, id: &str) -> Self {
        let (tx, events) = mpsc::channel(OUTBOX_CAPACITY);
        handle.connect(id, tx).await.expect("connect failed");

        let mut client = Self {
            id: id.to_string(),
            handle: handle.clone(),
            events,
            seen: Vec::new(),
        };
        let ack = client.next().await;
        assert!(
            matches!(&ack, ServerEvent::ConnectionAck { player_id, .. } if player_id == id),
            "expected connection-ack, got {:?}",
            ack
        );
        client
    }

    pub async fn send(&self, message: ClientMessage) {
        self.handle
            .dispatch(&self.id, message)
            .await
            .expect("engine unavailable");
    }

    pub async fn join(&self) {
        self.send(ClientMessage::JoinQueue).await;
    }

    pub async fn sample(&self, value: f64) {
        self.send(ClientMessage::IntensitySample { value: json!(value) })
            .await;
    }

    pub async fn disconnect(&self) {
        self.handle
            .disconnect(&self.id)
            .await
            .expect("engine unavailable");
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> ServerEvent {
        let event = self
            .events
            .recv()
            .await
            .expect("outbox closed while waiting for an event");
        self.seen.push(event.clone());
        event
    }

    /// Wait for the next event of the given kind, skipping others
    pub async fn expect(&mut self, kind: &str) -> ServerEvent {
        loop {
            let event = self.next().await;
            if event.kind() == kind {
                return event;
            }
        }
    }

    pub async fn expect_session_end(&mut self) -> SessionOutcome {
        match self.expect("session-end").await {
            ServerEvent::SessionEnd(outcome) => outcome,
            other => panic!("expected session-end, got {:?}", other),
        }
    }

    /// Events already queued for this client, without waiting
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event.clone());
            events.push(event);
        }
        events
    }

    /// Everything received so far, in order
    pub fn seen(&self) -> &[ServerEvent] {
        &self.seen
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.seen.iter().filter(|e| e.kind() == kind).count()
    }
}

/// Let the engine process everything currently queued
pub async fn settle(handle: &ArenaHandle) {
    handle.stats().await.expect("engine unavailable");
}
