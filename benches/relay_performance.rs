//! Performance benchmarks for the telemetry relay and matchmaking paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use duel_room::config::ArenaSettings;
use duel_room::connection::OUTBOX_CAPACITY;
use duel_room::protocol::{MessageUtils, ServerEvent};
use duel_room::session::{JoinResult, SessionManager, TimerEvent};
use tokio::sync::mpsc;

struct BenchArena {
    manager: SessionManager,
    // receivers are kept alive so sends succeed
    _timers: mpsc::UnboundedReceiver<TimerEvent>,
    inboxes: Vec<mpsc::Receiver<ServerEvent>>,
}

fn create_bench_arena(players: usize) -> BenchArena {
    let (timer_tx, timers) = mpsc::unbounded_channel();
    let mut manager = SessionManager::new(ArenaSettings::default(), timer_tx);
    let mut inboxes = Vec::with_capacity(players);

    for i in 0..players {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        manager.register(&format!("player{}", i), tx).unwrap();
        inboxes.push(rx);
    }

    BenchArena {
        manager,
        _timers: timers,
        inboxes,
    }
}

fn drain(arena: &mut BenchArena) {
    for inbox in arena.inboxes.iter_mut() {
        while inbox.try_recv().is_ok() {}
    }
}

fn bench_intensity_relay(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let mut arena = create_bench_arena(2);
    arena.manager.join_queue("player0").unwrap();
    let session_id = match arena.manager.join_queue("player1").unwrap() {
        JoinResult::Matched { session_id } => session_id,
        other => panic!("expected a match, got {:?}", other),
    };
    drain(&mut arena);

    let mut value = 0.0;
    c.bench_function("record_intensity", |b| {
        b.iter(|| {
            value = (value + 0.013) % 1.0;
            let accepted = arena
                .manager
                .record_intensity(black_box(session_id), "player0", black_box(value));
            arena.inboxes[1].try_recv().ok();
            accepted
        })
    });
}

fn bench_sample_parsing(c: &mut Criterion) {
    let frame = r#"{"type":"intensity-sample","payload":{"value":0.4213}}"#;

    c.bench_function("parse_intensity_frame", |b| {
        b.iter(|| MessageUtils::parse_client_message(black_box(frame)).unwrap())
    });
}

fn bench_matchmaking(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    c.bench_function("match_100_players", |b| {
        b.iter(|| {
            let mut arena = create_bench_arena(100);
            for i in 0..100 {
                arena
                    .manager
                    .join_queue(&format!("player{}", i))
                    .unwrap();
            }
            black_box(arena.manager.active_session_count())
        })
    });
}

criterion_group!(
    benches,
    bench_intensity_relay,
    bench_sample_parsing,
    bench_matchmaking
);
criterion_main!(benches);
