//! Performance benchmarks for the simulation hot paths

use server::game::Session;
use server::router::Router;
use shared::ServerMessage;
use std::time::Instant;
use tokio::sync::mpsc;

fn busy_session() -> Session {
    let mut session = Session::new("bench".to_string(), 0);
    session.gold = 1_000_000;
    for i in 0..50 {
        let kind = ["basic", "fast", "strong"][i % 3];
        session.place_tower((i as f32 * 16.0) % 800.0, 150.0 + (i as f32 * 7.0) % 200.0, kind, "p1");
    }
    session.start(0);
    for _ in 0..5 {
        session.spawn_wave(0);
    }
    session
}

/// Benchmarks a full tick with many towers and enemies
#[test]
fn benchmark_session_tick() {
    let mut session = busy_session();
    session.tick(5_000);

    let iterations = 2_000;
    let start = Instant::now();

    for i in 0..iterations {
        session.tick(5_000 + (i + 1) * 50);
    }

    let duration = start.elapsed();
    println!(
        "Session tick: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Well under one 50ms period per tick
    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks snapshot encoding, which runs once per session per tick
#[test]
fn benchmark_snapshot_serialization() {
    let mut session = busy_session();
    session.tick(5_000);

    let iterations = 2_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let message = ServerMessage::GameState {
            state: session.snapshot(),
        };
        let text = serde_json::to_string(&message).unwrap();
        assert!(!text.is_empty());
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5_000);
}

/// Stress test: many connections in one session, ticked repeatedly
#[test]
fn stress_test_broadcast_fan_out() {
    let mut router = Router::new();
    let mut receivers = Vec::new();

    for id in 1..=64 {
        let (tx, rx) = mpsc::unbounded_channel();
        router.connect(id, "127.0.0.1:9000".parse().unwrap(), tx);
        router.handle_frame(id, &format!(r#"{{"type":"join","playerName":"p{}"}}"#, id), 0);
        receivers.push(rx);
    }
    for id in 1..=64 {
        router.handle_frame(id, r#"{"type":"ready"}"#, 0);
    }
    for rx in receivers.iter_mut() {
        while rx.try_recv().is_ok() {}
    }

    let ticks = 200;
    let start = Instant::now();
    for i in 1..=ticks {
        assert_eq!(router.tick(i * 50), 1);
    }
    let duration = start.elapsed();
    println!("Fan-out: {} ticks to 64 connections in {:?}", ticks, duration);

    for rx in receivers.iter_mut() {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, ticks as usize);
    }
    assert!(duration.as_millis() < 5_000);
}
