//! Fixed-interval simulation driver.

use crate::broadcast::broadcast;
use crate::client_manager::ConnectionRegistry;
use crate::session_manager::SessionRegistry;
use crate::utils::get_timestamp;
use log::debug;
use shared::ServerMessage;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Advances every started session to `now` and broadcasts each new
/// snapshot to that session. Lobby sessions are skipped. Returns the number
/// of sessions ticked.
pub fn advance_sessions(
    sessions: &mut SessionRegistry,
    connections: &ConnectionRegistry,
    now: u64,
) -> usize {
    let mut ticked = 0;
    for session in sessions.started_mut() {
        session.tick(now);
        let message = ServerMessage::GameState {
            state: session.snapshot(),
        };
        broadcast(connections, &session.id, &message, None);
        ticked += 1;
    }
    ticked
}

/// Wakes the event loop once per period. Missed periods are skipped rather
/// than replayed; the next tick just sees a longer elapsed time.
pub struct TickScheduler {
    timer: Interval,
    ticks: u64,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { timer, ticks: 0 }
    }

    /// Waits for the next period and returns the wall-clock time in ms.
    pub async fn next(&mut self) -> u64 {
        self.timer.tick().await;
        self.ticks += 1;
        get_timestamp()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn record(&self, sessions_ticked: usize) {
        if self.ticks % 200 == 0 && sessions_ticked > 0 {
            debug!("Tick {}: {} active sessions", self.ticks, sessions_ticked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    #[test]
    fn test_only_started_sessions_advance() {
        let mut sessions = SessionRegistry::new();
        let mut connections = ConnectionRegistry::new();
        let (tx_lobby, mut rx_lobby) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        connections.register(1, test_addr(), tx_lobby);
        connections.register(2, test_addr(), tx_live);
        connections.bind(1, "lobby", "1");
        connections.bind(2, "live", "2");

        sessions.get_or_create("lobby", 0).spawn_wave(0);
        let live = sessions.get_or_create("live", 0);
        live.start(0);
        live.spawn_wave(0);

        let ticked = advance_sessions(&mut sessions, &connections, 50);

        assert_eq!(ticked, 1);
        assert_eq!(sessions.get("lobby").unwrap().last_tick, 0);
        assert_eq!(sessions.get("live").unwrap().last_tick, 50);
        assert!(rx_lobby.try_recv().is_err());

        let text = rx_live.try_recv().unwrap();
        match serde_json::from_str::<ServerMessage>(&text).unwrap() {
            ServerMessage::GameState { state } => {
                assert!(state.game_started);
                assert_eq!(state.enemies.len(), 1);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scheduler_counts_ticks() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(5));
        let first = scheduler.next().await;
        let second = scheduler.next().await;
        assert!(second >= first);
        assert_eq!(scheduler.ticks(), 2);
    }
}
