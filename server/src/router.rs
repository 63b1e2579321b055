//! Inbound message routing.
//!
//! The [`Router`] owns both registries and is the only thing that mutates
//! sessions on behalf of clients. The network event loop calls it for every
//! connection event and for every scheduler tick, one call at a time.

use crate::broadcast::{broadcast, send_to};
use crate::client_manager::{Binding, ConnectionId, ConnectionRegistry, Outbound};
use crate::scheduler::advance_sessions;
use crate::session_manager::SessionRegistry;
use log::{debug, warn};
use serde_json::Value;
use shared::{ClientMessage, PlayerSummary, ServerMessage, DEFAULT_GAME_ID};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("binary frame is not valid UTF-8")]
    NonUtf8(#[from] std::str::Utf8Error),
}

/// Decodes one text frame. `Ok(None)` means the frame has no recognised
/// `type` and should be ignored.
pub fn decode(text: &str) -> Result<Option<ClientMessage>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let known = value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| ClientMessage::KINDS.iter().any(|k| *k == kind));
    if !known {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[derive(Debug, Default)]
pub struct Router {
    sessions: SessionRegistry,
    connections: ConnectionRegistry,
    next_player_id: u64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn connect(&mut self, id: ConnectionId, addr: SocketAddr, sender: Outbound) {
        self.connections.register(id, addr, sender);
    }

    /// Handles a text frame. Decode failures are logged and dropped; the
    /// connection stays open.
    pub fn handle_frame(&mut self, id: ConnectionId, text: &str, now: u64) {
        match decode(text) {
            Ok(Some(message)) => self.handle_message(id, message, now),
            Ok(None) => debug!("Ignoring message of unknown type from {}", id),
            Err(e) => warn!("Connection {}: {}", id, e),
        }
    }

    pub fn handle_binary(&mut self, id: ConnectionId, data: &[u8], now: u64) {
        match std::str::from_utf8(data) {
            Ok(text) => self.handle_frame(id, text, now),
            Err(e) => warn!("Connection {}: {}", id, ProtocolError::from(e)),
        }
    }

    pub fn handle_message(&mut self, id: ConnectionId, message: ClientMessage, now: u64) {
        match message {
            ClientMessage::Join {
                player_name,
                game_id,
            } => self.join(id, player_name, game_id, now),
            ClientMessage::Ready => self.ready(id, now),
            ClientMessage::PlaceTower { x, y, tower_type } => {
                self.place_tower(id, x, y, &tower_type)
            }
            ClientMessage::StartWave => self.start_wave(id, now),
        }
    }

    /// Transport closed: drop the player, destroy an emptied session, and
    /// forget the connection.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.leave(id);
        self.connections.remove(id);
    }

    /// One scheduler step over every started session.
    pub fn tick(&mut self, now: u64) -> usize {
        advance_sessions(&mut self.sessions, &self.connections, now)
    }

    fn binding(&self, id: ConnectionId) -> Option<Binding> {
        self.connections.lookup(id).cloned()
    }

    fn join(&mut self, id: ConnectionId, player_name: String, game_id: Option<String>, now: u64) {
        if self.connections.get(id).is_none() {
            warn!("Join from unregistered connection {}", id);
            return;
        }

        // A second join on the same connection replaces the first player.
        if self.connections.lookup(id).is_some() {
            self.leave(id);
        }

        let session_id = game_id
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GAME_ID.to_string());

        self.next_player_id += 1;
        let player_id = self.next_player_id.to_string();

        let session = self.sessions.get_or_create(&session_id, now);
        session.add_player(player_id.clone(), player_name.clone());
        let game_state = session.snapshot();
        self.connections.bind(id, &session_id, &player_id);

        send_to(
            &self.connections,
            id,
            &ServerMessage::Joined {
                player_id: player_id.clone(),
                game_state,
            },
        );
        broadcast(
            &self.connections,
            &session_id,
            &ServerMessage::PlayerJoined {
                player: PlayerSummary {
                    id: player_id,
                    name: player_name,
                },
            },
            Some(id),
        );
    }

    fn ready(&mut self, id: ConnectionId, now: u64) {
        let Some(binding) = self.binding(id) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&binding.session_id) else {
            return;
        };

        session.set_ready(&binding.player_id);
        let state = session.snapshot();
        let starting = !session.started && session.all_ready();
        if starting {
            session.start(now);
        }

        broadcast(
            &self.connections,
            &binding.session_id,
            &ServerMessage::GameState { state },
            None,
        );
        if starting {
            broadcast(
                &self.connections,
                &binding.session_id,
                &ServerMessage::GameStarted,
                None,
            );
        }
    }

    fn place_tower(&mut self, id: ConnectionId, x: f32, y: f32, tower_type: &str) {
        let Some(binding) = self.binding(id) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&binding.session_id) else {
            return;
        };

        // Clients read the outcome from the next snapshot either way.
        session.place_tower(x, y, tower_type, &binding.player_id);
        let state = session.snapshot();
        broadcast(
            &self.connections,
            &binding.session_id,
            &ServerMessage::GameState { state },
            None,
        );
    }

    fn start_wave(&mut self, id: ConnectionId, now: u64) {
        let Some(binding) = self.binding(id) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&binding.session_id) else {
            return;
        };

        if session.has_active_wave() {
            debug!("Wave already running in {}", session.id);
            return;
        }
        session.spawn_wave(now);
    }

    fn leave(&mut self, id: ConnectionId) {
        let Some(binding) = self.connections.unbind(id) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&binding.session_id) else {
            return;
        };

        session.remove_player(&binding.player_id);
        if session.is_empty() {
            self.sessions.remove(&binding.session_id);
        } else {
            broadcast(
                &self.connections,
                &binding.session_id,
                &ServerMessage::PlayerLeft {
                    player_id: binding.player_id,
                },
                None,
            );
        }
    }
}
