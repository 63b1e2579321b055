//! Connection tracking for the game server
//!
//! This module keeps the server-side view of every open WebSocket:
//! - the outbound queue used to push text frames to that connection
//! - which session and player the connection currently speaks for
//!
//! The registry only holds a back-reference (session id, player id) per
//! connection. Sessions and players themselves live in the session
//! registry, so a message can be routed without the client repeating its
//! identity on every frame.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;

pub type ConnectionId = u32;

/// Queue drained by the connection's writer task. Each item is one text frame.
pub type Outbound = mpsc::UnboundedSender<String>;

/// The session and player a connection joined as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub session_id: String,
    pub player_id: String,
}

/// Represents one live connection
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned at accept time
    pub id: ConnectionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// Outbound frame queue
    pub sender: Outbound,
    /// Set once the connection has joined a session
    pub binding: Option<Binding>,
}

impl Connection {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: Outbound) -> Self {
        Self {
            id,
            addr,
            sender,
            binding: None,
        }
    }

    /// A connection is open while its writer task still holds the receiver.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn is_bound_to(&self, session_id: &str) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|b| b.session_id == session_id)
    }
}

/// Maps each live connection to its outbound queue and session binding
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection. It is not bound to any
    /// session until it joins.
    pub fn register(&mut self, id: ConnectionId, addr: SocketAddr, sender: Outbound) {
        info!("Connection {} opened from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, sender));
    }

    /// Forgets a connection entirely. Returns its last binding, if any.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Binding> {
        let connection = self.connections.remove(&id)?;
        info!("Connection {} closed", id);
        connection.binding
    }

    /// Binds a registered connection to a session and player. Returns false
    /// for unknown connections.
    pub fn bind(&mut self, id: ConnectionId, session_id: &str, player_id: &str) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) => {
                connection.binding = Some(Binding {
                    session_id: session_id.to_string(),
                    player_id: player_id.to_string(),
                });
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<&Binding> {
        self.connections.get(&id)?.binding.as_ref()
    }

    /// Clears the binding but keeps the connection registered.
    pub fn unbind(&mut self, id: ConnectionId) -> Option<Binding> {
        self.connections.get_mut(&id)?.binding.take()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All connections currently bound to `session_id`.
    pub fn bound_to<'a>(&'a self, session_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .values()
            .filter(move |c| c.is_bound_to(session_id))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn channel() -> (Outbound, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_and_lookup_unbound() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        registry.register(1, test_addr(), tx);

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(1).is_none());
        assert!(registry.lookup(2).is_none());
    }

    #[test]
    fn test_bind_lookup_unbind() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        registry.register(1, test_addr(), tx);

        assert!(registry.bind(1, "default", "42"));
        let binding = registry.lookup(1).cloned().unwrap();
        assert_eq!(binding.session_id, "default");
        assert_eq!(binding.player_id, "42");

        assert_eq!(registry.unbind(1), Some(binding));
        assert!(registry.lookup(1).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bind_unknown_connection() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.bind(9, "default", "1"));
        assert!(registry.unbind(9).is_none());
    }

    #[test]
    fn test_remove_returns_binding() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        registry.register(1, test_addr(), tx);
        registry.bind(1, "s", "p");

        let binding = registry.remove(1).unwrap();
        assert_eq!(binding.player_id, "p");
        assert!(registry.is_empty());
        assert!(registry.remove(1).is_none());
    }

    #[test]
    fn test_bound_to_filters_sessions() {
        let mut registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        registry.register(1, test_addr(), tx1);
        registry.register(2, test_addr(), tx2);
        registry.register(3, test_addr(), tx3);
        registry.bind(1, "a", "p1");
        registry.bind(2, "b", "p2");
        registry.bind(3, "a", "p3");

        let mut ids: Vec<ConnectionId> = registry.bound_to("a").map(|c| c.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_closed_receiver_marks_connection_closed() {
        let mut registry = ConnectionRegistry::new();
        let (tx, rx) = channel();
        registry.register(1, test_addr(), tx);
        assert!(registry.get(1).unwrap().is_open());

        drop(rx);
        assert!(!registry.get(1).unwrap().is_open());
    }
}
