use crate::client_manager::{ConnectionId, ConnectionRegistry};
use log::error;
use shared::ServerMessage;

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode outbound message: {}", e);
            None
        }
    }
}

/// Sends `message` to every open connection bound to `session_id`, except
/// `exclude`. Closed or foreign connections are skipped. Returns how many
/// connections the frame was queued for.
pub fn broadcast(
    connections: &ConnectionRegistry,
    session_id: &str,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) -> usize {
    let Some(text) = encode(message) else {
        return 0;
    };

    connections
        .bound_to(session_id)
        .filter(|c| Some(c.id) != exclude && c.is_open())
        .filter(|c| c.sender.send(text.clone()).is_ok())
        .count()
}

/// Sends `message` to a single connection. A missing or closed connection
/// is not an error.
pub fn send_to(connections: &ConnectionRegistry, id: ConnectionId, message: &ServerMessage) -> bool {
    let Some(connection) = connections.get(id) else {
        return false;
    };
    match encode(message) {
        Some(text) => connection.sender.send(text).is_ok(),
        None => false,
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
    fn test_broadcast_reaches_only_session_members() {
        let mut connections = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        connections.register(1, test_addr(), tx1);
        connections.register(2, test_addr(), tx2);
        connections.register(3, test_addr(), tx3);
        connections.bind(1, "a", "p1");
        connections.bind(2, "b", "p2");

        let sent = broadcast(&connections, "a", &ServerMessage::GameStarted, None);

        assert_eq!(sent, 1);
        assert_eq!(rx1.try_recv().unwrap(), r#"{"type":"gameStarted"}"#);
        assert!(rx2.try_recv().is_err());
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_exclude_and_closed() {
        let mut connections = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        connections.register(1, test_addr(), tx1);
        connections.register(2, test_addr(), tx2);
        connections.register(3, test_addr(), tx3);
        for id in 1..=3 {
            connections.bind(id, "a", &id.to_string());
        }
        drop(rx2);

        let sent = broadcast(&connections, "a", &ServerMessage::GameStarted, Some(3));

        assert_eq!(sent, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn test_send_to_missing_connection() {
        let connections = ConnectionRegistry::new();
        assert!(!send_to(&connections, 5, &ServerMessage::GameStarted));
    }
}
