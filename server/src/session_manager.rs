//! Registry of live game sessions, keyed by session id.
//!
//! A session is created the first time someone joins its id and is dropped
//! as soon as its last player leaves. Dropping a session also drops its
//! pending wave spawns, so nothing fires into a session that no longer
//! exists.

use crate::game::Session;
use log::info;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating an empty one if needed.
    pub fn get_or_create(&mut self, id: &str, now: u64) -> &mut Session {
        self.sessions.entry(id.to_string()).or_insert_with(|| {
            info!("Created session {}", id);
            Session::new(id.to_string(), now)
        })
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            info!("Destroyed session {}", id);
        }
        removed
    }

    /// Sessions that have left the lobby, in no particular order.
    pub fn started_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut().filter(|s| s.started)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses_session() {
        let mut registry = SessionRegistry::new();
        registry
            .get_or_create("default", 0)
            .add_player("1".to_string(), "A".to_string());
        let session = registry.get_or_create("default", 100);

        assert_eq!(session.players.len(), 1);
        assert_eq!(session.last_tick, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create("a", 0).gold = 10;
        registry.get_or_create("b", 0);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").map(|s| s.gold), Some(10));
        assert_eq!(registry.get("b").map(|s| s.gold), Some(500));
    }

    #[test]
    fn test_remove_session() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create("a", 0);

        assert!(registry.remove("a").is_some());
        assert!(registry.get("a").is_none());
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_started_filter() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create("lobby", 0);
        registry.get_or_create("live", 0).start(0);

        let started: Vec<String> = registry.started_mut().map(|s| s.id.clone()).collect();
        assert_eq!(started, vec!["live".to_string()]);
    }
}
