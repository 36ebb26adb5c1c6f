//! Session Store
//!
//! Live sessions keyed by owner. At most one session per user id. The store
//! is plain data; the engine serializes access to it.

use std::collections::BTreeMap;

use crate::engine::error::EngineError;
use crate::game::session::{Session, UserId};

/// All live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: BTreeMap<UserId, Session>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Fails if its owner already has one.
    pub fn insert(&mut self, session: Session) -> Result<(), EngineError> {
        let user_id = session.user_id().clone();
        if self.sessions.contains_key(&user_id) {
            return Err(EngineError::AlreadyActive(user_id));
        }
        self.sessions.insert(user_id, session);
        Ok(())
    }

    /// Register both halves of a duel, or neither.
    pub fn insert_pair(&mut self, a: Session, b: Session) -> Result<(), EngineError> {
        for user_id in [a.user_id(), b.user_id()] {
            if self.sessions.contains_key(user_id) {
                return Err(EngineError::AlreadyActive(user_id.clone()));
            }
        }
        self.sessions.insert(a.user_id().clone(), a);
        self.sessions.insert(b.user_id().clone(), b);
        Ok(())
    }

    /// Session owned by `user_id`.
    pub fn get(&self, user_id: &UserId) -> Option<&Session> {
        self.sessions.get(user_id)
    }

    /// Mutable session owned by `user_id`.
    pub fn get_mut(&mut self, user_id: &UserId) -> Result<&mut Session, EngineError> {
        self.sessions
            .get_mut(user_id)
            .ok_or_else(|| EngineError::NoActiveSession(user_id.clone()))
    }

    /// Remove and return a session.
    pub fn remove(&mut self, user_id: &UserId) -> Option<Session> {
        self.sessions.remove(user_id)
    }

    /// True if `user_id` has a live session.
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.sessions.contains_key(user_id)
    }

    /// Live session count.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::{Identity, SessionMode, MAX_TRIES};
    use crate::game::words::RoundDraw;
    use tokio::time::Instant;
    use uuid::Uuid;

    fn session(user: &str) -> Session {
        let draw = RoundDraw {
            target: "LUCK".to_string(),
            target_symbol: "ꖎ ⚍ ᓵ ꖌ".to_string(),
            options: vec!["ꖎ ⚍ ᓵ ꖌ".to_string()],
        };
        Session::new(
            Uuid::new_v4(),
            Identity::anonymous(user.into()),
            &draw,
            MAX_TRIES,
            Instant::now(),
            SessionMode::Solo,
        )
    }

    #[test]
    fn test_one_session_per_user() {
        let mut store = SessionStore::new();
        store.insert(session("alice")).unwrap();
        let err = store.insert(session("alice")).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyActive(id) if id.as_str() == "alice"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_pair_is_all_or_nothing() {
        let mut store = SessionStore::new();
        store.insert(session("bob")).unwrap();

        assert!(store.insert_pair(session("alice"), session("bob")).is_err());
        assert!(!store.contains(&"alice".into()));
        assert_eq!(store.len(), 1);

        store.insert_pair(session("carol"), session("dave")).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_get_mut_missing() {
        let mut store = SessionStore::new();
        assert!(matches!(
            store.get_mut(&"ghost".into()),
            Err(EngineError::NoActiveSession(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut store = SessionStore::new();
        store.insert(session("alice")).unwrap();
        assert!(store.remove(&"alice".into()).is_some());
        assert!(store.remove(&"alice".into()).is_none());
        assert!(store.is_empty());
    }
}
