//! Client Registry
//!
//! Maps identified users to their connection's outbound channel and fans
//! duel results out to watching connections. This is the engine's
//! [`Notifier`] in the server.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::engine::notify::{Notifier, NotifyError};
use crate::game::events::{GameEvent, Recipient};
use crate::game::session::UserId;
use crate::network::protocol::ServerMessage;

/// Results backlog a slow watcher may fall behind by.
const RESULTS_CAPACITY: usize = 256;

/// A result posted to a named sink.
#[derive(Debug, Clone)]
pub struct ResultPost {
    /// Sink name.
    pub sink: String,
    /// The result.
    pub event: GameEvent,
}

/// Identified connections and the results feed.
#[derive(Debug)]
pub struct ClientRegistry {
    users: RwLock<BTreeMap<UserId, mpsc::Sender<ServerMessage>>>,
    results: broadcast::Sender<ResultPost>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        let (results, _) = broadcast::channel(RESULTS_CAPACITY);
        Self {
            users: RwLock::new(BTreeMap::new()),
            results,
        }
    }

    /// Route a user's events to `sender`. A newer connection for the same
    /// user replaces the older one.
    pub fn register(&self, user_id: UserId, sender: mpsc::Sender<ServerMessage>) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, sender);
    }

    /// Stop routing to `sender`. Ignored if the user has since reconnected
    /// elsewhere.
    pub fn unregister(&self, user_id: &UserId, sender: &mpsc::Sender<ServerMessage>) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.get(user_id).is_some_and(|s| s.same_channel(sender)) {
            users.remove(user_id);
        }
    }

    /// True if `user_id` has a live connection.
    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(user_id)
    }

    /// Identified user count.
    pub fn user_count(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Subscribe to posted results.
    pub fn subscribe_results(&self) -> broadcast::Receiver<ResultPost> {
        self.results.subscribe()
    }
}

impl Notifier for ClientRegistry {
    fn deliver(&self, recipient: &Recipient, event: &GameEvent) -> Result<(), NotifyError> {
        match recipient {
            Recipient::User(user_id) => {
                let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
                let sender = users.get(user_id).ok_or(NotifyError::Unreachable)?;
                sender
                    .try_send(ServerMessage::Event(event.clone()))
                    .map_err(|_| NotifyError::Closed)
            }
            Recipient::Results(sink) => {
                let post = ResultPost {
                    sink: sink.clone(),
                    event: event.clone(),
                };
                if self.results.send(post).is_err() {
                    debug!(sink = %sink, "No results watchers");
                }
                Ok(())
            }
        }
    }
}
