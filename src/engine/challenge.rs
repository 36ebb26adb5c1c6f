//! Challenge Store
//!
//! Pending duel invitations keyed by challenger. Each challenge carries a
//! unique id so a stale expiry timer can tell it no longer owns the entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::engine::error::EngineError;
use crate::game::session::{Identity, UserId};

/// A pending duel invitation.
#[derive(Debug)]
pub struct Challenge {
    /// Unique per issued challenge.
    pub id: Uuid,
    /// Who issued it.
    pub challenger: Identity,
    /// Who must answer.
    pub opponent: UserId,
    /// Channel the challenge was issued from, if any.
    pub origin_channel: Option<String>,
    /// Where the duel result will be announced.
    pub results_sink: String,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// Expiry timer, set once it is spawned.
    pub expiry: Option<AbortHandle>,
}

impl Challenge {
    /// Challenger id.
    pub fn challenger_id(&self) -> &UserId {
        &self.challenger.user_id
    }

    /// True if `user_id` is either party.
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.challenger_id() == user_id || &self.opponent == user_id
    }

    /// Stop the expiry timer. A timer that already fired is unaffected.
    pub fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// All pending challenges.
#[derive(Debug, Default)]
pub struct ChallengeStore {
    pending: BTreeMap<UserId, Challenge>,
}

impl ChallengeStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a challenge. At most one per challenger.
    pub fn insert(&mut self, challenge: Challenge) -> Result<(), EngineError> {
        let challenger = challenge.challenger_id().clone();
        if self.pending.contains_key(&challenger) {
            return Err(EngineError::AlreadyActive(challenger));
        }
        self.pending.insert(challenger, challenge);
        Ok(())
    }

    /// Pending challenge issued by `challenger`.
    pub fn get(&self, challenger: &UserId) -> Option<&Challenge> {
        self.pending.get(challenger)
    }

    /// Attach the expiry timer to the challenge with the given id.
    pub fn attach_expiry(&mut self, challenger: &UserId, id: Uuid, handle: AbortHandle) {
        match self.pending.get_mut(challenger) {
            Some(challenge) if challenge.id == id => challenge.expiry = Some(handle),
            // consumed before the timer was attached
            _ => handle.abort(),
        }
    }

    /// Remove the challenge issued by `challenger`.
    pub fn remove(&mut self, challenger: &UserId) -> Option<Challenge> {
        self.pending.remove(challenger)
    }

    /// Remove the challenge only if it is still the one with `id`.
    pub fn remove_if_current(&mut self, challenger: &UserId, id: Uuid) -> Option<Challenge> {
        match self.pending.get(challenger) {
            Some(challenge) if challenge.id == id => self.pending.remove(challenger),
            _ => None,
        }
    }

    /// True if `user_id` is a party to any pending challenge.
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.pending.values().any(|c| c.involves(user_id))
    }

    /// True if `user_id` has issued a pending challenge.
    pub fn contains(&self, challenger: &UserId) -> bool {
        self.pending.contains_key(challenger)
    }

    /// Pending challenge count.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
