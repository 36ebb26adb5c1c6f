//! Session State
//!
//! One user's live round. The session itself only knows how to absorb a
//! guess; scoring, stats and the paired opponent are handled by the engine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::game::words::RoundDraw;

// =============================================================================
// IDENTITY
// =============================================================================

/// Caller-supplied user identifier. Trusted as given.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Display identity snapshot stored alongside stats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id.
    pub user_id: UserId,
    /// Account name.
    pub username: String,
    /// Name shown on leaderboards.
    pub display_name: String,
}

impl Identity {
    /// Identity whose names both equal the id.
    pub fn anonymous(user_id: UserId) -> Self {
        Self {
            username: user_id.0.clone(),
            display_name: user_id.0.clone(),
            user_id,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Tries a fresh session starts with.
pub const MAX_TRIES: u32 = 3;

/// Round mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// Single-player round.
    Solo,
    /// One half of a duel.
    Duel {
        /// Owner of the paired session.
        opponent: UserId,
        /// Where duel results are announced.
        results_sink: String,
    },
}

/// One user's active round.
#[derive(Clone, Debug)]
pub struct Session {
    /// Round identifier, shared by both halves of a duel.
    pub round_id: Uuid,
    /// Owner.
    pub identity: Identity,
    /// Word to find.
    pub target: String,
    /// Encoded target.
    pub target_symbol: String,
    /// Encoded options, fixed for the session's lifetime.
    pub options: Vec<String>,
    /// Symbols tried so far, in guess order.
    pub guessed_symbols: Vec<String>,
    /// Remaining tries.
    pub tries_remaining: u32,
    /// When the round became (or becomes) playable.
    pub started_at: Instant,
    /// Solo or duel.
    pub mode: SessionMode,
}

/// What a single guess did to a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuessVerdict {
    /// Correct symbol on the given (1-based) try.
    Correct {
        /// Tries used including this one.
        tries_used: u32,
    },
    /// Wrong symbol, tries remain.
    Incorrect {
        /// Tries left after this guess.
        tries_left: u32,
    },
    /// Wrong symbol and no tries left.
    Exhausted,
}

impl Session {
    /// Build a fresh session from a round draw.
    pub fn new(
        round_id: Uuid,
        identity: Identity,
        draw: &RoundDraw,
        max_tries: u32,
        started_at: Instant,
        mode: SessionMode,
    ) -> Self {
        Self {
            round_id,
            identity,
            target: draw.target.clone(),
            target_symbol: draw.target_symbol.clone(),
            options: draw.options.clone(),
            guessed_symbols: Vec::new(),
            tries_remaining: max_tries,
            started_at,
            mode,
        }
    }

    /// Owner id.
    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    /// Paired opponent, if this is a duel half.
    pub fn opponent(&self) -> Option<&UserId> {
        match &self.mode {
            SessionMode::Duel { opponent, .. } => Some(opponent),
            SessionMode::Solo => None,
        }
    }

    /// True for duel halves.
    pub fn is_duel(&self) -> bool {
        matches!(self.mode, SessionMode::Duel { .. })
    }

    /// Record a guess.
    ///
    /// The symbol is appended even if it was tried before. Tries used on a
    /// correct guess count the current one: `max_tries + 1 - tries_remaining`
    /// before the decrement, i.e. 1 on a first-try hit.
    pub fn apply_guess(&mut self, symbol: &str, max_tries: u32) -> GuessVerdict {
        self.guessed_symbols.push(symbol.to_string());

        if symbol == self.target_symbol {
            return GuessVerdict::Correct {
                tries_used: (max_tries + 1).saturating_sub(self.tries_remaining),
            };
        }

        self.tries_remaining = self.tries_remaining.saturating_sub(1);
        if self.tries_remaining == 0 {
            GuessVerdict::Exhausted
        } else {
            GuessVerdict::Incorrect {
                tries_left: self.tries_remaining,
            }
        }
    }

    /// Time since the round became playable. Zero during a countdown.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}
