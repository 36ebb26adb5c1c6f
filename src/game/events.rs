//! Game Events
//!
//! Structured results for the presentation layer. The engine never renders
//! anything; it emits these and the transport decides how to show them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::rank::Rank;
use crate::game::session::UserId;

/// Round mode as seen by clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// Single-player.
    Solo,
    /// Duel half.
    Duel,
}

/// Outbound event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// A round is playable.
    GameStarted {
        /// Round id, shared by both halves of a duel.
        round_id: Uuid,
        /// Solo or duel.
        mode: RoundKind,
        /// Plain-text word to find.
        target_hint: String,
        /// Encoded symbols to pick from.
        options: Vec<String>,
        /// Guesses allowed.
        tries_left: u32,
    },

    /// Wrong symbol, round continues.
    Incorrect {
        /// The guess.
        symbol: String,
        /// Word behind the guessed symbol, if it is a known word.
        word: Option<String>,
        /// Guesses remaining.
        tries_left: u32,
        /// Wrong guesses so far.
        guessed_symbols: Vec<String>,
    },

    /// Correct symbol.
    Won {
        /// The winning guess.
        symbol: String,
        /// Points awarded.
        points: u32,
        /// Time from start to the winning guess.
        elapsed_seconds: f64,
        /// Points after the award.
        total_points: i64,
        /// Rank after the award.
        rank: Rank,
    },

    /// Out of tries.
    Lost {
        /// Symbol that would have won.
        correct_symbol: String,
        /// Word behind it.
        correct_word: String,
        /// Points deducted.
        points_lost: u32,
        /// Wrong guesses made.
        guessed_symbols: Vec<String>,
    },

    /// Challenge accepted by the engine and delivered to the opponent.
    ChallengeIssued {
        /// Issuer.
        challenger_id: UserId,
        /// Challenged user.
        opponent_id: UserId,
        /// Time left to answer.
        expires_in_seconds: u64,
    },

    /// Sent to the challenged user.
    ChallengeReceived {
        /// Issuer.
        challenger_id: UserId,
        /// Issuer's display name.
        challenger_name: String,
        /// Time left to answer.
        expires_in_seconds: u64,
    },

    /// Duel is on; the countdown starts now.
    ChallengeAccepted {
        /// Issuer.
        challenger_id: UserId,
        /// User who accepted.
        opponent_id: UserId,
        /// Ticks before the round opens.
        countdown_ticks: u32,
    },

    /// One countdown tick.
    Countdown {
        /// Ticks left, counting down to 1.
        remaining: u32,
    },

    /// Opponent said no.
    ChallengeDeclined {
        /// Issuer.
        challenger_id: UserId,
        /// User who declined.
        opponent_id: UserId,
    },

    /// The caller gave up their own round.
    Cancelled {
        /// Abandoned round.
        round_id: Uuid,
    },

    /// Nobody answered in time.
    ChallengeExpired {
        /// Issuer.
        challenger_id: UserId,
        /// Challenged user.
        opponent_id: UserId,
    },

    /// The other duelist cancelled.
    DuelCancelled {
        /// Duelist who gave up.
        cancelled_by: UserId,
    },

    /// The other duelist found the symbol first.
    OpponentSolved {
        /// Duelist who solved it.
        winner_id: UserId,
        /// Winning symbol.
        correct_symbol: String,
        /// Word behind it.
        correct_word: String,
        /// Points deducted from the recipient.
        points_lost: u32,
    },

    /// The other duelist ran out of tries.
    OpponentExhausted {
        /// Duelist who ran out.
        loser_id: UserId,
        /// Symbol nobody found.
        correct_symbol: String,
        /// Word behind it.
        correct_word: String,
        /// Points awarded to the recipient.
        points_gained: u32,
    },

    /// Announcement for the results sink.
    DuelResult {
        /// Winner.
        winner_id: UserId,
        /// Loser.
        loser_id: UserId,
        /// Winner's award.
        points_gained: u32,
        /// Loser's deduction.
        points_lost: u32,
        /// Target word.
        word: String,
        /// Winning time, zero for a win by default.
        elapsed_seconds: f64,
    },

    /// Rank moved after a stats update.
    RankChanged {
        /// Whose rank.
        user_id: UserId,
        /// Rank before.
        from: Rank,
        /// Rank after.
        to: Rank,
    },
}

/// Who an event goes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Direct message to one user.
    User(UserId),
    /// Named results channel.
    Results(String),
}

/// An event bound for a recipient. Built under the store lock, delivered
/// after it is released.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    /// Target.
    pub recipient: Recipient,
    /// Payload.
    pub event: GameEvent,
}

impl Dispatch {
    /// Event for one user.
    pub fn user(user_id: &UserId, event: GameEvent) -> Self {
        Self {
            recipient: Recipient::User(user_id.clone()),
            event,
        }
    }

    /// Event for a results channel.
    pub fn results(sink: &str, event: GameEvent) -> Self {
        Self {
            recipient: Recipient::Results(sink.to_string()),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rank::rank_for_points;

    #[test]
    fn test_event_json_tag() {
        let event = GameEvent::Countdown { remaining: 2 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"kind":"countdown","remaining":2}"#);
    }

    #[test]
    fn test_rank_changed_json() {
        let event = GameEvent::RankChanged {
            user_id: "alice".into(),
            from: rank_for_points(119),
            to: rank_for_points(120),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"rank_changed""#));
        assert!(json.contains(r#""user_id":"alice""#));
        assert!(json.contains(r#""division":"II""#));
    }

    #[test]
    fn test_dispatch_helpers() {
        let d = Dispatch::results("duel-results", GameEvent::Countdown { remaining: 1 });
        assert_eq!(d.recipient, Recipient::Results("duel-results".to_string()));

        let d = Dispatch::user(&"bob".into(), GameEvent::Countdown { remaining: 1 });
        assert_eq!(d.recipient, Recipient::User("bob".into()));
    }
}
