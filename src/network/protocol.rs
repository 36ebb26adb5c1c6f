//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text message tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::core::glyph::Direction;
use crate::engine::error::EngineError;
use crate::engine::stats::{LeaderboardEntry, StatsReport};
use crate::game::events::GameEvent;
use crate::game::session::UserId;

/// Leaderboard length when the client does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Longest leaderboard a client may request.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a user. Must come first.
    Identify(IdentifyRequest),

    /// Start a single-player round.
    StartSolo,

    /// Guess a symbol in the live round.
    Guess {
        /// Encoded symbol.
        symbol: String,
    },

    /// Abandon the live round.
    Cancel,

    /// Challenge another user.
    IssueChallenge {
        /// User to challenge.
        opponent_id: UserId,
        /// Channel the challenge was issued from.
        #[serde(default)]
        channel: Option<String>,
    },

    /// Accept or decline a challenge.
    RespondChallenge {
        /// Issuer of the challenge.
        challenger_id: UserId,
        /// Accept or decline.
        accept: bool,
    },

    /// Encode or decode text.
    Translate {
        /// Input text.
        text: String,
        /// Encode or decode.
        direction: Direction,
    },

    /// Stats for a user, the caller if omitted.
    Stats {
        /// User to look up.
        #[serde(default)]
        user_id: Option<UserId>,
    },

    /// Top users by points.
    Leaderboard {
        /// Rows wanted.
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Subscribe this connection to duel results.
    WatchResults,

    /// Keepalive.
    Ping {
        /// Client time, echoed back.
        timestamp: u64,
    },
}

/// Identification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyRequest {
    /// Caller-chosen user id. Trusted as given.
    pub user_id: UserId,
    /// Account name, defaults to the id.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name, defaults to the username.
    #[serde(default)]
    pub display_name: Option<String>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Identification accepted.
    Identified {
        /// Bound user.
        user_id: UserId,
        /// Server version.
        server_version: String,
    },

    /// Game or challenge event.
    Event(GameEvent),

    /// Translation result.
    Translation {
        /// Translated text.
        text: String,
    },

    /// Stats for one user.
    Stats(StatsReport),

    /// Leaderboard rows.
    Leaderboard {
        /// Rows, best first.
        entries: Vec<LeaderboardEntry>,
    },

    /// Pong response.
    Pong {
        /// Client time from the ping.
        timestamp: u64,
        /// Server time in milliseconds.
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error payload.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Operation needs a prior identify.
    NotIdentified,
    /// Malformed message.
    InvalidInput,
    /// Game or challenge already in progress.
    AlreadyActive,
    /// No live round.
    NoActiveSession,
    /// No such challenge.
    NotFound,
    /// Not allowed to answer this challenge.
    Forbidden,
    /// Tried to challenge yourself.
    SelfChallenge,
    /// Opponent could not be reached.
    OpponentUnavailable,
    /// Too many requests.
    RateLimited,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&EngineError> for ServerError {
    fn from(err: &EngineError) -> Self {
        let code = match err {
            EngineError::AlreadyActive(_) => ErrorCode::AlreadyActive,
            EngineError::NoActiveSession(_) => ErrorCode::NoActiveSession,
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::Forbidden(_) => ErrorCode::Forbidden,
            EngineError::SelfChallenge => ErrorCode::SelfChallenge,
            EngineError::OpponentUnavailable(_) => ErrorCode::OpponentUnavailable,
            EngineError::Stats(_) => ErrorCode::InternalError,
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Allowed before identify.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Identify(_) | Self::Ping { .. })
    }

    /// Subject to the per-user cooldown.
    pub fn is_rate_limited(&self) -> bool {
        !matches!(
            self,
            Self::Identify(_) | Self::Ping { .. } | Self::WatchResults
        )
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Error frame.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ServerError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parse() {
        let msg = ClientMessage::from_json(r#"{"type":"guess","symbol":"ᓵ ᒷ"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Guess { symbol } if symbol == "ᓵ ᒷ"));

        let msg = ClientMessage::from_json(
            r#"{"type":"respond_challenge","challenger_id":"alice","accept":false}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::RespondChallenge { accept: false, .. }
        ));

        let msg = ClientMessage::from_json(r#"{"type":"leaderboard"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Leaderboard { limit: None }));
    }

    #[test]
    fn test_identify_defaults() {
        let msg = ClientMessage::from_json(r#"{"type":"identify","user_id":"42"}"#).unwrap();
        match msg {
            ClientMessage::Identify(req) => {
                assert_eq!(req.user_id.as_str(), "42");
                assert!(req.username.is_none());
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_translate_direction() {
        let msg = ClientMessage::from_json(
            r#"{"type":"translate","text":"hi","direction":"decode"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Translate {
                direction: Direction::Decode,
                ..
            }
        ));
    }

    #[test]
    fn test_event_frame_carries_both_tags() {
        let msg = ServerMessage::Event(GameEvent::Countdown { remaining: 3 });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"event""#));
        assert!(json.contains(r#""kind":"countdown""#));

        let parsed = ServerMessage::from_json(&json).unwrap();
        assert!(matches!(
            parsed,
            ServerMessage::Event(GameEvent::Countdown { remaining: 3 })
        ));
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::error(ErrorCode::RateLimited, "slow down");
        let json = msg.to_json().unwrap();
        assert!(json.contains("rate_limited"));

        let err = ServerError::from(&EngineError::SelfChallenge);
        assert_eq!(err.code, ErrorCode::SelfChallenge);
    }

    #[test]
    fn test_gating_rules() {
        let ping = ClientMessage::Ping { timestamp: 1 };
        assert!(ping.is_anonymous());
        assert!(!ping.is_rate_limited());
        assert!(!ClientMessage::StartSolo.is_anonymous());
        assert!(ClientMessage::StartSolo.is_rate_limited());
        assert!(!ClientMessage::WatchResults.is_rate_limited());
    }
}
