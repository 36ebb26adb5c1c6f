//! Engine errors.

use crate::engine::stats::StatsError;
use crate::game::session::UserId;

/// Rejections returned to the caller. None of them leave the stores in a
/// partially updated state.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// User already has a session or a pending challenge.
    #[error("{0} already has an active game or challenge")]
    AlreadyActive(UserId),

    /// User has no live session.
    #[error("{0} has no active game")]
    NoActiveSession(UserId),

    /// No pending challenge from this challenger.
    #[error("no pending challenge from {0}")]
    NotFound(UserId),

    /// Only the challenged user may answer.
    #[error("{0} cannot respond to this challenge")]
    Forbidden(UserId),

    /// Challenger and opponent are the same user.
    #[error("cannot challenge yourself")]
    SelfChallenge,

    /// A notification could not be delivered.
    #[error("could not reach {0}")]
    OpponentUnavailable(UserId),

    /// Stats could not be read.
    #[error(transparent)]
    Stats(#[from] StatsError),
}
