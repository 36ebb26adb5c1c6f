//! Game Rules
//!
//! Pure rules with no shared state.
//!
//! ## Module Structure
//!
//! - `rank`: points to rank tier
//! - `scoring`: points awarded and deducted per round
//! - `words`: vocabulary and per-round draws
//! - `session`: one user's round and how it absorbs a guess
//! - `events`: outbound results for the presentation layer

pub mod events;
pub mod rank;
pub mod scoring;
pub mod session;
pub mod words;

// Re-export key types
pub use events::{Dispatch, GameEvent, Recipient, RoundKind};
pub use rank::{rank_for_points, Division, Rank, Tier};
pub use scoring::points_for_try;
pub use session::{GuessVerdict, Identity, Session, SessionMode, UserId};
pub use words::{RoundDraw, WordPool};
