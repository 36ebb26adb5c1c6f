//! Session Engine
//!
//! Stateful half of the game: live sessions, pending challenges, duel
//! resolution and the boundaries to stats storage and notification.
//!
//! ## Module Structure
//!
//! - `store`: live sessions, one per user
//! - `challenge`: pending duel invitations, one per challenger
//! - `orchestrator`: [`DuelEngine`], the only entry point that mutates state
//! - `stats`: stats gateway trait and its memory and file implementations
//! - `notify`: outbound delivery boundary
//! - `error`: engine rejections

pub mod challenge;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod stats;
pub mod store;

use std::time::Duration;

use crate::game::session::MAX_TRIES;
use crate::game::words::DEFAULT_POOL_SIZE;

// Re-export key types
pub use error::EngineError;
pub use notify::{Notifier, NotifyError};
pub use orchestrator::DuelEngine;
pub use stats::{
    JsonFileStats, LeaderboardEntry, MemoryStats, StatsError, StatsGateway, StatsRecord,
    StatsReport,
};

/// Default results sink name.
pub const DEFAULT_RESULTS_SINK: &str = "duel-results";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tries per session.
    pub max_tries: u32,
    /// Words offered per round.
    pub pool_size: usize,
    /// How long a challenge waits for an answer.
    pub challenge_ttl: Duration,
    /// Countdown ticks before a duel is shown.
    pub countdown_ticks: u32,
    /// Time between countdown ticks.
    pub countdown_interval: Duration,
    /// Points lost on a failed solo round.
    pub solo_loss_penalty: u32,
    /// Fixed RNG seed. `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Where duel results are announced.
    pub results_sink: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tries: MAX_TRIES,
            pool_size: DEFAULT_POOL_SIZE,
            challenge_ttl: Duration::from_secs(60),
            countdown_ticks: 3,
            countdown_interval: Duration::from_secs(1),
            solo_loss_penalty: 5,
            seed: None,
            results_sink: DEFAULT_RESULTS_SINK.to_string(),
        }
    }
}

impl EngineConfig {
    /// Time from accept until a duel is playable.
    pub fn countdown_duration(&self) -> Duration {
        self.countdown_interval * self.countdown_ticks
    }
}
