//! Per-user cooldown gate.
//!
//! Each user must wait `min_interval` between rate-limited requests. A
//! request inside the window is rejected, not delayed, and does not move
//! the window.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::game::session::UserId;

/// Cooldown tracker keyed by user.
#[derive(Debug)]
pub struct Cooldown {
    min_interval: Duration,
    last_request: Mutex<BTreeMap<UserId, Instant>>,
}

impl Cooldown {
    /// Gate with the given minimum spacing. Zero disables it.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(BTreeMap::new()),
        }
    }

    /// Configured spacing.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Admit a request, or return how long the user still has to wait.
    pub fn check(&self, user_id: &UserId) -> Result<(), Duration> {
        if self.min_interval.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = last.get(user_id) {
            let elapsed = now.saturating_duration_since(*previous);
            if elapsed < self.min_interval {
                return Err(self.min_interval - elapsed);
            }
        }
        last.insert(user_id.clone(), now);
        Ok(())
    }

    /// Drop entries older than the window.
    pub fn prune(&self) {
        let now = Instant::now();
        let window = self.min_interval;
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, at| now.saturating_duration_since(*at) < window);
    }

    /// Tracked users.
    pub fn len(&self) -> usize {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nobody is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
