//! Scoring
//!
//! Every point award and deduction in the game derives from
//! [`points_for_try`]. Loss penalties reuse it with one try and no elapsed
//! time, scaled by the fixed multipliers below.

/// Base points by tries used (1st, 2nd, 3rd).
const BASE_POINTS: [u32; 3] = [12, 8, 5];

/// Solved within this many seconds: x1.5.
const FAST_SECONDS: f64 = 10.0;
/// Solved within this many seconds: x1.25.
const QUICK_SECONDS: f64 = 20.0;

/// Points a duel loser forfeits relative to the winner's award.
pub const DUEL_LOSER_SHARE: f64 = 0.75;
/// Penalty multiplier for a duelist who exhausts their tries.
pub const DUEL_EXHAUSTED_MULTIPLIER: f64 = 1.5;
/// Share of the exhausted duelist's penalty awarded to the opponent.
pub const DUEL_DEFAULT_WIN_SHARE: f64 = 0.5;

/// Compute points for reaching the correct answer.
///
/// - `tries_used`: 1-based attempt that found the answer; anything outside
///   1..=3 scores zero
/// - `elapsed_seconds`: time since the round became playable
/// - `is_duel`: apply the point differential adjustment
/// - `self_points` / `opponent_points`: pre-resolution totals
pub fn points_for_try(
    tries_used: u32,
    elapsed_seconds: f64,
    is_duel: bool,
    self_points: i64,
    opponent_points: i64,
) -> u32 {
    let base = tries_used
        .checked_sub(1)
        .and_then(|i| BASE_POINTS.get(i as usize))
        .copied()
        .unwrap_or(0);

    let mut points = if elapsed_seconds <= FAST_SECONDS {
        scale(base, 1.5)
    } else if elapsed_seconds <= QUICK_SECONDS {
        scale(base, 1.25)
    } else {
        base
    };

    if is_duel {
        let diff = self_points.saturating_sub(opponent_points);
        if diff > 0 {
            // Ahead: award shrinks, never below one point.
            let factor = 1.0 - (diff as f64 / 1000.0).min(0.5);
            points = scale(points, factor).max(1);
        } else if diff < 0 {
            // Behind: award grows, at most doubled.
            let factor = 1.0 + (diff.unsigned_abs() as f64 / 500.0).min(1.0);
            points = scale(points, factor);
        }
    }

    points
}

/// Penalty for a duelist who runs out of tries.
///
/// Tries and time do not matter: the penalty is the one-try, zero-seconds
/// duel award scaled by [`DUEL_EXHAUSTED_MULTIPLIER`].
pub fn duel_exhaustion_penalty(self_points: i64, opponent_points: i64) -> u32 {
    scale(
        points_for_try(1, 0.0, true, self_points, opponent_points),
        DUEL_EXHAUSTED_MULTIPLIER,
    )
}

/// Points the duel loser forfeits when the opponent solves first.
pub fn duel_loser_forfeit(winner_points: u32) -> u32 {
    scale(winner_points, DUEL_LOSER_SHARE)
}

/// Points awarded to the opponent of a duelist who ran out of tries.
pub fn duel_default_win_award(penalty: u32) -> u32 {
    scale(penalty, DUEL_DEFAULT_WIN_SHARE)
}

/// Multiply and floor.
fn scale(points: u32, factor: f64) -> u32 {
    (f64::from(points) * factor).floor() as u32
}
