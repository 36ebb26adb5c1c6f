//! Duel Orchestrator
//!
//! Owns the session and challenge stores behind one lock and drives every
//! inbound operation against them.
//!
//! Each operation runs in three steps:
//! 1. take the lock, validate, mutate both stores and stats
//! 2. collect the resulting [`Dispatch`]es
//! 3. release the lock and hand the dispatches to the [`Notifier`]
//!
//! A duel resolution therefore removes both halves before anyone is told,
//! and no notification is ever sent while the lock is held.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::glyph::{self, Direction};
use crate::core::rng::{derive_round_seed, entropy_seed, DeterministicRng};
use crate::engine::challenge::{Challenge, ChallengeStore};
use crate::engine::error::EngineError;
use crate::engine::notify::Notifier;
use crate::engine::stats::{leaderboard, LeaderboardEntry, StatsGateway, StatsRecord, StatsReport};
use crate::engine::store::SessionStore;
use crate::engine::EngineConfig;
use crate::game::events::{Dispatch, GameEvent, RoundKind};
use crate::game::rank::rank_for_points;
use crate::game::scoring::{
    duel_default_win_award, duel_exhaustion_penalty, duel_loser_forfeit, points_for_try,
};
use crate::game::session::{GuessVerdict, Identity, Session, SessionMode, UserId};
use crate::game::words::{RoundDraw, WordPool};

/// Mutable engine state. Only ever touched with the engine lock held.
#[derive(Debug)]
struct EngineState {
    sessions: SessionStore,
    challenges: ChallengeStore,
    /// Rounds drawn so far; feeds the per-round seed.
    rounds: u64,
}

/// The game and duel session engine.
pub struct DuelEngine {
    config: EngineConfig,
    words: WordPool,
    seed: u64,
    stats: Arc<dyn StatsGateway>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<EngineState>,
}

impl DuelEngine {
    /// Create an engine.
    pub fn new(
        config: EngineConfig,
        words: WordPool,
        stats: Arc<dyn StatsGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(entropy_seed);
        info!(
            seed,
            words = words.len(),
            pool_size = config.pool_size,
            "Duel engine ready"
        );

        Self {
            config,
            words,
            seed,
            stats,
            notifier,
            state: Mutex::new(EngineState {
                sessions: SessionStore::new(),
                challenges: ChallengeStore::new(),
                rounds: 0,
            }),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Start a single-player round.
    pub async fn start_solo(&self, identity: &Identity) -> Result<GameEvent, EngineError> {
        let user_id = &identity.user_id;
        let mut state = self.state.lock().await;

        if state.sessions.contains(user_id) || state.challenges.involves(user_id) {
            debug!(user_id = %user_id, "Solo start rejected, already active");
            return Err(EngineError::AlreadyActive(user_id.clone()));
        }

        let draw = self.draw_round(&mut state, &[user_id.as_str()]);
        let session = Session::new(
            Uuid::new_v4(),
            identity.clone(),
            &draw,
            self.config.max_tries,
            Instant::now(),
            SessionMode::Solo,
        );
        let started = game_started(&session);
        info!(user_id = %user_id, round_id = %session.round_id, "Solo round started");
        state.sessions.insert(session)?;

        Ok(started)
    }

    /// Apply a guess to the caller's live session.
    pub async fn guess(&self, user_id: &UserId, symbol: &str) -> Result<GameEvent, EngineError> {
        let now = Instant::now();
        let mut dispatches = Vec::new();

        let outcome = {
            let mut state = self.state.lock().await;
            let session = state.sessions.get_mut(user_id)?;

            match session.apply_guess(symbol, self.config.max_tries) {
                GuessVerdict::Incorrect { tries_left } => GameEvent::Incorrect {
                    symbol: symbol.to_string(),
                    word: self.words.word_for_symbol(symbol).map(str::to_string),
                    tries_left,
                    guessed_symbols: session.guessed_symbols.clone(),
                },
                GuessVerdict::Correct { tries_used } => {
                    let session = state
                        .sessions
                        .remove(user_id)
                        .ok_or_else(|| EngineError::NoActiveSession(user_id.clone()))?;
                    let opponent = take_opponent(&mut state.sessions, &session);
                    self.resolve_win(session, opponent, tries_used, now, &mut dispatches)
                }
                GuessVerdict::Exhausted => {
                    let session = state
                        .sessions
                        .remove(user_id)
                        .ok_or_else(|| EngineError::NoActiveSession(user_id.clone()))?;
                    let opponent = take_opponent(&mut state.sessions, &session);
                    self.resolve_loss(session, opponent, now, &mut dispatches)
                }
            }
        };

        self.deliver(dispatches);
        Ok(outcome)
    }

    /// Abandon the caller's session. Not scored. A duel takes the opponent's
    /// half down with it.
    pub async fn cancel(&self, user_id: &UserId) -> Result<GameEvent, EngineError> {
        let mut dispatches = Vec::new();

        let round_id = {
            let mut state = self.state.lock().await;
            let session = state
                .sessions
                .remove(user_id)
                .ok_or_else(|| EngineError::NoActiveSession(user_id.clone()))?;

            if let Some(opponent) = take_opponent(&mut state.sessions, &session) {
                dispatches.push(Dispatch::user(
                    opponent.user_id(),
                    GameEvent::DuelCancelled {
                        cancelled_by: user_id.clone(),
                    },
                ));
            }
            info!(user_id = %user_id, round_id = %session.round_id, duel = session.is_duel(), "Session cancelled");
            session.round_id
        };

        self.deliver(dispatches);
        Ok(GameEvent::Cancelled { round_id })
    }

    /// Copy of a user's live session.
    pub async fn session(&self, user_id: &UserId) -> Option<Session> {
        self.state.lock().await.sessions.get(user_id).cloned()
    }

    /// Live session count.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    // =========================================================================
    // CHALLENGES
    // =========================================================================

    /// Challenge another user to a duel.
    ///
    /// The opponent is told immediately. If that fails the challenge is
    /// withdrawn. Otherwise it expires after the configured TTL unless
    /// answered first.
    pub async fn issue_challenge(
        self: &Arc<Self>,
        challenger: &Identity,
        opponent: &UserId,
        origin_channel: Option<String>,
    ) -> Result<GameEvent, EngineError> {
        let challenger_id = &challenger.user_id;
        if challenger_id == opponent {
            return Err(EngineError::SelfChallenge);
        }

        let challenge_id = Uuid::new_v4();
        {
            let mut state = self.state.lock().await;
            for party in [challenger_id, opponent] {
                if state.sessions.contains(party) || state.challenges.involves(party) {
                    debug!(challenger_id = %challenger_id, busy = %party, "Challenge rejected");
                    return Err(EngineError::AlreadyActive(party.clone()));
                }
            }
            state.challenges.insert(Challenge {
                id: challenge_id,
                challenger: challenger.clone(),
                opponent: opponent.clone(),
                origin_channel,
                results_sink: self.config.results_sink.clone(),
                created_at: Utc::now(),
                expiry: None,
            })?;
        }

        let expires_in_seconds = self.config.challenge_ttl.as_secs();
        let received = Dispatch::user(
            opponent,
            GameEvent::ChallengeReceived {
                challenger_id: challenger_id.clone(),
                challenger_name: challenger.display_name.clone(),
                expires_in_seconds,
            },
        );
        if let Err(e) = self.notifier.deliver(&received.recipient, &received.event) {
            warn!(challenger_id = %challenger_id, opponent_id = %opponent, error = %e, "Challenge not delivered, withdrawing");
            self.state
                .lock()
                .await
                .challenges
                .remove_if_current(challenger_id, challenge_id);
            return Err(EngineError::OpponentUnavailable(opponent.clone()));
        }

        let engine = Arc::clone(self);
        let expiring = challenger_id.clone();
        let ttl = self.config.challenge_ttl;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            engine.expire_challenge(&expiring, challenge_id).await;
        });
        self.state
            .lock()
            .await
            .challenges
            .attach_expiry(challenger_id, challenge_id, timer.abort_handle());

        info!(challenger_id = %challenger_id, opponent_id = %opponent, "Challenge issued");
        Ok(GameEvent::ChallengeIssued {
            challenger_id: challenger_id.clone(),
            opponent_id: opponent.clone(),
            expires_in_seconds,
        })
    }

    /// Answer a pending challenge. Only the challenged user may answer.
    ///
    /// Accepting pairs both sessions immediately; they become playable once
    /// the countdown has run.
    pub async fn respond_challenge(
        self: &Arc<Self>,
        challenger_id: &UserId,
        responder: &Identity,
        accept: bool,
    ) -> Result<GameEvent, EngineError> {
        let responder_id = &responder.user_id;
        let mut dispatches = Vec::new();
        let mut countdown = None;

        let reply = {
            let mut state = self.state.lock().await;
            let challenge = state
                .challenges
                .get(challenger_id)
                .ok_or_else(|| EngineError::NotFound(challenger_id.clone()))?;
            if &challenge.opponent != responder_id {
                debug!(challenger_id = %challenger_id, responder_id = %responder_id, "Response forbidden");
                return Err(EngineError::Forbidden(responder_id.clone()));
            }
            if accept
                && (state.sessions.contains(challenger_id) || state.sessions.contains(responder_id))
            {
                return Err(EngineError::AlreadyActive(responder_id.clone()));
            }

            let mut challenge = state
                .challenges
                .remove(challenger_id)
                .ok_or_else(|| EngineError::NotFound(challenger_id.clone()))?;
            challenge.cancel_expiry();

            if accept {
                let ticks = self.config.countdown_ticks;
                let draw = self.draw_round(
                    &mut state,
                    &[challenger_id.as_str(), responder_id.as_str()],
                );
                let round_id = Uuid::new_v4();
                let started_at = Instant::now() + self.config.countdown_duration();

                let duel_half = |identity: Identity, opponent: &UserId| {
                    Session::new(
                        round_id,
                        identity,
                        &draw,
                        self.config.max_tries,
                        started_at,
                        SessionMode::Duel {
                            opponent: opponent.clone(),
                            results_sink: challenge.results_sink.clone(),
                        },
                    )
                };
                state.sessions.insert_pair(
                    duel_half(challenge.challenger.clone(), responder_id),
                    duel_half(responder.clone(), challenger_id),
                )?;

                let accepted = GameEvent::ChallengeAccepted {
                    challenger_id: challenger_id.clone(),
                    opponent_id: responder_id.clone(),
                    countdown_ticks: ticks,
                };
                dispatches.push(Dispatch::user(challenger_id, accepted.clone()));
                info!(challenger_id = %challenger_id, opponent_id = %responder_id, round_id = %round_id, "Challenge accepted");
                countdown = Some(round_id);
                accepted
            } else {
                let declined = GameEvent::ChallengeDeclined {
                    challenger_id: challenger_id.clone(),
                    opponent_id: responder_id.clone(),
                };
                dispatches.push(Dispatch::user(challenger_id, declined.clone()));
                info!(challenger_id = %challenger_id, opponent_id = %responder_id, "Challenge declined");
                declined
            }
        };

        self.deliver(dispatches);
        if let Some(round_id) = countdown {
            self.spawn_countdown(round_id, challenger_id.clone(), responder_id.clone());
        }
        Ok(reply)
    }

    /// Drop a challenge whose TTL ran out. A no-op if the challenge with this
    /// id was already accepted, declined or withdrawn.
    pub async fn expire_challenge(&self, challenger_id: &UserId, challenge_id: Uuid) -> bool {
        let expired = self
            .state
            .lock()
            .await
            .challenges
            .remove_if_current(challenger_id, challenge_id);

        let Some(challenge) = expired else {
            debug!(challenger_id = %challenger_id, "Stale expiry ignored");
            return false;
        };

        info!(challenger_id = %challenger_id, opponent_id = %challenge.opponent, "Challenge expired");
        let event = GameEvent::ChallengeExpired {
            challenger_id: challenger_id.clone(),
            opponent_id: challenge.opponent.clone(),
        };
        self.deliver(vec![
            Dispatch::user(challenger_id, event.clone()),
            Dispatch::user(&challenge.opponent, event),
        ]);
        true
    }

    /// Pending challenge count.
    pub async fn challenge_count(&self) -> usize {
        self.state.lock().await.challenges.len()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Translate text. Refused while the caller has a live session.
    pub async fn translate(
        &self,
        user_id: &UserId,
        text: &str,
        direction: Direction,
    ) -> Result<String, EngineError> {
        if self.state.lock().await.sessions.contains(user_id) {
            return Err(EngineError::AlreadyActive(user_id.clone()));
        }
        Ok(glyph::translate(text, direction))
    }

    /// Stats for one user.
    pub fn stats(&self, user_id: &UserId) -> Result<StatsReport, EngineError> {
        let record = self.stats.get(user_id)?;
        Ok(StatsReport::new(user_id.clone(), &record))
    }

    /// Top users by points.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, EngineError> {
        Ok(leaderboard(self.stats.all()?, limit))
    }

    /// Refresh the stored names of a known user.
    pub fn refresh_identity(&self, identity: &Identity) -> Result<(), EngineError> {
        self.stats.refresh_identity(identity)?;
        Ok(())
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    fn resolve_win(
        &self,
        session: Session,
        opponent: Option<Session>,
        tries_used: u32,
        now: Instant,
        dispatches: &mut Vec<Dispatch>,
    ) -> GameEvent {
        let elapsed = session.elapsed(now).as_secs_f64();
        let user_id = session.user_id().clone();

        // Both totals are read before either is written.
        let before = self.read_stats(&user_id);
        let rival_id = session.opponent().cloned();
        let rival_before = rival_id.as_ref().map(|id| self.read_stats(id));

        let points = match &rival_before {
            Some(rival) => points_for_try(tries_used, elapsed, true, before.points, rival.points),
            None => points_for_try(tries_used, elapsed, false, 0, 0),
        };
        let total = self.settle(&session.identity, &before, i64::from(points), true, dispatches);

        if let (Some(opponent), Some(rival_before)) = (opponent, rival_before) {
            let forfeit = duel_loser_forfeit(points);
            self.settle(
                &opponent.identity,
                &rival_before,
                -i64::from(forfeit),
                false,
                dispatches,
            );
            dispatches.push(Dispatch::user(
                opponent.user_id(),
                GameEvent::OpponentSolved {
                    winner_id: user_id.clone(),
                    correct_symbol: session.target_symbol.clone(),
                    correct_word: session.target.clone(),
                    points_lost: forfeit,
                },
            ));
            if let SessionMode::Duel { results_sink, .. } = &session.mode {
                dispatches.push(Dispatch::results(
                    results_sink,
                    GameEvent::DuelResult {
                        winner_id: user_id.clone(),
                        loser_id: opponent.user_id().clone(),
                        points_gained: points,
                        points_lost: forfeit,
                        word: session.target.clone(),
                        elapsed_seconds: elapsed,
                    },
                ));
            }
        }

        info!(user_id = %user_id, round_id = %session.round_id, points, tries_used, "Round won");
        GameEvent::Won {
            symbol: session.target_symbol,
            points,
            elapsed_seconds: elapsed,
            total_points: total,
            rank: rank_for_points(total),
        }
    }

    fn resolve_loss(
        &self,
        session: Session,
        opponent: Option<Session>,
        now: Instant,
        dispatches: &mut Vec<Dispatch>,
    ) -> GameEvent {
        let user_id = session.user_id().clone();
        let before = self.read_stats(&user_id);
        let rival_id = session.opponent().cloned();
        let rival_before = rival_id.as_ref().map(|id| self.read_stats(id));

        let penalty = match &rival_before {
            Some(rival) => duel_exhaustion_penalty(before.points, rival.points),
            None => self.config.solo_loss_penalty,
        };
        self.settle(&session.identity, &before, -i64::from(penalty), false, dispatches);

        if let (Some(opponent), Some(rival_before)) = (opponent, rival_before) {
            let award = duel_default_win_award(penalty);
            self.settle(
                &opponent.identity,
                &rival_before,
                i64::from(award),
                true,
                dispatches,
            );
            dispatches.push(Dispatch::user(
                opponent.user_id(),
                GameEvent::OpponentExhausted {
                    loser_id: user_id.clone(),
                    correct_symbol: session.target_symbol.clone(),
                    correct_word: session.target.clone(),
                    points_gained: award,
                },
            ));
            if let SessionMode::Duel { results_sink, .. } = &session.mode {
                dispatches.push(Dispatch::results(
                    results_sink,
                    GameEvent::DuelResult {
                        winner_id: opponent.user_id().clone(),
                        loser_id: user_id.clone(),
                        points_gained: award,
                        points_lost: penalty,
                        word: session.target.clone(),
                        elapsed_seconds: session.elapsed(now).as_secs_f64(),
                    },
                ));
            }
        }

        info!(user_id = %user_id, round_id = %session.round_id, penalty, "Round lost");
        GameEvent::Lost {
            correct_symbol: session.target_symbol,
            correct_word: session.target,
            points_lost: penalty,
            guessed_symbols: session.guessed_symbols,
        }
    }

    /// Read a total for scoring. A failed read scores against zero.
    fn read_stats(&self, user_id: &UserId) -> StatsRecord {
        self.stats.get(user_id).unwrap_or_else(|e| {
            error!(user_id = %user_id, error = %e, "Stats read failed");
            StatsRecord::default()
        })
    }

    /// Apply one participant's delta and queue a rank change if it moved.
    /// Returns the new total.
    fn settle(
        &self,
        identity: &Identity,
        before: &StatsRecord,
        delta: i64,
        won: bool,
        dispatches: &mut Vec<Dispatch>,
    ) -> i64 {
        let user_id = &identity.user_id;
        let total = match self.stats.apply_delta(user_id, delta, won, identity) {
            Ok(record) => record.points,
            Err(e) => {
                error!(user_id = %user_id, delta, error = %e, "Stats update failed");
                before.points.saturating_add(delta)
            }
        };

        let from = rank_for_points(before.points);
        let to = rank_for_points(total);
        if from != to {
            info!(user_id = %user_id, from = %from, to = %to, "Rank changed");
            dispatches.push(Dispatch::user(
                user_id,
                GameEvent::RankChanged {
                    user_id: user_id.clone(),
                    from,
                    to,
                },
            ));
        }
        total
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn draw_round(&self, state: &mut EngineState, participants: &[&str]) -> RoundDraw {
        state.rounds += 1;
        let seed = derive_round_seed(self.seed, state.rounds, participants);
        self.words
            .draw(&mut DeterministicRng::new(seed), self.config.pool_size)
    }

    /// Tick both duelists down, then show them the round. Stops as soon as
    /// either half is gone.
    fn spawn_countdown(self: &Arc<Self>, round_id: Uuid, a: UserId, b: UserId) {
        let engine = Arc::clone(self);
        let ticks = self.config.countdown_ticks;
        let interval = self.config.countdown_interval;

        tokio::spawn(async move {
            for remaining in (1..=ticks).rev() {
                if engine.live_duel(round_id, &a, &b).await.is_none() {
                    debug!(round_id = %round_id, "Duel ended during countdown");
                    return;
                }
                let tick = GameEvent::Countdown { remaining };
                engine.deliver(vec![
                    Dispatch::user(&a, tick.clone()),
                    Dispatch::user(&b, tick),
                ]);
                tokio::time::sleep(interval).await;
            }

            match engine.live_duel(round_id, &a, &b).await {
                Some(started) => {
                    info!(round_id = %round_id, "Duel started");
                    engine.deliver(started);
                }
                None => debug!(round_id = %round_id, "Duel ended during countdown"),
            }
        });
    }

    /// `GameStarted` for both halves, if both are still in `round_id`.
    async fn live_duel(&self, round_id: Uuid, a: &UserId, b: &UserId) -> Option<Vec<Dispatch>> {
        let state = self.state.lock().await;
        let sa = state.sessions.get(a).filter(|s| s.round_id == round_id)?;
        let sb = state.sessions.get(b).filter(|s| s.round_id == round_id)?;
        Some(vec![
            Dispatch::user(a, game_started(sa)),
            Dispatch::user(b, game_started(sb)),
        ])
    }

    /// Hand dispatches to the notifier. Failures are logged only.
    fn deliver(&self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            if let Err(e) = self.notifier.deliver(&dispatch.recipient, &dispatch.event) {
                warn!(recipient = ?dispatch.recipient, error = %e, "Notification dropped");
            }
        }
    }
}

/// Remove the other half of a duel, if it is still the same round.
fn take_opponent(sessions: &mut SessionStore, session: &Session) -> Option<Session> {
    let opponent = session.opponent()?;
    match sessions.get(opponent) {
        Some(other) if other.round_id == session.round_id => sessions.remove(opponent),
        _ => None,
    }
}

fn game_started(session: &Session) -> GameEvent {
    GameEvent::GameStarted {
        round_id: session.round_id,
        mode: if session.is_duel() {
            RoundKind::Duel
        } else {
            RoundKind::Solo
        },
        target_hint: session.target.clone(),
        options: session.options.clone(),
        tries_left: session.tries_remaining,
    }
}
