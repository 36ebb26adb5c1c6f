//! Stats Gateway
//!
//! Cumulative points and win/loss counts per user. The engine reads and
//! writes through [`StatsGateway`] and never owns the storage.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::rank::{rank_for_points, Rank};
use crate::game::session::{Identity, UserId};

/// Per-user record. Absent users read as the zero record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    /// Signed point total; may go negative.
    pub points: i64,
    /// Resolved games.
    pub games_played: u32,
    /// Resolved games won.
    pub games_won: u32,
    /// Last known account name.
    #[serde(default)]
    pub username: String,
    /// Last known display name.
    #[serde(default)]
    pub display_name: String,
    /// Last mutation.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatsRecord {
    /// Games lost.
    pub fn games_lost(&self) -> u32 {
        self.games_played.saturating_sub(self.games_won)
    }

    /// Win rate as a rounded percentage.
    pub fn win_rate_percent(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        (f64::from(self.games_won) * 100.0 / f64::from(self.games_played)).round() as u32
    }

    /// Current rank.
    pub fn rank(&self) -> Rank {
        rank_for_points(self.points)
    }
}

/// Stats as shown to one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Whose stats.
    pub user_id: UserId,
    /// Point total.
    pub points: i64,
    /// Resolved games.
    pub games_played: u32,
    /// Games won.
    pub games_won: u32,
    /// Games lost.
    pub games_lost: u32,
    /// Rounded win percentage.
    pub win_rate_percent: u32,
    /// Current rank.
    pub rank: Rank,
}

impl StatsReport {
    /// Report for a record.
    pub fn new(user_id: UserId, record: &StatsRecord) -> Self {
        Self {
            user_id,
            points: record.points,
            games_played: record.games_played,
            games_won: record.games_won,
            games_lost: record.games_lost(),
            win_rate_percent: record.win_rate_percent(),
            rank: record.rank(),
        }
    }
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub position: u32,
    /// User id.
    pub user_id: UserId,
    /// Name to show, falling back to the id.
    pub display_name: String,
    /// Point total.
    pub points: i64,
    /// Games won.
    pub games_won: u32,
    /// Games lost.
    pub games_lost: u32,
    /// Current rank.
    pub rank: Rank,
}

/// Top `limit` users by points, ties broken by user id.
pub fn leaderboard(
    records: Vec<(UserId, StatsRecord)>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut records = records;
    records.sort_by(|(a_id, a), (b_id, b)| b.points.cmp(&a.points).then_with(|| a_id.cmp(b_id)));

    records
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (user_id, record))| LeaderboardEntry {
            position: i as u32 + 1,
            display_name: if record.display_name.is_empty() {
                user_id.to_string()
            } else {
                record.display_name.clone()
            },
            points: record.points,
            games_won: record.games_won,
            games_lost: record.games_lost(),
            rank: record.rank(),
            user_id,
        })
        .collect()
}

/// Stats storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// File I/O failed.
    #[error("stats I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stats file is not valid JSON.
    #[error("stats JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage boundary consumed by the engine.
pub trait StatsGateway: Send + Sync {
    /// Read a user's record; absent users yield the zero record.
    fn get(&self, user_id: &UserId) -> Result<StatsRecord, StatsError>;

    /// Apply one resolved game. Called exactly once per participant per
    /// resolved game. Returns the updated record.
    fn apply_delta(
        &self,
        user_id: &UserId,
        points_delta: i64,
        won: bool,
        identity: &Identity,
    ) -> Result<StatsRecord, StatsError>;

    /// Refresh the stored display identity of an existing record.
    /// Unknown users are left absent.
    fn refresh_identity(&self, identity: &Identity) -> Result<(), StatsError>;

    /// All records.
    fn all(&self) -> Result<Vec<(UserId, StatsRecord)>, StatsError>;
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Stats kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStats {
    records: Mutex<BTreeMap<UserId, StatsRecord>>,
}

impl MemoryStats {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with records.
    pub fn with_records(records: BTreeMap<UserId, StatsRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<UserId, StatsRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> BTreeMap<UserId, StatsRecord> {
        self.lock().clone()
    }
}

impl StatsGateway for MemoryStats {
    fn get(&self, user_id: &UserId) -> Result<StatsRecord, StatsError> {
        Ok(self.lock().get(user_id).cloned().unwrap_or_default())
    }

    fn apply_delta(
        &self,
        user_id: &UserId,
        points_delta: i64,
        won: bool,
        identity: &Identity,
    ) -> Result<StatsRecord, StatsError> {
        let mut records = self.lock();
        let record = records.entry(user_id.clone()).or_default();
        record.points = record.points.saturating_add(points_delta);
        record.games_played += 1;
        if won {
            record.games_won += 1;
        }
        record.username = identity.username.clone();
        record.display_name = identity.display_name.clone();
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    fn refresh_identity(&self, identity: &Identity) -> Result<(), StatsError> {
        if let Some(record) = self.lock().get_mut(&identity.user_id) {
            record.username = identity.username.clone();
            record.display_name = identity.display_name.clone();
        }
        Ok(())
    }

    fn all(&self) -> Result<Vec<(UserId, StatsRecord)>, StatsError> {
        Ok(self.snapshot().into_iter().collect())
    }
}

// =============================================================================
// JSON FILE
// =============================================================================

/// Stats persisted to a JSON file after every mutation.
///
/// Writes go to a sibling temp file which is synced and then renamed over
/// the target, so a crash mid-write leaves the previous file intact.
/// Mutations are serialized from the in-memory update through the rename.
#[derive(Debug)]
pub struct JsonFileStats {
    path: PathBuf,
    inner: MemoryStats,
    write_lock: Mutex<()>,
}

impl JsonFileStats {
    /// Open (or create on first write) the stats file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StatsError> {
        let path = path.into();
        let records = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let records: BTreeMap<UserId, StatsRecord> = serde_json::from_str(&text)?;
            info!(path = %path.display(), users = records.len(), "Loaded stats file");
            records
        } else {
            info!(path = %path.display(), "Stats file not found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            inner: MemoryStats::with_records(records),
            write_lock: Mutex::new(()),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold `write_guard`.
    fn persist(&self) -> Result<(), StatsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Stats persisted");
        Ok(())
    }
}

impl StatsGateway for JsonFileStats {
    fn get(&self, user_id: &UserId) -> Result<StatsRecord, StatsError> {
        self.inner.get(user_id)
    }

    fn apply_delta(
        &self,
        user_id: &UserId,
        points_delta: i64,
        won: bool,
        identity: &Identity,
    ) -> Result<StatsRecord, StatsError> {
        let _guard = self.write_guard();
        let record = self.inner.apply_delta(user_id, points_delta, won, identity)?;
        self.persist()?;
        Ok(record)
    }

    fn refresh_identity(&self, identity: &Identity) -> Result<(), StatsError> {
        let _guard = self.write_guard();
        self.inner.refresh_identity(identity)?;
        self.persist()
    }

    fn all(&self) -> Result<Vec<(UserId, StatsRecord)>, StatsError> {
        self.inner.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn identity(id: &str) -> Identity {
        Identity {
            user_id: id.into(),
            username: format!("{id}_name"),
            display_name: format!("{id} Display"),
        }
    }

    #[test]
    fn test_absent_user_is_zero_record() {
        let stats = MemoryStats::new();
        let record = stats.get(&"ghost".into()).unwrap();
        assert_eq!(record.points, 0);
        assert_eq!(record.games_played, 0);
        assert_eq!(record.win_rate_percent(), 0);
    }

    #[test]
    fn test_apply_delta_accumulates() {
        let stats = MemoryStats::new();
        let alice = identity("alice");

        stats.apply_delta(&alice.user_id, 18, true, &alice).unwrap();
        let record = stats.apply_delta(&alice.user_id, -25, false, &alice).unwrap();

        assert_eq!(record.points, -7);
        assert_eq!(record.games_played, 2);
        assert_eq!(record.games_won, 1);
        assert_eq!(record.games_lost(), 1);
        assert_eq!(record.win_rate_percent(), 50);
        assert_eq!(record.display_name, "alice Display");
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_win_rate_rounds() {
        let record = StatsRecord {
            games_played: 3,
            games_won: 2,
            ..Default::default()
        };
        assert_eq!(record.win_rate_percent(), 67);
    }

    #[test]
    fn test_refresh_identity_only_touches_existing() {
        let stats = MemoryStats::new();
        stats.refresh_identity(&identity("nobody")).unwrap();
        assert!(stats.all().unwrap().is_empty());

        let alice = identity("alice");
        stats.apply_delta(&alice.user_id, 5, true, &alice).unwrap();
        let renamed = Identity {
            display_name: "Alice the Great".to_string(),
            ..alice.clone()
        };
        stats.refresh_identity(&renamed).unwrap();
        assert_eq!(
            stats.get(&alice.user_id).unwrap().display_name,
            "Alice the Great"
        );
    }

    #[test]
    fn test_leaderboard_order_and_limit() {
        let stats = MemoryStats::new();
        for (id, points) in [("carol", 50), ("alice", 120), ("bob", 50), ("dave", -10)] {
            let who = identity(id);
            stats.apply_delta(&who.user_id, points, points > 0, &who).unwrap();
        }

        let board = leaderboard(stats.all().unwrap(), 3);
        let ids: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
        assert_eq!(board[0].position, 1);
        assert_eq!(board[0].display_name, "alice Display");
        assert_eq!(board[0].rank.to_string(), "Iron II");
    }

    #[test]
    fn test_report_from_record() {
        let record = StatsRecord {
            points: 600,
            games_played: 4,
            games_won: 3,
            ..Default::default()
        };
        let report = StatsReport::new("alice".into(), &record);
        assert_eq!(report.games_lost, 1);
        assert_eq!(report.win_rate_percent, 75);
        assert_eq!(report.rank.to_string(), "Gold I");
    }

    #[test]
    fn test_json_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stats.json");

        {
            let stats = JsonFileStats::open(&path).unwrap();
            let bob = identity("bob");
            stats.apply_delta(&bob.user_id, 12, true, &bob).unwrap();
        }

        let reopened = JsonFileStats::open(&path).unwrap();
        let record = reopened.get(&"bob".into()).unwrap();
        assert_eq!(record.points, 12);
        assert_eq!(record.games_won, 1);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"gamesPlayed\": 1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_file_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stats.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(JsonFileStats::open(&path), Err(StatsError::Json(_))));
    }

    #[test]
    fn test_json_file_concurrent_writers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stats.json");
        let stats = Arc::new(JsonFileStats::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    let who = identity(&format!("player{n}"));
                    let mut failures = 0;
                    for _ in 0..50 {
                        failures += stats.apply_delta(&who.user_id, 1, true, &who).is_err() as usize;
                        failures += stats.refresh_identity(&who).is_err() as usize;
                    }
                    failures
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let reopened = JsonFileStats::open(&path).unwrap();
        let total: i64 = reopened.all().unwrap().iter().map(|(_, r)| r.points).sum();
        assert_eq!(total, 400);
    }
}
