//! Ranking users against each other

use serde::{Deserialize, Serialize};

/// Default number of leaderboard rows
pub const DEFAULT_LIMIT: usize = 10;

/// Largest leaderboard a caller may request
pub const MAX_LIMIT: usize = 100;

/// Metric a leaderboard is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    #[default]
    Points,
    Level,
    Streak,
    Tasks,
}

impl LeaderboardKind {
    /// Parse a kind, falling back to points for anything unrecognised
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("level") => LeaderboardKind::Level,
            Some("streak") => LeaderboardKind::Streak,
            Some("tasks") => LeaderboardKind::Tasks,
            _ => LeaderboardKind::Points,
        }
    }
}

impl std::fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardKind::Points => write!(f, "points"),
            LeaderboardKind::Level => write!(f, "level"),
            LeaderboardKind::Streak => write!(f, "streak"),
            LeaderboardKind::Tasks => write!(f, "tasks"),
        }
    }
}

/// Public figures for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub level: u32,
    pub experience: u64,
    pub points: u64,
    pub streak: u32,
    pub completed_tasks: u32,
}

impl LeaderboardEntry {
    fn metric(&self, kind: LeaderboardKind) -> u64 {
        match kind {
            LeaderboardKind::Points => self.points,
            LeaderboardKind::Level => u64::from(self.level),
            LeaderboardKind::Streak => u64::from(self.streak),
            LeaderboardKind::Tasks => u64::from(self.completed_tasks),
        }
    }
}

/// An entry with its 1-based position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Order entries by `kind` descending and keep the top `limit`
///
/// Ties keep their input order. `limit` defaults to 10 and is clamped to
/// `1..=100`.
pub fn rank(
    mut entries: Vec<LeaderboardEntry>,
    kind: LeaderboardKind,
    limit: Option<usize>,
) -> Vec<RankedEntry> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    entries.sort_by(|a, b| b.metric(kind).cmp(&a.metric(kind)));
    entries
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, entry)| RankedEntry { rank: i + 1, entry })
        .collect()
}
