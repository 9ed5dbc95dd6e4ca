//! Experience, levels and rewards for Questlog
//!
//! Everything here is plain arithmetic over a user's [`Profile`]: completing
//! tasks and earning achievements grant experience and points, experience
//! determines the level, and profiles are ranked on leaderboards.

pub mod error;
pub mod leaderboard;
pub mod profile;
pub mod progress;

pub use error::GamificationError;
pub use leaderboard::{rank, LeaderboardEntry, LeaderboardKind, RankedEntry};
pub use profile::{
    completion_reward, level_for_experience, AchievementAward, Award, AwardGrant, LevelUp,
    Profile, Reward, ACHIEVEMENT_BONUS_EXPERIENCE, EXPERIENCE_PER_LEVEL,
};
pub use progress::{Progress, WeeklyStats};
