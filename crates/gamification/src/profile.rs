//! A user's gamification state and the rules that change it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GamificationError;
use crate::progress::{Progress, WeeklyStats};

/// Experience needed to advance one level
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Experience granted alongside every new achievement
pub const ACHIEVEMENT_BONUS_EXPERIENCE: u64 = 25;

/// Cap on experience granted for a single task completion
const MAX_COMPLETION_EXPERIENCE: u64 = 50;

/// Level reached with `experience` points; level 1 starts at zero
pub fn level_for_experience(experience: u64) -> u32 {
    u32::try_from(experience / EXPERIENCE_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Experience and points granted for one reward event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub experience: u64,
    pub points: u64,
}

impl Reward {
    /// Points are always half the experience, rounded down
    pub fn from_experience(experience: u64) -> Self {
        Self {
            experience,
            points: experience / 2,
        }
    }
}

/// Reward for completing a task estimated at `estimated_minutes`
///
/// Ten experience for finishing, one more per ten estimated minutes, capped
/// at fifty.
pub fn completion_reward(estimated_minutes: u32) -> Reward {
    let experience = (u64::from(estimated_minutes) / 10 + 10).min(MAX_COMPLETION_EXPERIENCE);
    Reward::from_experience(experience)
}

/// Outcome of adding experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUp {
    pub leveled_up: bool,
    pub new_level: u32,
}

/// An earned achievement or badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

/// Request to grant an achievement or badge
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AwardGrant {
    #[serde(alias = "achievementId", alias = "badgeId")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl AwardGrant {
    fn into_award(self, now: DateTime<Utc>) -> Result<Award, GamificationError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(GamificationError::MissingField("id"));
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(GamificationError::MissingField("name"));
        }

        Ok(Award {
            id,
            name,
            description: self.description,
            icon: self.icon,
            earned_at: now,
        })
    }
}

/// Result of granting an achievement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementAward {
    pub achievement: Award,
    pub bonus_experience: u64,
    pub bonus_points: u64,
    pub level_up: LevelUp,
}

/// Gamification state kept on every user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub level: u32,
    pub experience: u64,
    pub points: u64,
    /// Number of tasks completed since the streak started
    pub streak: u32,
    #[serde(default)]
    pub achievements: Vec<Award>,
    #[serde(default)]
    pub badges: Vec<Award>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            points: 0,
            streak: 0,
            achievements: Vec::new(),
            badges: Vec::new(),
        }
    }
}

impl Profile {
    /// Add experience, raising the level if a threshold was crossed.
    /// The level never goes down.
    pub fn add_experience(&mut self, amount: u64) -> LevelUp {
        self.experience = self.experience.saturating_add(amount);
        let level = level_for_experience(self.experience);

        if level > self.level {
            self.level = level;
            LevelUp {
                leveled_up: true,
                new_level: level,
            }
        } else {
            LevelUp {
                leveled_up: false,
                new_level: self.level,
            }
        }
    }

    /// Apply a task completion reward and extend the streak
    pub fn record_completion(&mut self, reward: Reward) -> LevelUp {
        let level_up = self.add_experience(reward.experience);
        self.points = self.points.saturating_add(reward.points);
        self.streak = self.streak.saturating_add(1);
        level_up
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.iter().any(|b| b.id == id)
    }

    /// Grant an achievement once, with its experience bonus
    pub fn award_achievement(
        &mut self,
        grant: AwardGrant,
        now: DateTime<Utc>,
    ) -> Result<AchievementAward, GamificationError> {
        let award = grant.into_award(now)?;
        if self.has_achievement(&award.id) {
            return Err(GamificationError::AchievementAlreadyEarned(award.id));
        }

        self.achievements.push(award.clone());

        let bonus = Reward::from_experience(ACHIEVEMENT_BONUS_EXPERIENCE);
        let level_up = self.add_experience(bonus.experience);
        self.points = self.points.saturating_add(bonus.points);

        Ok(AchievementAward {
            achievement: award,
            bonus_experience: bonus.experience,
            bonus_points: bonus.points,
            level_up,
        })
    }

    /// Grant a badge once; badges carry no experience
    pub fn award_badge(
        &mut self,
        grant: AwardGrant,
        now: DateTime<Utc>,
    ) -> Result<Award, GamificationError> {
        let award = grant.into_award(now)?;
        if self.has_badge(&award.id) {
            return Err(GamificationError::BadgeAlreadyEarned(award.id));
        }

        self.badges.push(award.clone());
        Ok(award)
    }

    /// Percentage of the way from the current level to the next one
    pub fn progress_to_next_level(&self) -> u8 {
        let level_floor = u64::from(self.level.saturating_sub(1)) * EXPERIENCE_PER_LEVEL;
        let into_level = self.experience.saturating_sub(level_floor) as f64;
        let percent = (into_level / EXPERIENCE_PER_LEVEL as f64 * 100.0).round();
        percent.clamp(0.0, 100.0) as u8
    }

    /// Summary shown on the achievements page
    pub fn progress(&self, weekly_stats: WeeklyStats) -> Progress {
        Progress {
            current_level: self.level,
            experience: self.experience,
            progress_to_next_level: self.progress_to_next_level(),
            points: self.points,
            streak: self.streak,
            achievements: self.achievements.len(),
            badges: self.badges.len(),
            weekly_stats,
        }
    }
}
