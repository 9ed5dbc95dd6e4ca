//! Error types for rewards

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GamificationError {
    #[error("Achievement already earned: {0}")]
    AchievementAlreadyEarned(String),

    #[error("Badge already earned: {0}")]
    BadgeAlreadyEarned(String),

    #[error("{0} is required")]
    MissingField(&'static str),
}
