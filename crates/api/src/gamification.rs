//! Achievements, badges, leaderboards and progress

use std::sync::Arc;

use accounts::User;
use axum::{extract::State, Json};
use chrono::Utc;
use gamification::{
    rank, AchievementAward, Award, AwardGrant, LeaderboardEntry, LeaderboardKind, Progress,
    RankedEntry, WeeklyStats,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, QueryParams};
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsResponse {
    achievements: Vec<Award>,
    badges: Vec<Award>,
    level: u32,
    experience: u64,
    points: u64,
    streak: u32,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    #[serde(rename = "type")]
    kind: LeaderboardKind,
    leaderboard: Vec<RankedEntry>,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    progress: Progress,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementResponse {
    #[serde(flatten)]
    award: AchievementAward,
    total_experience: u64,
    level: u32,
}

#[derive(Serialize)]
pub struct BadgeResponse {
    badge: Award,
}

fn leaderboard_entry(user: User) -> LeaderboardEntry {
    LeaderboardEntry {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        avatar: user.avatar,
        level: user.gamification.level,
        experience: user.gamification.experience,
        points: user.gamification.points,
        streak: user.gamification.streak,
        completed_tasks: user.stats.completed_tasks,
    }
}

pub async fn achievements(auth: AuthUser) -> Json<AchievementsResponse> {
    let profile = auth.user.gamification;
    Json(AchievementsResponse {
        achievements: profile.achievements,
        badges: profile.badges,
        level: profile.level,
        experience: profile.experience,
        points: profile.points,
        streak: profile.streak,
    })
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    QueryParams(query): QueryParams<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let kind = LeaderboardKind::parse_or_default(query.kind.as_deref());
    let entries = state
        .accounts
        .list_active_users()
        .await?
        .into_iter()
        .map(leaderboard_entry)
        .collect();

    Ok(Json(LeaderboardResponse {
        kind,
        leaderboard: rank(entries, kind, query.limit),
    }))
}

pub async fn progress(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<ProgressResponse>> {
    let tasks = state.tasks.tasks_involving(&auth.id).await?;
    let weekly = WeeklyStats::from_tasks(&tasks, &auth.id, Utc::now());

    Ok(Json(ProgressResponse {
        progress: auth.user.gamification.progress(weekly),
    }))
}

pub async fn award_achievement(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(grant): JsonBody<AwardGrant>,
) -> ApiResult<Json<AchievementResponse>> {
    let now = Utc::now();
    let (user, award) = state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            Ok::<_, ApiError>(user.gamification.award_achievement(grant.clone(), now)?)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("{} earned achievement {}", user.username, award.achievement.id);
    Ok(Json(AchievementResponse {
        award,
        total_experience: user.gamification.experience,
        level: user.gamification.level,
    }))
}

pub async fn award_badge(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(grant): JsonBody<AwardGrant>,
) -> ApiResult<Json<BadgeResponse>> {
    let now = Utc::now();
    let (_, badge) = state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            Ok::<_, ApiError>(user.gamification.award_badge(grant.clone(), now)?)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(BadgeResponse { badge }))
}
