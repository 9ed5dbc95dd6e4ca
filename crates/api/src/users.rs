//! Profile, preferences, lookup and stats for the signed-in user

use std::sync::Arc;

use accounts::{Preferences, PreferencesUpdate, UserStats, DEFAULT_SEARCH_LIMIT};
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tasks::TaskStats;

use crate::auth::UserResponse;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, QueryParams};
use crate::views::UserSummary;
use crate::AppState;

#[derive(Serialize)]
pub struct PreferencesResponse {
    preferences: Preferences,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    query: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    users: Vec<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    stats: UserStats,
    task_stats: TaskStats,
}

pub async fn profile(auth: AuthUser) -> Json<UserResponse> {
    crate::auth::me(auth).await
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(update): JsonBody<PreferencesUpdate>,
) -> ApiResult<Json<PreferencesResponse>> {
    let (user, ()) = state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            Ok::<_, ApiError>(user.set_preferences(update.clone())?)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(PreferencesResponse {
        preferences: user.preferences,
    }))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    QueryParams(query): QueryParams<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    // One extra row in case the caller matches their own query
    let found = state
        .accounts
        .search_users(&query.query, DEFAULT_SEARCH_LIMIT + 1)
        .await?;

    let users = found
        .into_iter()
        .filter(|u| u.id.as_ref() != Some(&auth.id))
        .take(DEFAULT_SEARCH_LIMIT)
        .map(UserSummary::from)
        .collect();

    Ok(Json(SearchResponse { users }))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<StatsResponse>> {
    let tasks = state.tasks.tasks_for_user(&auth.id).await?;

    Ok(Json(StatsResponse {
        stats: auth.user.stats,
        task_stats: TaskStats::from_tasks(&tasks, Utc::now()),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{register_user, TestApp};

    #[tokio::test]
    async fn test_preferences_update_is_partial() {
        let app = TestApp::new().await;
        let token = register_user(&app, "ada").await;

        let (status, body) = app
            .put(
                "/api/users/preferences",
                Some(&token),
                json!({ "theme": "dark", "notifications": { "sound": false } }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preferences"]["theme"], "dark");
        assert_eq!(body["preferences"]["notifications"]["sound"], false);
        assert_eq!(body["preferences"]["notifications"]["email"], true);

        let (_, body) = app.get("/api/users/profile", Some(&token)).await;
        assert_eq!(body["user"]["preferences"]["theme"], "dark");
    }

    #[tokio::test]
    async fn test_search_excludes_caller() {
        let app = TestApp::new().await;
        let token = register_user(&app, "mara").await;
        register_user(&app, "marco").await;
        register_user(&app, "zed").await;

        let (status, body) = app.get("/api/users/search?query=mar", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "marco");
        assert!(users[0].get("email").is_none());
    }

    #[tokio::test]
    async fn test_stats_reflect_created_tasks() {
        let app = TestApp::new().await;
        let token = register_user(&app, "ada").await;
        app.post("/api/tasks", Some(&token), json!({ "title": "One" })).await;
        app.post("/api/tasks", Some(&token), json!({ "title": "Two" })).await;

        let (status, body) = app.get("/api/users/stats", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["totalTasks"], 2);
        assert_eq!(body["taskStats"]["totalTasks"], 2);
        assert_eq!(body["taskStats"]["todoTasks"], 2);
    }
}
