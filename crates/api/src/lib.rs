//! HTTP API for Questlog
//!
//! JSON endpoints under `/api` for accounts, the task board and
//! gamification, plus a `/health` probe. Every route except registration,
//! login and health expects `Authorization: Bearer <token>`.

use std::sync::Arc;

use accounts::TokenIssuer;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use db::Database;

mod auth;
mod error;
mod extract;
mod gamification;
mod tasks;
mod users;
mod views;

#[cfg(test)]
mod testing;

pub use error::{ApiError, ApiResult};
pub use extract::{AuthUser, JsonBody, QueryParams};

/// Shared state for API handlers
pub struct AppState {
    pub tasks: ::tasks::Store,
    pub accounts: accounts::Store,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Both stores share one database connection
    pub fn new(db: Database, tokens: TokenIssuer) -> Self {
        Self {
            tasks: ::tasks::Store::new(db.clone()),
            accounts: accounts::Store::new(db),
            tokens,
        }
    }
}

/// Build the API router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(auth::update_profile))
        .route("/api/auth/change-password", put(auth::change_password))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users/profile", get(users::profile))
        .route("/api/users/preferences", put(users::update_preferences))
        .route("/api/users/search", get(users::search))
        .route("/api/users/stats", get(users::stats))
        // Tasks
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/stats/overview", get(tasks::overview))
        .route(
            "/api/tasks/:id",
            get(tasks::get).put(tasks::update).delete(tasks::delete),
        )
        .route("/api/tasks/:id/complete", post(tasks::complete))
        .route("/api/tasks/:id/time-entry", post(tasks::add_time_entry))
        .route("/api/tasks/:id/notes", post(tasks::add_note))
        // Gamification
        .route("/api/gamification/achievements", get(gamification::achievements))
        .route("/api/gamification/leaderboard", get(gamification::leaderboard))
        .route("/api/gamification/progress", get(gamification::progress))
        .route(
            "/api/gamification/award-achievement",
            post(gamification::award_achievement),
        )
        .route("/api/gamification/award-badge", post(gamification::award_badge))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
