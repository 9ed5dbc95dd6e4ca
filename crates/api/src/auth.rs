//! Registration, login and the signed-in user's own account

use std::sync::Arc;

use accounts::{AccountError, NewUser, ProfileUpdate, User};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody};
use crate::views::UserView;
use crate::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    token: String,
    user: UserView,
}

#[derive(Serialize)]
pub struct UserResponse {
    user: UserView,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

fn session(state: &AppState, user: User) -> ApiResult<SessionResponse> {
    let id = user
        .id_str()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Stored user has no id")))?;
    let token = state.tokens.issue(&id)?;
    Ok(SessionResponse {
        token,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<NewUser>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = req.into_user()?;
    let user = state.accounts.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(session(&state, user)?)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let id = state
        .accounts
        .find_by_email(&req.email)
        .await?
        .filter(|u| u.is_active && u.check_password(&req.password))
        .and_then(|u| u.id_str())
        .ok_or(AccountError::InvalidCredentials)?;

    let now = Utc::now();
    let (user, ()) = state
        .accounts
        .update_user(&id, |user| {
            user.last_login = now.into();
            Ok::<_, ApiError>(())
        })
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    info!("User {} logged in", user.username);
    Ok(Json(session(&state, user)?))
}

pub async fn me(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        user: auth.user.into(),
    })
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<UserResponse>> {
    let (user, ()) = state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            Ok::<_, ApiError>(user.update_profile(update.clone())?)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse { user: user.into() }))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            Ok::<_, ApiError>(user.change_password(&req.current_password, &req.new_password)?)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

/// Tokens are stateless, so there is nothing to revoke server-side
pub async fn logout(_auth: AuthUser) -> StatusCode {
    StatusCode::NO_CONTENT
}
