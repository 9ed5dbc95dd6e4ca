//! Request extractors: bearer token authentication, plus JSON body and
//! query string wrappers that reject with the API's error format

use std::sync::Arc;

use accounts::User;
use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use surrealdb::sql::Thing;

use crate::error::ApiError;
use crate::AppState;

/// `axum::Json` whose rejections become `400 {"error": ...}`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejections become `400 {"error": ...}`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// The signed-in user, loaded fresh for every request
pub struct AuthUser {
    pub id: Thing,
    pub user: User,
}

impl AuthUser {
    pub fn raw_id(&self) -> String {
        self.id.id.to_raw()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;
        let claims = state.tokens.verify(token)?;

        let user = state
            .accounts
            .get_user(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::Unauthorized("Token is not valid".to_string()))?;
        let id = user.id.clone().context("Stored user has no id")?;

        Ok(AuthUser { id, user })
    }
}
