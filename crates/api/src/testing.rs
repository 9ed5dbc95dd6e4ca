//! Helpers for driving the router in tests

use std::sync::Arc;

use accounts::TokenIssuer;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use db::Database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{build_router, AppState};

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::memory("questlog").await.unwrap();
        let state = AppState::new(db, TokenIssuer::new("test-secret", 1));
        Self {
            router: build_router(Arc::new(state)),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }
}

/// Register `username` with password `password1`, returning token and id
pub async fn register(app: &TestApp, username: &str) -> (String, String) {
    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "password1",
                "firstName": "Test",
                "lastName": username,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let token = body["token"].as_str().unwrap().to_string();
    let id = body["user"]["id"].as_str().unwrap().to_string();
    (token, id)
}

pub async fn register_user(app: &TestApp, username: &str) -> String {
    register(app, username).await.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = TestApp::new().await;
        let (status, _) = app.get("/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
