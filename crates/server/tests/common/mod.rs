//! Shared harness: the full router over in-memory SQLite and a fake catalog.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use retrorewind_server::{
    app,
    config::Config,
    db::{models::MediaType, AuditLog, Database},
    services::catalog::{CatalogError, MediaCatalog, MediaSummary},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    Healthy,
    Unavailable,
    Broken,
}

pub struct FakeCatalog {
    pub calls: AtomicUsize,
    pub mode: Mutex<CatalogMode>,
}

impl FakeCatalog {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            mode: Mutex::new(CatalogMode::Healthy),
        }
    }

    pub fn set_mode(&self, mode: CatalogMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(
        &self,
        catalog: &'static str,
        item: MediaSummary,
    ) -> Result<Vec<MediaSummary>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.mode.lock().unwrap() {
            CatalogMode::Healthy => Ok(vec![item]),
            CatalogMode::Unavailable => Err(CatalogError::Unavailable {
                catalog,
                detail: "503 Service Unavailable".to_string(),
            }),
            CatalogMode::Broken => Err(CatalogError::Internal("unexpected payload".to_string())),
        }
    }
}

#[async_trait]
impl MediaCatalog for FakeCatalog {
    async fn search_games(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        self.answer(
            "igdb",
            MediaSummary {
                id: "1020".to_string(),
                title: format!("{query} (game)"),
                year: "2013-09-17".to_string(),
                platforms: vec!["PC".to_string()],
                summary: "A game.".to_string(),
                cover_url: "https://images.igdb.com/igdb/image/upload/t_cover_small_2x/co2lbd.jpg"
                    .to_string(),
                media_type: MediaType::Game,
            },
        )
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        self.answer(
            "omdb",
            MediaSummary {
                id: "tt0133093".to_string(),
                title: format!("{query} (movie)"),
                year: "1999".to_string(),
                platforms: vec!["Theaters".to_string(), "Streaming".to_string()],
                summary: "No summary available.".to_string(),
                cover_url: "https://placehold.co/200x280?text=No+Cover".to_string(),
                media_type: MediaType::Movie,
            },
        )
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub catalog: Arc<FakeCatalog>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Builds the app with extra environment values layered over the test defaults.
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let config = Config::from_lookup(|key| {
            if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
                return Some(value.to_string());
            }
            match key {
                "DATABASE_URL" | "AUDIT_DATABASE_URL" => Some("sqlite::memory:".to_string()),
                "JWT_SECRET" => Some("test-secret".to_string()),
                _ => None,
            }
        });

        let db = Database::connect(&config.database_url).await.unwrap();
        db.run_migrations().await.unwrap();
        let audit = AuditLog::connect(&config.audit_database_url).await.unwrap();
        audit.run_migrations().await.unwrap();

        let catalog = Arc::new(FakeCatalog::new());
        let state = AppState {
            db,
            audit,
            config,
            catalog: catalog.clone(),
        };

        Self {
            router: app(state.clone()),
            state,
            catalog,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
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
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body), None).await
    }

    pub async fn delete(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, body, None).await
    }

    /// Registers `username` with `<username>@example.com` and returns the user id.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/register",
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["user_id"].as_str().unwrap().to_string()
    }

    /// Logs `username` in and returns the session token.
    pub async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/login",
                json!({ "email": format!("{username}@example.com"), "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["auth_token"].as_str().unwrap().to_string()
    }

    pub async fn create_thread(&self, user_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/threads",
                json!({ "title": title, "content": format!("{title} body"), "user_id": user_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create thread failed: {body}");
        body["thread_id"].as_str().unwrap().to_string()
    }

    pub async fn post_comment(&self, thread_id: &str, user_id: &str, content: &str) -> String {
        let (status, body) = self
            .post(
                "/comments",
                json!({ "thread_id": thread_id, "user_id": user_id, "content": content }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "post comment failed: {body}");
        body["comment_id"].as_str().unwrap().to_string()
    }
}
