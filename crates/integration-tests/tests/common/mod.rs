//! Shared harness: a real router over tempdir-backed stores, with cookie
//! minting and JSON request helpers.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use api_adapters::AppState;
use auth_adapters::SessionCodec;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use domains::{ContentStore, SessionUser, UserStore};
use serde_json::Value;
use storage_adapters::{FsContentStore, FsUserStore};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SUPER_ADMIN: &str = "root";

pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
    pub codec: SessionCodec,
    pub content: Arc<dyn ContentStore>,
    pub users: Arc<dyn UserStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = TempDir::new().unwrap();
        let content: Arc<dyn ContentStore> =
            Arc::new(FsContentStore::new(dir.path().join("boards")).await.unwrap());
        let users: Arc<dyn UserStore> =
            Arc::new(FsUserStore::new(dir.path().join("users")).await.unwrap());
        let codec = SessionCodec::new("integration-secret".to_string().into());
        let state = AppState::new(
            content.clone(),
            users.clone(),
            codec.clone(),
            vec![SUPER_ADMIN.to_string()],
        );
        TestApp {
            dir,
            router: api_adapters::router(state),
            codec,
            content,
            users,
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("boards")
    }

    pub fn cookie(&self, username: &str) -> String {
        let value = self.codec.encode(&SessionUser::new(username)).unwrap();
        format!("session={value}")
    }

    pub async fn get(&self, path: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(user) = user {
            builder = builder.header(header::COOKIE, self.cookie(user));
        }
        self.send_json(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, path: &str, body: Value, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::COOKIE, self.cookie(user));
        }
        self.send_json(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Raw dispatch, for tests that look at headers or non-JSON bodies.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    // Frequent fixtures, created through the real endpoints.

    pub async fn create_board(&self, owner: &str, board: &str) {
        let (status, _) = self
            .post("/api/board", serde_json::json!({ "name": board }), Some(owner))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    pub async fn create_section(&self, actor: &str, board: &str, section: &str) {
        let (status, _) = self
            .post(
                "/api/section",
                serde_json::json!({ "board": board, "name": section }),
                Some(actor),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    pub async fn create_post(&self, author: &str, board: &str, section: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/post",
                serde_json::json!({
                    "board": board,
                    "section": section,
                    "title": title,
                    "content": format!("{title} body"),
                }),
                Some(author),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["filename"].as_str().unwrap().to_string()
    }
}
