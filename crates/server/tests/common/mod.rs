//! Common test utilities for driving the API in process.
//!
//! The fixture wires the real router to SQLite stores in a temporary
//! directory and a seeded selector, so draw results are repeatable.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use demolot_core::{
    audit_pipeline, AuditStore, Config, DatabaseConfig, DrawConfig, DrawService,
    FairnessSelector, SqliteAuditStore, SqliteDemoStore, SqliteMemberStore, SystemClock,
};
use demolot_server::state::AppState;

/// In-process server over temporary SQLite stores.
pub struct TestFixture {
    pub router: Router,
    pub members: Arc<SqliteMemberStore>,
    pub audit_store: Arc<dyn AuditStore>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            draw: DrawConfig {
                seed: Some(7),
                ..DrawConfig::default()
            },
            ..Config::default()
        };

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let demo_store =
            Arc::new(SqliteDemoStore::new(&db_path).expect("Failed to create demo store"));
        let members =
            Arc::new(SqliteMemberStore::new(&db_path).expect("Failed to create member store"));

        let (audit_handle, audit_writer) = audit_pipeline(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let draw = DrawService::new(
            demo_store,
            members.clone(),
            Arc::new(FairnessSelector::new(true, Some(7))),
            Arc::new(SystemClock),
        )
        .with_audit(audit_handle.clone());

        let state = Arc::new(AppState::new(
            config,
            Arc::new(draw),
            members.clone(),
            audit_handle,
            Arc::clone(&audit_store),
        ));

        Self {
            router: demolot_server::api::create_router(state),
            members,
            audit_store,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Register a member through the API and return its id.
    pub async fn add_member(&self, name: &str) -> i64 {
        let response = self
            .post("/api/v1/members", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["id"].as_i64().expect("member id")
    }

    /// Give the audit writer time to drain its channel.
    pub async fn settle_audit(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
