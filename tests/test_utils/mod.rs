//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use tempfile::TempDir;
use tokio_rusqlite::Connection;

use draftly::api::{AppState, app};
use draftly::core::AppConfig;
use draftly::core::db::{async_db, initialize_db};
use draftly::dispatch::RetryPolicy;
use draftly::drafts::Pipeline;
use draftly::sessions::create_session;
use draftly::users::upsert_user;

pub const USER_EMAIL: &str = "me@example.com";

/// A router wired to a temporary database and a mock server standing
/// in for Gmail, Google OAuth and the model API.
pub struct TestApp {
    pub router: Router,
    pub db: Connection,
    pub server: ServerGuard,
    pub config: AppConfig,
    /// Session token of the registered test user.
    pub session: String,
    _dir: TempDir,
}

impl TestApp {
    pub fn cookie(&self) -> String {
        format!("session_token={}", self.session)
    }

    pub fn pipeline(&self) -> Pipeline {
        test_pipeline(&self.db, &self.config)
    }
}

pub fn test_pipeline(db: &Connection, config: &AppConfig) -> Pipeline {
    Pipeline::from_config(db.clone(), config)
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)))
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("db");
    std::fs::create_dir_all(&db_path).expect("Failed to create db directory");
    let db_path = db_path.to_str().unwrap().to_string();

    let db = async_db(&db_path)
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    upsert_user(&db, USER_EMAIL, "test-refresh-token")
        .await
        .unwrap();
    let session = create_session(&db, USER_EMAIL, 2).await.unwrap();

    let server = mockito::Server::new_async().await;
    let config = AppConfig {
        storage_path: dir.path().display().to_string(),
        db_path,
        gmail_api_client_id: String::from("test_client_id"),
        gmail_api_client_secret: String::from("test_client_secret"),
        gmail_api_base_url: server.url(),
        google_oauth_token_url: format!("{}/token", server.url()),
        openai_model: String::from("test-model"),
        openai_api_hostname: server.url(),
        openai_api_key: String::from("test-api-key"),
        session_ttl_hours: 2,
        max_draft_length: 50_000,
        unread_fetch_limit: 5,
        draft_job_interval_secs: 60,
    };

    let pipeline = test_pipeline(&db, &config);
    let app_state = AppState::with_pipeline(db.clone(), config.clone(), pipeline);
    let router = app(Arc::new(RwLock::new(app_state)));

    TestApp {
        router,
        db,
        server,
        config,
        session,
        _dir: dir,
    }
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}

pub fn encoded(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

pub async fn mock_token(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "test-access-token", "expires_in": 3599}"#)
        .create_async()
        .await
}

pub async fn mock_completion(server: &mut ServerGuard, content: &str) -> Mock {
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
                .to_string(),
        )
        .create_async()
        .await
}

/// A two message thread in Gmail's newest-first order. The newest
/// message quotes the older one.
pub fn thread_json(thread_id: &str) -> serde_json::Value {
    json!({
        "id": thread_id,
        "messages": [
            {
                "id": "m2",
                "threadId": thread_id,
                "snippet": "Tuesday works",
                "payload": {
                    "mimeType": "multipart/alternative",
                    "headers": [
                        {"name": "From", "value": "Alice <alice@example.com>"},
                        {"name": "To", "value": USER_EMAIL},
                        {"name": "Subject", "value": "Re: Lunch"},
                        {"name": "Date", "value": "Tue, 2 Jan 2024 09:00:00 +0000"},
                        {"name": "Message-ID", "value": "<m2@mail.example.com>"}
                    ],
                    "parts": [
                        {"partId": "0", "mimeType": "text/plain", "body": {"data": encoded("Tuesday works")}},
                        {"partId": "1", "mimeType": "text/html", "body": {"data": encoded(
                            "<div>Tuesday works for me</div><div class=\"gmail_quote\">old stuff</div>"
                        )}}
                    ]
                }
            },
            {
                "id": "m1",
                "threadId": thread_id,
                "snippet": "Lunch next week?",
                "payload": {
                    "mimeType": "text/html",
                    "headers": [
                        {"name": "From", "value": "Alice <alice@example.com>"},
                        {"name": "To", "value": USER_EMAIL},
                        {"name": "Subject", "value": "Lunch"},
                        {"name": "Date", "value": "Mon, 1 Jan 2024 09:00:00 +0000"},
                        {"name": "Message-ID", "value": "<m1@mail.example.com>"}
                    ],
                    "body": {"data": encoded("<p>Lunch next week?</p>")}
                }
            }
        ]
    })
}

pub async fn mock_thread(server: &mut ServerGuard, thread_id: &str) -> Mock {
    server
        .mock("GET", format!("/gmail/v1/users/me/threads/{}", thread_id).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(thread_json(thread_id).to_string())
        .create_async()
        .await
}

pub async fn mock_mark_read(server: &mut ServerGuard, thread_id: &str) -> Mock {
    server
        .mock(
            "POST",
            format!("/gmail/v1/users/me/threads/{}/modify", thread_id).as_str(),
        )
        .with_status(200)
        .with_body(format!(r#"{{"id": "{}"}}"#, thread_id))
        .create_async()
        .await
}
