//! Router for the email API

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json, routing::post};

use super::public;
use crate::api::CurrentUser;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::core::PipelineError;
use crate::dispatch::DispatchMode;
use crate::drafts::{DraftOutcome, Pipeline, SendRequest};

type SharedState = Arc<RwLock<AppState>>;

fn pipeline(state: &SharedState) -> Pipeline {
    state
        .read()
        .expect("Unable to read shared state")
        .pipeline
        .clone()
}

fn require_thread_id(thread_id: &str) -> Result<&str, PipelineError> {
    let thread_id = thread_id.trim();
    if thread_id.is_empty() {
        return Err(PipelineError::Validation(String::from("thread_id is required")));
    }
    Ok(thread_id)
}

impl From<DraftOutcome> for public::DraftResponse {
    fn from(outcome: DraftOutcome) -> Self {
        public::DraftResponse {
            draft: outcome.draft,
            thread_context: outcome.thread_context,
        }
    }
}

async fn fetch_latest_handler(
    State(state): State<SharedState>,
    user: CurrentUser,
    body: Option<Json<public::FetchLatestRequest>>,
) -> Result<Json<public::FetchLatestResponse>, ApiError> {
    let default_limit = state
        .read()
        .expect("Unable to read shared state")
        .config
        .unread_fetch_limit;
    let limit = body
        .and_then(|Json(req)| req.limit)
        .unwrap_or(default_limit)
        .max(1);

    let messages = pipeline(&state).list_unread(&user.email, limit).await?;
    let message = messages
        .is_empty()
        .then(|| String::from("No new unread emails found."));

    Ok(Json(public::FetchLatestResponse { messages, message }))
}

async fn draft_handler(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<public::DraftRequest>,
) -> Result<Json<public::DraftResponse>, ApiError> {
    let thread_id = require_thread_id(&req.thread_id)?;
    let outcome = pipeline(&state)
        .draft_thread(&user.email, thread_id, req.tone.as_deref())
        .await?;
    Ok(Json(outcome.into()))
}

async fn regenerate_draft_handler(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<public::RegenerateDraftRequest>,
) -> Result<Json<public::DraftResponse>, ApiError> {
    let thread_id = require_thread_id(&req.thread_id)?;
    let outcome = pipeline(&state)
        .regenerate(
            &user.email,
            thread_id,
            req.user_style.as_deref(),
            req.sender_name.as_deref(),
        )
        .await?;
    Ok(Json(outcome.into()))
}

async fn send_handler(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<public::SendRequest>,
) -> Result<Json<public::SendResponse>, ApiError> {
    let thread_id = require_thread_id(&req.thread_id)?.to_string();
    let mode = if req.draft_only {
        DispatchMode::DraftOnly
    } else {
        DispatchMode::Send
    };

    let outcome = pipeline(&state)
        .send(
            &user.email,
            SendRequest {
                thread_id,
                draft_body: req.draft_body,
                mode,
                to_email: req.to_email,
            },
        )
        .await?;

    let resp = match outcome.mode {
        DispatchMode::DraftOnly => public::SendResponse {
            message: String::from("Draft saved to Gmail"),
            draft_id: Some(outcome.provider_id),
            message_id: None,
        },
        DispatchMode::Send => public::SendResponse {
            message: String::from("Email sent"),
            draft_id: None,
            message_id: Some(outcome.provider_id),
        },
    };
    Ok(Json(resp))
}

/// Create the email router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/fetch_latest", post(fetch_latest_handler))
        .route("/draft", post(draft_handler))
        .route("/regenerate_draft", post(regenerate_draft_handler))
        .route("/send", post(send_handler))
}
