//! Public types for the email API
use serde::{Deserialize, Serialize};

use crate::context::ThreadContext;
use crate::drafts::UnreadSummary;

#[derive(Debug, Default, Deserialize)]
pub struct FetchLatestRequest {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FetchLatestResponse {
    pub messages: Vec<UnreadSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub thread_id: String,
    pub tone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateDraftRequest {
    pub thread_id: String,
    pub user_style: Option<String>,
    pub sender_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: String,
    pub thread_context: ThreadContext,
}

fn default_draft_only() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub thread_id: String,
    pub draft_body: String,
    /// Omitted means save as a Gmail draft, never an implicit send.
    #[serde(default = "default_draft_only")]
    pub draft_only: bool,
    pub to_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}
