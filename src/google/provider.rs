//! Mail provider abstraction used by the pipeline.
//!
//! Failures come back already classified (`ProviderErrorKind`) so the
//! dispatch retry policy never has to look at error text.

use std::fmt;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

use super::gmail::{self, MessageHeader, MessageResponse, Thread};
use crate::core::PipelineError;

/// Opaque, short-lived authorization handle for one user. Only the
/// provider client reads the token.
#[derive(Clone)]
pub struct Capability {
    access_token: String,
}

impl Capability {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub(crate) fn bearer(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Capability(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Credential expired, revoked or otherwise rejected.
    Auth,
    /// Rate limited, over quota or forbidden.
    QuotaOrPermission,
    NotFound,
    /// Network failures, 5xx and anything else worth retrying.
    Transient,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transient, message)
    }

    /// Classify a non-success HTTP response from the provider.
    pub fn from_status(status: StatusCode, context: &str, body: &str) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ProviderErrorKind::Auth,
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                ProviderErrorKind::QuotaOrPermission
            }
            StatusCode::NOT_FOUND => ProviderErrorKind::NotFound,
            _ => ProviderErrorKind::Transient,
        };
        Self::new(kind, format!("{} failed: {} ({})", context, status, body))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProviderError::from_status(status, "Provider request", &err.to_string()),
            None => ProviderError::transient(err.to_string()),
        }
    }
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err.kind {
            ProviderErrorKind::Auth => PipelineError::AuthExpired(err.message),
            ProviderErrorKind::QuotaOrPermission => PipelineError::QuotaOrPermission(err.message),
            ProviderErrorKind::NotFound => PipelineError::NotFound(err.message),
            ProviderErrorKind::Transient => PipelineError::Upstream(err.message),
        }
    }
}

/// Operations the drafting pipeline needs from a mail provider.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn list_unread(
        &self,
        cap: &Capability,
        max_results: usize,
    ) -> Result<Vec<MessageResponse>, ProviderError>;

    /// Fetch a full thread. Messages are returned newest-first.
    async fn get_thread(&self, cap: &Capability, thread_id: &str) -> Result<Thread, ProviderError>;

    async fn get_message_metadata(
        &self,
        cap: &Capability,
        message_id: &str,
        header_names: &[&str],
    ) -> Result<Vec<MessageHeader>, ProviderError>;

    /// Store `raw` (base64url RFC 822) as a provider draft, returning its id.
    async fn create_draft(
        &self,
        cap: &Capability,
        thread_id: &str,
        raw: &str,
    ) -> Result<String, ProviderError>;

    /// Send `raw` (base64url RFC 822) in the thread, returning the message id.
    async fn send_message(
        &self,
        cap: &Capability,
        thread_id: &str,
        raw: &str,
    ) -> Result<String, ProviderError>;

    async fn remove_unread_label(
        &self,
        cap: &Capability,
        thread_id: &str,
    ) -> Result<(), ProviderError>;
}

/// Gmail REST implementation of `MailProvider`.
#[derive(Clone, Debug)]
pub struct GmailProvider {
    base_url: String,
    client: reqwest::Client,
}

impl GmailProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn list_unread(
        &self,
        cap: &Capability,
        max_results: usize,
    ) -> Result<Vec<MessageResponse>, ProviderError> {
        gmail::list_unread_messages(&self.client, &self.base_url, cap.bearer(), max_results).await
    }

    async fn get_thread(&self, cap: &Capability, thread_id: &str) -> Result<Thread, ProviderError> {
        gmail::fetch_thread(&self.client, &self.base_url, cap.bearer(), thread_id).await
    }

    async fn get_message_metadata(
        &self,
        cap: &Capability,
        message_id: &str,
        header_names: &[&str],
    ) -> Result<Vec<MessageHeader>, ProviderError> {
        gmail::fetch_message_metadata(
            &self.client,
            &self.base_url,
            cap.bearer(),
            message_id,
            header_names,
        )
        .await
    }

    async fn create_draft(
        &self,
        cap: &Capability,
        thread_id: &str,
        raw: &str,
    ) -> Result<String, ProviderError> {
        gmail::create_draft(&self.client, &self.base_url, cap.bearer(), thread_id, raw).await
    }

    async fn send_message(
        &self,
        cap: &Capability,
        thread_id: &str,
        raw: &str,
    ) -> Result<String, ProviderError> {
        gmail::send_message(&self.client, &self.base_url, cap.bearer(), thread_id, raw).await
    }

    async fn remove_unread_label(
        &self,
        cap: &Capability,
        thread_id: &str,
    ) -> Result<(), ProviderError> {
        gmail::remove_unread_label(&self.client, &self.base_url, cap.bearer(), thread_id).await
    }
}
