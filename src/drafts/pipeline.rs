//! Orchestrates fetch, generate, save and dispatch for one user.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio_rusqlite::Connection;

use super::db::{finalize_draft, load_context, save_draft};
use super::models::{FinalizeOutcome, reply_recipient};
use crate::ai::{GenerativeBackend, OpenAiBackend, generate_draft};
use crate::context::{ContextInput, ThreadContext, extract_thread};
use crate::core::{AppConfig, DEFAULT_MAX_DRAFT_LENGTH, PipelineError};
use crate::dispatch::{DispatchMode, RetryPolicy, dispatch};
use crate::google::reply::{ReplyEnvelope, build_reply_raw};
use crate::google::{
    Capability, CredentialResolver, GmailProvider, MailProvider, OAuthCredentialResolver,
};
use crate::users::{get_preferred_style, set_preferred_style};

const SUMMARY_HEADERS: [&str; 3] = ["From", "Subject", "Date"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnreadSummary {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftOutcome {
    pub draft: String,
    pub thread_context: ThreadContext,
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub thread_id: String,
    pub draft_body: String,
    pub mode: DispatchMode,
    /// Overrides the recipient derived from the thread.
    pub to_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub mode: DispatchMode,
    /// Provider draft id or sent message id depending on `mode`.
    pub provider_id: String,
}

/// Everything a request needs to run the drafting pipeline. Cheap to
/// clone.
#[derive(Clone)]
pub struct Pipeline {
    db: Connection,
    mail: Arc<dyn MailProvider>,
    backend: Arc<dyn GenerativeBackend>,
    credentials: Arc<dyn CredentialResolver>,
    retry: RetryPolicy,
    max_draft_length: usize,
}

impl Pipeline {
    pub fn new(
        db: Connection,
        mail: Arc<dyn MailProvider>,
        backend: Arc<dyn GenerativeBackend>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Self {
        Self {
            db,
            mail,
            backend,
            credentials,
            retry: RetryPolicy::default(),
            max_draft_length: DEFAULT_MAX_DRAFT_LENGTH,
        }
    }

    /// Wire up the Gmail, OAuth and OpenAI implementations.
    pub fn from_config(db: Connection, config: &AppConfig) -> Self {
        let mail = Arc::new(GmailProvider::new(&config.gmail_api_base_url));
        let backend = Arc::new(OpenAiBackend::new(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
        ));
        let credentials = Arc::new(OAuthCredentialResolver::new(
            db.clone(),
            &config.google_oauth_token_url,
            &config.gmail_api_client_id,
            &config.gmail_api_client_secret,
        ));
        Self::new(db, mail, backend, credentials).with_max_draft_length(config.max_draft_length)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_draft_length(mut self, max_draft_length: usize) -> Self {
        self.max_draft_length = max_draft_length;
        self
    }

    pub fn db(&self) -> &Connection {
        &self.db
    }

    async fn capability(&self, user_email: &str) -> Result<Capability, PipelineError> {
        self.credentials.resolve(user_email).await
    }

    async fn fetch_context(
        &self,
        cap: &Capability,
        thread_id: &str,
    ) -> Result<ThreadContext, PipelineError> {
        let thread = self.mail.get_thread(cap, thread_id).await?;
        extract_thread(&thread)
    }

    /// Up to `limit` unread messages, one per thread, newest first.
    pub async fn list_unread(
        &self,
        user_email: &str,
        limit: usize,
    ) -> Result<Vec<UnreadSummary>, PipelineError> {
        let cap = self.capability(user_email).await?;
        let messages = self.mail.list_unread(&cap, limit).await?;

        let mut seen = HashSet::new();
        let mut summaries = Vec::new();
        for message in messages {
            if !seen.insert(message.thread_id.clone()) {
                continue;
            }
            let headers = self
                .mail
                .get_message_metadata(&cap, &message.id, &SUMMARY_HEADERS)
                .await?;
            let header = |name: &str, default: &str| {
                headers
                    .iter()
                    .find(|h| h.name == name)
                    .map(|h| h.value.clone())
                    .unwrap_or_else(|| default.to_string())
            };
            summaries.push(UnreadSummary {
                from: header("From", "Unknown Sender"),
                subject: header("Subject", "No Subject"),
                date: header("Date", "Unknown Date"),
                id: message.id,
                thread_id: message.thread_id,
            });
        }

        tracing::debug!("Found {} unread threads for {}", summaries.len(), user_email);
        Ok(summaries)
    }

    async fn generate_and_save(
        &self,
        user_email: &str,
        context: ThreadContext,
        style: Option<&str>,
        sender_name: Option<&str>,
    ) -> Result<DraftOutcome, PipelineError> {
        let input = ContextInput::Structured(context.clone());
        let draft = generate_draft(self.backend.as_ref(), &input, style, sender_name).await?;
        save_draft(&self.db, user_email, &context.thread_id, &context, &draft).await?;

        Ok(DraftOutcome {
            draft,
            thread_context: context,
        })
    }

    /// Fetch a thread and generate a fresh draft for it. Without an
    /// explicit style the user's stored preference is used.
    pub async fn draft_thread(
        &self,
        user_email: &str,
        thread_id: &str,
        style: Option<&str>,
    ) -> Result<DraftOutcome, PipelineError> {
        let cap = self.capability(user_email).await?;
        let context = self.fetch_context(&cap, thread_id).await?;

        let style = match style.map(str::trim).filter(|s| !s.is_empty()) {
            Some(style) => Some(style.to_string()),
            None => get_preferred_style(&self.db, user_email).await?,
        };

        self.generate_and_save(user_email, context, style.as_deref(), None)
            .await
    }

    /// Generate another draft for a thread, reusing the stored context
    /// snapshot when there is one. A requested style is remembered for
    /// next time.
    pub async fn regenerate(
        &self,
        user_email: &str,
        thread_id: &str,
        style: Option<&str>,
        sender_name: Option<&str>,
    ) -> Result<DraftOutcome, PipelineError> {
        let style = match style.map(str::trim).filter(|s| !s.is_empty()) {
            Some(style) => {
                set_preferred_style(&self.db, user_email, style).await?;
                Some(style.to_string())
            }
            None => get_preferred_style(&self.db, user_email).await?,
        };

        let context = match load_context(&self.db, user_email, thread_id).await? {
            Some(context) => context,
            None => {
                tracing::debug!("No stored context for thread {}, fetching", thread_id);
                let cap = self.capability(user_email).await?;
                self.fetch_context(&cap, thread_id).await?
            }
        };

        self.generate_and_save(user_email, context, style.as_deref(), sender_name)
            .await
    }

    /// Save the reply as a provider draft or send it. Marking the
    /// thread read and finalizing the record happen after a successful
    /// dispatch and never fail it.
    pub async fn send(
        &self,
        user_email: &str,
        request: SendRequest,
    ) -> Result<DispatchOutcome, PipelineError> {
        let body = request.draft_body.trim();
        if body.is_empty() {
            return Err(PipelineError::Validation(String::from("Draft body is empty")));
        }
        if body.chars().count() > self.max_draft_length {
            return Err(PipelineError::Validation(format!(
                "Draft body exceeds the maximum length of {} characters",
                self.max_draft_length
            )));
        }

        let cap = self.capability(user_email).await?;
        let context = match load_context(&self.db, user_email, &request.thread_id).await? {
            Some(context) => context,
            None => self.fetch_context(&cap, &request.thread_id).await?,
        };

        let to = match request.to_email.as_deref().map(str::trim) {
            Some(to) if !to.is_empty() => to.to_string(),
            _ => reply_recipient(&context, user_email).ok_or_else(|| {
                PipelineError::Validation(String::from("Unable to determine the recipient"))
            })?,
        };
        let subject = context
            .initiating()
            .map(|m| m.subject.clone())
            .unwrap_or_default();
        let in_reply_to = context.latest().and_then(|m| m.rfc_message_id.clone());

        let raw = build_reply_raw(
            &ReplyEnvelope {
                from: user_email,
                to: &to,
                subject: &subject,
                in_reply_to: in_reply_to.as_deref(),
            },
            body,
        )?;

        let provider_id = dispatch(
            &self.retry,
            self.mail.as_ref(),
            &cap,
            request.mode,
            &request.thread_id,
            &raw,
        )
        .await?;

        if let Err(e) = self.mail.remove_unread_label(&cap, &request.thread_id).await {
            tracing::warn!("Failed to mark thread {} as read: {}", request.thread_id, e);
        }

        match finalize_draft(&self.db, user_email, &request.thread_id, Some(&provider_id)).await {
            Ok(FinalizeOutcome::Finalized) => {}
            Ok(FinalizeOutcome::NotFound) => {
                tracing::warn!("No open draft to finalize for thread {}", request.thread_id)
            }
            Err(e) => tracing::warn!(
                "Failed to finalize draft for thread {}: {}",
                request.thread_id,
                e
            ),
        }

        Ok(DispatchOutcome {
            mode: request.mode,
            provider_id,
        })
    }
}
