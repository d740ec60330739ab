//! Reply draft generation.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::prompt::{PLACEHOLDER, Prompt, TEMPLATES};
use crate::context::{ContextInput, format_context};
use crate::core::PipelineError;
use crate::openai::{Message, Role, completion, completion_content};

pub const DEFAULT_STYLE: &str = "Professional";
pub const DEFAULT_SENDER_NAME: &str = "User";

static CONTROL_WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t]+").expect("valid regex"));

/// A text generation service. Given a system directive and the
/// formatted thread, returns the model's reply.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, directive: &str, context: &str) -> Result<String>;
}

/// Backend for any OpenAI compatible chat completions API.
#[derive(Clone, Debug)]
pub struct OpenAiBackend {
    api_hostname: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for OpenAiBackend {
    async fn generate(&self, directive: &str, context: &str) -> Result<String> {
        let messages = vec![
            Message::new(Role::System, directive),
            Message::new(Role::User, context),
        ];
        let response =
            completion(&messages, &self.api_hostname, &self.api_key, &self.model).await?;
        completion_content(&response)
    }
}

fn render_directive(style: &str, sender_name: &str) -> Result<String, PipelineError> {
    TEMPLATES
        .render(
            &Prompt::DraftDirective.to_string(),
            &json!({
                "style": style,
                "sender_name": sender_name,
                "placeholder": PLACEHOLDER,
            }),
        )
        .map_err(|e| PipelineError::Internal(anyhow::anyhow!("Failed to render directive: {}", e)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Generate an HTML reply to the latest message of `context`.
///
/// The result has line breaks and tabs collapsed so it can be stored
/// and sent as a single HTML fragment. No retries: a failed or empty
/// generation is reported as `PipelineError::Generation`.
pub async fn generate_draft(
    backend: &dyn GenerativeBackend,
    context: &ContextInput,
    style: Option<&str>,
    sender_name: Option<&str>,
) -> Result<String, PipelineError> {
    let style = non_blank(style).unwrap_or(DEFAULT_STYLE);
    let sender_name = non_blank(sender_name).unwrap_or(DEFAULT_SENDER_NAME);

    let formatted = format_context(context)?;
    let directive = render_directive(style, sender_name)?;

    tracing::debug!("Generating draft in {} style", style);
    let reply = backend.generate(&directive, &formatted).await.map_err(|e| {
        tracing::error!("Draft generation failed: {}", e);
        PipelineError::Generation(e.to_string())
    })?;

    let draft = CONTROL_WHITESPACE_RE.replace_all(&reply, " ").trim().to_string();
    if draft.is_empty() {
        return Err(PipelineError::Generation(String::from(
            "The model returned an empty draft",
        )));
    }

    Ok(draft)
}
