use serde_json::json;

use super::html::{collapse_whitespace, looks_like_html, strip_html};
use super::{ThreadContext, ThreadMessage};
use crate::ai::prompt::{Prompt, TEMPLATES};
use crate::core::PipelineError;

/// What the formatter was handed. Decided once, at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextInput {
    Structured(ThreadContext),
    RawHtml(String),
    PlainText(String),
}

impl ContextInput {
    /// Classify an untyped string: a serialized `ThreadContext`, markup,
    /// or plain text.
    pub fn resolve(input: &str) -> Self {
        if let Ok(context) = serde_json::from_str::<ThreadContext>(input) {
            return ContextInput::Structured(context);
        }
        if looks_like_html(input) {
            ContextInput::RawHtml(input.to_string())
        } else {
            ContextInput::PlainText(input.to_string())
        }
    }
}

impl From<ThreadContext> for ContextInput {
    fn from(context: ThreadContext) -> Self {
        ContextInput::Structured(context)
    }
}

fn message_json(message: &ThreadMessage) -> serde_json::Value {
    json!({
        "from": message.from,
        "to": message.to,
        "date": message.date,
        "subject": message.subject,
        "body": strip_html(&message.body),
    })
}

fn format_structured(context: &ThreadContext) -> Result<String, PipelineError> {
    let Some((latest, previous)) = context.messages.split_last() else {
        return Err(PipelineError::Validation(format!(
            "Thread {} has no messages to format",
            context.thread_id
        )));
    };

    let data = json!({
        "previous": previous.iter().map(message_json).collect::<Vec<_>>(),
        "latest": message_json(latest),
    });

    TEMPLATES
        .render(&Prompt::ThreadContext.to_string(), &data)
        .map_err(|e| PipelineError::Internal(anyhow::anyhow!("Failed to render context: {}", e)))
}

/// Render model input text. Deterministic, and formatting an already
/// formatted plain string returns it unchanged.
pub fn format_context(input: &ContextInput) -> Result<String, PipelineError> {
    match input {
        ContextInput::Structured(context) => format_structured(context),
        ContextInput::RawHtml(html) => Ok(strip_html(html)),
        ContextInput::PlainText(text) => Ok(collapse_whitespace(text)),
    }
}
