use crate::core::PipelineError;
use crate::google::gmail::{Message, MessagePart, MessagePartBody, Thread, decode_base64};

use super::html::strip_html;
use super::{ThreadContext, ThreadMessage};

/// Start of the quoted history block Gmail appends to replies.
pub const QUOTE_MARKER: &str = "<div class=\"gmail_quote";

const UNKNOWN_SENDER: &str = "Unknown Sender";
const UNKNOWN_RECIPIENT: &str = "Unknown Recipient";
const UNKNOWN_DATE: &str = "Unknown Date";
const NO_SUBJECT: &str = "No Subject";

fn find_part<'a>(parts: &'a [MessagePart], mimetype: &str) -> Option<&'a MessagePart> {
    for part in parts {
        if part.mimetype.eq_ignore_ascii_case(mimetype) && has_data(part.body.as_ref()) {
            return Some(part);
        }
        if let Some(found) = part.parts.as_deref().and_then(|p| find_part(p, mimetype)) {
            return Some(found);
        }
    }
    None
}

fn has_data(body: Option<&MessagePartBody>) -> bool {
    body.and_then(|b| b.data.as_deref())
        .is_some_and(|d| !d.is_empty())
}

/// Raw (still encoded) body data to use for a message, if any.
fn select_body_data(message: &Message) -> Option<&str> {
    let payload = message.payload.as_ref()?;
    match payload.parts.as_deref() {
        Some(parts) if !parts.is_empty() => find_part(parts, "text/html")
            .or_else(|| find_part(parts, "text/plain"))
            .and_then(|part| part.body.as_ref())
            .and_then(|body| body.data.as_deref()),
        _ => payload.body.as_ref().and_then(|body| body.data.as_deref()),
    }
}

fn message_text(message: &Message, is_latest: bool) -> String {
    let snippet = message.snippet.as_deref().unwrap_or_default();

    let raw = match select_body_data(message) {
        Some(data) => decode_base64(data).unwrap_or_else(|| {
            tracing::warn!("Failed to decode body of message {}, using snippet", message.id);
            snippet.to_string()
        }),
        None => snippet.to_string(),
    };

    let raw = if is_latest {
        match raw.find(QUOTE_MARKER) {
            Some(idx) => &raw[..idx],
            None => raw.as_str(),
        }
    } else {
        raw.as_str()
    };

    strip_html(raw)
}

fn to_thread_message(message: &Message, is_latest: bool) -> ThreadMessage {
    let header = |name: &str, default: &str| {
        message
            .header(name)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    };

    ThreadMessage {
        id: message.id.clone(),
        rfc_message_id: message
            .header("Message-ID")
            .or_else(|| message.header("Message-Id"))
            .map(str::to_string),
        from: header("From", UNKNOWN_SENDER),
        to: header("To", UNKNOWN_RECIPIENT),
        date: header("Date", UNKNOWN_DATE),
        subject: header("Subject", NO_SUBJECT),
        body: message_text(message, is_latest),
    }
}

/// Normalize a provider thread (newest-first) into a context ordered
/// oldest-first. Quoted history is only trimmed from the newest message.
pub fn extract_thread(thread: &Thread) -> Result<ThreadContext, PipelineError> {
    if thread.messages.is_empty() {
        return Err(PipelineError::Validation(format!(
            "Thread {} has no messages",
            thread.id
        )));
    }

    let mut messages: Vec<ThreadMessage> = thread
        .messages
        .iter()
        .enumerate()
        .map(|(idx, message)| to_thread_message(message, idx == 0))
        .collect();
    messages.reverse();

    Ok(ThreadContext {
        thread_id: thread.id.clone(),
        messages,
    })
}
