//! Turning provider threads into bounded, ordered model input.

pub mod extract;
pub mod format;
pub mod html;

use serde::{Deserialize, Serialize};

pub use extract::{QUOTE_MARKER, extract_thread};
pub use format::{ContextInput, format_context};

/// One message of a thread, already reduced to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    /// RFC 822 `Message-ID`, used to thread replies.
    #[serde(default)]
    pub rfc_message_id: Option<String>,
    pub from: String,
    pub to: String,
    /// Provider-native date string, passed through as is.
    pub date: String,
    pub subject: String,
    pub body: String,
}

/// A thread's messages ordered oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadContext {
    pub thread_id: String,
    pub messages: Vec<ThreadMessage>,
}

impl ThreadContext {
    /// The message that started the thread.
    pub fn initiating(&self) -> Option<&ThreadMessage> {
        self.messages.first()
    }

    /// The message a reply answers.
    pub fn latest(&self) -> Option<&ThreadMessage> {
        self.messages.last()
    }
}
