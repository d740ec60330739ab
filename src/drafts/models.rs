use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::context::ThreadContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DraftStatus {
    Draft,
    Sent,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "DRAFT",
            DraftStatus::Sent => "SENT",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(DraftStatus::Draft),
            "SENT" => Ok(DraftStatus::Sent),
            other => Err(anyhow!("Unknown draft status {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftRecord {
    pub id: i64,
    pub user_email: String,
    pub thread_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub draft_body: String,
    /// Serialized `ThreadContext` snapshot. Cleared once the draft is
    /// finalized.
    pub thread_context: Option<String>,
    pub status: DraftStatus,
    pub provider_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized,
    /// There was no open draft for the thread.
    NotFound,
}

/// The address part of a mailbox header, lowercased.
/// `"Alice <Alice@Example.com>"` becomes `"alice@example.com"`.
pub fn bare_address(mailbox: &str) -> String {
    let mailbox = mailbox.trim();
    let address = match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(start), Some(end)) if start < end => &mailbox[start + 1..end],
        _ => mailbox,
    };
    address.trim().to_lowercase()
}

/// Who a reply in this thread goes to: the side of the initiating
/// message that isn't the user.
pub fn reply_recipient(context: &ThreadContext, user_email: &str) -> Option<String> {
    let initiating = context.initiating()?;
    if bare_address(&initiating.from) == bare_address(user_email) {
        Some(initiating.to.clone())
    } else {
        Some(initiating.from.clone())
    }
}
