//! Build the raw RFC 822 reply handed to the Gmail drafts/send endpoints.

use lettre::Message;
use lettre::message::{Mailbox, Mailboxes, header::ContentType};

use super::gmail::base64_url_no_pad;
use crate::core::PipelineError;

pub struct ReplyEnvelope<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    /// `Message-ID` of the message being answered, used for threading.
    pub in_reply_to: Option<&'a str>,
}

pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let already_reply = trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        trimmed.to_string()
    } else {
        format!("Re: {}", trimmed)
    }
}

/// Returns the message base64url encoded, ready for the `raw` field.
pub fn build_reply_raw(envelope: &ReplyEnvelope, html_body: &str) -> Result<String, PipelineError> {
    let from: Mailbox = envelope
        .from
        .parse()
        .map_err(|e| PipelineError::Validation(format!("Invalid sender address: {}", e)))?;
    let to: Mailboxes = envelope
        .to
        .parse()
        .map_err(|e| PipelineError::Validation(format!("Invalid recipient address: {}", e)))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(reply_subject(envelope.subject));
    for mailbox in to {
        builder = builder.to(mailbox);
    }
    if let Some(id) = envelope.in_reply_to {
        builder = builder
            .in_reply_to(id.to_string())
            .references(id.to_string());
    }

    let message = builder
        .header(ContentType::TEXT_HTML)
        .body(html_body.to_string())
        .map_err(|e| PipelineError::Validation(format!("Failed to build reply: {}", e)))?;

    Ok(base64_url_no_pad(&message.formatted()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::gmail::decode_base64;

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject("Lunch?"), "Re: Lunch?");
        assert_eq!(reply_subject("Re: Lunch?"), "Re: Lunch?");
        assert_eq!(reply_subject("RE: Lunch?"), "RE: Lunch?");
        assert_eq!(reply_subject(""), "Re: ");
        assert_eq!(reply_subject("1€ offer"), "Re: 1€ offer");
        assert_eq!(reply_subject("été"), "Re: été");
    }

    #[test]
    fn test_build_reply_raw_with_non_ascii_subject() {
        let envelope = ReplyEnvelope {
            from: "me@example.com",
            to: "alice@example.com",
            subject: "🎉 Party on Friday",
            in_reply_to: None,
        };
        let raw = build_reply_raw(&envelope, "<p>I'm in</p>").unwrap();
        let decoded = decode_base64(&raw).unwrap();
        assert!(decoded.contains("Subject: "));
        assert!(decoded.contains("<p>I'm in</p>"));
    }

    #[test]
    fn test_build_reply_raw_threads_the_reply() {
        let envelope = ReplyEnvelope {
            from: "me@example.com",
            to: "Alice <alice@example.com>",
            subject: "Hello",
            in_reply_to: Some("<abc123@mail.example.com>"),
        };
        let raw = build_reply_raw(&envelope, "<p>Hi Alice</p>").unwrap();
        let decoded = decode_base64(&raw).unwrap();

        assert!(decoded.contains("Subject: Re: Hello"));
        assert!(decoded.contains("In-Reply-To: <abc123@mail.example.com>"));
        assert!(decoded.contains("References: <abc123@mail.example.com>"));
        assert!(decoded.contains("alice@example.com"));
        assert!(decoded.contains("text/html"));
        assert!(decoded.contains("<p>Hi Alice</p>"));
    }

    #[test]
    fn test_build_reply_raw_rejects_bad_recipient() {
        let envelope = ReplyEnvelope {
            from: "me@example.com",
            to: "not an address",
            subject: "Hello",
            in_reply_to: None,
        };
        let err = build_reply_raw(&envelope, "<p>Hi</p>").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
