//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since email
//! content should be considered untrusted and Handlebars forces you
//! to add only what you need.
//!
//! Escaping is turned off: the output is model input, not a web page.

use std::fmt;
use std::sync::LazyLock;

use handlebars::{Handlebars, handlebars_helper, no_escape};

// A simple `inc` helper for use with `each` and `@index` so that
// there can be natural number sequences when rendering (instead of
// starting at 0).
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

/// Token the model inserts wherever it needs a fact it doesn't have.
pub const PLACEHOLDER: &str = "[PLACEHOLDER]";

#[derive(Debug)]
pub enum Prompt {
    ThreadContext,
    DraftDirective,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Implement the Into trait so that Prompt can be converted to an &str
impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const THREAD_CONTEXT_PROMPT: &str = r"{{#if previous}}PREVIOUS EMAIL THREAD (for context only):
{{#each previous}}
--- Message {{inc @index}} ---
From: {{from}}
To: {{to}}
Date: {{date}}
Subject: {{subject}}
Content: {{body}}
{{/each}}

{{/if}}LATEST EMAIL (Reply to this):
From: {{latest.from}}
To: {{latest.to}}
Date: {{latest.date}}
Subject: {{latest.subject}}
Content: {{latest.body}}
";

const DRAFT_DIRECTIVE_PROMPT: &str = r"You are an assistant drafting an email reply on behalf of {{sender_name}}.

Read the entire email thread provided by the user for context, but write a reply to the LATEST EMAIL only.

Rules:
- Write in a {{style}} style.
- Return the reply as HTML suitable for an email body. Use <p> for paragraphs and a <ul> list wherever the content can be enumerated.
- Do not include a subject line or any text outside of the reply itself.
- Where the reply needs a fact you do not know (a date, a number, a name, an attachment), insert the exact token {{placeholder}} instead.
- Never invent facts, commitments, or details that are not present in the thread.
- Sign the reply as {{sender_name}}.
";

/// Every prompt, registered once for the life of the process.
pub static TEMPLATES: LazyLock<Handlebars<'static>> = LazyLock::new(templates);

fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(no_escape);
    registry.register_helper("inc", Box::new(inc));
    registry
        .register_template_string(&Prompt::ThreadContext.to_string(), THREAD_CONTEXT_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::DraftDirective.to_string(), DRAFT_DIRECTIVE_PROMPT)
        .expect("Failed to register template");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_directive_renders_without_escaping() {
        let rendered = TEMPLATES
            .render(
                &Prompt::DraftDirective.to_string(),
                &json!({"sender_name": "Sam & Co", "style": "Casual", "placeholder": PLACEHOLDER}),
            )
            .unwrap();
        assert!(rendered.contains("on behalf of Sam & Co."));
        assert!(rendered.contains("Write in a Casual style."));
        assert!(rendered.contains("[PLACEHOLDER]"));
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let result = TEMPLATES.render(&Prompt::DraftDirective.to_string(), &json!({}));
        assert!(result.is_err());
    }
}
