//! HTML to plain text for model input.
//!
//! Link targets and list markers are dropped; only the visible text
//! survives.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("valid regex")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

// Block-level tags get a space so words on either side don't run together
static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|li|ul|ol|tr|td|th|table|h[1-6]|blockquote)\b[^>]*>")
        .expect("valid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z/!?][^>]*>").expect("valid regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:(\d+)|[xX]([0-9a-fA-F]+));").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse every run of whitespace into a single space and trim.
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}

/// Decode HTML entities in a string
pub fn html_entity_decode(input: &str) -> String {
    let decoded = NUMERIC_ENTITY_RE.replace_all(input, |caps: &regex::Captures| {
        let codepoint = match (caps.get(1), caps.get(2)) {
            (Some(decimal), _) => decimal.as_str().parse::<u32>().ok(),
            (_, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            _ => None,
        };
        codepoint
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    // `&amp;` goes last so `&amp;lt;` decodes to the literal `&lt;`
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&copy;", "\u{a9}")
        .replace("&reg;", "\u{ae}")
        .replace("&trade;", "\u{2122}")
        .replace("&amp;", "&")
}

/// Unescape entities, remove script/style blocks, strip the remaining
/// tags and collapse whitespace. The output never contains a tag, so
/// stripping it again is a no-op.
pub fn strip_html(input: &str) -> String {
    // Entities go first so escaped markup can't come back as tags
    let text = html_entity_decode(input);
    let text = SCRIPT_STYLE_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let mut text = BLOCK_TAG_RE.replace_all(&text, " ").into_owned();

    // Removing one tag can expose another, e.g. `<<b>i>`
    while TAG_RE.is_match(&text) {
        text = TAG_RE.replace_all(&text, "").into_owned();
    }
    collapse_whitespace(&text)
}

/// Rough check used to decide whether a stored string is markup.
pub fn looks_like_html(input: &str) -> bool {
    TAG_RE.is_match(input)
}
