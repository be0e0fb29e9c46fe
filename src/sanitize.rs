//! URL sanitization for model-stated links.
//!
//! Models truncate, mangle, and invent URLs. This module normalizes the
//! salvageable cases (markdown wrappers, missing schemes, trailing prose
//! punctuation) and rejects the hopeless ones (truncated stubs, placeholder
//! domains, anything that fails strict URL parsing). The policy here is
//! strict: an empty result means "no link", and downstream a non-linkable
//! item is still a valid, displayable item. That beats handing a renderer a
//! plausible-but-invalid href.
//!
//! Steps run in a fixed order: extract → trim punctuation → reject truncated →
//! reject placeholder → default scheme → validate.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

/// Inputs shorter than this that carry an ellipsis are truncation debris.
pub const TRUNCATION_MIN_LEN: usize = 20;

/// Domain fragments that mark an invented, template-style link.
const PLACEHOLDER_MARKERS: [&str; 2] = ["example.com", "your-url-here"];

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(\s*([^)\s]+)").expect("markdown link pattern"));

static PAREN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(https?://[^)\s]+)").expect("paren url pattern"));

/// True if the text carries a truncation marker, ASCII or typographic.
pub fn contains_ellipsis(s: &str) -> bool {
    s.contains("...") || s.contains('…')
}

/// Normalize a raw model-stated URL, or return an empty string when nothing
/// trustworthy can be salvaged.
///
/// The returned text is the cleaned input, not a re-serialized URL, so an
/// exact comparison against a citation URI still works.
pub fn sanitize_url(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return String::new();
    }

    // Models love wrapping links: "[title](https://...)" or "see (https://...)".
    if let Some(caps) = MARKDOWN_LINK.captures(&text) {
        text = caps[1].trim().to_string();
    } else if let Some(caps) = PAREN_URL.captures(&text) {
        text = caps[1].trim().to_string();
    }

    // Checked before the punctuation trim: a tail ellipsis must not dodge the
    // truncation test by losing one of its dots.
    if contains_ellipsis(&text) && text.chars().count() < TRUNCATION_MIN_LEN {
        debug!(url = %text, "rejecting truncated url stub");
        return String::new();
    }

    // One trailing punctuation character from surrounding prose.
    if text.ends_with(|c: char| matches!(c, '.' | ',' | ';' | '!')) {
        text.pop();
    }

    let lower = text.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
        debug!(url = %text, "rejecting placeholder url");
        return String::new();
    }

    let has_scheme = text.contains("://");
    if !has_scheme && text.contains('.') {
        text = format!("https://{text}");
    }

    match Url::parse(&text) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => {
            text
        }
        _ => {
            debug!(url = %text, "rejecting unparsable url");
            String::new()
        }
    }
}
