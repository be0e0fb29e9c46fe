//! Line-protocol parser for model replies.
//!
//! The model is asked to emit one record per line, marked with `[ITEM]` and
//! field-separated by `>>>`:
//!
//! ```text
//! [ITEM] title >>> snippet >>> source >>> platform >>> url >>> category >>> tool >>> date
//! ```
//!
//! Naive splitting on commas or single characters falls apart the moment the
//! model writes prose containing them; the explicit marker and the
//! multi-character separator exist to make accidental collisions unlikely.
//! Lines without the marker, or with fewer than five fields after it, are
//! skipped silently — malformed output reduces yield, it never raises.

use crate::models::{
    CandidateRecord, Category, Platform, Tool, SNIPPET_PLACEHOLDER, SOURCE_PLACEHOLDER,
};
use tracing::debug;

/// Marker a line must carry to be considered a record.
pub const ITEM_MARKER: &str = "[ITEM]";

/// Multi-character field separator.
pub const FIELD_SEPARATOR: &str = ">>>";

/// Fields required for a line to count: title through url.
const MIN_FIELDS: usize = 5;

/// Tokenize a model reply into candidate records, one per well-formed line.
pub fn parse_records(text: &str) -> Vec<CandidateRecord> {
    let mut records = Vec::new();

    for line in text.lines() {
        let Some(marker_at) = line.find(ITEM_MARKER) else {
            continue;
        };
        let payload = &line[marker_at + ITEM_MARKER.len()..];
        let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            debug!(
                fields = fields.len(),
                line = %line.trim(),
                "skipping line with too few fields"
            );
            continue;
        }

        records.push(CandidateRecord {
            title: strip_title_markup(fields[0]),
            snippet: field_or(&fields, 1, SNIPPET_PLACEHOLDER),
            source: field_or(&fields, 2, SOURCE_PLACEHOLDER),
            platform: Platform::from_tag(field_raw(&fields, 3)),
            raw_url: fields[4].to_string(),
            category: Category::from_tag(field_raw(&fields, 5)),
            tool: Tool::from_tag(field_raw(&fields, 6)),
            published_at_raw: match field_raw(&fields, 7) {
                "" => None,
                raw => Some(raw.to_string()),
            },
        });
    }

    records
}

/// Strip the leading run of list/heading markup the model tends to prepend.
fn strip_title_markup(title: &str) -> String {
    title
        .trim_start_matches(|c: char| matches!(c, '#' | '*' | '-' | '•' | '·') || c.is_whitespace())
        .to_string()
}

fn field_raw<'a>(fields: &[&'a str], idx: usize) -> &'a str {
    fields.get(idx).copied().unwrap_or("")
}

fn field_or(fields: &[&str], idx: usize, default: &str) -> String {
    match field_raw(fields, idx) {
        "" => default.to_string(),
        value => value.to_string(),
    }
}
