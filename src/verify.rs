//! Citation-backed verification of parsed records.
//!
//! The model hallucinates URLs more readily than anything else, so the URL a
//! record carries is only trusted when the grounding citations agree with it.
//! A record URL that exactly matches a citation passes through untouched; any
//! other record is scored against every citation by title-word overlap and,
//! when the evidence points at a citation (or the record URL is suspect on its
//! face), the citation's URI replaces the model's.

use crate::ident::derive_id;
use crate::models::{CandidateRecord, Citation, NewsItem, SOURCE_PLACEHOLDER};
use crate::sanitize::{contains_ellipsis, sanitize_url};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::debug;

/// URLs shorter than this are treated as truncated or fabricated stubs.
pub const MIN_PLAUSIBLE_URL_LEN: usize = 15;

/// Words shorter than this carry no signal for title matching.
const MIN_MATCH_WORD_LEN: usize = 3;

/// A sanitized URL that still looks fabricated or truncated.
pub fn is_suspect(url: &str) -> bool {
    url.is_empty()
        || url.chars().count() < MIN_PLAUSIBLE_URL_LEN
        || !(url.starts_with("http://") || url.starts_with("https://"))
        || contains_ellipsis(url)
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Count citation-title words (over the noise threshold) that also occur in
/// the record title. Case and surrounding punctuation are ignored.
fn title_overlap(record_title: &str, citation_title: &str) -> usize {
    let record_words: HashSet<String> = record_title
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();

    citation_title
        .split_whitespace()
        .map(|w| normalize_word(w))
        .filter(|w| w.chars().count() > MIN_MATCH_WORD_LEN && record_words.contains(w))
        .count()
}

/// The citation whose title best overlaps the record's. Ties keep the
/// earliest citation, which tends to be the model's primary ground.
fn best_citation<'a>(record_title: &str, citations: &'a [Citation]) -> (usize, &'a Citation) {
    let mut best = &citations[0];
    let mut best_score = title_overlap(record_title, &best.title);

    for citation in &citations[1..] {
        let score = title_overlap(record_title, &citation.title);
        if score > best_score {
            best_score = score;
            best = citation;
        }
    }

    (best_score, best)
}

/// Promote a parsed record to a feed item, or drop it.
///
/// Returns `None` only for records with no title at all; everything else is
/// salvaged with whatever the citations can vouch for.
pub fn verify_record(
    record: CandidateRecord,
    citations: &[Citation],
    now: DateTime<Utc>,
) -> Option<NewsItem> {
    let title = record.title.trim().to_string();
    if title.is_empty() {
        debug!("dropping untitled record");
        return None;
    }

    let mut url = sanitize_url(&record.raw_url);
    let mut source = record.source;

    let exact_match = citations.iter().any(|c| c.uri == url);
    if !citations.is_empty() && !exact_match {
        let (score, citation) = best_citation(&title, citations);
        if score > 0 || is_suspect(&url) {
            debug!(
                title = %title,
                from = %url,
                to = %citation.uri,
                score,
                "substituting citation url"
            );
            url = citation.uri.clone();
            let citation_title = citation.title.trim();
            if (source == SOURCE_PLACEHOLDER || source.trim().is_empty())
                && !citation_title.is_empty()
            {
                source = citation_title.to_string();
            }
        }
    }

    let id = if url.is_empty() {
        derive_id(&title)
    } else {
        derive_id(&url)
    };

    Some(NewsItem {
        id,
        title,
        snippet: record.snippet,
        source,
        platform: record.platform,
        url,
        category: record.category,
        tool: record.tool,
        published_at: sanitize_published_at(record.published_at_raw.as_deref(), now),
        is_new: false,
    })
}

/// Verify a whole batch and drop duplicate ids, keeping the first occurrence.
pub fn verify_records(
    records: Vec<CandidateRecord>,
    citations: &[Citation],
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    records
        .into_iter()
        .filter_map(|record| verify_record(record, citations, now))
        .unique_by(|item| item.id.clone())
        .collect()
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Parse a model-supplied publication date, clamping the future to `now` and
/// falling back to `now` when absent or unreadable.
pub fn sanitize_published_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    match parse_published(raw) {
        Some(parsed) if parsed > now => {
            debug!(raw, "clamping future publication date");
            now
        }
        Some(parsed) => parsed,
        None => {
            debug!(raw, "unreadable publication date, defaulting to now");
            now
        }
    }
}
