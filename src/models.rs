//! Data models for news signals and their verified representations.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`CandidateRecord`]: a provisionally parsed, unverified item from one
//!   line of model output
//! - [`NewsItem`]: the durable unit after URL sanitization and citation-based
//!   link verification
//! - [`Citation`] / [`GroundedReply`]: what the search-grounded upstream call
//!   hands back
//! - Tag enums: [`Platform`], [`Category`], [`Tool`]
//!
//! The tag enums are closed sets with an explicit fallback variant. The model
//! emits loosely-spelled tags ("Twitter", "HN", "guide"); [`Platform::from_tag`]
//! and friends normalize those leniently, while the `FromStr` impls are strict
//! and meant for CLI filter arguments where a typo should be an error rather
//! than a silent fallback.
//!
//! Persisted JSON uses camelCase field names so the stored feed matches the
//! shape the dashboard reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Snippet text used when the model leaves the summary field blank.
pub const SNIPPET_PLACEHOLDER: &str = "No summary provided.";

/// Source name used when the model leaves the source field blank.
pub const SOURCE_PLACEHOLDER: &str = "Unknown";

/// Where a news signal surfaced.
///
/// [`Platform::News`] doubles as the fallback for tags the model invents.
/// Deserialization funnels through [`Platform::from_tag`], so stored feeds
/// written with tags this build no longer knows still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Platform {
    X,
    Reddit,
    HackerNews,
    GitHub,
    Blog,
    YouTube,
    News,
}

impl From<String> for Platform {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl Platform {
    fn match_tag(tag: &str) -> Option<Self> {
        let t = tag.trim().to_lowercase();
        match t.as_str() {
            "x" | "twitter" | "x/twitter" | "twitter/x" => Some(Self::X),
            "hn" | "hackernews" | "hacker news" => Some(Self::HackerNews),
            "reddit" => Some(Self::Reddit),
            "github" => Some(Self::GitHub),
            "youtube" => Some(Self::YouTube),
            "news" => Some(Self::News),
            _ if t.contains("blog") => Some(Self::Blog),
            _ => None,
        }
    }

    /// Lenient tag normalization with fallback to [`Platform::News`].
    pub fn from_tag(tag: &str) -> Self {
        Self::match_tag(tag).unwrap_or(Self::News)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "X",
            Self::Reddit => "Reddit",
            Self::HackerNews => "HackerNews",
            Self::GitHub => "GitHub",
            Self::Blog => "Blog",
            Self::YouTube => "YouTube",
            Self::News => "News",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::match_tag(s).ok_or_else(|| format!("unknown platform tag: {s}"))
    }
}

/// What kind of signal an item is.
///
/// Serialized lowercase; [`Category::Community`] is the fallback, both for
/// model-invented tags and for stored tags from other builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Official,
    Release,
    Tutorial,
    Research,
    Community,
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl Category {
    fn match_tag(tag: &str) -> Option<Self> {
        let t = tag.trim().to_lowercase();
        if t.contains("official") {
            Some(Self::Official)
        } else if t.contains("release") {
            Some(Self::Release)
        } else if t.contains("tutorial") || t.contains("guide") {
            Some(Self::Tutorial)
        } else if t.contains("research") || t.contains("paper") {
            Some(Self::Research)
        } else if t.contains("community") {
            Some(Self::Community)
        } else {
            None
        }
    }

    /// Lenient tag normalization with fallback to [`Category::Community`].
    pub fn from_tag(tag: &str) -> Self {
        Self::match_tag(tag).unwrap_or(Self::Community)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Official => "official",
            Self::Release => "release",
            Self::Tutorial => "tutorial",
            Self::Research => "research",
            Self::Community => "community",
        };
        f.write_str(name)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::match_tag(s).ok_or_else(|| format!("unknown category tag: {s}"))
    }
}

/// Which developer tool an item concerns.
///
/// [`Tool::GeneralAi`] is the fallback for everything that does not mention a
/// tracked tool by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Tool {
    #[serde(rename = "Claude Code")]
    ClaudeCode,
    Cursor,
    #[serde(rename = "GitHub Copilot")]
    Copilot,
    #[serde(rename = "Gemini CLI")]
    GeminiCli,
    Windsurf,
    Aider,
    Codex,
    #[serde(rename = "General AI")]
    GeneralAi,
}

impl From<String> for Tool {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl Tool {
    fn match_tag(tag: &str) -> Option<Self> {
        let t = tag.trim().to_lowercase();
        if t.is_empty() {
            None
        } else if t.contains("claude") {
            Some(Self::ClaudeCode)
        } else if t.contains("cursor") {
            Some(Self::Cursor)
        } else if t.contains("copilot") {
            Some(Self::Copilot)
        } else if t.contains("gemini") {
            Some(Self::GeminiCli)
        } else if t.contains("windsurf") {
            Some(Self::Windsurf)
        } else if t.contains("aider") {
            Some(Self::Aider)
        } else if t.contains("codex") {
            Some(Self::Codex)
        } else if t.contains("general") {
            Some(Self::GeneralAi)
        } else {
            None
        }
    }

    /// Lenient tag normalization with fallback to [`Tool::GeneralAi`].
    pub fn from_tag(tag: &str) -> Self {
        Self::match_tag(tag).unwrap_or(Self::GeneralAi)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::Copilot => "GitHub Copilot",
            Self::GeminiCli => "Gemini CLI",
            Self::Windsurf => "Windsurf",
            Self::Aider => "Aider",
            Self::Codex => "Codex",
            Self::GeneralAi => "General AI",
        };
        f.write_str(name)
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::match_tag(s).ok_or_else(|| format!("unknown tool tag: {s}"))
    }
}

/// An authoritative (uri, title) pair from the search-grounding subsystem.
///
/// Citations are ground truth for link correctness: the verifier reconciles
/// model-stated URLs against this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    /// Page title as reported by the search backend; may be empty.
    pub title: String,
}

/// What the upstream call hands back: the model's free-text reply plus the
/// citation list backing it.
#[derive(Debug, Clone, Default)]
pub struct GroundedReply {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// A provisionally parsed news item extracted from one `[ITEM]` line.
///
/// Created transiently per line and discarded after verification. The raw URL
/// is whatever the model wrote, possibly empty or mangled; the tag fields are
/// already normalized to the closed enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub snippet: String,
    pub source: String,
    pub platform: Platform,
    pub raw_url: String,
    pub category: Category,
    pub tool: Tool,
    pub published_at_raw: Option<String>,
}

/// A verified news item, the durable unit of the feed.
///
/// `id` is a pure function of `url` (or of `title` when the URL is empty), so
/// favorites and "is this new" survive across independent fetch cycles. `url`
/// is either empty or a sanitizer-validated absolute http(s) URL.
/// `published_at` never lies in the future as of verification time. `is_new`
/// is transient: every merge clears it on retained history and sets it only on
/// genuinely unseen ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub source: String,
    pub platform: Platform,
    pub url: String,
    pub category: Category,
    pub tool: Tool,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub is_new: bool,
}
