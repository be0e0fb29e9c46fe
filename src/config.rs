//! YAML configuration for the sync side of the reader.
//!
//! Everything has a workable default, so a config file is only needed to
//! point at a different endpoint, change the retry posture, or replace the
//! query list.

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Query sent when the config lists none.
///
/// The prompt pins down the line protocol the parser expects: one record per
/// line, `[ITEM]`-marked, `>>>`-separated. Models follow formats they are
/// shown far more reliably than formats they are described.
pub const DEFAULT_QUERY: &str = "\
Find the latest news from the past week about AI developer tools: releases, \
features, tutorials, research and community discussion around Claude Code, \
Cursor, GitHub Copilot, Gemini CLI, Windsurf, Aider and Codex.
Return each story on its own line, formatted exactly as:
[ITEM] title >>> summary (max 30 words) >>> source name >>> platform (X, \
Reddit, Hacker News, GitHub, Blog, YouTube, News) >>> url >>> category \
(official, release, tutorial, research, community) >>> tool (Claude Code, \
Cursor, GitHub Copilot, Gemini CLI, Windsurf, Aider, Codex, General AI) >>> \
publication date (YYYY-MM-DD)
Use >>> only as the field separator and start every line with [ITEM]. \
Output nothing else.";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Base URL of the generateContent API.
    pub api_base: String,
    /// Model name appended to the base URL.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    /// Queries fanned out per sync. Each reply is parsed independently and
    /// the batches merge into one history.
    pub queries: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 60,
            max_retries: 3,
            initial_delay_ms: 1500,
            queries: vec![DEFAULT_QUERY.to_string()],
        }
    }
}

impl NewsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// Load configuration from a YAML file, normalizing an empty query list back
/// to the default so a sync always asks something.
pub fn load_config(path: &Path) -> Result<NewsConfig, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let mut config: NewsConfig = serde_yaml::from_str(&text)?;
    if config.queries.is_empty() {
        config.queries = vec![DEFAULT_QUERY.to_string()];
    }
    info!(
        path = %path.display(),
        model = %config.model,
        queries = config.queries.len(),
        "Loaded configuration"
    );
    Ok(config)
}
