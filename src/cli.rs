//! Command-line interface definitions for the newswire reader.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Filter flags reuse the same lenient tag parsing the sync pipeline applies
//! to model output, so `--tool cursor` and `--platform hn` just work.

use crate::feed::{CategoryChoice, RecencyWindow};
use crate::models::{Platform, Tool};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the newswire reader.
///
/// # Examples
///
/// ```sh
/// # Sync, then print everything
/// devtool_newswire
///
/// # Catch up on the week's Cursor items without touching the network
/// devtool_newswire --offline --tool cursor --window week
///
/// # Star an item id from an earlier listing
/// devtool_newswire --offline --favorite news-1abc2d
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding feed history and favorites
    #[arg(short, long, env = "NEWSWIRE_STATE_DIR", default_value = "./state")]
    pub state_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API key, overriding the environment variable named by the config
    #[arg(long, env = "NEWSWIRE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Skip the sync and present stored history only
    #[arg(long)]
    pub offline: bool,

    /// Extra query to run this sync, besides the configured ones (repeatable)
    #[arg(short, long)]
    pub query: Vec<String>,

    /// Toggle an item id in the favorites set (repeatable)
    #[arg(long)]
    pub favorite: Vec<String>,

    /// Category filter; "favorites" selects starred items
    #[arg(long)]
    pub category: Option<CategoryChoice>,

    /// Tool filter, e.g. "cursor" or "claude"
    #[arg(long)]
    pub tool: Option<Tool>,

    /// Platform filter, e.g. "reddit" or "hn"
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Case-insensitive substring matched against titles and snippets
    #[arg(long)]
    pub search: Option<String>,

    /// Recency window: day, week, month or half-year
    #[arg(short, long)]
    pub window: Option<RecencyWindow>,

    /// Maximum number of items to print
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Emit the presented feed as JSON instead of text lines
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["devtool_newswire"]);

        assert_eq!(cli.state_dir, PathBuf::from("./state"));
        assert!(!cli.offline);
        assert!(!cli.json);
        assert!(cli.category.is_none());
        assert!(cli.query.is_empty());
    }

    #[test]
    fn test_cli_filter_flags() {
        let cli = Cli::parse_from([
            "devtool_newswire",
            "--offline",
            "--category",
            "official",
            "--tool",
            "cursor",
            "--platform",
            "hn",
            "--window",
            "week",
            "--limit",
            "10",
        ]);

        assert!(cli.offline);
        assert_eq!(cli.category, Some(CategoryChoice::Is(Category::Official)));
        assert_eq!(cli.tool, Some(Tool::Cursor));
        assert_eq!(cli.platform, Some(Platform::HackerNews));
        assert_eq!(cli.window, Some(RecencyWindow::Week));
        assert_eq!(cli.limit, Some(10));
    }

    #[test]
    fn test_cli_favorites_pseudo_category() {
        let cli = Cli::parse_from(["devtool_newswire", "--category", "favorites"]);
        assert_eq!(cli.category, Some(CategoryChoice::Favorites));
    }

    #[test]
    fn test_cli_repeatable_flags() {
        let cli = Cli::parse_from([
            "devtool_newswire",
            "-q",
            "extra query one",
            "-q",
            "extra query two",
            "--favorite",
            "news-abc",
        ]);

        assert_eq!(cli.query.len(), 2);
        assert_eq!(cli.favorite, vec!["news-abc".to_string()]);
    }
}
