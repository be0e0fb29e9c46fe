//! # Devtool Newswire
//!
//! A terminal news reader for the AI developer tooling scene. Each run asks a
//! search-grounded LLM for recent stories about tools like Claude Code,
//! Cursor and Copilot, verifies every reported link against the citations the
//! model actually consulted, and folds the result into a local history that
//! can be filtered, searched and starred offline.
//!
//! ## Usage
//!
//! ```sh
//! devtool_newswire --window week --tool cursor
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fan-out**: Send each configured query to the grounded model (4 at a time)
//! 2. **Parse**: Tokenize the `[ITEM]` line protocol into candidate records
//! 3. **Verify**: Sanitize URLs and substitute citation links where warranted
//! 4. **Merge**: Fold the batch into stored history, flagging unseen items
//! 5. **Present**: Filter, sort and print the feed

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod feed;
mod ident;
mod models;
mod parse;
mod pipeline;
mod sanitize;
mod store;
mod utils;
mod verify;

use api::{GroundedClient, UpstreamError};
use cli::Cli;
use config::{load_config, NewsConfig};
use feed::{present, FeedFilters};
use models::NewsItem;
use pipeline::run_sync;
use store::JsonFileStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    // Logs go to stderr; stdout is reserved for the feed itself.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("devtool_newswire starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.state_dir, ?args.offline, "Parsed CLI arguments");

    // Early check: ensure the state directory is writable
    if let Err(e) = ensure_writable_dir(&args.state_dir).await {
        error!(
            path = %args.state_dir.display(),
            error = %e,
            "State directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let store = JsonFileStore::new(&args.state_dir);

    // ---- Favorites toggles ----
    let mut favorites = store::load_favorites(&store).await?;
    if !args.favorite.is_empty() {
        for id in &args.favorite {
            if favorites.remove(id) {
                info!(id = %id, "Unstarred item");
            } else {
                favorites.insert(id.clone());
                info!(id = %id, "Starred item");
            }
        }
        store::save_favorites(&store, &favorites).await?;
    }

    // ---- Config ----
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            debug!("No config file given; using defaults");
            NewsConfig::default()
        }
    };

    let mut queries = config.queries.clone();
    queries.extend(args.query.iter().cloned());

    // ---- Sync (unless offline) ----
    let items: Vec<NewsItem> = if args.offline {
        info!("Offline; presenting stored history only");
        store::load_history(&store).await?
    } else {
        let api_key = match args.api_key.clone() {
            Some(key) => key,
            None => std::env::var(&config.api_key_env)
                .map_err(|_| UpstreamError::MissingApiKey(config.api_key_env.clone()))?,
        };
        let client = GroundedClient::new(
            config.api_base.clone(),
            config.model.clone(),
            api_key,
            config.request_timeout(),
        )?;

        match run_sync(
            &client,
            &store,
            &queries,
            config.max_retries,
            config.initial_delay(),
            Utc::now(),
        )
        .await
        {
            Ok(outcome) => outcome.items,
            Err(e) => {
                // A reader with stale news beats no reader at all.
                error!(error = %e, "Sync failed; falling back to stored history");
                store::load_history(&store).await?
            }
        }
    };

    // ---- Present ----
    let filters = FeedFilters {
        category: args.category,
        tool: args.tool,
        platform: args.platform,
        search: args.search.clone(),
        window: args.window,
    };
    let mut shown = present(&items, &filters, &favorites, Utc::now());
    let total = shown.len();
    if let Some(limit) = args.limit {
        shown.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        render_text(&shown, total);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Print the feed as indented text blocks, one per item. Unseen items get a
/// `*` marker in the left margin.
fn render_text(items: &[NewsItem], total: usize) {
    if items.is_empty() {
        println!("No matching items.");
        return;
    }

    for item in items {
        let marker = if item.is_new { '*' } else { ' ' };
        println!(
            "{} {}  {}  [{}] {}",
            marker,
            item.published_at.format("%Y-%m-%d"),
            item.id,
            item.category,
            item.title
        );
        println!("      {}", item.snippet);
        if item.url.is_empty() {
            println!("      {} | {} | {}", item.tool, item.platform, item.source);
        } else {
            println!(
                "      {} | {} | {} | {}",
                item.tool, item.platform, item.source, item.url
            );
        }
    }

    if items.len() < total {
        println!("({} of {} items shown)", items.len(), total);
    } else {
        println!("({} items)", total);
    }
}
