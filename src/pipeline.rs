//! One sync cycle: fan out queries, verify the replies, merge into history.
//!
//! Queries run concurrently but the merge is a single pass in query order, so
//! a story reported by several queries lands in history exactly once and the
//! result of a sync does not depend on reply timing.

use crate::api::{ask_with_backoff, GroundedAsk, UpstreamError};
use crate::feed::merge_history;
use crate::models::{GroundedReply, NewsItem};
use crate::parse::parse_records;
use crate::store::{self, KeyValueStore, StoreError};
use crate::verify::verify_records;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// How many queries are in flight at once.
const QUERY_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("every query failed; stored history left untouched")]
    AllQueriesFailed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one sync cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// The full merged history after the sync.
    pub items: Vec<NewsItem>,
    /// Queries that returned a usable reply.
    pub queries_ok: usize,
    /// Queries that failed even after retries.
    pub queries_failed: usize,
    /// Verified items across all replies, before the history merge.
    pub fetched: usize,
    /// Items the history had not seen before.
    pub added: usize,
}

/// Run one full sync against the stored history.
///
/// Individual query failures are logged and absorbed; the sync only errors
/// when no query produced anything, in which case the store is not written.
#[instrument(level = "info", skip_all)]
pub async fn run_sync<C, S>(
    client: &C,
    store: &S,
    queries: &[String],
    max_retries: usize,
    base_delay: Duration,
    now: DateTime<Utc>,
) -> Result<SyncOutcome, SyncError>
where
    C: GroundedAsk<Reply = GroundedReply> + fmt::Debug,
    S: KeyValueStore,
{
    let t0 = Instant::now();
    info!(queries = queries.len(), "Starting sync");

    let mut replies: Vec<(usize, Result<GroundedReply, UpstreamError>)> =
        stream::iter(queries.iter().enumerate())
            .map(|(idx, query)| async move {
                (idx, ask_with_backoff(client, query, max_retries, base_delay).await)
            })
            .buffer_unordered(QUERY_CONCURRENCY)
            .collect()
            .await;

    // Completion order is timing-dependent; first-seen-wins must not be.
    replies.sort_by_key(|(idx, _)| *idx);

    let mut verified: Vec<NewsItem> = Vec::new();
    let mut queries_ok = 0usize;
    let mut queries_failed = 0usize;

    for (idx, result) in replies {
        match result {
            Ok(reply) => {
                let records = parse_records(&reply.text);
                let items = verify_records(records, &reply.citations, now);
                info!(
                    query = idx,
                    items = items.len(),
                    citations = reply.citations.len(),
                    "Query verified"
                );
                queries_ok += 1;
                verified.extend(items);
            }
            Err(error) => {
                warn!(query = idx, %error, "Query failed; continuing with the rest");
                queries_failed += 1;
            }
        }
    }

    if queries_ok == 0 && !queries.is_empty() {
        return Err(SyncError::AllQueriesFailed);
    }

    let history = store::load_history(store).await?;
    let fetched = verified.len();
    let merged = merge_history(history, verified);
    let added = merged.iter().filter(|item| item.is_new).count();
    store::save_history(store, &merged).await?;

    info!(
        fetched,
        added,
        total = merged.len(),
        queries_ok,
        queries_failed,
        elapsed_ms = t0.elapsed().as_millis() as u128,
        "Sync finished"
    );

    Ok(SyncOutcome {
        items: merged,
        queries_ok,
        queries_failed,
        fetched,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::derive_id;
    use crate::models::{Category, Citation, Platform, Tool};
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[derive(Debug)]
    enum Script {
        Reply(GroundedReply),
        Fail(u16),
    }

    /// Maps each prompt to a scripted outcome.
    #[derive(Debug, Default)]
    struct FakeModel {
        scripts: HashMap<String, Script>,
    }

    impl FakeModel {
        fn reply(mut self, prompt: &str, text: &str, citations: Vec<Citation>) -> Self {
            self.scripts.insert(
                prompt.to_string(),
                Script::Reply(GroundedReply {
                    text: text.to_string(),
                    citations,
                }),
            );
            self
        }

        fn fail(mut self, prompt: &str, status: u16) -> Self {
            self.scripts.insert(prompt.to_string(), Script::Fail(status));
            self
        }
    }

    impl GroundedAsk for FakeModel {
        type Reply = GroundedReply;

        async fn ask(&self, prompt: &str) -> Result<GroundedReply, UpstreamError> {
            match self.scripts.get(prompt) {
                Some(Script::Reply(reply)) => Ok(reply.clone()),
                Some(Script::Fail(status)) => Err(UpstreamError::Status {
                    status: *status,
                    message: "scripted failure".to_string(),
                }),
                None => Err(UpstreamError::Malformed("unscripted prompt".to_string())),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn queries(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn sync(
        model: &FakeModel,
        store: &MemoryStore,
        qs: &[String],
    ) -> Result<SyncOutcome, SyncError> {
        run_sync(model, store, qs, 0, Duration::from_millis(1), now()).await
    }

    #[tokio::test]
    async fn test_sync_grounds_records_against_citations() {
        let model = FakeModel::default().reply(
            "q",
            "[ITEM] Cursor ships agent mode >>> New autonomous refactor tool >>> DevBlog \
             >>> X >>> http://dev.example/... >>> official >>> Cursor >>> 2025-01-01",
            vec![Citation {
                uri: "https://dev.example/cursor-agent-mode".to_string(),
                title: "Cursor Ships Agent Mode For Refactoring".to_string(),
            }],
        );
        let store = MemoryStore::default();

        let outcome = sync(&model, &store, &queries(&["q"])).await.unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.added, 1);

        let item = &outcome.items[0];
        assert_eq!(item.title, "Cursor ships agent mode");
        assert_eq!(item.url, "https://dev.example/cursor-agent-mode");
        assert_eq!(item.id, derive_id("https://dev.example/cursor-agent-mode"));
        assert_eq!(item.platform, Platform::X);
        assert_eq!(item.category, Category::Official);
        assert_eq!(item.tool, Tool::Cursor);
        assert_eq!(
            item.published_at,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(item.is_new);
    }

    #[tokio::test]
    async fn test_resync_adds_nothing_and_clears_new_flags() {
        let model = FakeModel::default().reply(
            "q",
            "[ITEM] Stable story >>> s >>> src >>> News >>> https://a.io/stable-story",
            Vec::new(),
        );
        let store = MemoryStore::default();

        let first = sync(&model, &store, &queries(&["q"])).await.unwrap();
        assert_eq!(first.added, 1);
        assert!(first.items[0].is_new);

        let second = sync(&model, &store, &queries(&["q"])).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.items.len(), 1);
        assert!(!second.items[0].is_new);
        assert_eq!(first.items[0].id, second.items[0].id);
    }

    #[tokio::test]
    async fn test_partial_failure_still_merges() {
        let model = FakeModel::default()
            .reply(
                "good",
                "[ITEM] Survivor >>> s >>> src >>> News >>> https://a.io/survivor",
                Vec::new(),
            )
            .fail("bad", 500);
        let store = MemoryStore::default();

        let outcome = sync(&model, &store, &queries(&["good", "bad"])).await.unwrap();
        assert_eq!(outcome.queries_ok, 1);
        assert_eq!(outcome.queries_failed, 1);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].title, "Survivor");
    }

    #[tokio::test]
    async fn test_all_failed_leaves_history_untouched() {
        let model = FakeModel::default().fail("a", 500).fail("b", 500);
        let store = MemoryStore::default();

        let seeded = FakeModel::default().reply(
            "seed",
            "[ITEM] Seeded >>> s >>> src >>> News >>> https://a.io/seeded",
            Vec::new(),
        );
        sync(&seeded, &store, &queries(&["seed"])).await.unwrap();

        let err = sync(&model, &store, &queries(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, SyncError::AllQueriesFailed));

        let history = store::load_history(&store).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "Seeded");
    }

    #[tokio::test]
    async fn test_story_reported_by_two_queries_keeps_first() {
        let model = FakeModel::default()
            .reply(
                "q1",
                "[ITEM] First wording >>> s >>> src >>> News >>> https://a.io/same",
                Vec::new(),
            )
            .reply(
                "q2",
                "[ITEM] Second wording >>> s >>> src >>> News >>> https://a.io/same",
                Vec::new(),
            );
        let store = MemoryStore::default();

        let outcome = sync(&model, &store, &queries(&["q1", "q2"])).await.unwrap();
        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].title, "First wording");
    }
}
