//! Accumulating merge of sync batches into the stored history.
//!
//! History is append-only: an id that has been seen keeps the stored item
//! forever, no matter what later syncs claim about it. Items are keyed by the
//! content id from [`crate::ident::derive_id`], so the same story re-fetched
//! under the same URL collapses to one entry.

use crate::models::NewsItem;
use std::collections::BTreeMap;
use tracing::debug;

/// Merge a freshly synced batch into the stored history.
///
/// Every retained item leaves with `is_new == false`; only ids seen for the
/// first time in `incoming` come out flagged new. Running the same merge
/// twice therefore converges: the second pass changes nothing but the flags.
pub fn merge_history(history: Vec<NewsItem>, incoming: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut by_id: BTreeMap<String, NewsItem> = BTreeMap::new();

    for mut item in history {
        item.is_new = false;
        by_id.entry(item.id.clone()).or_insert(item);
    }

    let seen = by_id.len();
    for mut item in incoming {
        item.is_new = true;
        by_id.entry(item.id.clone()).or_insert(item);
    }
    debug!(
        added = by_id.len() - seen,
        total = by_id.len(),
        "merged sync batch into history"
    );

    by_id.into_values().collect()
}
