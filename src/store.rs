//! Persistence for feed history and starred items.
//!
//! State lives as JSON documents behind a small string key-value seam, so the
//! sync logic never touches the filesystem directly. Loading is fail-soft: a
//! missing or unreadable document comes back as the empty state with a
//! warning, never as an error, because losing history must not brick the
//! reader.

use crate::models::NewsItem;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Key under which the accumulated feed history is stored.
pub const HISTORY_KEY: &str = "news-feed-history";

/// Key under which the starred item ids are stored.
pub const FAVORITES_KEY: &str = "news-feed-favorites";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String documents by key. Implementations decide where the bytes live.
pub trait KeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `{dir}/{key}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }
}

/// In-memory store for exercising sync logic without a filesystem.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

async fn load_json<S, T>(store: &S, key: &str, what: &str) -> Result<T, StoreError>
where
    S: KeyValueStore,
    T: DeserializeOwned + Default,
{
    let Some(text) = store.load(key).await? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!(key, %error, "discarding unreadable {} state", what);
            Ok(T::default())
        }
    }
}

async fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string_pretty(value)?;
    store.save(key, &text).await
}

pub async fn load_history<S: KeyValueStore>(store: &S) -> Result<Vec<NewsItem>, StoreError> {
    load_json(store, HISTORY_KEY, "history").await
}

pub async fn save_history<S: KeyValueStore>(
    store: &S,
    items: &[NewsItem],
) -> Result<(), StoreError> {
    save_json(store, HISTORY_KEY, items).await
}

pub async fn load_favorites<S: KeyValueStore>(store: &S) -> Result<HashSet<String>, StoreError> {
    let ids: Vec<String> = load_json(store, FAVORITES_KEY, "favorites").await?;
    Ok(ids.into_iter().collect())
}

/// Favorites are written sorted so the file is diffable across runs.
pub async fn save_favorites<S: KeyValueStore>(
    store: &S,
    favorites: &HashSet<String>,
) -> Result<(), StoreError> {
    let mut ids: Vec<&String> = favorites.iter().collect();
    ids.sort();
    save_json(store, FAVORITES_KEY, &ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::derive_id;
    use crate::models::{Category, Platform, Tool};
    use chrono::{TimeZone, Utc};

    fn item(url: &str) -> NewsItem {
        NewsItem {
            id: derive_id(url),
            title: "Title".to_string(),
            snippet: "snippet".to_string(),
            source: "src".to_string(),
            platform: Platform::News,
            url: url.to_string(),
            category: Category::Community,
            tool: Tool::GeneralAi,
            published_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            is_new: true,
        }
    }

    #[tokio::test]
    async fn test_history_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let items = vec![item("https://a.io/1"), item("https://a.io/2")];
        save_history(&store, &items).await.unwrap();

        let loaded = load_history(&store).await.unwrap();
        assert_eq!(loaded, items);
    }

    #[tokio::test]
    async fn test_missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("never-created"));

        assert!(load_history(&store).await.unwrap().is_empty());
        assert!(load_favorites(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_state_is_discarded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(dir.path().join(format!("{HISTORY_KEY}.json")), "{ not json").unwrap();

        assert!(load_history(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state"));

        save_history(&store, &[item("https://a.io/1")]).await.unwrap();
        assert_eq!(load_history(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_favorites_round_trip_in_memory() {
        let store = MemoryStore::default();
        let favorites: HashSet<String> =
            ["news-abc".to_string(), "news-def".to_string()].into();

        save_favorites(&store, &favorites).await.unwrap();
        assert_eq!(load_favorites(&store).await.unwrap(), favorites);
    }
}
