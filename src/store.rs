//! Favorites and recently viewed items.
//!
//! Both lists are persisted as JSON arrays of [`DocItem`] through a
//! [`KeyValueStore`], read once when the store is opened and rewritten after
//! every mutation.

use crate::error::Result;
use crate::types::DocItem;
use ahash::AHashSet;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const FAVORITES_KEY: &str = "rust-docs-favorites";
pub const HISTORY_KEY: &str = "rust-docs-history";

/// Maximum number of recent items kept.
pub const MAX_HISTORY: usize = 10;

/// Read/write-by-key persistence port.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, for tests and for running without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        // Write then rename so a crash never leaves a truncated list behind.
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

fn load_list(port: &dyn KeyValueStore, key: &str) -> Result<Vec<DocItem>> {
    let Some(content) = port.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&content) {
        Ok(items) => Ok(items),
        Err(e) => {
            // A corrupt list is not worth failing startup over.
            tracing::warn!(key, error = %e, "Ignoring unreadable stored list");
            Ok(Vec::new())
        }
    }
}

fn save_list(port: &dyn KeyValueStore, key: &str, items: &[DocItem]) -> Result<()> {
    let content = serde_json::to_string(items).context("Failed to serialize item list")?;
    port.set(key, &content)
}

/// Favorite items, newest first, unique by URL.
pub struct FavoritesStore {
    port: Arc<dyn KeyValueStore>,
    items: Vec<DocItem>,
    urls: AHashSet<String>,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("count", &self.items.len())
            .finish()
    }
}

impl FavoritesStore {
    pub fn open(port: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut items = load_list(port.as_ref(), FAVORITES_KEY)?;
        let mut urls = AHashSet::with_capacity(items.len());
        items.retain(|item| urls.insert(item.url.clone()));
        Ok(Self { port, items, urls })
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Add the item if absent, remove it if present. Returns whether it is now a favorite.
    ///
    /// Nothing changes in memory unless the new list was saved.
    pub fn toggle(&mut self, item: &DocItem) -> Result<bool> {
        let added = !self.urls.contains(&item.url);
        let mut items = self.items.clone();
        if added {
            items.insert(0, item.clone());
        } else {
            items.retain(|f| f.url != item.url);
        }

        save_list(self.port.as_ref(), FAVORITES_KEY, &items)?;

        self.items = items;
        if added {
            self.urls.insert(item.url.clone());
        } else {
            self.urls.remove(&item.url);
        }
        tracing::debug!(url = %item.url, added, "Toggled favorite");
        Ok(added)
    }
}

/// Recently opened items, most recent first, unique by URL, at most [`MAX_HISTORY`].
pub struct RecentsStore {
    port: Arc<dyn KeyValueStore>,
    items: Vec<DocItem>,
}

impl std::fmt::Debug for RecentsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentsStore")
            .field("count", &self.items.len())
            .finish()
    }
}

impl RecentsStore {
    pub fn open(port: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut items = load_list(port.as_ref(), HISTORY_KEY)?;
        let mut seen = AHashSet::with_capacity(items.len());
        items.retain(|item| seen.insert(item.url.clone()));
        items.truncate(MAX_HISTORY);
        Ok(Self { port, items })
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    /// Move (or insert) the item to the front. Nothing changes in memory unless
    /// the new list was saved.
    pub fn record(&mut self, item: &DocItem) -> Result<()> {
        let mut items = Vec::with_capacity(MAX_HISTORY);
        items.push(item.clone());
        items.extend(
            self.items
                .iter()
                .filter(|h| h.url != item.url)
                .take(MAX_HISTORY - 1)
                .cloned(),
        );

        save_list(self.port.as_ref(), HISTORY_KEY, &items)?;
        self.items = items;
        Ok(())
    }
}
