//! The consumer-facing view of the pipeline.
//!
//! A [`DocSession`] exposes the current item list, a loading flag and the last
//! terminal error, and accepts the two caller events: favorite toggled and item
//! opened. Loads run in the background; if the session is dropped before a load
//! finishes, the result is discarded.

use crate::decode::{DecodeStats, DecodedIndex};
use crate::error::{PipelineError, Result};
use crate::store::{FavoritesStore, KeyValueStore, RecentsStore};
use crate::types::DocItem;
use crate::worker::DocState;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct ViewState {
    index: Option<Arc<DecodedIndex>>,
    loading: bool,
    error: Option<PipelineError>,
    /// Bumped per load so an older load never overwrites a newer one.
    generation: u64,
}

/// Point-in-time copy of what the caller renders.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub index: Option<Arc<DecodedIndex>>,
    pub loading: bool,
    pub error: Option<PipelineError>,
}

impl Snapshot {
    /// Decoded items, empty until the first load succeeds.
    pub fn items(&self) -> &[DocItem] {
        match &self.index {
            Some(index) => &index.items,
            None => &[],
        }
    }

    pub fn stats(&self) -> Option<&DecodeStats> {
        self.index.as_ref().map(|index| &index.stats)
    }
}

pub struct DocSession {
    state: Arc<DocState>,
    version: String,
    view: Arc<RwLock<ViewState>>,
    favorites: Mutex<FavoritesStore>,
    recents: Mutex<RecentsStore>,
}

impl std::fmt::Debug for DocSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocSession")
            .field("version", &self.version)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DocSession {
    /// Open a session, reading favorites and recents from `storage` once.
    pub fn new(
        state: Arc<DocState>,
        version: impl Into<String>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        Ok(Self {
            state,
            version: version.into(),
            view: Arc::new(RwLock::new(ViewState::default())),
            favorites: Mutex::new(FavoritesStore::open(Arc::clone(&storage))?),
            recents: Mutex::new(RecentsStore::open(storage)?),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn doc_state(&self) -> &Arc<DocState> {
        &self.state
    }

    pub async fn snapshot(&self) -> Snapshot {
        let view = self.view.read().await;
        Snapshot {
            index: view.index.clone(),
            loading: view.loading,
            error: view.error.clone(),
        }
    }

    /// Start loading the index in the background.
    pub async fn load(&self) -> JoinHandle<()> {
        self.spawn_load(false).await
    }

    /// Start a cache-busting reload in the background.
    pub async fn refresh(&self) -> JoinHandle<()> {
        self.spawn_load(true).await
    }

    /// Load and wait for the outcome.
    pub async fn load_now(&self) -> Snapshot {
        if let Err(e) = self.load().await.await {
            tracing::error!(error = %e, "Index load task failed");
        }
        self.snapshot().await
    }

    async fn spawn_load(&self, refresh: bool) -> JoinHandle<()> {
        let generation = {
            let mut view = self.view.write().await;
            view.loading = true;
            view.generation += 1;
            view.generation
        };

        let state = Arc::clone(&self.state);
        let version = self.version.clone();
        let view = Arc::downgrade(&self.view);

        tokio::spawn(async move {
            let result = if refresh {
                state.refresh(&version).await
            } else {
                state.get_index(&version).await
            };
            apply(&view, generation, result).await;
        })
    }

    /// Event: the caller toggled favorite status. Returns whether the item is now a favorite.
    pub async fn toggle_favorite(&self, item: &DocItem) -> Result<bool> {
        self.favorites.lock().await.toggle(item)
    }

    /// Event: the caller opened or viewed an item.
    pub async fn item_opened(&self, item: &DocItem) -> Result<()> {
        self.recents.lock().await.record(item)
    }

    pub async fn favorites(&self) -> Vec<DocItem> {
        self.favorites.lock().await.items().to_vec()
    }

    pub async fn is_favorite(&self, url: &str) -> bool {
        self.favorites.lock().await.contains(url)
    }

    pub async fn recents(&self) -> Vec<DocItem> {
        self.recents.lock().await.items().to_vec()
    }

    /// Look an item up by URL in the loaded index, then favorites and recents.
    pub async fn find_item(&self, url: &str) -> Option<DocItem> {
        if let Some(item) = self
            .snapshot()
            .await
            .items()
            .iter()
            .find(|item| item.url == url)
        {
            return Some(item.clone());
        }
        if let Some(item) = self.favorites.lock().await.items().iter().find(|i| i.url == url) {
            return Some(item.clone());
        }
        self.recents
            .lock()
            .await
            .items()
            .iter()
            .find(|i| i.url == url)
            .cloned()
    }
}

async fn apply(
    view: &Weak<RwLock<ViewState>>,
    generation: u64,
    result: std::result::Result<Arc<DecodedIndex>, PipelineError>,
) {
    let Some(view) = view.upgrade() else {
        tracing::debug!("Session dropped before index load finished, discarding result");
        return;
    };

    let mut view = view.write().await;
    if view.generation != generation {
        tracing::debug!(generation, current = view.generation, "Discarding superseded index load");
        return;
    }

    view.loading = false;
    match result {
        Ok(index) => {
            view.index = Some(index);
            view.error = None;
        }
        // Keep showing the previous list alongside the error.
        Err(e) => view.error = Some(e),
    }
}
