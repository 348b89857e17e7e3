//! Resolve → fetch → decode pipeline with memoization.
//!
//! Decoded indices are cached by resolved URL. A pipeline that is already running
//! for a URL is joined rather than duplicated: the in-flight map hands every caller
//! a clone of the same shared future.

use crate::config::Config;
use crate::decode::{DecodedIndex, decode};
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::resolver::Resolver;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use reqwest::Url;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Type alias for shared pipeline futures.
type SharedDecodeFuture = Shared<BoxFuture<'static, Result<Arc<DecodedIndex>, PipelineError>>>;

/// Type alias for shared resolution futures.
type SharedResolveFuture = Shared<BoxFuture<'static, Result<Url, PipelineError>>>;

/// A running pipeline. `id` tells a run whether a refresh has replaced it.
struct InFlight {
    id: u64,
    future: SharedDecodeFuture,
}

/// Shared state for resolving, fetching and caching decoded indices.
pub struct DocState {
    resolver: Resolver,
    fetcher: Fetcher,
    doc_root: String,

    /// Version → resolved index URL
    resolved: RwLock<HashMap<String, Url>>,

    /// LRU cache of decoded indices, keyed by resolved URL
    cache: RwLock<LruCache<String, Arc<DecodedIndex>>>,

    /// Version → in-flight resolution
    resolving: Mutex<HashMap<String, SharedResolveFuture>>,

    /// In-flight pipelines (can be awaited by multiple callers)
    in_flight: Mutex<HashMap<String, InFlight>>,

    next_run: AtomicU64,
}

impl std::fmt::Debug for DocState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocState")
            .field("doc_root", &self.doc_root)
            .field("cache_size", &self.cache.try_read().map(|c| c.len()).ok())
            .field("in_flight_count", &self.in_flight.try_lock().map(|m| m.len()).ok())
            .finish_non_exhaustive()
    }
}

impl DocState {
    pub fn new(resolver: Resolver, fetcher: Fetcher, doc_root: String, capacity: NonZeroUsize) -> Self {
        Self {
            resolver,
            fetcher,
            doc_root,
            resolved: RwLock::new(HashMap::new()),
            cache: RwLock::new(LruCache::new(capacity)),
            resolving: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            next_run: AtomicU64::new(0),
        }
    }

    /// Build the pipeline from configuration with one shared HTTP client.
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let client = crate::http::new_client(config.fetch_timeout())?;
        let resolver = Resolver::from_config(client.clone(), config)?;
        let fetcher = Fetcher::new(client, config.max_payload_bytes);
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .ok_or_else(|| anyhow::anyhow!("cache_capacity must be non-zero"))?;
        Ok(Self::new(resolver, fetcher, config.doc_root.clone(), capacity))
    }

    /// Get the decoded index for a release.
    ///
    /// 1. Resolves the index URL (memoized per version)
    /// 2. Checks the cache
    /// 3. Joins an in-flight pipeline for the same URL, or starts one
    pub async fn get_index(self: &Arc<Self>, version: &str) -> Result<Arc<DecodedIndex>, PipelineError> {
        let url = self.resolve(version).await?;
        self.load(url, false).await
    }

    /// Drop everything memoized for `version` and run the full pipeline again.
    ///
    /// A pipeline already running for the same URL is not joined: a new one
    /// replaces it, and the older run's result is returned only to its own callers.
    pub async fn refresh(self: &Arc<Self>, version: &str) -> Result<Arc<DecodedIndex>, PipelineError> {
        let previous = self.resolved.write().await.remove(version);
        if let Some(url) = previous {
            self.cache.write().await.pop(url.as_str());
            tracing::info!(version, %url, "Cache cleared for refresh");
        }
        let url = self.resolve(version).await?;
        self.load(url, true).await
    }

    /// Resolved URL for a version, if one has been found.
    pub async fn resolved_url(&self, version: &str) -> Option<Url> {
        self.resolved.read().await.get(version).cloned()
    }

    /// Check if a decoded index is cached for a URL.
    pub async fn is_cached(&self, url: &str) -> bool {
        self.cache.read().await.contains(url)
    }

    /// Check if a pipeline is running for a URL.
    pub async fn is_loading(&self, url: &str) -> bool {
        self.in_flight.lock().await.contains_key(url)
    }

    /// Resolve through the memo. Concurrent first callers share one resolver run.
    async fn resolve(self: &Arc<Self>, version: &str) -> Result<Url, PipelineError> {
        if let Some(url) = self.resolved.read().await.get(version) {
            return Ok(url.clone());
        }

        let future = {
            let mut resolving = self.resolving.lock().await;

            if let Some(future) = resolving.get(version) {
                tracing::debug!(version, "Joining in-flight resolution");
                future.clone()
            } else if let Some(url) = self.resolved.read().await.get(version) {
                return Ok(url.clone());
            } else {
                let task = tokio::spawn(Arc::clone(self).run_resolve(version.to_string()));
                let future: BoxFuture<'static, _> = Box::pin(async move {
                    task.await
                        .unwrap_or_else(|e| Err(PipelineError::Aborted(e.to_string())))
                });
                let shared = future.shared();
                resolving.insert(version.to_string(), shared.clone());
                shared
            }
        };

        future.await
    }

    async fn run_resolve(self: Arc<Self>, version: String) -> Result<Url, PipelineError> {
        let result = self.resolver.resolve(&version).await.map_err(PipelineError::from);

        let mut resolving = self.resolving.lock().await;
        if let Ok(url) = &result {
            self.resolved.write().await.insert(version.clone(), url.clone());
        }
        resolving.remove(&version);
        result
    }

    /// Serve `url` from the cache or a running pipeline, or start one.
    /// `force` skips both and replaces any running pipeline.
    async fn load(self: &Arc<Self>, url: Url, force: bool) -> Result<Arc<DecodedIndex>, PipelineError> {
        let key = url.to_string();

        if !force && let Some(index) = self.cache.write().await.get(&key) {
            tracing::debug!(url = %key, "Cache hit");
            return Ok(Arc::clone(index));
        }

        let future = {
            let mut in_flight = self.in_flight.lock().await;

            let running = if force {
                None
            } else {
                in_flight.get(&key).map(|run| run.future.clone())
            };

            if let Some(future) = running {
                tracing::debug!(url = %key, "Joining in-flight pipeline");
                future
            } else {
                if !force && let Some(index) = self.cache.write().await.get(&key) {
                    // Finished between the cache check and taking the lock.
                    return Ok(Arc::clone(index));
                }
                if force && in_flight.contains_key(&key) {
                    tracing::debug!(url = %key, "Replacing in-flight pipeline for refresh");
                }

                tracing::info!(url = %key, "Starting search index pipeline");
                // Spawned so the pipeline completes (and is cached) even if every
                // caller goes away. The task removes its own in-flight entry, which
                // needs this lock, so insertion always happens first.
                let id = self.next_run.fetch_add(1, Ordering::Relaxed);
                let task = tokio::spawn(Arc::clone(self).run(url, id));
                let future: BoxFuture<'static, _> = Box::pin(async move {
                    task.await
                        .unwrap_or_else(|e| Err(PipelineError::Aborted(e.to_string())))
                });
                let shared = future.shared();
                in_flight.insert(
                    key,
                    InFlight {
                        id,
                        future: shared.clone(),
                    },
                );
                shared
            }
        };

        future.await
    }

    /// Fetch and decode one URL, then publish the result unless a refresh
    /// replaced this run in the meantime.
    async fn run(self: Arc<Self>, url: Url, id: u64) -> Result<Arc<DecodedIndex>, PipelineError> {
        let key = url.to_string();
        let result = self.fetch_and_decode(&url).await;

        if let Err(e) = &result {
            tracing::warn!(url = %key, error = %e, "Search index pipeline failed");
        }

        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.get(&key).is_some_and(|run| run.id == id) {
            tracing::debug!(url = %key, id, "Pipeline superseded by refresh, not caching");
            return result;
        }

        if let Ok(index) = &result {
            self.cache.write().await.put(key.clone(), Arc::clone(index));
            tracing::debug!(url = %key, items = index.items.len(), "Cached decoded index");
        }
        in_flight.remove(&key);
        result
    }

    async fn fetch_and_decode(&self, url: &Url) -> Result<Arc<DecodedIndex>, PipelineError> {
        let text = self.fetcher.fetch(url).await?;
        let doc_root = self.doc_root.clone();

        // Decoding is CPU-bound and synchronous
        let index = tokio::task::spawn_blocking(move || decode(&text, &doc_root))
            .await
            .map_err(|e| PipelineError::Aborted(e.to_string()))??;

        Ok(Arc::new(index))
    }
}
