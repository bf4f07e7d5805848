//! Service Worker Module
//!
//! Install/activate/fetch lifecycle of the offline asset cache.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStats, CacheStorage, CachedResponse, FetchStrategy};
use crate::error::{Result, SuiteError};
use crate::net::{Fetcher, Request, Response};

/// Host whose requests are never intercepted; the weather widget keeps its
/// own offline copy in storage.
pub const WEATHER_API_HOST: &str = "api.weatherapi.com";

/// Page served to navigations that fail while offline.
pub const OFFLINE_FALLBACK: &str = "index.html";

/// Assets cached on install.
pub const ASSET_MANIFEST: &[&str] = &[
    "/",
    "index.html",
    "manifest.json",
    "404.html",
    "pages/login.html",
    "pages/login-index.html",
    "pages/suite/suite.css",
    "pages/suite/suite.js",
    "pages/suite/santo-do-dia.js",
    "pages/suite/weather/weather.css",
    "pages/suite/weather/weather.js",
    "src/styles/fonts-manager.css",
    "src/styles/modes.css",
    "src/app/update.css",
    "src/app/update.js",
    "src/scripts/main/config.js",
    "src/scripts/main/factory.js",
    "src/scripts/main/colors.js",
    "database/avatar/avatar.jpg",
    "database/calendario.json",
    "database/templates/dark_mode.jpg",
    "database/templates/light_mode.jpg",
    "database/favicon/Favicon.png",
    "database/favicon/icon-192.png",
    "database/favicon/icon-512.png",
];

// == Worker State ==
/// Lifecycle of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, install not attempted
    Parsed,
    Installing,
    /// Cache populated, waiting for activation
    Installed,
    /// Controlling requests
    Activated,
    /// Install failed; this version never activates
    Redundant,
}

// == Service Worker ==
/// Intercepts requests for the site origin and answers them from a single
/// versioned cache.
pub struct ServiceWorker {
    cache_name: String,
    manifest: Vec<String>,
    strategy: FetchStrategy,
    excluded_hosts: Vec<String>,
    network: Arc<dyn Fetcher>,
    storage: Arc<RwLock<CacheStorage>>,
    stats: Arc<Mutex<CacheStats>>,
    state: Mutex<WorkerState>,
    revalidations: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceWorker {
    // == Constructor ==
    /// Creates a worker with its own empty cache storage.
    ///
    /// # Arguments
    /// * `cache_name` - Versioned cache name, e.g. `suite-cache-v2.3.0`
    /// * `manifest` - Asset paths cached on install
    /// * `strategy` - Policy for intercepted requests
    /// * `network` - Fetcher used to reach the origin
    pub fn new(
        cache_name: impl Into<String>,
        manifest: Vec<String>,
        strategy: FetchStrategy,
        network: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            manifest,
            strategy,
            excluded_hosts: vec![WEATHER_API_HOST.to_string()],
            network,
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            stats: Arc::new(Mutex::new(CacheStats::new())),
            state: Mutex::new(WorkerState::Parsed),
            revalidations: Mutex::new(Vec::new()),
        }
    }

    /// Creates a worker with the default asset manifest.
    pub fn with_default_manifest(
        cache_name: impl Into<String>,
        strategy: FetchStrategy,
        network: Arc<dyn Fetcher>,
    ) -> Self {
        let manifest = ASSET_MANIFEST.iter().map(|s| s.to_string()).collect();
        Self::new(cache_name, manifest, strategy, network)
    }

    /// Shares cache storage with other worker versions of the same origin.
    pub fn with_storage(mut self, storage: Arc<RwLock<CacheStorage>>) -> Self {
        self.storage = storage;
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        self.storage.clone()
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().map(|s| *s).unwrap_or(WorkerState::Redundant)
    }

    fn set_state(&self, next: WorkerState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    // == Install ==
    /// Populates the cache with every manifest asset.
    ///
    /// All assets must be fetched with status 200 before anything is written;
    /// one failure leaves the cache untouched and marks the worker redundant.
    /// Returns the number of cached assets.
    pub async fn install(&self) -> Result<usize> {
        info!("Installing service worker {}", self.cache_name);
        self.set_state(WorkerState::Installing);

        let mut fetched = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let request = Request::get(path.clone());
            let outcome = match self.network.fetch(&request).await {
                Ok(resp) if resp.status == 200 => Ok(resp),
                Ok(resp) => Err(format!("{} answered {}", path, resp.status)),
                Err(err) => Err(format!("{}: {}", path, err)),
            };
            match outcome {
                Ok(resp) => fetched.push((request.cache_key(), resp)),
                Err(reason) => {
                    error!("Install of {} failed: {}", self.cache_name, reason);
                    self.set_state(WorkerState::Redundant);
                    return Err(SuiteError::InstallFailed(reason));
                }
            }
        }

        let count = fetched.len();
        {
            let mut storage = self.storage.write().await;
            let cache = storage.open(&self.cache_name);
            for (key, resp) in fetched {
                cache.put(key, CachedResponse::new(resp));
            }
        }

        self.set_state(WorkerState::Installed);
        info!("Cached {} assets for offline use", count);
        Ok(count)
    }

    // == Activate ==
    /// Deletes every cache not named after this version and starts
    /// intercepting requests. Returns the names of the deleted caches.
    pub async fn activate(&self) -> Result<Vec<String>> {
        match self.state() {
            WorkerState::Installed | WorkerState::Activated => {}
            _ => return Err(SuiteError::NotInstalled),
        }
        info!("Activating service worker {}", self.cache_name);

        let deleted = {
            let mut storage = self.storage.write().await;
            let stale: Vec<String> = storage
                .keys()
                .into_iter()
                .filter(|name| name != &self.cache_name)
                .collect();
            for name in &stale {
                info!("Removing old cache {}", name);
                storage.delete(name);
            }
            stale
        };

        self.set_state(WorkerState::Activated);
        Ok(deleted)
    }

    // == Fetch ==
    /// Answers a request according to the worker's strategy.
    ///
    /// Excluded hosts and requests made before activation go straight to the
    /// network.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response> {
        if self.is_excluded(request) || self.state() != WorkerState::Activated {
            self.with_stats(|s| s.record_bypass());
            return self.network.fetch(request).await;
        }

        match self.strategy {
            FetchStrategy::CacheFirst => self.cache_first(request).await,
            FetchStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response> {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key).await {
            self.with_stats(|s| s.record_hit());
            return Ok(cached);
        }
        self.with_stats(|s| s.record_miss());

        match self.network.fetch(request).await {
            Ok(resp) => {
                if resp.status == 200 {
                    let mut storage = self.storage.write().await;
                    storage
                        .open(&self.cache_name)
                        .put(key, CachedResponse::new(resp.clone()));
                    self.with_stats(|s| s.record_store());
                }
                Ok(resp)
            }
            Err(err) => self.offline_fallback(request, err).await,
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<Response> {
        let key = request.cache_key();

        let network = self.network.clone();
        let storage = self.storage.clone();
        let stats = self.stats.clone();
        let cache_name = self.cache_name.clone();
        let outgoing = request.clone();
        let store_key = key.clone();
        let revalidation = tokio::spawn(async move {
            let result = network.fetch(&outgoing).await;
            if let Ok(resp) = &result {
                if resp.status == 200 {
                    storage
                        .write()
                        .await
                        .open(&cache_name)
                        .put(store_key, CachedResponse::new(resp.clone()));
                    if let Ok(mut stats) = stats.lock() {
                        stats.record_store();
                    }
                }
            }
            result
        });

        if let Some(cached) = self.lookup(&key).await {
            self.with_stats(|s| s.record_hit());
            let url = request.url.clone();
            let background = tokio::spawn(async move {
                match revalidation.await {
                    Ok(Ok(_)) => debug!("Revalidated {}", url),
                    Ok(Err(err)) => debug!("Revalidation of {} failed: {}", url, err),
                    Err(err) => warn!("Revalidation task for {} panicked: {}", url, err),
                }
            });
            if let Ok(mut pending) = self.revalidations.lock() {
                pending.retain(|h| !h.is_finished());
                pending.push(background);
            }
            return Ok(cached);
        }
        self.with_stats(|s| s.record_miss());

        match revalidation.await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(err)) => self.offline_fallback(request, err).await,
            Err(err) => Err(SuiteError::Network(err.to_string())),
        }
    }

    /// Navigations get the cached index page; anything else gets the error.
    async fn offline_fallback(&self, request: &Request, err: SuiteError) -> Result<Response> {
        if request.is_navigation() {
            let index = Request::get(OFFLINE_FALLBACK).cache_key();
            if let Some(page) = self.lookup(&index).await {
                warn!("Network failed for {}, serving offline page", request.url);
                self.with_stats(|s| s.record_fallback());
                return Ok(page);
            }
        }
        debug!("No cached answer for {}: {}", request.url, err);
        Err(err)
    }

    async fn lookup(&self, key: &str) -> Option<Response> {
        let storage = self.storage.read().await;
        storage.match_any(key).map(|entry| entry.response.clone())
    }

    fn is_excluded(&self, request: &Request) -> bool {
        let Some(host) = request.host() else {
            return false;
        };
        self.excluded_hosts
            .iter()
            .any(|excluded| host.eq_ignore_ascii_case(excluded))
    }

    fn with_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    // == Settle ==
    /// Waits for background revalidations started by earlier fetches.
    pub async fn settle(&self) {
        let pending: Vec<JoinHandle<()>> = match self.revalidations.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        for handle in pending {
            let _ = handle.await;
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let total = self.storage.read().await.total_entries();
        let mut stats = self.stats.lock().map(|s| s.clone()).unwrap_or_default();
        stats.set_total_entries(total);
        stats
    }
}

#[async_trait]
impl Fetcher for ServiceWorker {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.handle_fetch(request).await
    }
}
