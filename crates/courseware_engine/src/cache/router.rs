use std::sync::atomic::{AtomicBool, Ordering};

use courseware_core::{
    CacheGenerations, CachePolicy, RoutingRules, FALLBACK_DOCUMENT, PRECACHE_PATHS,
};
use lms_logging::{lms_debug, lms_info, lms_warn};
use url::Url;

use crate::cache::network::Network;
use crate::cache::storage::{CacheStorage, CachedResponse};
use crate::types::{FailureKind, FetchError};

/// Largest body the router writes into a cache generation.
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterPhase {
    Installing,
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Cached root document served because the network failed.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedResponse {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

/// Per-request cache policy between the application and the network.
///
/// The only mutable state is the activation flag; every request is decided
/// independently. Cache write failures never fail a request, and bodies over
/// the entry limit are passed through without being stored.
pub struct CacheRouter<N, S> {
    network: N,
    storage: S,
    rules: RoutingRules,
    generations: CacheGenerations,
    origin: Url,
    max_entry_bytes: u64,
    activated: AtomicBool,
}

impl<N: Network, S: CacheStorage> CacheRouter<N, S> {
    pub fn new(
        network: N,
        storage: S,
        rules: RoutingRules,
        generations: CacheGenerations,
        origin: Url,
    ) -> Self {
        Self {
            network,
            storage,
            rules,
            generations,
            origin,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            activated: AtomicBool::new(false),
        }
    }

    pub fn with_max_entry_bytes(mut self, max_entry_bytes: u64) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    pub fn phase(&self) -> RouterPhase {
        if self.activated.load(Ordering::Acquire) {
            RouterPhase::Activated
        } else {
            RouterPhase::Installing
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn current_generation(&self) -> &str {
        self.generations.current()
    }

    /// Pre-caches the application shell. Returns how many paths were stored.
    pub async fn install(&self) -> usize {
        lms_info!("Installing cache generation {}", self.generations.current());
        let mut stored = 0;
        for path in PRECACHE_PATHS {
            let url = match self.origin.join(path) {
                Ok(url) => url,
                Err(err) => {
                    lms_warn!("Skipping pre-cache of {}: {}", path, err);
                    continue;
                }
            };
            match self.network.fetch(url.as_str()).await {
                Ok(response) if response.status == 200 => {
                    if self.store(url.as_str(), &response).await {
                        stored += 1;
                    }
                }
                Ok(response) => {
                    lms_warn!("Pre-cache of {} got status {}", url, response.status);
                }
                Err(err) => lms_warn!("Pre-cache of {} failed: {}", url, err),
            }
        }
        lms_info!(
            "Installed {} of {} shell entries",
            stored,
            PRECACHE_PATHS.len()
        );
        stored
    }

    /// Deletes every generation except the current one. Returns the deleted names.
    pub async fn activate(&self) -> Vec<String> {
        let existing = match self.storage.generations().await {
            Ok(existing) => existing,
            Err(err) => {
                lms_warn!("Cannot enumerate cache generations: {}", err);
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in self.generations.stale(&existing) {
            match self.storage.delete_generation(&name).await {
                Ok(_) => {
                    lms_info!("Deleted stale cache generation {}", name);
                    deleted.push(name);
                }
                Err(err) => lms_warn!("Ignoring failed delete of generation {}: {}", name, err),
            }
        }
        self.activated.store(true, Ordering::Release);
        lms_info!("Cache router active on {}", self.generations.current());
        deleted
    }

    pub async fn handle(&self, url: &str) -> Result<RoutedResponse, FetchError> {
        match self.rules.classify(url) {
            CachePolicy::Bypass => {
                let response = self.network.fetch(url).await?;
                Ok(routed(response, ResponseSource::Network))
            }
            CachePolicy::CacheFirst => {
                if let Some(hit) = self.lookup(url).await {
                    return Ok(routed(hit, ResponseSource::Cache));
                }
                match self.network.fetch(url).await {
                    Ok(response) => {
                        if response.status == 200 {
                            self.store(url, &response).await;
                        }
                        Ok(routed(response, ResponseSource::Network))
                    }
                    Err(err) => self.fallback(url, err).await,
                }
            }
            CachePolicy::NetworkFirst => match self.network.fetch(url).await {
                Ok(response) => Ok(routed(response, ResponseSource::Network)),
                Err(err) => self.fallback(url, err).await,
            },
        }
    }

    async fn fallback(&self, url: &str, err: FetchError) -> Result<RoutedResponse, FetchError> {
        let root = self
            .origin
            .join(FALLBACK_DOCUMENT)
            .map_err(|e| FetchError::new(FailureKind::InvalidUrl, e.to_string()))?;
        match self.lookup(root.as_str()).await {
            Some(document) => {
                lms_debug!("Serving cached root for {} after: {}", url, err);
                Ok(routed(document, ResponseSource::Fallback))
            }
            None => Err(err),
        }
    }

    async fn lookup(&self, url: &str) -> Option<CachedResponse> {
        match self.storage.lookup(self.generations.current(), url).await {
            Ok(hit) => hit,
            Err(err) => {
                lms_warn!("Cache lookup for {} failed, treating as miss: {}", url, err);
                None
            }
        }
    }

    /// Returns whether the entry was stored; failures are logged and dropped.
    async fn store(&self, url: &str, response: &CachedResponse) -> bool {
        let len = response.body.len() as u64;
        if len > self.max_entry_bytes {
            lms_debug!(
                "Not caching {}: {} bytes exceeds entry limit {}",
                url,
                len,
                self.max_entry_bytes
            );
            return false;
        }
        match self
            .storage
            .store(self.generations.current(), url, response)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                lms_warn!("Cache store for {} skipped: {}", url, err);
                false
            }
        }
    }
}

fn routed(response: CachedResponse, source: ResponseSource) -> RoutedResponse {
    RoutedResponse { response, source }
}
