use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use bytes::Bytes;
use thiserror::Error;

use crate::persist::PersistError;

/// A captured response as kept in a cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn ok(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache generation name {0:?}")]
    InvalidName(String),
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
}

/// Named generations of URL-keyed responses.
///
/// Each call is atomic per key; no ordering across keys is promised.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    async fn generations(&self) -> Result<Vec<String>, CacheError>;

    /// Returns whether the generation existed.
    async fn delete_generation(&self, name: &str) -> Result<bool, CacheError>;

    async fn lookup(
        &self,
        generation: &str,
        url: &str,
    ) -> Result<Option<CachedResponse>, CacheError>;

    /// Stores a response, creating the generation if needed.
    async fn store(
        &self,
        generation: &str,
        url: &str,
        response: &CachedResponse,
    ) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: Mutex<BTreeMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_generations<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, HashMap<String, CachedResponse>>) -> T,
    ) -> Result<T, CacheError> {
        let mut guard = self
            .generations
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn generations(&self) -> Result<Vec<String>, CacheError> {
        self.with_generations(|gens| gens.keys().cloned().collect())
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, CacheError> {
        self.with_generations(|gens| gens.remove(name).is_some())
    }

    async fn lookup(
        &self,
        generation: &str,
        url: &str,
    ) -> Result<Option<CachedResponse>, CacheError> {
        self.with_generations(|gens| {
            gens.get(generation)
                .and_then(|entries| entries.get(url))
                .cloned()
        })
    }

    async fn store(
        &self,
        generation: &str,
        url: &str,
        response: &CachedResponse,
    ) -> Result<(), CacheError> {
        self.with_generations(|gens| {
            gens.entry(generation.to_string())
                .or_default()
                .insert(url.to_string(), response.clone());
        })
    }
}
