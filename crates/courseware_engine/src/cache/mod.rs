//! Request cache routing: storage backends, network access and the router.
mod disk;
mod network;
mod router;
mod storage;

pub use disk::DiskCacheStorage;
pub use network::{FetchSettings, Network, ReqwestNetwork};
pub use router::{CacheRouter, DEFAULT_MAX_ENTRY_BYTES, ResponseSource, RoutedResponse, RouterPhase};
pub use storage::{CacheError, CacheStorage, CachedResponse, MemoryCacheStorage};
