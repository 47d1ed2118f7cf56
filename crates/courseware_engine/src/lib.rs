//! Courseware engine: API client, upload orchestration, cache routing and keep-alive.
mod api;
mod cache;
mod cache_key;
mod engine;
mod keepalive;
mod persist;
mod retry;
mod types;
mod upload;

pub use api::{
    ApiSettings, ContentRecord, CreateModuleRequest, ReqwestUploadApi, StatusKind, UploadApi,
    UploadFile, UploadStatus,
};
pub use cache::{
    CacheError, CacheRouter, CacheStorage, CachedResponse, DiskCacheStorage, FetchSettings,
    MemoryCacheStorage, Network, ReqwestNetwork, ResponseSource, RoutedResponse, RouterPhase,
    DEFAULT_MAX_ENTRY_BYTES,
};
pub use cache_key::cache_key;
pub use engine::{EngineHandle, UploadRequest};
pub use keepalive::{KeepAliveConfig, KeepAliveService, SessionEvent};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retry::PollRetryPolicy;
pub use types::{EngineEvent, FailureKind, FetchError, JobId, UploadError, UploadProgress};
pub use upload::{CallbackSink, ChannelProgressSink, ProgressSink, UploadOrchestrator, UploadSettings};
