use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use courseware_engine::{
    ApiSettings, FetchSettings, KeepAliveConfig, PollRetryPolicy, UploadSettings,
    DEFAULT_MAX_ENTRY_BYTES,
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "courseware.ron";

/// Where a loaded config came from; reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults { missing: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub upload_init_path: String,
    pub upload_status_path: String,
    pub content_create_path: String,
    pub poll_interval_ms: u64,
    pub initiate_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_consecutive_poll_failures: u32,
    pub upload_deadline_secs: Option<u64>,
    pub cache_dir: PathBuf,
    pub cache_version: String,
    /// Larger responses are served but never stored.
    pub max_cache_entry_bytes: u64,
    pub keep_alive_endpoint: Option<String>,
    pub keep_alive_interval_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            api_base_url: api.base_url,
            upload_init_path: api.upload_init_path,
            upload_status_path: api.upload_status_path,
            content_create_path: api.content_create_path,
            poll_interval_ms: 1000,
            initiate_timeout_secs: api.initiate_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            max_consecutive_poll_failures: PollRetryPolicy::default().max_consecutive_failures,
            upload_deadline_secs: None,
            cache_dir: PathBuf::from("cache"),
            cache_version: "v1".to_string(),
            max_cache_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            keep_alive_endpoint: None,
            keep_alive_interval_secs: 14 * 60,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the default file when `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Self::default(), ConfigSource::Defaults { missing: path }));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config = ron::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok((config, ConfigSource::File(path)))
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            upload_init_path: self.upload_init_path.clone(),
            upload_status_path: self.upload_status_path.clone(),
            content_create_path: self.content_create_path.clone(),
            initiate_timeout: Duration::from_secs(self.initiate_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ApiSettings::default()
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry: PollRetryPolicy {
                max_consecutive_failures: self.max_consecutive_poll_failures,
                ..PollRetryPolicy::default()
            },
            deadline: self.upload_deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..FetchSettings::default()
        }
    }

    pub fn keep_alive(&self) -> Option<KeepAliveConfig> {
        self.keep_alive_endpoint.as_ref().map(|endpoint| KeepAliveConfig {
            interval: Duration::from_secs(self.keep_alive_interval_secs),
            ..KeepAliveConfig::new(endpoint.clone())
        })
    }

    /// Host of the API backend, which the cache router must always bypass.
    pub fn backend_host(&self) -> Option<String> {
        url::Url::parse(&self.api_base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}
