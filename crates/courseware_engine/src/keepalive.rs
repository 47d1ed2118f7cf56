use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lms_logging::{lms_debug, lms_info, lms_warn};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::types::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub endpoint: String,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl KeepAliveConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interval: Duration::from_secs(14 * 60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Session transitions that drive the keep-alive service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
}

/// Periodically pings a backend endpoint while a session is open.
///
/// Nothing starts implicitly: callers invoke `start`/`stop`, or feed session
/// events through `handle`.
pub struct KeepAliveService {
    config: KeepAliveConfig,
    client: reqwest::Client,
    runtime: Handle,
    running: Mutex<Option<CancellationToken>>,
    pings: Arc<AtomicU64>,
}

impl KeepAliveService {
    pub fn new(config: KeepAliveConfig, runtime: Handle) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            config,
            client,
            runtime,
            running: Mutex::new(None),
            pings: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn => self.start(),
            SessionEvent::SignedOut => self.stop(),
        }
    }

    /// Starts pinging; a no-op while already running.
    pub fn start(&self) {
        let Ok(mut running) = self.running.lock() else {
            lms_warn!("Keep-alive state lock poisoned; not starting");
            return;
        };
        if running.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let task_token = token.clone();
        let client = self.client.clone();
        let config = self.config.clone();
        let pings = self.pings.clone();
        self.runtime.spawn(async move {
            ping_loop(client, config, pings, task_token).await;
        });
        lms_info!(
            "Keep-alive started for {} every {:?}",
            self.config.endpoint,
            self.config.interval
        );
        *running = Some(token);
    }

    pub fn stop(&self) {
        let token = match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(_) => None,
        };
        if let Some(token) = token {
            token.cancel();
            lms_info!("Keep-alive stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|running| running.is_some())
            .unwrap_or(false)
    }

    /// Number of ping attempts made so far, successful or not.
    pub fn ping_count(&self) -> u64 {
        self.pings.load(Ordering::Relaxed)
    }
}

impl Drop for KeepAliveService {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn ping_loop(
    client: reqwest::Client,
    config: KeepAliveConfig,
    pings: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = client.get(&config.endpoint).send() => {
                pings.fetch_add(1, Ordering::Relaxed);
                match result {
                    Ok(response) if response.status().is_success() => {
                        lms_debug!("Keep-alive ping ok ({})", response.status());
                    }
                    Ok(response) => {
                        lms_warn!("Keep-alive ping got status {}", response.status());
                    }
                    Err(err) => lms_warn!("Keep-alive ping failed: {}", err),
                }
            }
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
