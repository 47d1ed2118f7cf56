use std::future::Future;
use std::time::Duration;

use courseware_core::{ModuleMetadata, UploadJob};
use lms_logging::{lms_debug, lms_trace};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{ContentRecord, CreateModuleRequest, StatusKind, UploadApi, UploadFile};
use crate::retry::PollRetryPolicy;
use crate::types::{EngineEvent, JobId, UploadError, UploadProgress};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Fixed delay between status requests.
    pub poll_interval: Duration,
    pub retry: PollRetryPolicy,
    /// Ceiling on the whole job; `None` polls until the server finishes.
    pub deadline: Option<Duration>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            retry: PollRetryPolicy::default(),
            deadline: None,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Adapts a `(percent, message)` callback to a progress sink.
pub struct CallbackSink<F>(pub F);

impl<F> ProgressSink for CallbackSink<F>
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = event {
            (self.0)(progress.percent, &progress.message);
        }
    }
}

/// Drives one upload job: initiate, poll until the server finishes, then
/// create the content record.
///
/// Failures are returned, never logged above debug level; presenting them is
/// the caller's job.
pub struct UploadOrchestrator<A> {
    api: A,
    settings: UploadSettings,
}

impl<A: UploadApi> UploadOrchestrator<A> {
    pub fn new(api: A, settings: UploadSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub async fn upload(
        &self,
        job_id: JobId,
        file: &UploadFile,
        metadata: &ModuleMetadata,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ContentRecord, UploadError> {
        let deadline = self.deadline(Instant::now());
        let mut job = UploadJob::new();

        job.begin("Uploading file");
        report(sink, job_id, &job);
        let upload_id = within(
            deadline,
            until_cancelled(cancel, self.api.initiate(file, metadata)),
        )
        .await?;
        lms_debug!("job {} initiated as upload {}", job_id, upload_id);

        job.initiated(upload_id.clone(), "Upload accepted, processing file");
        report(sink, job_id, &job);

        let url = self
            .poll_until_complete(job_id, &upload_id, &mut job, sink, cancel, deadline)
            .await?;
        job.remote_completed(url.clone());

        job.finalizing("Creating module");
        report(sink, job_id, &job);
        let request = CreateModuleRequest::new(metadata, url);
        let record = within(
            deadline,
            until_cancelled(cancel, self.api.create_module(&request)),
        )
        .await?;

        job.completed("Module created");
        report(sink, job_id, &job);
        lms_debug!("job {} finished upload {}", job_id, upload_id);
        Ok(record)
    }

    async fn poll_until_complete(
        &self,
        job_id: JobId,
        upload_id: &str,
        job: &mut UploadJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        deadline: Option<Deadline>,
    ) -> Result<String, UploadError> {
        let mut failures = 0u32;
        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline.at {
                    return Err(UploadError::DeadlineExceeded(deadline.limit));
                }
            }

            let status = within(
                deadline,
                until_cancelled(cancel, self.api.status(upload_id)),
            )
            .await;
            let delay = match status {
                Ok(status) => {
                    failures = 0;
                    match status.status {
                        StatusKind::Completed => {
                            return match status.url {
                                Some(url) if !url.trim().is_empty() => Ok(url),
                                _ => Err(UploadError::Malformed(
                                    "completed status without url".to_string(),
                                )),
                            };
                        }
                        StatusKind::Error => return Err(UploadError::Remote(status.message)),
                        _ => {
                            lms_trace!(
                                "job {} status {:?} progress {}",
                                job_id,
                                status.status,
                                status.progress
                            );
                            job.poll_tick(status.progress, status.message);
                            report(sink, job_id, job);
                            self.settings.poll_interval
                        }
                    }
                }
                Err(UploadError::Transport(err)) => {
                    failures += 1;
                    if !self.settings.retry.should_retry(failures) {
                        return Err(UploadError::Transport(err));
                    }
                    lms_debug!(
                        "job {} status tick failed ({} in a row): {}",
                        job_id,
                        failures,
                        err
                    );
                    self.settings.retry.next_delay(failures)
                }
                Err(err) => return Err(err),
            };

            within(deadline, sleep_or_cancel(cancel, delay)).await?;
        }
    }

    fn deadline(&self, started: Instant) -> Option<Deadline> {
        self.settings.deadline.map(|limit| Deadline {
            at: started + limit,
            limit,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

/// Races `fut` against the job deadline, if one is set.
async fn within<T, F>(deadline: Option<Deadline>, fut: F) -> Result<T, UploadError>
where
    F: Future<Output = Result<T, UploadError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.at, fut)
            .await
            .unwrap_or_else(|_| Err(UploadError::DeadlineExceeded(deadline.limit))),
        None => fut.await,
    }
}

fn report(sink: &dyn ProgressSink, job_id: JobId, job: &UploadJob) {
    sink.emit(EngineEvent::Progress(UploadProgress {
        job_id,
        phase: job.phase(),
        percent: job.progress_percent(),
        message: job.status_message().to_string(),
    }));
}

async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, UploadError>
where
    F: Future<Output = Result<T, UploadError>>,
{
    if cancel.is_cancelled() {
        return Err(UploadError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UploadError::Cancelled),
        result = fut => result,
    }
}

async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> Result<(), UploadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UploadError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
