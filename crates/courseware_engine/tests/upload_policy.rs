use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use courseware_core::{ContentKind, ModuleMetadata, UploadPhase};
use courseware_engine::{
    ContentRecord, CreateModuleRequest, EngineEvent, FailureKind, FetchError, PollRetryPolicy,
    ProgressSink, StatusKind, UploadApi, UploadError, UploadFile, UploadOrchestrator,
    UploadSettings, UploadStatus,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Plays back scripted status responses; keeps reporting "processing" once exhausted.
#[derive(Default)]
struct ScriptedApi {
    statuses: Mutex<VecDeque<Result<UploadStatus, UploadError>>>,
    status_calls: AtomicUsize,
    creates: Mutex<Vec<CreateModuleRequest>>,
}

impl ScriptedApi {
    fn new(statuses: Vec<Result<UploadStatus, UploadError>>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        })
    }
}

struct Shared(Arc<ScriptedApi>);

#[async_trait::async_trait]
impl UploadApi for Shared {
    async fn initiate(
        &self,
        _file: &UploadFile,
        _metadata: &ModuleMetadata,
    ) -> Result<String, UploadError> {
        Ok("job-1".to_string())
    }

    async fn status(&self, _upload_id: &str) -> Result<UploadStatus, UploadError> {
        self.0.status_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(processing(50)))
    }

    async fn create_module(
        &self,
        request: &CreateModuleRequest,
    ) -> Result<ContentRecord, UploadError> {
        self.0.creates.lock().unwrap().push(request.clone());
        Ok(ContentRecord(json!({ "id": 1 })))
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn phases(&self) -> Vec<(UploadPhase, u8)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(p) => Some((p.phase, p.percent)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn processing(progress: i64) -> UploadStatus {
    UploadStatus {
        status: StatusKind::Processing,
        progress,
        message: "processing".to_string(),
        url: None,
    }
}

fn completed(url: Option<&str>) -> UploadStatus {
    UploadStatus {
        status: StatusKind::Completed,
        progress: 100,
        message: "done".to_string(),
        url: url.map(str::to_string),
    }
}

fn dropped_tick() -> UploadError {
    UploadError::Transport(FetchError {
        kind: FailureKind::Network,
        message: "connection reset".to_string(),
    })
}

fn metadata() -> ModuleMetadata {
    ModuleMetadata {
        title: "Syllabus".to_string(),
        kind: ContentKind::Pdf,
        order: 3,
        course_id: 11,
    }
}

fn settings(max_failures: u32) -> UploadSettings {
    UploadSettings {
        poll_interval: Duration::from_millis(5),
        retry: PollRetryPolicy {
            max_consecutive_failures: max_failures,
            base_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        deadline: None,
    }
}

async fn run(
    api: &Arc<ScriptedApi>,
    settings: UploadSettings,
    cancel: &CancellationToken,
) -> (Result<ContentRecord, UploadError>, TestSink) {
    let orchestrator = UploadOrchestrator::new(Shared(api.clone()), settings);
    let sink = TestSink::default();
    let file = UploadFile::new("syllabus.pdf", "application/pdf", b"%PDF".to_vec());
    let result = orchestrator
        .upload(9, &file, &metadata(), &sink, cancel)
        .await;
    (result, sink)
}

#[tokio::test]
async fn transient_tick_failures_are_retried() {
    let api = ScriptedApi::new(vec![
        Ok(processing(20)),
        Err(dropped_tick()),
        Err(dropped_tick()),
        Ok(processing(60)),
        Ok(completed(Some("/files/s.pdf"))),
    ]);
    let (result, sink) = run(&api, settings(2), &CancellationToken::new()).await;

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 5);
    let creates = api.creates.lock().unwrap().clone();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].content_url, "/files/s.pdf");
    assert_eq!(creates[0].parent_id, 11);
    assert_eq!(creates[0].type_tag, "pdf");

    let phases = sink.phases();
    assert_eq!(phases.last(), Some(&(UploadPhase::Completed, 100)));
    assert!(phases.contains(&(UploadPhase::CreatingRecord, 95)));
}

#[tokio::test]
async fn too_many_consecutive_failures_fail_the_job() {
    let api = ScriptedApi::new(vec![
        Err(dropped_tick()),
        Err(dropped_tick()),
        Err(dropped_tick()),
    ]);
    let (result, _sink) = run(&api, settings(2), &CancellationToken::new()).await;

    assert_eq!(result.unwrap_err(), dropped_tick());
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 3);
    assert!(api.creates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn without_retries_a_single_dropped_tick_fails() {
    let api = ScriptedApi::new(vec![Err(dropped_tick())]);
    let (result, _sink) = run(&api, settings(0), &CancellationToken::new()).await;
    assert_eq!(result.unwrap_err(), dropped_tick());
}

#[tokio::test]
async fn malformed_status_is_not_retried() {
    let api = ScriptedApi::new(vec![Err(UploadError::Malformed("bad json".to_string()))]);
    let (result, _sink) = run(&api, settings(5), &CancellationToken::new()).await;
    assert!(matches!(result, Err(UploadError::Malformed(_))));
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn completed_without_url_is_malformed() {
    let api = ScriptedApi::new(vec![Ok(completed(None))]);
    let (result, _sink) = run(&api, settings(0), &CancellationToken::new()).await;
    assert!(matches!(result, Err(UploadError::Malformed(_))));
    assert!(api.creates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn regressing_remote_progress_is_reported_monotonically() {
    let api = ScriptedApi::new(vec![
        Ok(processing(70)),
        Ok(processing(30)),
        Ok(processing(100)),
        Ok(completed(Some("/files/s.pdf"))),
    ]);
    let (result, sink) = run(&api, settings(0), &CancellationToken::new()).await;
    assert!(result.is_ok());
    let percents: Vec<u8> = sink.phases().into_iter().map(|(_, p)| p).collect();
    assert_eq!(percents, vec![5, 10, 70, 70, 94, 95, 100]);
}

#[tokio::test]
async fn cancellation_stops_polling() {
    let api = ScriptedApi::new(Vec::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        trigger.cancel();
    });

    let (result, _sink) = run(&api, settings(0), &cancel).await;
    assert_eq!(result.unwrap_err(), UploadError::Cancelled);

    let calls_at_cancel = api.status_calls.load(Ordering::SeqCst);
    assert!(calls_at_cancel >= 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(api.status_calls.load(Ordering::SeqCst), calls_at_cancel);
    assert!(api.creates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_token_prevents_initiation() {
    let api = ScriptedApi::new(Vec::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (result, _sink) = run(&api, settings(0), &cancel).await;
    assert_eq!(result.unwrap_err(), UploadError::Cancelled);
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deadline_bounds_an_endless_job() {
    let api = ScriptedApi::new(Vec::new());
    let settings = UploadSettings {
        deadline: Some(Duration::from_millis(30)),
        ..settings(0)
    };
    let (result, _sink) = run(&api, settings, &CancellationToken::new()).await;
    assert_eq!(
        result.unwrap_err(),
        UploadError::DeadlineExceeded(Duration::from_millis(30))
    );
}

#[tokio::test]
async fn deadline_cuts_short_a_long_backoff() {
    let api = ScriptedApi::new(vec![Err(dropped_tick())]);
    let settings = UploadSettings {
        deadline: Some(Duration::from_millis(40)),
        retry: PollRetryPolicy {
            max_consecutive_failures: 3,
            base_delay: Duration::from_secs(10),
            multiplier: 1.0,
        },
        ..settings(0)
    };
    let started = std::time::Instant::now();
    let (result, _sink) = run(&api, settings, &CancellationToken::new()).await;
    assert_eq!(
        result.unwrap_err(),
        UploadError::DeadlineExceeded(Duration::from_millis(40))
    );
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
}
