use std::time::{Duration, Instant};

use courseware_core::{ContentKind, ModuleMetadata};
use courseware_engine::{
    ContentRecord, CreateModuleRequest, EngineEvent, EngineHandle, StatusKind, UploadApi,
    UploadError, UploadFile, UploadRequest, UploadSettings, UploadStatus,
};
use serde_json::json;
use tempfile::TempDir;

/// Completes on the first poll, or keeps processing forever when `endless`.
struct InstantApi {
    endless: bool,
}

#[async_trait::async_trait]
impl UploadApi for InstantApi {
    async fn initiate(
        &self,
        file: &UploadFile,
        _metadata: &ModuleMetadata,
    ) -> Result<String, UploadError> {
        Ok(format!("id-{}", file.file_name))
    }

    async fn status(&self, upload_id: &str) -> Result<UploadStatus, UploadError> {
        Ok(UploadStatus {
            status: if self.endless {
                StatusKind::Processing
            } else {
                StatusKind::Completed
            },
            progress: 50,
            message: String::new(),
            url: Some(format!("/files/{upload_id}")),
        })
    }

    async fn create_module(
        &self,
        request: &CreateModuleRequest,
    ) -> Result<ContentRecord, UploadError> {
        Ok(ContentRecord(json!({ "id": 5, "url": request.content_url })))
    }
}

fn request(temp: &TempDir, name: &str) -> UploadRequest {
    let file_path = temp.path().join(name);
    std::fs::write(&file_path, b"data").unwrap();
    UploadRequest {
        file_path,
        metadata: ModuleMetadata {
            title: "Notes".to_string(),
            kind: ContentKind::Text,
            order: 1,
            course_id: 2,
        },
    }
}

fn settings() -> UploadSettings {
    UploadSettings {
        poll_interval: Duration::from_millis(5),
        ..UploadSettings::default()
    }
}

fn wait_for_completion(
    engine: &EngineHandle,
    job_id: u64,
) -> Result<ContentRecord, UploadError> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(EngineEvent::UploadCompleted { job_id: id, result }) =
            engine.recv_timeout(Duration::from_millis(50))
        {
            if id == job_id {
                return result;
            }
        }
    }
    panic!("job {job_id} did not complete");
}

#[test]
fn enqueued_job_reports_progress_and_completion() {
    let temp = TempDir::new().unwrap();
    let engine = EngineHandle::with_api(InstantApi { endless: false }, settings());
    engine.enqueue(1, request(&temp, "notes.txt"));

    let record = wait_for_completion(&engine, 1).unwrap();
    assert_eq!(record.id(), Some(5));
    assert_eq!(record.0["url"], "/files/id-notes.txt");
}

#[test]
fn missing_file_fails_the_job() {
    let temp = TempDir::new().unwrap();
    let engine = EngineHandle::with_api(InstantApi { endless: false }, settings());
    engine.enqueue(
        2,
        UploadRequest {
            file_path: temp.path().join("absent.pdf"),
            ..request(&temp, "present.pdf")
        },
    );
    let err = wait_for_completion(&engine, 2).unwrap_err();
    assert!(matches!(err, UploadError::File(_)), "{err:?}");
}

#[test]
fn cancel_ends_an_endless_job() {
    let temp = TempDir::new().unwrap();
    let engine = EngineHandle::with_api(InstantApi { endless: true }, settings());
    engine.enqueue(3, request(&temp, "clip.mp4"));
    std::thread::sleep(Duration::from_millis(50));
    engine.cancel(3);

    assert_eq!(wait_for_completion(&engine, 3).unwrap_err(), UploadError::Cancelled);
}
