use std::path::PathBuf;
use std::time::Duration;

use courseware_core::{Effect, Msg};
use courseware_engine::{EngineEvent, EngineHandle, UploadRequest};
use lms_logging::{lms_info, lms_warn};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload {
                    job_id,
                    file_path,
                    metadata,
                } => {
                    lms_info!(
                        "StartUpload job_id={} kind={} file={}",
                        job_id,
                        metadata.kind,
                        file_path
                    );
                    self.engine.enqueue(
                        job_id,
                        UploadRequest {
                            file_path: PathBuf::from(file_path),
                            metadata,
                        },
                    );
                }
                Effect::CancelUpload { job_id } => {
                    lms_info!("CancelUpload job_id={}", job_id);
                    self.engine.cancel(job_id);
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(to_msg)
    }
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::UploadProgress {
            job_id: progress.job_id,
            phase: progress.phase,
            percent: progress.percent,
            message: progress.message,
        },
        EngineEvent::UploadCompleted { job_id, result } => Msg::UploadFinished {
            job_id,
            result: match result {
                Ok(record) => Ok(record.summary()),
                Err(err) => {
                    lms_warn!("Upload job {} failed: {}", job_id, err);
                    Err(err.to_string())
                }
            },
        },
    }
}
