use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use courseware_core::ModuleMetadata;
use lms_logging::lms_warn;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiSettings, ReqwestUploadApi, UploadApi, UploadFile};
use crate::upload::{ChannelProgressSink, UploadOrchestrator, UploadSettings};
use crate::{EngineEvent, JobId, UploadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub metadata: ModuleMetadata,
}

enum EngineCommand {
    Enqueue {
        job_id: JobId,
        request: UploadRequest,
    },
    Cancel {
        job_id: JobId,
    },
}

type CancelMap = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Runs upload jobs on a background runtime and reports their events.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(api: ApiSettings, upload: UploadSettings) -> Result<Self, UploadError> {
        let api = ReqwestUploadApi::new(api)?;
        Ok(Self::with_api(api, upload))
    }

    pub fn with_api<A: UploadApi + 'static>(api: A, upload: UploadSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let orchestrator = Arc::new(UploadOrchestrator::new(api, upload));
        let cancels: CancelMap = Arc::new(Mutex::new(HashMap::new()));

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Enqueue { job_id, request } => {
                        let token = CancellationToken::new();
                        if let Ok(mut map) = cancels.lock() {
                            map.insert(job_id, token.clone());
                        }
                        let orchestrator = orchestrator.clone();
                        let event_tx = event_tx.clone();
                        let cancels = cancels.clone();
                        runtime.spawn(async move {
                            run_job(orchestrator.as_ref(), job_id, request, token, event_tx)
                                .await;
                            if let Ok(mut map) = cancels.lock() {
                                map.remove(&job_id);
                            }
                        });
                    }
                    EngineCommand::Cancel { job_id } => {
                        let token = cancels.lock().ok().and_then(|map| map.get(&job_id).cloned());
                        match token {
                            Some(token) => token.cancel(),
                            None => lms_warn!("Cancel for unknown or finished job {}", job_id),
                        }
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn enqueue(&self, job_id: JobId, request: UploadRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Enqueue { job_id, request });
    }

    pub fn cancel(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { job_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn run_job<A: UploadApi>(
    orchestrator: &UploadOrchestrator<A>,
    job_id: JobId,
    request: UploadRequest,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let result = match UploadFile::from_path(&request.file_path).await {
        Ok(file) => {
            orchestrator
                .upload(job_id, &file, &request.metadata, &sink, &cancel)
                .await
        }
        Err(err) => Err(err),
    };
    let _ = event_tx.send(EngineEvent::UploadCompleted { job_id, result });
}
