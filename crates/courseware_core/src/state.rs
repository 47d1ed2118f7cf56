use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, RejectedSubmission, UploadRowView};
use crate::UploadJob;

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackedUpload {
    title: String,
    file_path: String,
    job: UploadJob,
    record: Option<String>,
    cancel_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    jobs: BTreeMap<JobId, TrackedUpload>,
    rejected: Vec<RejectedSubmission>,
    next_job_id: JobId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let jobs: Vec<UploadRowView> = self
            .jobs
            .iter()
            .map(|(job_id, tracked)| UploadRowView {
                job_id: *job_id,
                title: tracked.title.clone(),
                file_path: tracked.file_path.clone(),
                phase: tracked.job.phase(),
                percent: tracked.job.progress_percent(),
                message: tracked.job.status_message().to_string(),
                record: tracked.record.clone(),
                cancel_requested: tracked.cancel_requested,
            })
            .collect();
        let active_count = jobs.iter().filter(|row| !row.phase.is_terminal()).count();
        AppViewModel {
            jobs,
            rejected: self.rejected.clone(),
            active_count,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn has_active_jobs(&self) -> bool {
        self.jobs.values().any(|t| !t.job.phase().is_terminal())
    }

    pub(crate) fn start_job(&mut self, title: String, file_path: String) -> JobId {
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        let mut job = UploadJob::new();
        job.begin("Queued");
        self.jobs.insert(
            job_id,
            TrackedUpload {
                title,
                file_path,
                job,
                record: None,
                cancel_requested: false,
            },
        );
        self.dirty = true;
        job_id
    }

    pub(crate) fn reject(&mut self, file_path: String, reason: String) {
        self.rejected.push(RejectedSubmission { file_path, reason });
        self.dirty = true;
    }

    pub(crate) fn apply_progress(
        &mut self,
        job_id: JobId,
        phase: crate::UploadPhase,
        percent: u8,
        message: String,
    ) {
        if let Some(tracked) = self.jobs.get_mut(&job_id) {
            tracked.job.observe(phase, percent, message);
            self.dirty = true;
        }
    }

    pub(crate) fn apply_finished(&mut self, job_id: JobId, result: Result<String, String>) {
        if let Some(tracked) = self.jobs.get_mut(&job_id) {
            match result {
                Ok(record) => {
                    tracked.job.completed("Module created");
                    tracked.record = Some(record);
                }
                Err(message) => tracked.job.failed(message),
            }
            self.dirty = true;
        }
    }

    /// Marks an active job as cancelled; returns false for unknown or finished jobs.
    pub(crate) fn request_cancel(&mut self, job_id: JobId) -> bool {
        match self.jobs.get_mut(&job_id) {
            Some(tracked) if !tracked.job.phase().is_terminal() && !tracked.cancel_requested => {
                tracked.cancel_requested = true;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }
}
