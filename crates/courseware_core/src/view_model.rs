use crate::{JobId, UploadPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub jobs: Vec<UploadRowView>,
    pub rejected: Vec<RejectedSubmission>,
    pub active_count: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRowView {
    pub job_id: JobId,
    pub title: String,
    pub file_path: String,
    pub phase: UploadPhase,
    pub percent: u8,
    pub message: String,
    pub record: Option<String>,
    pub cancel_requested: bool,
}

/// A submission whose form could not be coerced into module metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSubmission {
    pub file_path: String,
    pub reason: String,
}
