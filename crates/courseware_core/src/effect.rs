use crate::{JobId, ModuleMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartUpload {
        job_id: JobId,
        file_path: String,
        metadata: ModuleMetadata,
    },
    CancelUpload {
        job_id: JobId,
    },
}
