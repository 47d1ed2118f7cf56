#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Author submitted a module form together with the file to upload.
    UploadSubmitted {
        form: crate::ModuleForm,
        file_path: String,
    },
    /// Engine progress for an upload job.
    UploadProgress {
        job_id: crate::JobId,
        phase: crate::UploadPhase,
        percent: u8,
        message: String,
    },
    /// Engine completion for an upload job; `Ok` carries a record summary.
    UploadFinished {
        job_id: crate::JobId,
        result: Result<String, String>,
    },
    /// Author abandoned an upload.
    CancelRequested { job_id: crate::JobId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
