/// Percent reported before the initiation call.
pub const PERCENT_STARTED: u8 = 5;
/// Percent reported once the upload id has been assigned.
pub const PERCENT_INITIATED: u8 = 10;
/// Percent reported before the content record is created.
pub const PERCENT_FINALIZING: u8 = 95;
/// Percent reported once the content record exists.
pub const PERCENT_COMPLETED: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Initiating,
    Uploading,
    Polling,
    CreatingRecord,
    Completed,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadPhase::Completed | UploadPhase::Failed)
    }
}

/// One upload-and-poll sequence.
///
/// Transitions only move forward: progress never decreases and terminal
/// phases swallow every later transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadJob {
    upload_id: Option<String>,
    phase: UploadPhase,
    progress_percent: u8,
    status_message: String,
    result_url: Option<String>,
}

impl UploadJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn begin(&mut self, message: impl Into<String>) {
        self.advance(UploadPhase::Initiating, PERCENT_STARTED, message.into());
    }

    pub fn initiated(&mut self, upload_id: impl Into<String>, message: impl Into<String>) {
        if self.phase.is_terminal() {
            return;
        }
        self.upload_id = Some(upload_id.into());
        self.advance(UploadPhase::Uploading, PERCENT_INITIATED, message.into());
    }

    /// Applies a status tick. The remote percentage is kept strictly below the
    /// finalize mark so the finalize report is always the later, larger one.
    pub fn poll_tick(&mut self, remote_progress: i64, message: impl Into<String>) {
        let clamped = remote_progress.clamp(
            i64::from(PERCENT_INITIATED),
            i64::from(PERCENT_FINALIZING - 1),
        ) as u8;
        self.advance(UploadPhase::Polling, clamped, message.into());
    }

    pub fn remote_completed(&mut self, url: impl Into<String>) {
        if self.phase.is_terminal() {
            return;
        }
        self.result_url = Some(url.into());
    }

    pub fn finalizing(&mut self, message: impl Into<String>) {
        self.advance(UploadPhase::CreatingRecord, PERCENT_FINALIZING, message.into());
    }

    pub fn completed(&mut self, message: impl Into<String>) {
        self.advance(UploadPhase::Completed, PERCENT_COMPLETED, message.into());
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = UploadPhase::Failed;
        self.status_message = message.into();
    }

    /// Applies an externally observed progress report, such as an engine event.
    pub fn observe(&mut self, phase: UploadPhase, percent: u8, message: impl Into<String>) {
        self.advance(phase, percent.min(PERCENT_COMPLETED), message.into());
    }

    fn advance(&mut self, phase: UploadPhase, percent: u8, message: String) {
        if self.phase.is_terminal() {
            return;
        }
        if phase_rank(phase) >= phase_rank(self.phase) {
            self.phase = phase;
        }
        self.progress_percent = self.progress_percent.max(percent);
        self.status_message = message;
    }
}

fn phase_rank(phase: UploadPhase) -> u8 {
    match phase {
        UploadPhase::Initiating => 0,
        UploadPhase::Uploading => 1,
        UploadPhase::Polling => 2,
        UploadPhase::CreatingRecord => 3,
        UploadPhase::Completed | UploadPhase::Failed => 4,
    }
}
