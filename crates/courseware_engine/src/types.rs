use std::fmt;
use std::time::Duration;

use courseware_core::UploadPhase;
use thiserror::Error;

use crate::api::ContentRecord;

pub type JobId = courseware_core::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub job_id: JobId,
    pub phase: UploadPhase,
    pub percent: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(UploadProgress),
    UploadCompleted {
        job_id: JobId,
        result: Result<ContentRecord, UploadError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Why an upload job did not produce a content record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Network unreachable, timeout or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(FetchError),
    /// Response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The server reported the upload as failed; message passed through verbatim.
    #[error("{0}")]
    Remote(String),
    #[error("upload cancelled")]
    Cancelled,
    #[error("upload did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("cannot read upload file: {0}")]
    File(String),
}

impl From<FetchError> for UploadError {
    fn from(err: FetchError) -> Self {
        UploadError::Transport(err)
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
