use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use courseware_core::ModuleMetadata;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{map_reqwest_error, FailureKind, FetchError, UploadError};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub upload_init_path: String,
    pub upload_status_path: String,
    pub content_create_path: String,
    pub connect_timeout: Duration,
    /// Applies to the initiation call, which carries the whole file.
    pub initiate_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            upload_init_path: "/api/modules/upload-async".to_string(),
            upload_status_path: "/api/modules/upload-status".to_string(),
            content_create_path: "/api/modules".to_string(),
            connect_timeout: Duration::from_secs(10),
            initiate_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// File payload of an upload. Size and type checks belong to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| UploadError::File(format!("{}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(file_name, mime_type, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StatusKind {
    Pending,
    Processing,
    Completed,
    Error,
    Other(String),
}

impl From<String> for StatusKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => StatusKind::Pending,
            "processing" => StatusKind::Processing,
            "completed" => StatusKind::Completed,
            "error" => StatusKind::Error,
            _ => StatusKind::Other(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadStatus {
    pub status: StatusKind,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    pub title: String,
    pub type_tag: String,
    pub order: u32,
    pub parent_id: i64,
    pub content_url: String,
}

impl CreateModuleRequest {
    pub fn new(metadata: &ModuleMetadata, content_url: impl Into<String>) -> Self {
        Self {
            title: metadata.title.clone(),
            type_tag: metadata.kind.as_tag().to_string(),
            order: metadata.order,
            parent_id: metadata.course_id,
            content_url: content_url.into(),
        }
    }
}

/// Content record returned by the API; opaque beyond its existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRecord(pub serde_json::Value);

impl ContentRecord {
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(serde_json::Value::as_i64)
    }

    pub fn summary(&self) -> String {
        match self.id() {
            Some(id) => format!("module {id}"),
            None => self.0.to_string(),
        }
    }
}

/// Remote endpoints an upload job talks to.
#[async_trait::async_trait]
pub trait UploadApi: Send + Sync {
    /// Submits the file and returns the upload id assigned by the server.
    async fn initiate(
        &self,
        file: &UploadFile,
        metadata: &ModuleMetadata,
    ) -> Result<String, UploadError>;

    async fn status(&self, upload_id: &str) -> Result<UploadStatus, UploadError>;

    async fn create_module(
        &self,
        request: &CreateModuleRequest,
    ) -> Result<ContentRecord, UploadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUploadApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestUploadApi {
    pub fn new(settings: ApiSettings) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UploadError> {
        Url::parse(&self.settings.base_url)
            .and_then(|base| base.join(path))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()).into())
    }

    async fn read_body(response: reqwest::Response) -> Result<Bytes, UploadError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            )
            .into());
        }
        response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(err).into())
    }
}

#[async_trait::async_trait]
impl UploadApi for ReqwestUploadApi {
    async fn initiate(
        &self,
        file: &UploadFile,
        metadata: &ModuleMetadata,
    ) -> Result<String, UploadError> {
        let url = self.endpoint(&self.settings.upload_init_path)?;
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|err| UploadError::File(err.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("title", metadata.title.clone())
            .text("typeTag", metadata.kind.as_tag())
            .text("order", metadata.order.to_string())
            .text("parentId", metadata.course_id.to_string());

        let response = self
            .client
            .post(url)
            .timeout(self.settings.initiate_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;
        parse_upload_id(&body)
    }

    async fn status(&self, upload_id: &str) -> Result<UploadStatus, UploadError> {
        let mut url = self.endpoint(&self.settings.upload_status_path)?;
        url.path_segments_mut()
            .map_err(|_| FetchError::new(FailureKind::InvalidUrl, "base url cannot have paths"))?
            .pop_if_empty()
            .push(upload_id);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;
        serde_json::from_slice(&body)
            .map_err(|err| UploadError::Malformed(format!("status response: {err}")))
    }

    async fn create_module(
        &self,
        request: &CreateModuleRequest,
    ) -> Result<ContentRecord, UploadError> {
        let url = self.endpoint(&self.settings.content_create_path)?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;
        if body.is_empty() {
            return Ok(ContentRecord(serde_json::Value::Null));
        }
        serde_json::from_slice(&body)
            .map_err(|err| UploadError::Malformed(format!("create response: {err}")))
    }
}

fn parse_upload_id(body: &[u8]) -> Result<String, UploadError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| UploadError::Malformed(format!("initiate response: {err}")))?;
    match value.get("uploadId").and_then(serde_json::Value::as_str) {
        Some(id) if !id.trim().is_empty() => Ok(id.to_string()),
        _ => Err(UploadError::Malformed(
            "initiate response has no uploadId".to_string(),
        )),
    }
}
