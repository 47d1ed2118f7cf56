use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cache::storage::{CacheError, CacheStorage, CachedResponse};
use crate::cache_key::cache_key;
use crate::persist::{ensure_output_dir, AtomicFileWriter};

const META_SUFFIX: &str = "json";
const BODY_SUFFIX: &str = "body";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    content_type: Option<String>,
}

/// Cache generations as directories under a root; each entry is a JSON
/// metadata file plus a raw body file named by the URL's hash.
///
/// The body is written before the metadata, so a present metadata file marks
/// a complete entry.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, name: &str) -> Result<PathBuf, CacheError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| CacheError::Unavailable(err.to_string()))?
}

#[async_trait::async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn generations(&self) -> Result<Vec<String>, CacheError> {
        let root = self.root.clone();
        blocking(move || {
            let entries = match fs::read_dir(&root) {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            names.sort();
            Ok(names)
        })
        .await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, CacheError> {
        let dir = self.generation_dir(name)?;
        blocking(move || match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        })
        .await
    }

    async fn lookup(
        &self,
        generation: &str,
        url: &str,
    ) -> Result<Option<CachedResponse>, CacheError> {
        let dir = self.generation_dir(generation)?;
        let url = url.to_string();
        blocking(move || {
            let key = cache_key(&url);
            let meta_text = match fs::read(dir.join(format!("{key}.{META_SUFFIX}"))) {
                Ok(text) => text,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            let meta: EntryMeta = serde_json::from_slice(&meta_text)
                .map_err(|err| CacheError::Corrupt(err.to_string()))?;
            if meta.url != url {
                return Ok(None);
            }
            let body = fs::read(dir.join(format!("{key}.{BODY_SUFFIX}")))
                .map_err(|err| CacheError::Corrupt(format!("missing body for {url}: {err}")))?;
            Ok(Some(CachedResponse {
                status: meta.status,
                content_type: meta.content_type,
                body: Bytes::from(body),
            }))
        })
        .await
    }

    async fn store(
        &self,
        generation: &str,
        url: &str,
        response: &CachedResponse,
    ) -> Result<(), CacheError> {
        let dir = self.generation_dir(generation)?;
        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        let body = response.body.clone();
        blocking(move || {
            ensure_output_dir(&dir)?;
            let key = cache_key(&meta.url);
            let meta_text = serde_json::to_vec(&meta)
                .map_err(|err| CacheError::Corrupt(err.to_string()))?;
            let writer = AtomicFileWriter::new(dir);
            writer.write(&format!("{key}.{BODY_SUFFIX}"), &body)?;
            writer.write(&format!("{key}.{META_SUFFIX}"), &meta_text)?;
            Ok(())
        })
        .await
    }
}
