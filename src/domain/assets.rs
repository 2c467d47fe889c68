//! Media assets managed by the editor's asset subsystem.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Fallback name used when an upload source has no usable file name.
pub const FALLBACK_FILE_NAME: &str = "upload.bin";

/// An asset persisted by the remote storage service.
///
/// `id` and `src` are authoritative only once the remote store accepted the
/// upload; the editor references assets by these values afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub src: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// A binary file handle submitted for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Build an upload from file contents, guessing the MIME type from the extension.
    pub fn from_path_contents(path: &Path, data: impl Into<Bytes>) -> Self {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
