//! Asset storage contract invoked by the editor's asset subsystem.

use std::future::Future;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;

use crate::domain::assets::{Asset, UploadFile};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("asset storage rejected `{file}` with status {status}")]
    Rejected { file: String, status: u16 },
    #[error("asset upload of `{file}` failed: {message}")]
    Transport { file: String, message: String },
    #[error("asset storage returned an unreadable response for `{file}`: {message}")]
    InvalidResponse { file: String, message: String },
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("asset storage is not configured: {0}")]
    NotConfigured(String),
}

/// Remote persistence for editor media.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Upload every file. The result holds one asset per file, in input order.
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<Asset>, UploadError>;

    /// Remove previously uploaded assets.
    async fn delete(&self, assets: &[Asset]) -> Result<(), UploadError>;
}

/// Submit every file concurrently and collect the assets in input order.
///
/// All or nothing: the first failed submission fails the whole call and the
/// remaining in-flight submissions are dropped.
pub async fn upload_all<F, Fut>(files: Vec<UploadFile>, submit: F) -> Result<Vec<Asset>, UploadError>
where
    F: FnMut(UploadFile) -> Fut,
    Fut: Future<Output = Result<Asset, UploadError>>,
{
    try_join_all(files.into_iter().map(submit)).await
}
