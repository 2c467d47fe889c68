//! Local delivery of export artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};
use tracing::info;

use crate::application::{capabilities::ExportPresenter, error::PresentError};

/// Where the HTML bundle goes once exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleTarget {
    Stdout,
    File(PathBuf),
}

/// Saves downloads into a directory and writes the bundle to a file or stdout.
#[derive(Debug, Clone)]
pub struct LocalPresenter {
    download_dir: PathBuf,
    bundle_target: BundleTarget,
}

impl LocalPresenter {
    pub fn new(download_dir: PathBuf, bundle_target: BundleTarget) -> Self {
        Self {
            download_dir,
            bundle_target,
        }
    }
}

fn io_error(target: &Path, source: std::io::Error) -> PresentError {
    PresentError::Io {
        target: target.display().to_string(),
        source,
    }
}

#[async_trait]
impl ExportPresenter for LocalPresenter {
    async fn download(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), PresentError> {
        fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|err| io_error(&self.download_dir, err))?;
        let path = self.download_dir.join(filename);
        fs::write(&path, &data)
            .await
            .map_err(|err| io_error(&path, err))?;

        info!(
            target = "infra::presenter",
            op = "presenter::download",
            path = %path.display(),
            content_type,
            bytes = data.len(),
            "Artifact saved"
        );
        Ok(())
    }

    async fn show_bundle(&self, html: &str) -> Result<(), PresentError> {
        match &self.bundle_target {
            BundleTarget::Stdout => {
                let mut stdout = tokio::io::stdout();
                let mut payload = html.to_string();
                payload.push('\n');
                stdout
                    .write_all(payload.as_bytes())
                    .await
                    .map_err(|err| io_error(Path::new("stdout"), err))?;
                stdout
                    .flush()
                    .await
                    .map_err(|err| io_error(Path::new("stdout"), err))?;
            }
            BundleTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|err| io_error(parent, err))?;
                }
                fs::write(path, html.as_bytes())
                    .await
                    .map_err(|err| io_error(path, err))?;
                info!(
                    target = "infra::presenter",
                    op = "presenter::show_bundle",
                    path = %path.display(),
                    bytes = html.len(),
                    "Bundle written"
                );
            }
        }
        Ok(())
    }
}
