//! Host-provided capabilities injected into the export pipeline.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::artifacts::{DocumentOptions, RasterImage, RasterOptions};

use super::{
    error::{PresentError, RenderCapabilityError},
    surface::RenderNode,
};

/// Captures a rendered node as a PNG image.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        node: &dyn RenderNode,
        options: &RasterOptions,
    ) -> Result<RasterImage, RenderCapabilityError>;
}

/// Converts a rendered node into a paginated document.
///
/// Returns `None` when the converter saved the document itself under
/// `options.filename`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(
        &self,
        node: &dyn RenderNode,
        options: &DocumentOptions,
    ) -> Result<Option<Bytes>, RenderCapabilityError>;
}

/// Hands finished artifacts to the user.
#[async_trait]
pub trait ExportPresenter: Send + Sync {
    /// Offer `data` as a downloadable file.
    async fn download(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), PresentError>;

    /// Display the exported HTML bundle for copying.
    async fn show_bundle(&self, html: &str) -> Result<(), PresentError>;
}
