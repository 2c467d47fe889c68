//! Export orchestration: snapshot, isolate, settle, render, deliver.

use std::{sync::Arc, time::Instant};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::domain::{
    artifacts::{
        DOCUMENT_CONTENT_TYPE, DOCUMENT_FILENAME, DocumentOptions, DocumentOutput, ExportArtifact,
        ExportKind, RASTER_CONTENT_TYPE, RASTER_FILENAME, RasterOptions,
    },
    bundle::standalone_document,
};

use super::{
    barrier::await_images_settled,
    capabilities::{DocumentConverter, ExportPresenter, Rasterizer},
    error::ExportError,
    offscreen::with_offscreen_copy,
    snapshot::DocumentSnapshot,
    surface::{EditorSurface, LiveTree},
};

/// Rules merged into the document export so the live editor theme cannot
/// leak into the printed output.
pub const NEUTRAL_FOREGROUND_CSS: &str =
    "body { color: #000 !important; }\n* { color: #000 !important; }";

/// Collaborators the orchestrator composes.
#[derive(Clone)]
pub struct ExportServices {
    pub editor: Arc<dyn EditorSurface>,
    pub tree: Arc<dyn LiveTree>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub converter: Arc<dyn DocumentConverter>,
    pub presenter: Arc<dyn ExportPresenter>,
}

/// Runs the three export strategies. At most one export runs at a time.
pub struct ExportOrchestrator {
    services: ExportServices,
    in_flight: Mutex<()>,
}

impl ExportOrchestrator {
    pub fn new(services: ExportServices) -> Self {
        Self {
            services,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn export(&self, kind: ExportKind) -> Result<ExportArtifact, ExportError> {
        match kind {
            ExportKind::Raster => self.export_raster().await,
            ExportKind::Document => self.export_document().await,
            ExportKind::Bundle => self.export_bundle().await,
        }
    }

    /// Rasterize the live canvas and offer it as `email-template.png`.
    pub async fn export_raster(&self) -> Result<ExportArtifact, ExportError> {
        let _permit = self.begin(ExportKind::Raster)?;
        let started_at = Instant::now();

        let root = self.services.editor.canvas_root();
        await_images_settled(root.as_ref()).await;

        let image = self
            .services
            .rasterizer
            .rasterize(root.as_ref(), &RasterOptions::default())
            .await
            .map_err(ExportError::from)
            .inspect_err(|err| log_failure(ExportKind::Raster, started_at, err))?;

        self.services
            .presenter
            .download(RASTER_FILENAME, RASTER_CONTENT_TYPE, image.png.clone())
            .await?;

        info!(
            target = "application::export",
            op = "export::raster",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            png_bytes = image.png.len(),
            filename = RASTER_FILENAME,
            "Raster export finished"
        );
        Ok(ExportArtifact::Raster(image))
    }

    /// Convert an isolated copy of the document into `email-template.pdf`.
    pub async fn export_document(&self) -> Result<ExportArtifact, ExportError> {
        let _permit = self.begin(ExportKind::Document)?;
        let started_at = Instant::now();

        let snapshot = DocumentSnapshot::capture(self.services.editor.as_ref())
            .with_extra_stylesheet(NEUTRAL_FOREGROUND_CSS);
        let options = DocumentOptions::default();
        let converter = Arc::clone(&self.services.converter);

        let converted = with_offscreen_copy(self.services.tree.as_ref(), &snapshot, |node| {
            let options = &options;
            async move {
                await_images_settled(node.as_ref()).await;
                converter
                    .convert(node.as_ref(), options)
                    .await
                    .map_err(ExportError::from)
            }
        })
        .await
        .inspect_err(|err| log_failure(ExportKind::Document, started_at, err))?;

        let output = match converted {
            Some(data) => {
                let output = DocumentOutput::Encoded(data.clone());
                self.services
                    .presenter
                    .download(&options.filename, DOCUMENT_CONTENT_TYPE, data)
                    .await?;
                output
            }
            None => DocumentOutput::SavedByConverter,
        };

        info!(
            target = "application::export",
            op = "export::document",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            filename = DOCUMENT_FILENAME,
            saved_by_converter = matches!(output, DocumentOutput::SavedByConverter),
            "Document export finished"
        );
        Ok(ExportArtifact::Document(output))
    }

    /// Wrap the document in a standalone HTML page and present it.
    pub async fn export_bundle(&self) -> Result<ExportArtifact, ExportError> {
        let _permit = self.begin(ExportKind::Bundle)?;

        let (markup, stylesheet) =
            DocumentSnapshot::capture(self.services.editor.as_ref()).into_parts();
        let html = standalone_document(&markup, &stylesheet);
        self.services.presenter.show_bundle(&html).await?;

        info!(
            target = "application::export",
            op = "export::bundle",
            result = "ok",
            html_bytes = html.len(),
            "Bundle export finished"
        );
        Ok(ExportArtifact::Bundle(html))
    }

    fn begin(&self, kind: ExportKind) -> Result<MutexGuard<'_, ()>, ExportError> {
        self.in_flight.try_lock().map_err(|_| {
            warn!(
                target = "application::export",
                op = "export::begin",
                kind = %kind,
                result = "busy",
                "Export rejected while another export is running"
            );
            ExportError::Busy
        })
    }
}

fn log_failure(kind: ExportKind, started_at: Instant, err: &ExportError) {
    warn!(
        target = "application::export",
        op = "export::render",
        kind = %kind,
        result = "error",
        failure = err.kind(),
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        error = %err,
        "Export failed"
    );
}
