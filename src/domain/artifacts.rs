//! Export artifacts and the fixed options each export path renders with.

use std::{fmt, str::FromStr};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;

pub const RASTER_FILENAME: &str = "email-template.png";
pub const DOCUMENT_FILENAME: &str = "email-template.pdf";
pub const RASTER_CONTENT_TYPE: &str = "image/png";
pub const DOCUMENT_CONTENT_TYPE: &str = "application/pdf";

const DOCUMENT_MARGIN_MM: u32 = 10;
const DOCUMENT_SCALE_FACTOR: u32 = 2;

/// The three export strategies offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Raster,
    Document,
    Bundle,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Raster => "raster",
            ExportKind::Document => "document",
            ExportKind::Bundle => "bundle",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown export format `{0}` (expected png, pdf or html)")]
pub struct ParseExportKindError(String);

impl FromStr for ExportKind {
    type Err = ParseExportKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" | "image" | "raster" => Ok(ExportKind::Raster),
            "pdf" | "document" => Ok(ExportKind::Document),
            "html" | "bundle" => Ok(ExportKind::Bundle),
            _ => Err(ParseExportKindError(value.to_string())),
        }
    }
}

/// A rasterized capture of the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub png: Bytes,
    pub dimensions: Option<(u32, u32)>,
}

impl RasterImage {
    pub fn new(png: impl Into<Bytes>) -> Self {
        let png = png.into();
        let dimensions = imagesize::blob_size(&png).ok().and_then(|size| {
            let width = u32::try_from(size.width).ok()?;
            let height = u32::try_from(size.height).ok()?;
            Some((width, height))
        });
        Self { png, dimensions }
    }

    /// Encode the image as a `data:` URL suitable for an anchor download.
    pub fn to_data_url(&self) -> String {
        format!("data:{RASTER_CONTENT_TYPE};base64,{}", STANDARD.encode(&self.png))
    }
}

/// Outcome of the document conversion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutput {
    /// The converter produced the encoded document.
    Encoded(Bytes),
    /// The converter persisted the document itself under the requested filename.
    SavedByConverter,
}

/// One export's output. Produced once and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    Raster(RasterImage),
    Document(DocumentOutput),
    Bundle(String),
}

impl ExportArtifact {
    pub fn kind(&self) -> ExportKind {
        match self {
            ExportArtifact::Raster(_) => ExportKind::Raster,
            ExportArtifact::Document(_) => ExportKind::Document,
            ExportArtifact::Bundle(_) => ExportKind::Bundle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    pub use_cors: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { use_cors: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
}

impl PageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

/// Geometry handed to the document converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    pub margin_mm: u32,
    pub filename: String,
    pub scale_factor: u32,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    pub use_cors: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            margin_mm: DOCUMENT_MARGIN_MM,
            filename: DOCUMENT_FILENAME.to_string(),
            scale_factor: DOCUMENT_SCALE_FACTOR,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            use_cors: true,
        }
    }
}
