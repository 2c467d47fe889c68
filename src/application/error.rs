use thiserror::Error;

use crate::infra::error::InfraError;

use super::assets::UploadError;

/// An injected rendering capability rejected the request.
#[derive(Debug, Clone, Error)]
#[error("{capability} capability failed: {message}")]
pub struct RenderCapabilityError {
    pub capability: &'static str,
    pub message: String,
}

impl RenderCapabilityError {
    pub fn rasterize(message: impl Into<String>) -> Self {
        Self {
            capability: "rasterize",
            message: message.into(),
        }
    }

    pub fn convert(message: impl Into<String>) -> Self {
        Self {
            capability: "convert",
            message: message.into(),
        }
    }
}

/// The presenter could not hand an artifact to the user.
#[derive(Debug, Error)]
pub enum PresentError {
    #[error("failed to write `{target}`: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("another export is already in progress")]
    Busy,
    #[error(transparent)]
    Render(#[from] RenderCapabilityError),
    #[error("failed to mount offscreen container: {message}")]
    Mount { message: String },
    #[error(transparent)]
    Present(#[from] PresentError),
}

impl ExportError {
    pub fn mount(message: impl Into<String>) -> Self {
        Self::Mount {
            message: message.into(),
        }
    }

    /// Short label for the failing stage, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Busy => "busy",
            ExportError::Render(err) => err.capability,
            ExportError::Mount { .. } => "mount",
            ExportError::Present(_) => "present",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
