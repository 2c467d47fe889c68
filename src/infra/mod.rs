//! Infrastructure adapters and runtime bootstrap.

pub mod cloudinary;
pub mod editor;
pub mod error;
pub mod host;
pub mod images;
pub mod presenter;
pub mod render;
pub mod telemetry;
