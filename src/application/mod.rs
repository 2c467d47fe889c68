//! Export pipeline and asset storage contracts.

pub mod assets;
pub mod barrier;
pub mod capabilities;
pub mod error;
pub mod export;
pub mod offscreen;
pub mod snapshot;
pub mod surface;
