//! Domain layer types and invariants.

pub mod artifacts;
pub mod assets;
pub mod blocks;
pub mod bundle;
pub mod template;
