//! Shared building blocks: errors, geometry values and settings.

/// Build-wide settings loaded from JSON.
pub mod config;
/// Transforms, shapes, axes and rotation orders.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
