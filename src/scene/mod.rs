//! Scene collaborators consumed by the build pipeline.
//!
//! Everything above this layer talks to a [`graph::SceneGraph`]; [`memory::MemoryScene`] is the
//! headless implementation used by the CLI and tests.

/// Node query and mutation trait.
pub mod graph;
/// In-memory scene.
pub mod memory;
/// World/local conversion and transform mirroring.
pub mod transform;
