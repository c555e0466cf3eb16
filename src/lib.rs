//! rigforge builds character rigs out of reusable, option-parameterized parts.
//!
//! Each part goes through two phases against a [`SceneGraph`]:
//!
//! - a guide: placement handles, joints and shape templates the user adjusts
//! - a rig: controls and constraint networks built from the finished guide
//!
//! Guides can be mirrored across sides, duplicated, and captured into a [`Template`] that
//! replays the whole population later.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Errors, geometry values and settings.
pub mod foundation;
/// Guide lifecycle and validated option updates.
pub mod guide;
/// Mirroring and duplication of guides.
pub mod mirror;
/// Node naming convention.
pub mod naming;
/// Typed option schema.
pub mod options;
/// The part value and builder traits.
pub mod part;
/// Built-in part types.
pub mod parts;
/// Part factories and the definition catalog.
pub mod registry;
/// Rename engine with clash resolution.
pub mod rename;
/// Rig lifecycle and batch builds.
pub mod rig;
/// Scene collaborators.
pub mod scene;
/// Scoped stashing of guide populations.
pub mod staging;
/// Template capture and replay.
pub mod template;
/// Shared build environment.
pub mod workspace;

pub use crate::foundation::config::{ProjectSettings, RigSettings};
pub use crate::foundation::core::{Axis, CurveShape, MirrorMode, RotateOrder, Space, Transform, Vec3};
pub use crate::foundation::error::{RigError, RigResult};
pub use crate::guide::{GuideSession, StartMode, UpdateReport};
pub use crate::mirror::{duplicate, mirror, mirror_with};
pub use crate::naming::NameConvention;
pub use crate::options::{DataType, OptionSpec, OptionTable, OptionValue, Rejection};
pub use crate::part::{GuideBuilder, NodeCategory, NodeSet, Part, PartState, RigBuilder};
pub use crate::registry::{Catalog, CatalogEntry, DefinitionKind, PartRegistry};
pub use crate::rename::{AutoFailResolver, Resolution, Resolver, ScriptedResolver};
pub use crate::rig::{BuildReport, build_rigs};
pub use crate::scene::graph::{ConstraintKind, NodeType, SceneGraph};
pub use crate::scene::memory::MemoryScene;
pub use crate::template::{ReplayOptions, ReplayReport, Template, capture, replay};
pub use crate::workspace::Workspace;
