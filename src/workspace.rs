//! Everything an operation needs besides the part itself: scene, naming, resolver, settings.

use crate::foundation::config::RigSettings;
use crate::foundation::error::RigResult;
use crate::naming::NameConvention;
use crate::part::ATTR_PART_TYPE;
use crate::rename::{AutoFailResolver, Resolver};
use crate::scene::graph::{NodeType, SceneGraph};
use crate::scene::memory::MemoryScene;

/// Visibility toggle on the settings node driving every guide root.
pub const GUIDE_VIS: &str = "guideVis";
/// Visibility toggle on the settings node driving every control group.
pub const CONTROL_VIS: &str = "controlVis";
/// Visibility toggle on the settings node driving every rig group.
pub const RIG_VIS: &str = "rigVis";

/// Build environment shared by every part operation.
pub struct Workspace {
    scene: Box<dyn SceneGraph>,
    naming: NameConvention,
    resolver: Box<dyn Resolver>,
    settings: RigSettings,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("naming", &self.naming)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

pub(crate) struct WorkspaceParts<'a> {
    pub scene: &'a mut dyn SceneGraph,
    pub naming: &'a NameConvention,
    pub resolver: &'a mut dyn Resolver,
    pub settings: &'a RigSettings,
}

impl Workspace {
    /// Workspace over `scene`. Settings are validated; clashes cancel until a resolver is set.
    pub fn new(scene: impl SceneGraph + 'static, settings: RigSettings) -> RigResult<Self> {
        settings.validate()?;
        Ok(Self {
            scene: Box::new(scene),
            naming: NameConvention::from_settings(&settings),
            resolver: Box::new(AutoFailResolver),
            settings,
        })
    }

    /// Empty in-memory scene with default settings.
    pub fn in_memory() -> Self {
        let settings = RigSettings::default();
        Self {
            scene: Box::new(MemoryScene::new()),
            naming: NameConvention::from_settings(&settings),
            resolver: Box::new(AutoFailResolver),
            settings,
        }
    }

    /// Replace the clash resolver.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.set_resolver(resolver);
        self
    }

    /// Replace the clash resolver in place.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) {
        self.resolver = Box::new(resolver);
    }

    /// Scene collaborator.
    pub fn scene(&self) -> &dyn SceneGraph {
        self.scene.as_ref()
    }

    /// Mutable scene collaborator.
    pub fn scene_mut(&mut self) -> &mut dyn SceneGraph {
        self.scene.as_mut()
    }

    /// Active naming convention.
    pub fn naming(&self) -> &NameConvention {
        &self.naming
    }

    /// Active settings.
    pub fn settings(&self) -> &RigSettings {
        &self.settings
    }

    pub(crate) fn parts(&mut self) -> WorkspaceParts<'_> {
        WorkspaceParts {
            scene: self.scene.as_mut(),
            naming: &self.naming,
            resolver: self.resolver.as_mut(),
            settings: &self.settings,
        }
    }

    /// Create the guide container, parts container and settings node if missing.
    pub fn ensure_containers(&mut self) -> RigResult<()> {
        let s = &self.settings;
        let scene = self.scene.as_mut();
        for group in [&s.guide_container, &s.parts_container] {
            if !scene.exists(group) {
                scene.create_node(group, NodeType::Group, None)?;
            }
        }
        if !scene.exists(&s.settings_node) {
            scene.create_node(&s.settings_node, NodeType::Utility, None)?;
            for toggle in [GUIDE_VIS, CONTROL_VIS, RIG_VIS] {
                scene.set_attr(&s.settings_node, toggle, serde_json::Value::Bool(true))?;
            }
            tracing::debug!(node = %s.settings_node, "created settings node");
        }
        Ok(())
    }

    /// Guide roots under the guide container, in scene order.
    pub fn guide_roots(&self) -> Vec<String> {
        let container = &self.settings.guide_container;
        if !self.scene.exists(container) {
            return Vec::new();
        }
        self.scene
            .children(container)
            .into_iter()
            .filter(|c| self.scene.attr(c, ATTR_PART_TYPE).is_some())
            .collect()
    }
}
