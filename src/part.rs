//! The [`Part`] value and the seams part types plug into.
//!
//! A part is reconstructed from scene state on demand; its guide root is the ground truth of
//! whether it is built. Guide and rig construction are supplied per part type through the
//! [`GuideBuilder`] and [`RigBuilder`] traits.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{CurveShape, Space, Transform};
use crate::foundation::error::{RigError, RigResult};
use crate::naming::NameConvention;
use crate::options::{OptionTable, OptionValue};
use crate::registry::PartRegistry;
use crate::scene::graph::{ConstraintKind, NodeType, SceneGraph};
use crate::scene::transform::{read_transform, write_transform};
use crate::workspace::Workspace;

/// Guide-root attribute holding the registered part type.
pub const ATTR_PART_TYPE: &str = "partType";
/// Guide-root attribute holding the serialized option declarations.
pub const ATTR_OPTIONS: &str = "options";
/// Guide-root attribute flagging the part to build after every other part.
pub const ATTR_BUILD_LAST: &str = "buildLast";
/// Guide-root attribute excluding the part from batch rig builds.
pub const ATTR_SKIP_BUILD: &str = "skipBuild";
/// Guide-root attribute recording the rig groups created by `start_rig`.
pub const ATTR_RIG_ROOTS: &str = "rigRoots";
/// Sub-group attribute naming its [`NodeCategory`].
pub const ATTR_CATEGORY: &str = "guideCategory";
/// Visibility attribute driven by toggles.
pub const ATTR_VISIBILITY: &str = "visibility";

/// Lifecycle state of a part.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartState {
    /// No guide in the scene.
    #[default]
    Unbuilt,
    /// Between `start_guide` and `finish_guide`.
    GuideBuilding,
    /// Guide finished.
    GuideBuilt,
    /// Between `start_rig` and `finish_rig`.
    RigBuilding,
    /// Rig finished.
    RigBuilt,
}

/// The five typed sub-groups of a guide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Control shape templates.
    Controls,
    /// Placement handles.
    Placers,
    /// Skeleton joints.
    Joints,
    /// Proxy geometry and surfaces.
    Geometry,
    /// Nodes that must not inherit transforms.
    NoTransform,
}

impl NodeCategory {
    /// All categories in walk order.
    pub const ALL: [NodeCategory; 5] = [
        NodeCategory::Controls,
        NodeCategory::Placers,
        NodeCategory::Joints,
        NodeCategory::Geometry,
        NodeCategory::NoTransform,
    ];

    /// Name token of the category sub-group.
    pub fn token(self) -> &'static str {
        match self {
            Self::Controls => "controls",
            Self::Placers => "placers",
            Self::Joints => "joints",
            Self::Geometry => "geometry",
            Self::NoTransform => "noTransform",
        }
    }

    /// Inverse of [`NodeCategory::token`].
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    /// Name of the root attribute toggling this sub-group's visibility.
    pub fn visibility_attr(self) -> String {
        format!("{}Vis", self.token())
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Control and rig groups created for one driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigRoots {
    /// Group holding animator controls.
    pub control_group: String,
    /// Group holding the rig network.
    pub rig_group: String,
}

/// Scene nodes belonging to one guide.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeSet {
    /// Guide root.
    pub root: String,
    /// Category sub-groups.
    pub groups: IndexMap<NodeCategory, String>,
    /// Descendants of each sub-group, depth-first.
    pub members: IndexMap<NodeCategory, Vec<String>>,
    /// Nodes parented directly under the root outside the sub-groups.
    pub loose: Vec<String>,
    /// Non-hierarchical helpers attached to any node above.
    pub history: Vec<String>,
}

impl NodeSet {
    /// Discover the node set under `root`.
    pub fn from_root(scene: &dyn SceneGraph, root: &str) -> Self {
        let mut set = NodeSet {
            root: root.to_owned(),
            ..NodeSet::default()
        };
        for child in scene.children(root) {
            let category = scene
                .attr(&child, ATTR_CATEGORY)
                .and_then(|v| v.as_str().and_then(NodeCategory::from_token));
            match category {
                Some(c) => {
                    set.members.insert(c, scene.descendants(&child));
                    set.groups.insert(c, child);
                }
                None => {
                    set.loose.push(child.clone());
                    set.loose.extend(scene.descendants(&child));
                }
            }
        }
        for node in set.hierarchy() {
            for h in scene.history(&node) {
                if !set.history.contains(&h) {
                    set.history.push(h);
                }
            }
        }
        set
    }

    /// Members of one category.
    pub fn category(&self, category: NodeCategory) -> &[String] {
        self.members
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Root, sub-groups, members and loose nodes, parents before children.
    pub fn hierarchy(&self) -> Vec<String> {
        let mut out = vec![self.root.clone()];
        for c in NodeCategory::ALL {
            if let Some(g) = self.groups.get(&c) {
                out.push(g.clone());
            }
            out.extend(self.category(c).iter().cloned());
        }
        out.extend(self.loose.iter().cloned());
        out
    }

    /// Every node, history last.
    pub fn all(&self) -> Vec<String> {
        let mut out = self.hierarchy();
        out.extend(self.history.iter().cloned());
        out
    }
}

/// Per-part-type guide construction.
pub trait GuideBuilder: Send + Sync {
    /// Populate the guide sub-groups. Every created node must sit under a sub-group or the root.
    fn build_guide(&self, ctx: &mut GuideContext<'_>, options: &OptionTable) -> RigResult<()>;
}

/// Per-part-type rig construction.
pub trait RigBuilder: Send + Sync {
    /// Build controls and constraint networks under the groups made by `start_rig`.
    fn build_rig(&self, ctx: &mut RigContext<'_>, options: &OptionTable) -> RigResult<()>;
}

/// A self-contained, option-parameterized rig-building unit.
#[derive(Clone)]
pub struct Part {
    pub(crate) part_type: String,
    pub(crate) options: OptionTable,
    pub(crate) guide_root: Option<String>,
    pub(crate) rig_roots: IndexMap<String, RigRoots>,
    pub(crate) state: PartState,
    pub(crate) build_last: bool,
    pub(crate) root: bool,
    pub(crate) skip_build: bool,
    pub(crate) pending_rebuild: IndexMap<String, OptionValue>,
    pub(crate) guide: Arc<dyn GuideBuilder>,
    pub(crate) rig: Arc<dyn RigBuilder>,
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("part_type", &self.part_type)
            .field("side", &self.options.side())
            .field("name", &self.options.name())
            .field("guide_root", &self.guide_root)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Part {
    /// Unbuilt part of `part_type` with the given schema and builders.
    pub fn new(
        part_type: impl Into<String>,
        options: OptionTable,
        guide: Arc<dyn GuideBuilder>,
        rig: Arc<dyn RigBuilder>,
    ) -> Self {
        Self {
            part_type: part_type.into(),
            options,
            guide_root: None,
            rig_roots: IndexMap::new(),
            state: PartState::Unbuilt,
            build_last: false,
            root: false,
            skip_build: false,
            pending_rebuild: IndexMap::new(),
            guide,
            rig,
        }
    }

    /// Declare the part as building after every other part.
    pub fn with_build_last(mut self, build_last: bool) -> Self {
        self.build_last = build_last;
        self
    }

    /// Declare the part as a hierarchy root that batch builds run first.
    pub fn with_root(mut self, root: bool) -> Self {
        self.root = root;
        self
    }

    /// Whether batch builds run this part before every other part.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Registered type key.
    pub fn part_type(&self) -> &str {
        &self.part_type
    }

    /// Option schema and values.
    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    /// Current side token.
    pub fn side(&self) -> &str {
        self.options.side()
    }

    /// Current name token.
    pub fn name(&self) -> &str {
        self.options.name()
    }

    /// Guide root, `None` when unbuilt.
    pub fn guide_root(&self) -> Option<&str> {
        self.guide_root.as_deref()
    }

    /// Rig groups keyed by driver token.
    pub fn rig_roots(&self) -> &IndexMap<String, RigRoots> {
        &self.rig_roots
    }

    /// Lifecycle state.
    pub fn state(&self) -> PartState {
        self.state
    }

    /// Whether the part builds after every other part, statically or through a `rig_part` option.
    pub fn build_last(&self) -> bool {
        self.build_last || self.options.build_last()
    }

    /// Whether batch rig builds skip this part.
    pub fn skip_build(&self) -> bool {
        self.skip_build
    }

    /// Exclude or include the part in batch rig builds, persisting the flag when guide-built.
    pub fn set_skip_build(&mut self, ws: &mut Workspace, skip: bool) -> RigResult<()> {
        self.skip_build = skip;
        if let Some(root) = &self.guide_root {
            ws.scene_mut()
                .set_attr(root, ATTR_SKIP_BUILD, serde_json::Value::Bool(skip))?;
        }
        Ok(())
    }

    /// Values parked until [`Part::confirm_rebuild`].
    pub fn pending_rebuild(&self) -> &IndexMap<String, OptionValue> {
        &self.pending_rebuild
    }

    /// Discovered guide nodes, if the guide exists.
    pub fn node_set(&self, ws: &Workspace) -> Option<NodeSet> {
        let root = self.guide_root.as_deref()?;
        ws.scene()
            .exists(root)
            .then(|| NodeSet::from_root(ws.scene(), root))
    }

    /// Rebuild a part value from a guide root's metadata.
    pub fn set_guide(ws: &Workspace, registry: &PartRegistry, root: &str) -> RigResult<Part> {
        let scene = ws.scene();
        if !scene.exists(root) {
            return Err(RigError::missing_guide(format!("'{root}' does not exist")));
        }
        let part_type = scene
            .attr(root, ATTR_PART_TYPE)
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| {
                RigError::missing_guide(format!("'{root}' carries no {ATTR_PART_TYPE} tag"))
            })?;
        let mut part = registry.instantiate(&part_type)?;
        if let Some(meta) = scene.attr(root, ATTR_OPTIONS).and_then(|v| v.as_str().map(str::to_owned)) {
            let stored = OptionTable::parse_metadata(&meta)?;
            part.options
                .load_values(stored.iter().map(|(k, spec)| (k, &spec.value)));
        }
        part.skip_build = scene
            .attr(root, ATTR_SKIP_BUILD)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if scene.attr(root, ATTR_BUILD_LAST).and_then(|v| v.as_bool()) == Some(true) {
            part.build_last = true;
        }
        part.guide_root = Some(root.to_owned());
        part.state = PartState::GuideBuilt;

        if let Some(roots) = scene.attr(root, ATTR_RIG_ROOTS) {
            let roots: IndexMap<String, RigRoots> = serde_json::from_value(roots)
                .map_err(|e| RigError::serde(format!("parse {ATTR_RIG_ROOTS} on '{root}': {e}")))?;
            if !roots.is_empty()
                && roots
                    .values()
                    .all(|r| scene.exists(&r.control_group) && scene.exists(&r.rig_group))
            {
                part.rig_roots = roots;
                part.state = PartState::RigBuilt;
            }
        }
        Ok(part)
    }

    /// Locate a built part by its side and name tokens.
    pub fn find(
        ws: &Workspace,
        registry: &PartRegistry,
        side: &str,
        name: &str,
    ) -> RigResult<Option<Part>> {
        let root = ws.naming().guide_root(side, name);
        if !ws.scene().exists(&root) {
            return Ok(None);
        }
        Self::set_guide(ws, registry, &root).map(Some)
    }

    /// Write the option declarations and flags onto the guide root.
    pub(crate) fn write_metadata(&self, scene: &mut dyn SceneGraph) -> RigResult<()> {
        let Some(root) = &self.guide_root else {
            return Ok(());
        };
        scene.set_attr(
            root,
            ATTR_PART_TYPE,
            serde_json::Value::String(self.part_type.clone()),
        )?;
        scene.set_attr(
            root,
            ATTR_OPTIONS,
            serde_json::Value::String(self.options.to_metadata()?),
        )?;
        scene.set_attr(root, ATTR_BUILD_LAST, serde_json::Value::Bool(self.build_last()))?;
        scene.set_attr(root, ATTR_SKIP_BUILD, serde_json::Value::Bool(self.skip_build))?;
        Ok(())
    }
}

/// Node factory handed to [`GuideBuilder::build_guide`].
pub struct GuideContext<'a> {
    pub(crate) scene: &'a mut dyn SceneGraph,
    pub(crate) naming: &'a NameConvention,
    pub(crate) side: String,
    pub(crate) name: String,
    pub(crate) root: String,
    pub(crate) groups: IndexMap<NodeCategory, String>,
}

impl GuideContext<'_> {
    /// Side token the guide is built with.
    pub fn side(&self) -> &str {
        &self.side
    }

    /// Name token the guide is built with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `-1.0` on the right side, `1.0` elsewhere.
    pub fn side_sign(&self) -> f64 {
        if self.side == self.naming.right() {
            -1.0
        } else {
            1.0
        }
    }

    /// Left side token of the active naming convention.
    pub fn left(&self) -> &str {
        self.naming.left()
    }

    /// Right side token of the active naming convention.
    pub fn right(&self) -> &str {
        self.naming.right()
    }

    /// Canonical name for a node of this part.
    pub fn format(&self, tokens: &[&str], node_type: NodeType) -> String {
        self.naming.format(&self.side, &self.name, tokens, node_type)
    }

    /// Sub-group node of a category.
    pub fn group(&self, category: NodeCategory) -> &str {
        self.groups
            .get(&category)
            .map(String::as_str)
            .unwrap_or(self.root.as_str())
    }

    /// Create a node in a category, under `parent` or the category sub-group, at a local pose.
    pub fn add(
        &mut self,
        category: NodeCategory,
        tokens: &[&str],
        node_type: NodeType,
        parent: Option<&str>,
        transform: Transform,
    ) -> RigResult<String> {
        let name = self.format(tokens, node_type);
        let parent = parent.unwrap_or(self.group(category)).to_owned();
        self.scene.create_node(&name, node_type, Some(&parent))?;
        if node_type.is_transform() {
            self.scene.set_transform(&name, transform)?;
        }
        Ok(name)
    }

    /// Create a control-shape template. The `guide` token keeps it apart from the rig control.
    pub fn add_control(
        &mut self,
        tokens: &[&str],
        parent: Option<&str>,
        transform: Transform,
        shape: CurveShape,
    ) -> RigResult<String> {
        let mut toks: Vec<&str> = tokens.to_vec();
        toks.push("guide");
        let name = self.add(
            NodeCategory::Controls,
            &toks,
            NodeType::Control,
            parent,
            transform,
        )?;
        self.scene.set_shape(&name, shape)?;
        Ok(name)
    }

    /// Attach a non-hierarchical helper node to `owner`.
    pub fn add_history(&mut self, owner: &str, tokens: &[&str]) -> RigResult<String> {
        let name = self.format(tokens, NodeType::Utility);
        self.scene.create_node(&name, NodeType::Utility, None)?;
        self.scene.connect_history(owner, &name)?;
        Ok(name)
    }

    /// Set the shape of an existing node.
    pub fn set_shape(&mut self, node: &str, shape: CurveShape) -> RigResult<()> {
        self.scene.set_shape(node, shape)
    }

    /// Direct scene access for anything the helpers do not cover.
    pub fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut *self.scene
    }
}

/// Node factory handed to [`RigBuilder::build_rig`].
pub struct RigContext<'a> {
    pub(crate) scene: &'a mut dyn SceneGraph,
    pub(crate) naming: &'a NameConvention,
    pub(crate) side: String,
    pub(crate) name: String,
    pub(crate) guide: NodeSet,
    pub(crate) roots: IndexMap<String, RigRoots>,
    pub(crate) missing: Vec<String>,
}

impl RigContext<'_> {
    /// Side token.
    pub fn side(&self) -> &str {
        &self.side
    }

    /// Name token.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical name for a node of this part.
    pub fn format(&self, tokens: &[&str], node_type: NodeType) -> String {
        self.naming.format(&self.side, &self.name, tokens, node_type)
    }

    /// The guide this rig is built from.
    pub fn guide(&self) -> &NodeSet {
        &self.guide
    }

    /// Rig groups for a driver token, falling back to the first pair.
    pub fn roots(&self, driver: Option<&str>) -> RigResult<&RigRoots> {
        driver
            .and_then(|d| self.roots.get(d))
            .or_else(|| self.roots.values().next())
            .ok_or_else(|| RigError::invalid_state("rig groups were not created"))
    }

    /// Transform of a guide node.
    pub fn guide_transform(&self, node: &str, space: Space) -> Option<Transform> {
        read_transform(&*self.scene, node, space)
    }

    /// Shape of a guide node.
    pub fn guide_shape(&self, node: &str) -> Option<CurveShape> {
        self.scene.shape(node)
    }

    fn add_under(
        &mut self,
        parent: &str,
        tokens: &[&str],
        node_type: NodeType,
        world: Transform,
    ) -> RigResult<String> {
        let name = self.format(tokens, node_type);
        self.scene.create_node(&name, node_type, Some(parent))?;
        if node_type.is_transform() {
            write_transform(&mut *self.scene, &name, world, Space::World)?;
        }
        Ok(name)
    }

    /// Create an animator control at a world pose, under `parent` or the driver's control group.
    pub fn add_control(
        &mut self,
        driver: Option<&str>,
        parent: Option<&str>,
        tokens: &[&str],
        world: Transform,
        shape: Option<CurveShape>,
    ) -> RigResult<String> {
        let parent = match parent {
            Some(p) => p.to_owned(),
            None => self.roots(driver)?.control_group.clone(),
        };
        let name = self.add_under(&parent, tokens, NodeType::Control, world)?;
        if let Some(shape) = shape {
            self.scene.set_shape(&name, shape)?;
        }
        Ok(name)
    }

    /// Create a rig-network node at a world pose, under `parent` or the driver's rig group.
    pub fn add_rig_node(
        &mut self,
        driver: Option<&str>,
        parent: Option<&str>,
        tokens: &[&str],
        node_type: NodeType,
        world: Transform,
    ) -> RigResult<String> {
        let parent = match parent {
            Some(p) => p.to_owned(),
            None => self.roots(driver)?.rig_group.clone(),
        };
        self.add_under(&parent, tokens, node_type, world)
    }

    /// Constrain `driven` to `driver`.
    pub fn constrain(&mut self, driver: &str, driven: &str, kind: ConstraintKind) -> RigResult<()> {
        self.scene.apply_constraint(driver, driven, kind)
    }

    /// Resolve a referenced node; a missing target is logged and recorded, not raised.
    pub fn resolve(&mut self, target: &str) -> Option<String> {
        if !target.is_empty() && self.scene.exists(target) {
            return Some(target.to_owned());
        }
        let err = RigError::missing_dependency(format!(
            "{}: '{target}' does not exist",
            self.naming.part_id(&self.side, &self.name)
        ));
        tracing::warn!("{err}; skipping dependent feature");
        self.missing.push(target.to_owned());
        None
    }

    /// Guide root of another part identified as `side_name`, if it exists.
    pub fn resolve_part(&mut self, part_id: &str) -> Option<String> {
        let root = part_id
            .split_once(self.naming.delimiter())
            .map(|(s, n)| self.naming.guide_root(s, n))
            .unwrap_or_default();
        self.resolve(&root)
    }

    /// Direct scene access for anything the helpers do not cover.
    pub fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut *self.scene
    }
}

#[cfg(test)]
#[path = "../tests/unit/part.rs"]
mod tests;
