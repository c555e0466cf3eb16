use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{CurveShape, Transform};
use crate::foundation::error::RigResult;

/// Scene node kind. Each kind owns a fixed name suffix in the naming convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Empty transform used to organise hierarchy.
    Group,
    /// Animator-facing control carrying a curve shape.
    Control,
    /// Guide placement handle.
    Placer,
    /// Skeleton joint.
    Joint,
    /// Proxy or deforming geometry.
    Geometry,
    /// Locator / pivot marker.
    Locator,
    /// Control-point surface.
    Surface,
    /// Non-hierarchical helper (curve length, math nodes).
    Utility,
}

impl NodeType {
    /// All node types, in suffix-lookup order.
    pub const ALL: [NodeType; 8] = [
        NodeType::Group,
        NodeType::Control,
        NodeType::Placer,
        NodeType::Joint,
        NodeType::Geometry,
        NodeType::Locator,
        NodeType::Surface,
        NodeType::Utility,
    ];

    /// Name suffix for this node type.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Group => "GRP",
            Self::Control => "CTL",
            Self::Placer => "PLC",
            Self::Joint => "JNT",
            Self::Geometry => "GEO",
            Self::Locator => "LOC",
            Self::Surface => "SRF",
            Self::Utility => "UTL",
        }
    }

    /// Inverse of [`NodeType::suffix`].
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.suffix() == suffix)
    }

    /// Whether nodes of this type carry a transform.
    pub fn is_transform(self) -> bool {
        !matches!(self, Self::Utility)
    }
}

/// Constraint flavour applied by rig builders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Full parent constraint.
    Parent,
    /// Translation only.
    Point,
    /// Rotation only.
    Orient,
    /// Scale only.
    Scale,
    /// Aim at the driver.
    Aim,
}

/// Constraint recorded on a driven node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Driving node.
    pub driver: String,
    /// Driven node.
    pub driven: String,
    /// Constraint flavour.
    pub kind: ConstraintKind,
}

/// Attribute-to-attribute connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrConnection {
    /// Source node.
    pub source: String,
    /// Source attribute.
    pub source_attr: String,
    /// Destination node.
    pub target: String,
    /// Destination attribute.
    pub target_attr: String,
}

/// Scene collaborator consumed by the build pipeline.
///
/// Node names double as node references. Implementations must keep every relation (parent,
/// history, connections, constraints) attached to a node across [`SceneGraph::rename_node`].
pub trait SceneGraph {
    /// Whether a node with this name exists.
    fn exists(&self, name: &str) -> bool;
    /// Parent of `name`, if it has one.
    fn parent(&self, name: &str) -> Option<String>;
    /// Direct children of `name`, in creation order.
    fn children(&self, name: &str) -> Vec<String>;
    /// Kind of `name`.
    fn node_type(&self, name: &str) -> Option<NodeType>;
    /// Every node name in the scene, in creation order.
    fn nodes(&self) -> Vec<String>;

    /// Create a node. Fails if the name is taken or the parent is missing.
    fn create_node(&mut self, name: &str, node_type: NodeType, parent: Option<&str>)
    -> RigResult<()>;
    /// Rename a node. Fails if `new` is taken.
    fn rename_node(&mut self, old: &str, new: &str) -> RigResult<()>;
    /// Delete a node and its whole subtree.
    fn delete_node(&mut self, name: &str) -> RigResult<()>;
    /// Reparent a node; `None` moves it to the scene top level.
    fn set_parent(&mut self, name: &str, parent: Option<&str>) -> RigResult<()>;

    /// Read a metadata attribute.
    fn attr(&self, node: &str, attr: &str) -> Option<serde_json::Value>;
    /// Write a metadata attribute.
    fn set_attr(&mut self, node: &str, attr: &str, value: serde_json::Value) -> RigResult<()>;
    /// Drop a metadata attribute, returning its last value.
    fn remove_attr(&mut self, node: &str, attr: &str) -> RigResult<Option<serde_json::Value>>;
    /// Every metadata attribute on a node.
    fn attrs(&self, node: &str) -> BTreeMap<String, serde_json::Value>;

    /// Local transform of a transform-carrying node.
    fn transform(&self, name: &str) -> Option<Transform>;
    /// Replace the local transform.
    fn set_transform(&mut self, name: &str, transform: Transform) -> RigResult<()>;
    /// Curve or surface shape data, if the node carries a shape.
    fn shape(&self, name: &str) -> Option<CurveShape>;
    /// Replace the shape data.
    fn set_shape(&mut self, name: &str, shape: CurveShape) -> RigResult<()>;

    /// Attach a non-hierarchical helper node to `node`.
    fn connect_history(&mut self, node: &str, history: &str) -> RigResult<()>;
    /// Helper nodes attached to `node`.
    fn history(&self, node: &str) -> Vec<String>;

    /// Connect `source.source_attr -> target.target_attr`.
    fn connect_attr(
        &mut self,
        source: &str,
        source_attr: &str,
        target: &str,
        target_attr: &str,
    ) -> RigResult<()>;
    /// Connections where `node` is the source or target.
    fn connections(&self, node: &str) -> Vec<AttrConnection>;

    /// Constrain `driven` to `driver`.
    fn apply_constraint(
        &mut self,
        driver: &str,
        driven: &str,
        kind: ConstraintKind,
    ) -> RigResult<()>;
    /// Constraints acting on `driven`.
    fn constraints(&self, driven: &str) -> Vec<Constraint>;

    /// All descendants of `name` in depth-first creation order, excluding `name` itself.
    fn descendants(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<String> = self.children(name).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            stack.extend(self.children(&n).into_iter().rev());
            out.push(n);
        }
        out
    }

    /// Number of ancestors above `name`.
    fn depth(&self, name: &str) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(name);
        while let Some(p) = cur {
            depth += 1;
            cur = self.parent(&p);
        }
        depth
    }
}
