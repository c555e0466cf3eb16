use std::collections::{BTreeMap, HashMap};

use crate::foundation::core::{CurveShape, Transform};
use crate::foundation::error::{RigError, RigResult};
use crate::scene::graph::{AttrConnection, Constraint, ConstraintKind, NodeType, SceneGraph};

type NodeId = usize;

#[derive(Clone, Debug)]
struct NodeRecord {
    name: String,
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: Transform,
    shape: Option<CurveShape>,
    attrs: BTreeMap<String, serde_json::Value>,
    history: Vec<NodeId>,
    constraints: Vec<(NodeId, ConstraintKind)>,
}

#[derive(Clone, Debug)]
struct Connection {
    source: NodeId,
    source_attr: String,
    target: NodeId,
    target_attr: String,
}

/// Deterministic in-memory [`SceneGraph`] for headless builds and tests.
///
/// Nodes live in an append-only slot table; relations hold slot ids so renames never have to
/// rewrite them. Deleted slots are tombstoned.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    slots: Vec<Option<NodeRecord>>,
    by_name: HashMap<String, NodeId>,
    connections: Vec<Connection>,
}

impl MemoryScene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Return `true` when the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    fn require(&self, name: &str) -> RigResult<NodeId> {
        self.id(name)
            .ok_or_else(|| RigError::scene(format!("node '{name}' does not exist")))
    }

    fn rec(&self, id: NodeId) -> &NodeRecord {
        // Ids handed out by `by_name` always point at live slots.
        self.slots[id].as_ref().expect("live node slot")
    }

    fn rec_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        self.slots[id].as_mut().expect("live node slot")
    }

    fn name_of(&self, id: NodeId) -> String {
        self.rec(id).name.clone()
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.rec(out[i]).children.iter().copied());
            i += 1;
        }
        out
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(p) = self.rec(id).parent {
            self.rec_mut(p).children.retain(|c| *c != id);
        }
        self.rec_mut(id).parent = None;
    }
}

impl SceneGraph for MemoryScene {
    fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn parent(&self, name: &str) -> Option<String> {
        let id = self.id(name)?;
        self.rec(id).parent.map(|p| self.name_of(p))
    }

    fn children(&self, name: &str) -> Vec<String> {
        self.id(name)
            .map(|id| {
                self.rec(id)
                    .children
                    .iter()
                    .map(|c| self.name_of(*c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn node_type(&self, name: &str) -> Option<NodeType> {
        self.id(name).map(|id| self.rec(id).node_type)
    }

    fn nodes(&self) -> Vec<String> {
        self.slots
            .iter()
            .flatten()
            .map(|r| r.name.clone())
            .collect()
    }

    fn create_node(
        &mut self,
        name: &str,
        node_type: NodeType,
        parent: Option<&str>,
    ) -> RigResult<()> {
        if self.exists(name) {
            return Err(RigError::scene(format!("node '{name}' already exists")));
        }
        let parent_id = parent.map(|p| self.require(p)).transpose()?;
        let id = self.slots.len();
        self.slots.push(Some(NodeRecord {
            name: name.to_owned(),
            node_type,
            parent: parent_id,
            children: Vec::new(),
            transform: Transform::default(),
            shape: None,
            attrs: BTreeMap::new(),
            history: Vec::new(),
            constraints: Vec::new(),
        }));
        self.by_name.insert(name.to_owned(), id);
        if let Some(p) = parent_id {
            self.rec_mut(p).children.push(id);
        }
        Ok(())
    }

    fn rename_node(&mut self, old: &str, new: &str) -> RigResult<()> {
        if old == new {
            return Ok(());
        }
        let id = self.require(old)?;
        if self.exists(new) {
            return Err(RigError::scene(format!(
                "cannot rename '{old}' to '{new}': name is taken"
            )));
        }
        self.by_name.remove(old);
        self.by_name.insert(new.to_owned(), id);
        self.rec_mut(id).name = new.to_owned();
        Ok(())
    }

    fn delete_node(&mut self, name: &str) -> RigResult<()> {
        let id = self.require(name)?;
        self.detach(id);
        let doomed = self.subtree(id);
        for d in &doomed {
            if let Some(rec) = self.slots[*d].take() {
                self.by_name.remove(&rec.name);
            }
        }
        self.connections
            .retain(|c| !doomed.contains(&c.source) && !doomed.contains(&c.target));
        for rec in self.slots.iter_mut().flatten() {
            rec.history.retain(|h| !doomed.contains(h));
            rec.constraints.retain(|(d, _)| !doomed.contains(d));
        }
        Ok(())
    }

    fn set_parent(&mut self, name: &str, parent: Option<&str>) -> RigResult<()> {
        let id = self.require(name)?;
        let parent_id = parent.map(|p| self.require(p)).transpose()?;
        if let Some(p) = parent_id
            && self.subtree(id).contains(&p)
        {
            return Err(RigError::scene(format!(
                "cannot parent '{name}' under its own descendant"
            )));
        }
        self.detach(id);
        self.rec_mut(id).parent = parent_id;
        if let Some(p) = parent_id {
            self.rec_mut(p).children.push(id);
        }
        Ok(())
    }

    fn attr(&self, node: &str, attr: &str) -> Option<serde_json::Value> {
        let id = self.id(node)?;
        self.rec(id).attrs.get(attr).cloned()
    }

    fn set_attr(&mut self, node: &str, attr: &str, value: serde_json::Value) -> RigResult<()> {
        let id = self.require(node)?;
        self.rec_mut(id).attrs.insert(attr.to_owned(), value);
        Ok(())
    }

    fn remove_attr(&mut self, node: &str, attr: &str) -> RigResult<Option<serde_json::Value>> {
        let id = self.require(node)?;
        Ok(self.rec_mut(id).attrs.remove(attr))
    }

    fn attrs(&self, node: &str) -> BTreeMap<String, serde_json::Value> {
        self.id(node)
            .map(|id| self.rec(id).attrs.clone())
            .unwrap_or_default()
    }

    fn transform(&self, name: &str) -> Option<Transform> {
        let rec = self.rec(self.id(name)?);
        rec.node_type
            .is_transform()
            .then(|| rec.transform.clone())
    }

    fn set_transform(&mut self, name: &str, transform: Transform) -> RigResult<()> {
        let id = self.require(name)?;
        if !self.rec(id).node_type.is_transform() {
            return Err(RigError::scene(format!("'{name}' has no transform")));
        }
        self.rec_mut(id).transform = transform;
        Ok(())
    }

    fn shape(&self, name: &str) -> Option<CurveShape> {
        self.rec(self.id(name)?).shape.clone()
    }

    fn set_shape(&mut self, name: &str, shape: CurveShape) -> RigResult<()> {
        let id = self.require(name)?;
        self.rec_mut(id).shape = Some(shape);
        Ok(())
    }

    fn connect_history(&mut self, node: &str, history: &str) -> RigResult<()> {
        let id = self.require(node)?;
        let h = self.require(history)?;
        let rec = self.rec_mut(id);
        if !rec.history.contains(&h) {
            rec.history.push(h);
        }
        Ok(())
    }

    fn history(&self, node: &str) -> Vec<String> {
        self.id(node)
            .map(|id| {
                self.rec(id)
                    .history
                    .iter()
                    .map(|h| self.name_of(*h))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn connect_attr(
        &mut self,
        source: &str,
        source_attr: &str,
        target: &str,
        target_attr: &str,
    ) -> RigResult<()> {
        let s = self.require(source)?;
        let t = self.require(target)?;
        // A destination attribute has a single incoming connection.
        self.connections
            .retain(|c| !(c.target == t && c.target_attr == target_attr));
        self.connections.push(Connection {
            source: s,
            source_attr: source_attr.to_owned(),
            target: t,
            target_attr: target_attr.to_owned(),
        });
        Ok(())
    }

    fn connections(&self, node: &str) -> Vec<AttrConnection> {
        let Some(id) = self.id(node) else {
            return Vec::new();
        };
        self.connections
            .iter()
            .filter(|c| c.source == id || c.target == id)
            .map(|c| AttrConnection {
                source: self.name_of(c.source),
                source_attr: c.source_attr.clone(),
                target: self.name_of(c.target),
                target_attr: c.target_attr.clone(),
            })
            .collect()
    }

    fn apply_constraint(
        &mut self,
        driver: &str,
        driven: &str,
        kind: ConstraintKind,
    ) -> RigResult<()> {
        let d = self.require(driver)?;
        let n = self.require(driven)?;
        if d == n {
            return Err(RigError::scene(format!("'{driven}' cannot constrain itself")));
        }
        let rec = self.rec_mut(n);
        rec.constraints.retain(|(_, k)| *k != kind);
        rec.constraints.push((d, kind));
        Ok(())
    }

    fn constraints(&self, driven: &str) -> Vec<Constraint> {
        let Some(id) = self.id(driven) else {
            return Vec::new();
        };
        self.rec(id)
            .constraints
            .iter()
            .map(|(d, kind)| Constraint {
                driver: self.name_of(*d),
                driven: driven.to_owned(),
                kind: *kind,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/memory.rs"]
mod tests;
