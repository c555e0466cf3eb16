//! Scoped staging area that parks other guides under stash names while a guide is built.

use std::collections::HashSet;

use crate::foundation::error::RigResult;
use crate::naming::NameConvention;
use crate::part::{ATTR_PART_TYPE, NodeSet};
use crate::scene::graph::SceneGraph;

/// Exclusive construction scope over a scene.
///
/// On acquire, every guide under the container is renamed to its stash name so new nodes can
/// be created under canonical names without colliding. [`commit`](Self::commit) restores the
/// stashed names; [`rollback`](Self::rollback), or dropping the area, also deletes whatever was
/// [`track`](Self::track)ed.
pub struct ScopedStagingArea<'a> {
    scene: &'a mut dyn SceneGraph,
    naming: &'a NameConvention,
    stashed: Vec<(String, String)>,
    created: Vec<String>,
    done: bool,
}

impl<'a> ScopedStagingArea<'a> {
    /// Stash every guide found under `container`.
    #[tracing::instrument(skip(scene, naming))]
    pub fn acquire(
        scene: &'a mut dyn SceneGraph,
        naming: &'a NameConvention,
        container: &str,
    ) -> RigResult<Self> {
        let mut stage = Self {
            scene,
            naming,
            stashed: Vec::new(),
            created: Vec::new(),
            done: false,
        };
        if !stage.scene.exists(container) {
            return Ok(stage);
        }
        let roots: Vec<String> = stage
            .scene
            .children(container)
            .into_iter()
            .filter(|c| stage.scene.attr(c, ATTR_PART_TYPE).is_some())
            .collect();
        for root in roots {
            for node in NodeSet::from_root(&*stage.scene, &root).all() {
                if naming.unstash_name(&node).is_some() || !stage.scene.exists(&node) {
                    continue;
                }
                let stash = naming.stash_name(&node);
                stage.scene.rename_node(&node, &stash)?;
                stage.stashed.push((node, stash));
            }
        }
        tracing::debug!(count = stage.stashed.len(), "stashed guide nodes");
        Ok(stage)
    }

    /// Original names of every stashed node.
    pub fn reserved_names(&self) -> HashSet<String> {
        self.stashed.iter().map(|(orig, _)| orig.clone()).collect()
    }

    /// Delete `root` (and the history of its guide) on rollback.
    pub fn track(&mut self, root: impl Into<String>) {
        self.created.push(root.into());
    }

    /// Stop tracking a node that was renamed or removed.
    pub fn retrack(&mut self, old: &str, new: &str) {
        for c in &mut self.created {
            if c == old {
                *c = new.to_owned();
            }
        }
    }

    /// Mutable scene access while staged.
    pub fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut *self.scene
    }

    /// Shared scene access while staged.
    pub fn scene_ref(&self) -> &dyn SceneGraph {
        &*self.scene
    }

    /// Naming convention the stash names were derived from.
    pub fn naming(&self) -> &'a NameConvention {
        self.naming
    }

    /// Keep created nodes and restore stashed names.
    pub fn commit(mut self) -> RigResult<()> {
        self.done = true;
        self.restore()
    }

    /// Delete created nodes and restore stashed names.
    pub fn rollback(mut self) -> RigResult<()> {
        self.done = true;
        self.discard_created()?;
        self.restore()
    }

    fn discard_created(&mut self) -> RigResult<()> {
        for root in std::mem::take(&mut self.created) {
            if !self.scene.exists(&root) {
                continue;
            }
            let set = NodeSet::from_root(&*self.scene, &root);
            for h in &set.history {
                if self.scene.exists(h) {
                    self.scene.delete_node(h)?;
                }
            }
            self.scene.delete_node(&root)?;
        }
        Ok(())
    }

    fn restore(&mut self) -> RigResult<()> {
        let mut first_err = None;
        for (orig, stash) in std::mem::take(&mut self.stashed) {
            if let Err(e) = self.scene.rename_node(&stash, &orig) {
                tracing::error!(node = %orig, "could not restore stashed node: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for ScopedStagingArea<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        tracing::debug!("staging area dropped without commit, rolling back");
        if let Err(e) = self.discard_created().and_then(|()| self.restore()) {
            tracing::error!("staging rollback failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/staging.rs"]
mod tests;
