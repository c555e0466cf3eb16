//! Guide lifecycle: staged construction, option updates and deletion.
//!
//! Construction runs inside a [`GuideSession`]. While the session is open every other guide is
//! stashed, so the new guide is created under canonical names; finishing the session
//! disambiguates those names against the stash and restores it. A session that is dropped
//! without finishing removes everything it created.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::foundation::config::RigSettings;
use crate::foundation::error::{RigError, RigResult};
use crate::naming::NameConvention;
use crate::options::{
    DataType, NAME, OptionValue, Rejection, SIDE, canonical_parent_driver, canonical_rig_part,
};
use crate::part::{
    ATTR_CATEGORY, ATTR_PART_TYPE, ATTR_VISIBILITY, GuideContext, NodeCategory, NodeSet, Part,
    PartState,
};
use crate::rename::{RenameRequest, Resolver, rename_nodes};
use crate::scene::graph::NodeType;
use crate::staging::ScopedStagingArea;
use crate::workspace::{GUIDE_VIS, Workspace, WorkspaceParts};

/// How [`Part::start_guide`] treats an existing node with the guide-root name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    /// Fail with [`RigError::AlreadyExists`] before touching the scene.
    Exclusive,
    /// Stash first; any clash is resolved when the session finishes.
    Staged,
}

/// Outcome of [`Part::update_options`].
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Keys whose values were stored.
    pub applied: Vec<String>,
    /// Keys parked until [`Part::confirm_rebuild`].
    pub pending: Vec<String>,
    /// Keys that were refused, with the reason.
    pub rejected: Vec<(String, Rejection)>,
    /// Whether the guide nodes were renamed.
    pub renamed: bool,
}

/// Open guide construction scope. See the module docs.
pub struct GuideSession<'a> {
    stage: Option<ScopedStagingArea<'a>>,
    naming: &'a NameConvention,
    resolver: &'a mut dyn Resolver,
    settings: &'a RigSettings,
    part: &'a mut Part,
    root: String,
    groups: IndexMap<NodeCategory, String>,
    finished: bool,
}

impl<'a> GuideSession<'a> {
    /// Guide root created by the session.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Run the part type's [`GuideBuilder`](crate::part::GuideBuilder).
    pub fn build(&mut self) -> RigResult<()> {
        let Some(stage) = self.stage.as_mut() else {
            return Err(RigError::invalid_state("guide session already finished"));
        };
        let builder = Arc::clone(&self.part.guide);
        let mut ctx = GuideContext {
            scene: stage.scene(),
            naming: self.naming,
            side: self.part.side().to_owned(),
            name: self.part.name().to_owned(),
            root: self.root.clone(),
            groups: self.groups.clone(),
        };
        builder.build_guide(&mut ctx, &self.part.options)
    }

    /// Disambiguate names, reparent under the guide container and restore the stash.
    ///
    /// Returns `Ok(false)` when the clash resolver cancels; the new guide is then removed and
    /// the part's options reset to their defaults.
    #[tracing::instrument(skip(self), fields(root = %self.root))]
    pub fn finish(mut self) -> RigResult<bool> {
        let Some(mut stage) = self.stage.take() else {
            return Err(RigError::invalid_state("guide session already finished"));
        };
        let nodes = NodeSet::from_root(stage.scene_ref(), &self.root).all();
        let reserved = stage.reserved_names();
        let side = self.part.side().to_owned();
        let name = self.part.name().to_owned();

        let outcome = rename_nodes(
            stage.scene(),
            self.naming,
            &mut *self.resolver,
            RenameRequest {
                nodes: &nodes,
                old: (&side, &name),
                new: (&side, &name),
                reserved: &reserved,
            },
            self.settings.max_resolve_attempts,
        );
        match outcome {
            Ok(out) => {
                if out.side != side || out.name != name {
                    self.part.options.set_unchecked(SIDE, OptionValue::Str(out.side.clone()));
                    self.part.options.set_unchecked(NAME, OptionValue::Str(out.name.clone()));
                    let root = self.naming.guide_root(&out.side, &out.name);
                    stage.retrack(&self.root, &root);
                    self.root = root;
                }
            }
            Err(e) if e.is_clash() => {
                tracing::warn!("guide discarded: {e}");
                self.finished = true;
                self.part.options.reset_to_defaults();
                self.part.guide_root = None;
                self.part.state = PartState::Unbuilt;
                stage.rollback()?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        stage
            .scene()
            .set_parent(&self.root, Some(&self.settings.guide_container))?;
        self.part.guide_root = Some(self.root.clone());
        self.part.write_metadata(stage.scene())?;
        stage.commit()?;
        self.part.state = PartState::GuideBuilt;
        self.finished = true;
        tracing::info!(part_type = %self.part.part_type, "guide built");
        Ok(true)
    }
}

impl Drop for GuideSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(root = %self.root, "guide session abandoned");
            self.part.guide_root = None;
            self.part.state = PartState::Unbuilt;
        }
    }
}

impl Part {
    /// Open a guide session. Fails with [`RigError::AlreadyExists`] if the guide root is taken.
    pub fn start_guide<'a>(&'a mut self, ws: &'a mut Workspace) -> RigResult<GuideSession<'a>> {
        self.start_guide_with(ws, StartMode::Exclusive)
    }

    /// Open a guide session in the given mode.
    #[tracing::instrument(skip(self, ws), fields(part_type = %self.part_type))]
    pub fn start_guide_with<'a>(
        &'a mut self,
        ws: &'a mut Workspace,
        mode: StartMode,
    ) -> RigResult<GuideSession<'a>> {
        let side = self.side().to_owned();
        let name = self.name().to_owned();
        let root = ws.naming().guide_root(&side, &name);
        if mode == StartMode::Exclusive && ws.scene().exists(&root) {
            return Err(RigError::already_exists(root));
        }
        if self.state != PartState::Unbuilt {
            return Err(RigError::invalid_state(format!(
                "'{}' already has a guide",
                ws.naming().part_id(&side, &name)
            )));
        }
        ws.ensure_containers()?;

        let WorkspaceParts {
            scene,
            naming,
            resolver,
            settings,
        } = ws.parts();
        let mut stage = ScopedStagingArea::acquire(scene, naming, &settings.guide_container)?;
        if stage.scene_ref().exists(&root) {
            return Err(RigError::already_exists(root));
        }

        let scene = stage.scene();
        scene.create_node(&root, NodeType::Group, None)?;
        stage.track(root.clone());
        let scene = stage.scene();
        let mut groups = IndexMap::new();
        for category in NodeCategory::ALL {
            let group = naming.format(&side, &name, &["guide", category.token()], NodeType::Group);
            scene.create_node(&group, NodeType::Group, Some(&root))?;
            scene.set_attr(&group, ATTR_CATEGORY, category.token().into())?;
            let toggle = category.visibility_attr();
            scene.set_attr(&root, &toggle, serde_json::Value::Bool(true))?;
            scene.connect_attr(&root, &toggle, &group, ATTR_VISIBILITY)?;
            groups.insert(category, group);
        }
        scene.connect_attr(&settings.settings_node, GUIDE_VIS, &root, ATTR_VISIBILITY)?;

        self.guide_root = Some(root.clone());
        if let Err(e) = self.write_metadata(stage.scene()) {
            self.guide_root = None;
            return Err(e);
        }
        self.state = PartState::GuideBuilding;
        tracing::debug!(%root, "guide started");
        Ok(GuideSession {
            stage: Some(stage),
            naming,
            resolver,
            settings,
            part: self,
            root,
            groups,
            finished: false,
        })
    }

    /// Start, build and finish a guide in one call.
    pub fn create_guide(&mut self, ws: &mut Workspace) -> RigResult<bool> {
        self.create_guide_with(ws, StartMode::Exclusive)
    }

    /// [`Part::create_guide`] in the given mode.
    pub fn create_guide_with(&mut self, ws: &mut Workspace, mode: StartMode) -> RigResult<bool> {
        let mut session = self.start_guide_with(ws, mode)?;
        session.build()?;
        session.finish()
    }

    /// Delete the guide, its history nodes first.
    pub fn delete_guide(&mut self, ws: &mut Workspace) -> RigResult<()> {
        let Some(root) = self.guide_root.clone() else {
            return Err(RigError::missing_guide(format!(
                "'{}' has no guide to delete",
                ws.naming().part_id(self.side(), self.name())
            )));
        };
        if ws.scene().exists(&root) {
            let set = NodeSet::from_root(ws.scene(), &root);
            let scene = ws.scene_mut();
            for h in &set.history {
                if scene.exists(h) {
                    scene.delete_node(h)?;
                }
            }
            scene.delete_node(&root)?;
        }
        self.guide_root = None;
        self.state = PartState::Unbuilt;
        self.rig_roots.clear();
        tracing::info!(%root, "guide deleted");
        Ok(())
    }

    /// Validate and apply option values.
    ///
    /// Rejected values are logged and reported, never raised. Values of `rebuild_required`
    /// options on a built guide are parked in [`Part::pending_rebuild`]. A side or name change
    /// renames the guide; if that rename fails the whole update is reverted and the clash error
    /// returned.
    #[tracing::instrument(skip_all, fields(part_type = %self.part_type))]
    pub fn update_options<I, K, V>(&mut self, ws: &mut Workspace, values: I) -> RigResult<UpdateReport>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let snapshot = self.options.clone();
        let parked = self.pending_rebuild.clone();
        let old_side = self.side().to_owned();
        let old_name = self.name().to_owned();
        let mut report = UpdateReport::default();

        for (key, value) in values {
            let key = key.as_ref();
            let mut value = match self.options.check(key, &value.into()) {
                Ok(v) => v,
                Err(rejection) => {
                    if rejection.is_error() {
                        tracing::error!(option = key, "{rejection}");
                    } else {
                        tracing::warn!(option = key, "{rejection}");
                    }
                    report.rejected.push((key.to_owned(), rejection));
                    continue;
                }
            };
            let Some(spec) = self.options.spec(key) else {
                continue;
            };
            let data_type = spec.data_type;
            let rebuild = spec.rebuild_required;
            let allowed = spec.allowed_part_types.clone();

            let canonical = match (data_type, value.as_str()) {
                (DataType::ParentDriver, Some(s)) => Some(canonical_parent_driver(ws.naming(), s)),
                (DataType::RigPart, Some(s)) => Some(canonical_rig_part(ws.naming(), s)),
                _ => None,
            };
            if let Some(c) = canonical {
                value = OptionValue::Str(c);
            }

            if data_type == DataType::RigPart
                && !allowed.is_empty()
                && let Some(target) = value.as_str()
                && let Some(found) = target_part_type(ws, target)
                && !allowed.contains(&found)
            {
                let rejection = Rejection::DisallowedPartType {
                    target: target.to_owned(),
                    found,
                    allowed,
                };
                tracing::warn!(option = key, "{rejection}");
                report.rejected.push((key.to_owned(), rejection));
                continue;
            }

            if rebuild && self.guide_root.is_some() {
                tracing::info!(option = key, "value parked until the guide is rebuilt");
                self.pending_rebuild.insert(key.to_owned(), value);
                report.pending.push(key.to_owned());
                continue;
            }
            self.options.set_unchecked(key, value);
            report.applied.push(key.to_owned());
        }

        let Some(root) = self.guide_root.clone() else {
            return Ok(report);
        };
        let new_side = self.side().to_owned();
        let new_name = self.name().to_owned();
        if new_side != old_side || new_name != old_name {
            let nodes = NodeSet::from_root(ws.scene(), &root).all();
            let reserved = HashSet::new();
            let WorkspaceParts {
                scene,
                naming,
                resolver,
                settings,
            } = ws.parts();
            let outcome = rename_nodes(
                scene,
                naming,
                resolver,
                RenameRequest {
                    nodes: &nodes,
                    old: (&old_side, &old_name),
                    new: (&new_side, &new_name),
                    reserved: &reserved,
                },
                settings.max_resolve_attempts,
            );
            match outcome {
                Ok(out) => {
                    self.options.set_unchecked(SIDE, OptionValue::Str(out.side.clone()));
                    self.options.set_unchecked(NAME, OptionValue::Str(out.name.clone()));
                    self.guide_root = Some(naming.guide_root(&out.side, &out.name));
                    report.renamed = true;
                }
                Err(e) => {
                    self.options = snapshot;
                    self.pending_rebuild = parked;
                    tracing::error!("option update reverted: {e}");
                    return Err(e);
                }
            }
        }
        if !report.applied.is_empty() {
            self.write_metadata(ws.scene_mut())?;
        }
        Ok(report)
    }

    /// Apply parked values and rebuild the guide with them.
    ///
    /// Returns the result of the rebuilt guide's finish step.
    pub fn confirm_rebuild(&mut self, ws: &mut Workspace) -> RigResult<bool> {
        if self.pending_rebuild.is_empty() {
            return Ok(self.guide_root.is_some());
        }
        for (key, value) in std::mem::take(&mut self.pending_rebuild) {
            self.options.set_unchecked(&key, value);
        }
        if self.guide_root.is_none() {
            return Ok(false);
        }
        self.delete_guide(ws)?;
        self.create_guide(ws)
    }

    /// Drop parked values.
    pub fn discard_rebuild(&mut self) {
        if !self.pending_rebuild.is_empty() {
            tracing::debug!(count = self.pending_rebuild.len(), "discarding parked option values");
        }
        self.pending_rebuild.clear();
    }
}

fn target_part_type(ws: &Workspace, part_id: &str) -> Option<String> {
    let (side, name) = part_id.split_once(ws.naming().delimiter())?;
    let root = ws.naming().guide_root(side, name);
    ws.scene()
        .attr(&root, ATTR_PART_TYPE)
        .and_then(|v| v.as_str().map(str::to_owned))
}

#[cfg(test)]
#[path = "../tests/unit/guide.rs"]
mod tests;
