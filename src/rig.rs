//! Rig lifecycle and batch builds.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::foundation::error::{RigError, RigResult};
use crate::part::{ATTR_RIG_ROOTS, ATTR_VISIBILITY, NodeSet, Part, PartState, RigContext, RigRoots};
use crate::registry::PartRegistry;
use crate::scene::graph::NodeType;
use crate::workspace::{CONTROL_VIS, RIG_VIS, Workspace, WorkspaceParts};

/// Driver key used when a part declares no driver options.
pub const DEFAULT_DRIVER: &str = "default";

/// Outcome of [`build_rigs`].
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Guide roots whose rig was built.
    pub built: Vec<String>,
    /// Guide roots skipped, by flag or because their rig already exists.
    pub skipped: Vec<String>,
    /// Guide roots whose build failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl Part {
    /// Create one control group and one rig group per driver option.
    ///
    /// Groups are parented under the driver node when it exists; otherwise the missing
    /// dependency is logged and the groups go to the parts container.
    #[tracing::instrument(skip(self, ws), fields(part_type = %self.part_type))]
    pub fn start_rig(&mut self, ws: &mut Workspace) -> RigResult<()> {
        let id = ws.naming().part_id(self.side(), self.name());
        let Some(root) = self.guide_root.clone().filter(|r| ws.scene().exists(r)) else {
            return Err(RigError::missing_guide(format!("'{id}' has no guide")));
        };
        if self.state != PartState::GuideBuilt {
            return Err(RigError::invalid_state(format!(
                "'{id}' cannot start a rig from {:?}",
                self.state
            )));
        }
        ws.ensure_containers()?;

        let drivers: Vec<(String, String)> = self
            .options
            .iter()
            .filter(|(_, spec)| spec.data_type.is_driver())
            .map(|(k, spec)| (k.to_owned(), spec.value.as_str().unwrap_or_default().to_owned()))
            .collect();
        let drivers = if drivers.is_empty() {
            vec![(DEFAULT_DRIVER.to_owned(), String::new())]
        } else {
            drivers
        };

        let (side, name) = (self.side().to_owned(), self.name().to_owned());
        let WorkspaceParts {
            scene,
            naming,
            settings,
            ..
        } = ws.parts();
        let mut created = Vec::new();
        let placed = (|| -> RigResult<IndexMap<String, RigRoots>> {
            let mut roots = IndexMap::new();
            for (key, target) in drivers {
                let parent = if !target.is_empty() && scene.exists(&target) {
                    target
                } else {
                    if !target.is_empty() {
                        let err = RigError::missing_dependency(format!(
                            "{id}: driver '{key}' points at '{target}', which does not exist"
                        ));
                        tracing::warn!("{err}; using '{}'", settings.parts_container);
                    }
                    settings.parts_container.clone()
                };
                let token = if key == DEFAULT_DRIVER { "" } else { key.as_str() };
                let control_group =
                    naming.format(&side, &name, &[token, "controls"], NodeType::Group);
                let rig_group = naming.format(&side, &name, &[token, "rig"], NodeType::Group);
                for group in [&control_group, &rig_group] {
                    if scene.exists(group) {
                        return Err(RigError::already_exists(group.clone()));
                    }
                    scene.create_node(group, NodeType::Group, Some(&parent))?;
                    created.push(group.clone());
                }
                roots.insert(key, RigRoots {
                    control_group,
                    rig_group,
                });
            }
            let value = serde_json::to_value(&roots)
                .map_err(|e| RigError::serde(format!("serialize rig roots: {e}")))?;
            scene.set_attr(&root, ATTR_RIG_ROOTS, value)?;
            Ok(roots)
        })();
        let roots = match placed {
            Ok(roots) => roots,
            Err(e) => {
                for group in created.iter().rev() {
                    if scene.exists(group) {
                        scene.delete_node(group)?;
                    }
                }
                return Err(e);
            }
        };
        self.rig_roots = roots;
        self.state = PartState::RigBuilding;
        Ok(())
    }

    /// Run the part type's [`RigBuilder`](crate::part::RigBuilder) between start and finish.
    pub fn build_rig(&mut self, ws: &mut Workspace) -> RigResult<()> {
        if self.state != PartState::RigBuilding {
            return Err(RigError::invalid_state(format!(
                "build_rig called outside start_rig/finish_rig (state {:?})",
                self.state
            )));
        }
        let root = self
            .guide_root
            .clone()
            .ok_or_else(|| RigError::missing_guide("guide root lost during rig build"))?;
        let guide = NodeSet::from_root(ws.scene(), &root);
        let builder = Arc::clone(&self.rig);
        let WorkspaceParts { scene, naming, .. } = ws.parts();
        let mut ctx = RigContext {
            scene,
            naming,
            side: self.side().to_owned(),
            name: self.name().to_owned(),
            guide,
            roots: self.rig_roots.clone(),
            missing: Vec::new(),
        };
        builder.build_rig(&mut ctx, &self.options)?;
        if !ctx.missing.is_empty() {
            tracing::info!(missing = ?ctx.missing, "rig built without some dependencies");
        }
        Ok(())
    }

    /// Wire the global visibility toggles into every rig group. Safe to call repeatedly.
    pub fn finish_rig(&mut self, ws: &mut Workspace) -> RigResult<()> {
        if !matches!(self.state, PartState::RigBuilding | PartState::RigBuilt) {
            return Err(RigError::invalid_state(format!(
                "finish_rig called without start_rig (state {:?})",
                self.state
            )));
        }
        ws.ensure_containers()?;
        let WorkspaceParts {
            scene, settings, ..
        } = ws.parts();
        for roots in self.rig_roots.values() {
            scene.connect_attr(
                &settings.settings_node,
                CONTROL_VIS,
                &roots.control_group,
                ATTR_VISIBILITY,
            )?;
            scene.connect_attr(
                &settings.settings_node,
                RIG_VIS,
                &roots.rig_group,
                ATTR_VISIBILITY,
            )?;
        }
        self.state = PartState::RigBuilt;
        tracing::info!(part_type = %self.part_type, "rig built");
        Ok(())
    }

    /// Start, build and finish the rig in one call.
    ///
    /// If building or finishing fails, the rig groups and their recorded roots are removed and
    /// the part is back at [`PartState::GuideBuilt`].
    pub fn create_rig(&mut self, ws: &mut Workspace) -> RigResult<()> {
        self.start_rig(ws)?;
        let built = self.build_rig(ws).and_then(|()| self.finish_rig(ws));
        if let Err(e) = built {
            self.discard_rig(ws)?;
            return Err(e);
        }
        Ok(())
    }

    fn discard_rig(&mut self, ws: &mut Workspace) -> RigResult<()> {
        let scene = ws.scene_mut();
        for roots in std::mem::take(&mut self.rig_roots).values() {
            for group in [&roots.rig_group, &roots.control_group] {
                if scene.exists(group) {
                    scene.delete_node(group)?;
                }
            }
        }
        if let Some(root) = self.guide_root.as_deref()
            && scene.exists(root)
        {
            scene.remove_attr(root, ATTR_RIG_ROOTS)?;
        }
        self.state = PartState::GuideBuilt;
        tracing::debug!(part_type = %self.part_type, "rig discarded");
        Ok(())
    }
}

/// Build the rig of every guide in the scene.
///
/// Root parts go first, parts flagged build-last go last, everything else keeps scene order.
/// A failing part is logged and reported; the batch continues.
#[tracing::instrument(skip_all)]
pub fn build_rigs(ws: &mut Workspace, registry: &PartRegistry) -> BuildReport {
    let mut report = BuildReport::default();
    let mut parts = Vec::new();
    for root in ws.guide_roots() {
        match Part::set_guide(ws, registry, &root) {
            Ok(part) => parts.push((root, part)),
            Err(e) => {
                tracing::error!(%root, "cannot load guide: {e}");
                report.failed.push((root, e.to_string()));
            }
        }
    }
    parts.sort_by_key(|(_, p)| match (p.is_root(), p.build_last()) {
        (true, _) => 0,
        (false, false) => 1,
        (false, true) => 2,
    });

    for (root, mut part) in parts {
        if part.skip_build() || part.state() == PartState::RigBuilt {
            tracing::debug!(%root, "skipping rig build");
            report.skipped.push(root);
            continue;
        }
        match part.create_rig(ws) {
            Ok(()) => report.built.push(root),
            Err(e) => {
                tracing::error!(%root, "rig build failed: {e}");
                report.failed.push((root, e.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "../tests/unit/rig.rs"]
mod tests;
