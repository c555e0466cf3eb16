//! Templates: a replayable snapshot of every guide in a scene.
//!
//! Capture is read-only. Replay walks the entries in captured order, since later entries may
//! reference nodes built by earlier ones through their driver options.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context as _;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{CurveShape, Space, Transform};
use crate::foundation::error::{RigError, RigResult};
use crate::naming::STASH_SEPARATOR;
use crate::options::{NAME, OptionValue, SIDE};
use crate::part::{ATTR_OPTIONS, ATTR_PART_TYPE, ATTR_RIG_ROOTS, NodeCategory, Part};
use crate::registry::PartRegistry;
use crate::scene::transform::{read_transform, write_transform};
use crate::workspace::Workspace;

/// Ordered list of captured parts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Entries in capture order.
    pub template: Vec<TemplateEntry>,
}

/// One captured part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Registered part type.
    pub part_type: String,
    /// Scene state of the guide.
    pub part_data: PartData,
    /// Option values at capture time.
    pub options: IndexMap<String, OptionValue>,
}

impl TemplateEntry {
    /// Side token recorded in the options.
    pub fn side(&self) -> &str {
        self.options
            .get(SIDE)
            .and_then(OptionValue::as_str)
            .unwrap_or_default()
    }

    /// Name token recorded in the options.
    pub fn name(&self) -> &str {
        self.options
            .get(NAME)
            .and_then(OptionValue::as_str)
            .unwrap_or_default()
    }
}

/// Guide state captured for one part.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartData {
    /// Guide-root attributes other than the part metadata.
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
    /// Transforms of every guide node, parents first.
    #[serde(default)]
    pub transforms: IndexMap<String, Transform>,
    /// Shapes of control and geometry nodes.
    #[serde(default)]
    pub shapes: IndexMap<String, CurveShape>,
    /// Category of every sub-group member.
    #[serde(default)]
    pub node_categories: IndexMap<String, NodeCategory>,
    /// Space the transforms were captured in.
    #[serde(default)]
    pub space: Space,
}

/// Replay switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Build each guide from its options before applying the captured state.
    pub build: bool,
    /// Apply captured shape points.
    pub set_shapes: bool,
    /// Apply captured shape colors.
    pub set_colors: bool,
    /// Namespace prefixed to every node the entries reference. Only valid without `build`.
    pub namespace: Option<String>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            build: true,
            set_shapes: true,
            set_colors: true,
            namespace: None,
        }
    }
}

/// Outcome of [`replay`].
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Guide roots the captured state was applied to.
    pub replayed: Vec<String>,
    /// Entries that failed, as `side_name` with the error message.
    pub failed: Vec<(String, String)>,
    /// Captured nodes absent from the scene.
    pub missing_nodes: Vec<String>,
}

impl Template {
    /// Parse a template from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> RigResult<Self> {
        serde_json::from_reader(r).map_err(|e| RigError::serde(format!("parse template JSON: {e}")))
    }

    /// Parse a template file.
    pub fn from_path(path: impl AsRef<Path>) -> RigResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RigError::configuration(format!("open template '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Load a template listed in the registry catalog.
    pub fn from_registry(registry: &PartRegistry, name: &str) -> RigResult<Self> {
        Self::from_path(registry.template_path(name)?)
    }

    /// Write pretty-printed JSON.
    pub fn to_writer_pretty<W: Write>(&self, w: W) -> RigResult<()> {
        serde_json::to_writer_pretty(w, self)
            .map_err(|e| RigError::serde(format!("serialize template: {e}")))
    }

    /// Write the template to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> RigResult<()> {
        let path = path.as_ref();
        let f = File::create(path)
            .with_context(|| format!("create template '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        self.to_writer_pretty(&mut w)?;
        w.flush()
            .with_context(|| format!("write template '{}'", path.display()))?;
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.template.len()
    }

    /// Return `true` when the template has no entries.
    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }
}

/// Snapshot every guide under the guide container.
///
/// Guides whose part type cannot be resolved are logged and left out.
#[tracing::instrument(skip(ws, registry))]
pub fn capture(ws: &Workspace, registry: &PartRegistry, space: Space) -> Template {
    let mut out = Template::default();
    for root in ws.guide_roots() {
        match capture_part(ws, registry, &root, space) {
            Ok(entry) => out.template.push(entry),
            Err(e) => tracing::error!(%root, "cannot capture guide: {e}"),
        }
    }
    tracing::info!(entries = out.template.len(), "captured template");
    out
}

fn capture_part(
    ws: &Workspace,
    registry: &PartRegistry,
    root: &str,
    space: Space,
) -> RigResult<TemplateEntry> {
    let part = Part::set_guide(ws, registry, root)?;
    let scene = ws.scene();
    let set = part
        .node_set(ws)
        .ok_or_else(|| RigError::missing_guide(format!("'{root}' vanished during capture")))?;

    let mut data = PartData {
        space,
        ..PartData::default()
    };
    data.attrs = scene
        .attrs(root)
        .into_iter()
        .filter(|(k, _)| ![ATTR_PART_TYPE, ATTR_OPTIONS, ATTR_RIG_ROOTS].contains(&k.as_str()))
        .collect();
    for node in set.hierarchy() {
        if let Some(t) = read_transform(scene, &node, space) {
            data.transforms.insert(node, t);
        }
    }
    for category in NodeCategory::ALL {
        for node in set.category(category) {
            data.node_categories.insert(node.clone(), category);
            if matches!(category, NodeCategory::Controls | NodeCategory::Geometry)
                && let Some(shape) = scene.shape(node)
            {
                data.shapes.insert(node.clone(), shape);
            }
        }
    }

    Ok(TemplateEntry {
        part_type: part.part_type().to_owned(),
        part_data: data,
        options: part.options().values(),
    })
}

fn namespaced(namespace: Option<&str>, node: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}{STASH_SEPARATOR}{node}"),
        None => node.to_owned(),
    }
}

/// Reconstruct the captured guides.
///
/// With `build`, each entry is instantiated and its guide built from the captured options;
/// otherwise the matching guide must already exist, under `namespace` if given. The captured
/// transforms, shapes and colors are applied on top. A failing entry is logged and reported;
/// the remaining entries still replay.
#[tracing::instrument(skip(ws, registry, template), fields(entries = template.template.len()))]
pub fn replay(
    ws: &mut Workspace,
    registry: &PartRegistry,
    template: &Template,
    opts: &ReplayOptions,
) -> RigResult<ReplayReport> {
    if opts.build && opts.namespace.is_some() {
        return Err(RigError::configuration(
            "a namespace can only address existing guides; replay with build disabled",
        ));
    }
    let mut report = ReplayReport::default();
    for entry in &template.template {
        let id = ws.naming().part_id(entry.side(), entry.name());
        match replay_entry(ws, registry, entry, opts, &mut report.missing_nodes) {
            Ok(root) => report.replayed.push(root),
            Err(e) => {
                tracing::error!(part = %id, "replay failed: {e}");
                report.failed.push((id, e.to_string()));
            }
        }
    }
    Ok(report)
}

fn replay_entry(
    ws: &mut Workspace,
    registry: &PartRegistry,
    entry: &TemplateEntry,
    opts: &ReplayOptions,
    missing: &mut Vec<String>,
) -> RigResult<String> {
    let ns = opts.namespace.as_deref();
    let root = if opts.build {
        let mut part = registry.instantiate(&entry.part_type)?;
        let update = part.update_options(ws, entry.options.clone())?;
        if !update.rejected.is_empty() {
            tracing::warn!(
                part_type = %entry.part_type,
                rejected = update.rejected.len(),
                "some captured option values were rejected"
            );
        }
        if !part.create_guide(ws)? {
            return Err(RigError::clash(format!(
                "guide for '{}' could not be named",
                ws.naming().part_id(entry.side(), entry.name())
            )));
        }
        part.guide_root()
            .map(str::to_owned)
            .ok_or_else(|| RigError::missing_guide("guide root missing after build"))?
    } else {
        let root = namespaced(ns, &ws.naming().guide_root(entry.side(), entry.name()));
        let found = ws
            .scene()
            .attr(&root, ATTR_PART_TYPE)
            .and_then(|v| v.as_str().map(str::to_owned));
        match found {
            None => return Err(RigError::missing_guide(format!("'{root}' is not a guide"))),
            Some(t) if t != entry.part_type => {
                return Err(RigError::configuration(format!(
                    "'{root}' is a '{t}', template expects '{}'",
                    entry.part_type
                )));
            }
            Some(_) => root,
        }
    };

    let data = &entry.part_data;
    let scene = ws.scene_mut();
    for (key, value) in &data.attrs {
        scene.set_attr(&root, key, value.clone())?;
    }
    for (node, t) in &data.transforms {
        let target = namespaced(ns, node);
        if !scene.exists(&target) {
            tracing::warn!(node = %target, "captured node not in scene");
            missing.push(target);
            continue;
        }
        write_transform(scene, &target, t.clone(), data.space)?;
    }
    if opts.set_shapes || opts.set_colors {
        for (node, shape) in &data.shapes {
            let target = namespaced(ns, node);
            let Some(mut current) = scene.shape(&target) else {
                if !missing.contains(&target) {
                    missing.push(target);
                }
                continue;
            };
            if opts.set_shapes {
                current.points = shape.points.clone();
            }
            if opts.set_colors {
                current.color = shape.color;
            }
            scene.set_shape(&target, current)?;
        }
    }
    tracing::debug!(%root, "replayed guide state");
    Ok(root)
}

#[cfg(test)]
#[path = "../tests/unit/template.rs"]
mod tests;
