//! Mirroring and duplication of guides.
//!
//! Source and target node sets are paired category by category, by position. Poses are
//! computed in world space and applied parents first so a target's parent is already in place
//! when its own world pose is converted back to local.

use indexmap::IndexMap;

use crate::foundation::core::{Axis, MirrorMode, Vec3};
use crate::foundation::error::{RigError, RigResult};
use crate::guide::StartMode;
use crate::naming::NameConvention;
use crate::options::{NAME, OptionValue, SIDE};
use crate::part::{NodeCategory, NodeSet, Part};
use crate::registry::PartRegistry;
use crate::scene::graph::{NodeType, SceneGraph};
use crate::scene::transform::{MirrorChannels, copy_transform, mirror_transform};
use crate::workspace::Workspace;

/// Control points per row and column of a bilateral surface.
pub const SURFACE_SPAN: usize = 7;

/// Option values of `part` as they should read on the opposite side.
///
/// The side token is swapped, as is the leading side token of every sided reference value.
/// Center parts keep their side.
pub fn mirrored_values(naming: &NameConvention, part: &Part) -> IndexMap<String, OptionValue> {
    let swap = |s: &String| naming.mirror_value(s).unwrap_or_else(|| s.clone());
    let mut out = IndexMap::new();
    for (key, spec) in part.options().iter() {
        let value = if key == SIDE {
            let side = part.side();
            OptionValue::Str(naming.swap_side(side).unwrap_or(side).to_owned())
        } else if spec.data_type.is_sided_reference() {
            match &spec.value {
                OptionValue::Str(s) => OptionValue::Str(swap(s)),
                OptionValue::List(l) => OptionValue::List(l.iter().map(swap).collect()),
                other => other.clone(),
            }
        } else {
            spec.value.clone()
        };
        out.insert(key.to_owned(), value);
    }
    out
}

fn require_set(ws: &Workspace, part: &Part) -> RigResult<NodeSet> {
    part.node_set(ws).ok_or_else(|| {
        RigError::missing_guide(format!(
            "'{}' has no guide",
            ws.naming().part_id(part.side(), part.name())
        ))
    })
}

/// Mirror `source` onto its opposite-side counterpart, building the counterpart if needed.
///
/// A center part is its own counterpart and is mirrored left to right in place.
pub fn mirror(
    ws: &mut Workspace,
    registry: &PartRegistry,
    source: &Part,
    axis: Axis,
) -> RigResult<Part> {
    mirror_with(ws, registry, source, axis, &IndexMap::new())
}

/// [`mirror`] with option values that replace the mirrored ones, `side` and `name` included.
#[tracing::instrument(
    skip(ws, registry, source, overrides),
    fields(part_type = %source.part_type())
)]
pub fn mirror_with(
    ws: &mut Workspace,
    registry: &PartRegistry,
    source: &Part,
    axis: Axis,
    overrides: &IndexMap<String, OptionValue>,
) -> RigResult<Part> {
    let src_set = require_set(ws, source)?;
    let mut values = mirrored_values(ws.naming(), source);
    apply_overrides(&mut values, overrides);
    let target_root = target_root(ws, &values);

    if target_root == src_set.root {
        center_mirror(ws, source, axis)?;
        return Part::set_guide(ws, registry, &target_root);
    }

    let target = resolve_target(
        ws,
        registry,
        source,
        &src_set.root,
        &target_root,
        values,
        "mirror",
    )?;
    let dst_set = require_set(ws, &target)?;
    transfer(ws.scene_mut(), category_pairs(&src_set, &dst_set), Some(axis))?;
    tracing::info!(source = %src_set.root, target = %dst_set.root, "mirrored guide");
    Ok(target)
}

/// Build or update a same-type copy of `source` with its option values and pose.
///
/// `overrides` replace the copied values; naming the copy through `side` or `name` is what
/// keeps it apart from the source. Without them the clash resolver has to pick new tokens, and
/// a cancelled resolution fails with [`RigError::Clash`].
#[tracing::instrument(
    skip(ws, registry, source, overrides),
    fields(part_type = %source.part_type())
)]
pub fn duplicate(
    ws: &mut Workspace,
    registry: &PartRegistry,
    source: &Part,
    overrides: &IndexMap<String, OptionValue>,
) -> RigResult<Part> {
    let src_set = require_set(ws, source)?;
    let mut values = source.options().values();
    apply_overrides(&mut values, overrides);
    let target_root = target_root(ws, &values);

    let target = if target_root == src_set.root {
        build_target(ws, registry, source, &src_set.root, values, "duplicate")?
    } else {
        resolve_target(
            ws,
            registry,
            source,
            &src_set.root,
            &target_root,
            values,
            "duplicate",
        )?
    };
    let dst_set = require_set(ws, &target)?;
    transfer(ws.scene_mut(), category_pairs(&src_set, &dst_set), None)?;
    tracing::info!(source = %src_set.root, target = %dst_set.root, "duplicated guide");
    Ok(target)
}

fn apply_overrides(
    values: &mut IndexMap<String, OptionValue>,
    overrides: &IndexMap<String, OptionValue>,
) {
    for (key, value) in overrides {
        values.insert(key.clone(), value.clone());
    }
}

fn target_root(ws: &Workspace, values: &IndexMap<String, OptionValue>) -> String {
    let side = values.get(SIDE).and_then(OptionValue::as_str).unwrap_or_default();
    let name = values.get(NAME).and_then(OptionValue::as_str).unwrap_or_default();
    ws.naming().guide_root(side, name)
}

/// Reuse the guide at `target_root` when it exists, otherwise build it.
fn resolve_target(
    ws: &mut Workspace,
    registry: &PartRegistry,
    source: &Part,
    src_root: &str,
    target_root: &str,
    values: IndexMap<String, OptionValue>,
    verb: &str,
) -> RigResult<Part> {
    if !ws.scene().exists(target_root) {
        return build_target(ws, registry, source, src_root, values, verb);
    }
    let mut target = Part::set_guide(ws, registry, target_root)?;
    if target.part_type() != source.part_type() {
        return Err(RigError::configuration(format!(
            "{verb} target '{target_root}' is a '{}', not a '{}'",
            target.part_type(),
            source.part_type()
        )));
    }
    let changed: Vec<(String, OptionValue)> = values
        .into_iter()
        .filter(|(k, v)| k != SIDE && k != NAME && target.options().get(k) != Some(v))
        .collect();
    if !changed.is_empty() {
        target.update_options(ws, changed)?;
    }
    Ok(target)
}

fn build_target(
    ws: &mut Workspace,
    registry: &PartRegistry,
    source: &Part,
    src_root: &str,
    values: IndexMap<String, OptionValue>,
    verb: &str,
) -> RigResult<Part> {
    let mut target = registry.instantiate(source.part_type())?;
    target.update_options(ws, values)?;
    if !target.create_guide_with(ws, StartMode::Staged)? {
        return Err(RigError::clash(format!("{verb} of '{src_root}' was cancelled")));
    }
    Ok(target)
}

/// Mirror the left-tagged nodes of a center part onto their right-tagged twins, in place.
///
/// A node is left-tagged when its first descriptor token is the left side token. Surfaces with
/// a 7x7 control grid are mirrored by point index instead.
pub fn center_mirror(ws: &mut Workspace, part: &Part, axis: Axis) -> RigResult<()> {
    let set = require_set(ws, part)?;
    let naming = ws.naming().clone();
    let scene = ws.scene_mut();

    let mut pairs = Vec::new();
    for category in NodeCategory::ALL {
        for node in set.category(category) {
            let Some(parsed) = naming.parse(node) else {
                continue;
            };
            let (Some(first), Some(node_type)) = (parsed.tokens.first(), parsed.node_type) else {
                continue;
            };
            if !naming.is_left(first) {
                continue;
            }
            let mut tokens: Vec<&str> = parsed.tokens.iter().map(String::as_str).collect();
            tokens[0] = naming.right();
            let twin = naming.format(&parsed.side, &parsed.name, &tokens, node_type);
            if scene.exists(&twin) {
                pairs.push((category, node.clone(), twin));
            } else {
                tracing::debug!(%node, %twin, "left-tagged node has no right twin");
            }
        }
    }
    transfer(scene, pairs, Some(axis))?;

    for node in set.hierarchy() {
        if scene.node_type(&node) != Some(NodeType::Surface) {
            continue;
        }
        let Some(mut shape) = scene.shape(&node) else {
            continue;
        };
        if shape.points.len() != SURFACE_SPAN * SURFACE_SPAN {
            tracing::warn!(
                %node,
                points = shape.points.len(),
                "surface is not a 7x7 grid, skipping"
            );
            continue;
        }
        mirror_surface(&mut shape.points, axis);
        scene.set_shape(&node, shape)?;
    }
    Ok(())
}

/// Copy the left columns of a 7x7 grid (index `u * 7 + v`, `u < 3`) onto columns `6 - u`,
/// reflected across `axis`. The middle column is left alone.
pub fn mirror_surface(points: &mut [Vec3], axis: Axis) {
    let span = SURFACE_SPAN;
    for u in 0..span / 2 {
        for v in 0..span {
            points[(span - 1 - u) * span + v] = axis.reflect_point(points[u * span + v]);
        }
    }
}

fn category_pairs(src: &NodeSet, dst: &NodeSet) -> Vec<(NodeCategory, String, String)> {
    let mut pairs = Vec::new();
    for category in NodeCategory::ALL {
        let (a, b) = (src.category(category), dst.category(category));
        if a.len() != b.len() {
            tracing::warn!(
                %category,
                source = a.len(),
                target = b.len(),
                "category sizes differ, pairing by position"
            );
        }
        pairs.extend(
            a.iter()
                .zip(b)
                .map(|(s, d)| (category, s.clone(), d.clone())),
        );
    }
    pairs
}

fn transfer(
    scene: &mut dyn SceneGraph,
    mut pairs: Vec<(NodeCategory, String, String)>,
    axis: Option<Axis>,
) -> RigResult<()> {
    pairs.sort_by_key(|(_, _, target)| scene.depth(target));
    for (category, source, target) in &pairs {
        if let (Some(src), Some(_)) = (scene.transform(source), scene.transform(target)) {
            match axis {
                Some(axis) if src.mirror_mode == MirrorMode::Full => {
                    mirror_transform(scene, source, target, axis, MirrorChannels::FULL)?;
                }
                Some(axis) => {
                    mirror_transform(scene, source, target, axis, MirrorChannels::TRANSLATE_ROTATE)?;
                    if let Some(mut t) = scene.transform(target) {
                        t.scale = src.scale;
                        scene.set_transform(target, t)?;
                    }
                }
                None => copy_transform(scene, source, target)?,
            }
        }

        if matches!(category, NodeCategory::Controls | NodeCategory::Geometry)
            && let Some(shape) = scene.shape(source)
        {
            let mut out = scene.shape(target).unwrap_or_default();
            out.points = match axis {
                Some(axis) => shape.reflected_points(axis),
                None => shape.points,
            };
            out.color = shape.color;
            scene.set_shape(target, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/mirror.rs"]
mod tests;
