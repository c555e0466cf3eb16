//! Transform collaborator operations layered on top of [`SceneGraph`].

use glam::{DMat4, DQuat, DVec3};

use crate::foundation::core::{Axis, Space, Transform};
use crate::foundation::error::{RigError, RigResult};
use crate::scene::graph::SceneGraph;

/// Which channels [`mirror_transform`] writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MirrorChannels {
    /// Reflect translation.
    pub translate: bool,
    /// Reflect rotation.
    pub rotate: bool,
    /// Copy scale, reflected along the axis.
    pub scale: bool,
}

impl MirrorChannels {
    /// Translate and rotate only.
    pub const TRANSLATE_ROTATE: Self = Self {
        translate: true,
        rotate: true,
        scale: false,
    };

    /// Translate, rotate and scale.
    pub const FULL: Self = Self {
        translate: true,
        rotate: true,
        scale: true,
    };
}

/// World matrix of `name`, composed through every transform-carrying ancestor.
pub fn world_matrix(scene: &dyn SceneGraph, name: &str) -> Option<DMat4> {
    let mut m = scene.transform(name)?.matrix();
    let mut cur = scene.parent(name);
    while let Some(p) = cur {
        if let Some(t) = scene.transform(&p) {
            m = t.matrix() * m;
        }
        cur = scene.parent(&p);
    }
    Some(m)
}

fn parent_world(scene: &dyn SceneGraph, name: &str) -> DMat4 {
    scene
        .parent(name)
        .and_then(|p| world_matrix(scene, &p))
        .unwrap_or(DMat4::IDENTITY)
}

/// Read a node transform in the requested space.
///
/// World transforms keep the node's rotate order and mirror metadata.
pub fn read_transform(scene: &dyn SceneGraph, name: &str, space: Space) -> Option<Transform> {
    let local = scene.transform(name)?;
    match space {
        Space::Local => Some(local),
        Space::World => {
            let mut out = local;
            out.set_matrix(world_matrix(scene, name)?);
            Some(out)
        }
    }
}

/// Write a node transform given in the requested space.
pub fn write_transform(
    scene: &mut dyn SceneGraph,
    name: &str,
    transform: Transform,
    space: Space,
) -> RigResult<()> {
    match space {
        Space::Local => scene.set_transform(name, transform),
        Space::World => {
            let local_m = parent_world(scene, name).inverse() * transform.matrix();
            let mut local = transform;
            local.set_matrix(local_m);
            scene.set_transform(name, local)
        }
    }
}

fn set_world_pose(
    scene: &mut dyn SceneGraph,
    name: &str,
    translate: DVec3,
    rotation: DQuat,
    scale: DVec3,
) -> RigResult<()> {
    let mut local = scene
        .transform(name)
        .ok_or_else(|| RigError::scene(format!("'{name}' has no transform")))?;
    let m = parent_world(scene, name).inverse() * DMat4::from_rotation_translation(rotation, translate);
    let (_, r, t) = m.to_scale_rotation_translation();
    local.translate = t;
    local.rotate = local.rotate_order.euler_degrees(r);
    local.scale = scale;
    scene.set_transform(name, local)
}

/// Reflect `source`'s world pose across `axis` onto `target`.
///
/// Unselected channels keep the target's current values.
pub fn mirror_transform(
    scene: &mut dyn SceneGraph,
    source: &str,
    target: &str,
    axis: Axis,
    channels: MirrorChannels,
) -> RigResult<()> {
    let src_world = world_matrix(scene, source)
        .ok_or_else(|| RigError::scene(format!("'{source}' has no transform")))?;
    let dst_world = world_matrix(scene, target)
        .ok_or_else(|| RigError::scene(format!("'{target}' has no transform")))?;
    let src_local = scene.transform(source).unwrap_or_default();
    let dst_local = scene.transform(target).unwrap_or_default();

    let (_, src_r, src_t) = src_world.to_scale_rotation_translation();
    let (_, dst_r, dst_t) = dst_world.to_scale_rotation_translation();

    let t = if channels.translate {
        axis.reflect_point(src_t)
    } else {
        dst_t
    };
    let r = if channels.rotate {
        axis.reflect_quat(src_r)
    } else {
        dst_r
    };
    let s = if channels.scale {
        axis.reflect_scale(src_local.scale)
    } else {
        dst_local.scale
    };
    set_world_pose(scene, target, t, r, s)
}

/// Copy `source`'s world pose and local scale onto `target` without reflection.
pub fn copy_transform(scene: &mut dyn SceneGraph, source: &str, target: &str) -> RigResult<()> {
    let src_world = world_matrix(scene, source)
        .ok_or_else(|| RigError::scene(format!("'{source}' has no transform")))?;
    let src_scale = scene.transform(source).unwrap_or_default().scale;
    let (_, r, t) = src_world.to_scale_rotation_translation();
    set_world_pose(scene, target, t, r, src_scale)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/transform.rs"]
mod tests;
