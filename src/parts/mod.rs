//! Built-in part types.

use std::f64::consts::TAU;

use crate::foundation::core::{Rgb, Vec3};
use crate::registry::PartRegistry;

pub mod arm;
pub mod brow;
pub mod root;
pub mod space_switch;

/// Register every built-in part type.
pub fn register_builtins(registry: &mut PartRegistry) {
    registry.register(root::PART_TYPE, root::create);
    registry.register(arm::PART_TYPE, arm::create);
    registry.register(brow::PART_TYPE, brow::create);
    registry.register(space_switch::PART_TYPE, space_switch::create);
}

const LEFT_COLOR: Rgb = [0.1, 0.35, 1.0];
const RIGHT_COLOR: Rgb = [1.0, 0.15, 0.1];
const CENTER_COLOR: Rgb = [1.0, 0.85, 0.1];

/// Display color for a side token.
pub(crate) fn side_color(side: &str, left: &str, right: &str) -> Rgb {
    if side == left {
        LEFT_COLOR
    } else if side == right {
        RIGHT_COLOR
    } else {
        CENTER_COLOR
    }
}

/// Closed circle in the YZ plane.
pub(crate) fn circle(radius: f64) -> Vec<Vec3> {
    (0..=8)
        .map(|i| {
            let a = TAU * f64::from(i) / 8.0;
            Vec3::new(0.0, a.cos() * radius, a.sin() * radius)
        })
        .collect()
}

/// Closed square in the XZ plane.
pub(crate) fn square(half: f64) -> Vec<Vec3> {
    vec![
        Vec3::new(-half, 0.0, -half),
        Vec3::new(half, 0.0, -half),
        Vec3::new(half, 0.0, half),
        Vec3::new(-half, 0.0, half),
        Vec3::new(-half, 0.0, -half),
    ]
}
