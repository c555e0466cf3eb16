//! World and main controls at the top of every rig.

use std::sync::Arc;

use crate::foundation::core::{CurveShape, Space, Transform};
use crate::foundation::error::RigResult;
use crate::options::{DataType, OptionSpec, OptionTable};
use crate::part::{GuideBuilder, GuideContext, NodeCategory, Part, RigBuilder, RigContext};
use crate::scene::graph::{ConstraintKind, NodeType};

use super::{CENTER_COLOR, circle, square};

/// Registered type key.
pub const PART_TYPE: &str = "root";

/// Builds the world placer, the main joint and their controls.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootPart;

/// Fresh root part.
pub fn create() -> anyhow::Result<Part> {
    let mut options = OptionTable::new("C", "root");
    options.register(
        "worldScale",
        OptionSpec::new(DataType::Float, 1.0)
            .min(0.001)
            .tool_tip("Size of the world control shapes."),
    )?;
    let b = Arc::new(RootPart);
    Ok(Part::new(PART_TYPE, options, b.clone(), b).with_root(true))
}

impl GuideBuilder for RootPart {
    fn build_guide(&self, ctx: &mut GuideContext<'_>, options: &OptionTable) -> RigResult<()> {
        let size = options.get_f64("worldScale").unwrap_or(1.0);
        ctx.add(
            NodeCategory::Placers,
            &["world"],
            NodeType::Placer,
            None,
            Transform::default(),
        )?;
        ctx.add(
            NodeCategory::Joints,
            &["main"],
            NodeType::Joint,
            None,
            Transform::default(),
        )?;
        ctx.add_control(
            &["world"],
            None,
            Transform::default(),
            CurveShape::new(square(10.0 * size), Some(CENTER_COLOR)),
        )?;
        ctx.add_control(
            &["main"],
            None,
            Transform::default(),
            CurveShape::new(circle(8.0 * size), Some(CENTER_COLOR)),
        )?;
        Ok(())
    }
}

impl RigBuilder for RootPart {
    fn build_rig(&self, ctx: &mut RigContext<'_>, _options: &OptionTable) -> RigResult<()> {
        let placer = ctx.format(&["world"], NodeType::Placer);
        let joint = ctx.format(&["main"], NodeType::Joint);
        let world_pose = ctx.guide_transform(&placer, Space::World).unwrap_or_default();
        let world_shape = ctx.guide_shape(&ctx.format(&["world", "guide"], NodeType::Control));
        let world = ctx.add_control(None, None, &["world"], world_pose, world_shape)?;

        let main_pose = ctx.guide_transform(&joint, Space::World).unwrap_or_default();
        let main_shape = ctx.guide_shape(&ctx.format(&["main", "guide"], NodeType::Control));
        let main = ctx.add_control(None, Some(world.as_str()), &["main"], main_pose, main_shape)?;
        ctx.constrain(&main, &joint, ConstraintKind::Parent)?;
        ctx.constrain(&main, &joint, ConstraintKind::Scale)
    }
}
