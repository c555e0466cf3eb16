//! Space switch attached to another part's controls.
//!
//! Declares a `rig_part` target, so batch builds run it after every other part.

use std::sync::Arc;

use crate::foundation::core::{CurveShape, Space, Transform};
use crate::foundation::error::RigResult;
use crate::options::{DataType, OptionSpec, OptionTable, OptionValue};
use crate::part::{GuideBuilder, GuideContext, NodeCategory, Part, RigBuilder, RigContext};
use crate::scene::graph::{ConstraintKind, NodeType};

use super::{CENTER_COLOR, square};

/// Registered type key.
pub const PART_TYPE: &str = "space_switch";
/// Part the switch drives.
pub const TARGET: &str = "target";
/// Nodes offered as spaces.
pub const SPACES: &str = "spaces";

/// Builds the switch guide and rig.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpaceSwitchPart;

/// Fresh space-switch part.
pub fn create() -> anyhow::Result<Part> {
    let mut options = OptionTable::new("C", "space");
    options.register(
        TARGET,
        OptionSpec::new(DataType::RigPart, "")
            .allowed_part_types(["arm"])
            .tool_tip("Part whose controls follow the selected space."),
    )?;
    options.register(
        SPACES,
        OptionSpec::new(DataType::Selection, OptionValue::List(Vec::new())),
    )?;
    let b = Arc::new(SpaceSwitchPart);
    Ok(Part::new(PART_TYPE, options, b.clone(), b))
}

impl GuideBuilder for SpaceSwitchPart {
    fn build_guide(&self, ctx: &mut GuideContext<'_>, _options: &OptionTable) -> RigResult<()> {
        ctx.add(
            NodeCategory::Placers,
            &["pivot"],
            NodeType::Placer,
            None,
            Transform::default(),
        )?;
        ctx.add_control(
            &["switch"],
            None,
            Transform::default(),
            CurveShape::new(square(0.5), Some(CENTER_COLOR)),
        )?;
        Ok(())
    }
}

impl RigBuilder for SpaceSwitchPart {
    fn build_rig(&self, ctx: &mut RigContext<'_>, options: &OptionTable) -> RigResult<()> {
        let target = options.get_str(TARGET).unwrap_or_default().to_owned();
        let Some(target_root) = ctx.resolve_part(&target) else {
            return Ok(());
        };

        let pivot = ctx.format(&["pivot"], NodeType::Placer);
        let pose = ctx.guide_transform(&pivot, Space::World).unwrap_or_default();
        let shape = ctx.guide_shape(&ctx.format(&["switch", "guide"], NodeType::Control));
        let switch = ctx.add_control(None, None, &["switch"], pose, shape)?;
        ctx.scene()
            .set_attr(&switch, "target", serde_json::Value::String(target_root))?;

        let spaces = options
            .get(SPACES)
            .and_then(OptionValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let mut resolved = Vec::new();
        for (i, space) in spaces.iter().enumerate() {
            let Some(node) = ctx.resolve(space) else {
                continue;
            };
            let tok = format!("space{i}");
            let loc = ctx.add_rig_node(
                None,
                None,
                &[tok.as_str()],
                NodeType::Locator,
                Transform::default(),
            )?;
            ctx.constrain(&node, &loc, ConstraintKind::Parent)?;
            resolved.push(serde_json::Value::String(node));
        }
        ctx.scene()
            .set_attr(&switch, SPACES, serde_json::Value::Array(resolved))
    }
}
