//! Center brow carrying both sides: per-side placers plus a 7x7 bilateral lid surface.

use std::sync::Arc;

use crate::foundation::core::{CurveShape, Space, Transform, Vec3};
use crate::foundation::error::RigResult;
use crate::mirror::SURFACE_SPAN;
use crate::options::{DataType, OptionSpec, OptionTable};
use crate::part::{GuideBuilder, GuideContext, NodeCategory, Part, RigBuilder, RigContext};
use crate::scene::graph::{ConstraintKind, NodeType};

use super::{CENTER_COLOR, circle, side_color};

/// Registered type key.
pub const PART_TYPE: &str = "brow";

const SIDE_POINTS: [(&str, [f64; 3]); 2] = [("inner", [1.0, 20.0, 1.0]), ("outer", [3.0, 20.0, 0.5])];

/// Builds the brow guide and rig.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowPart;

/// Fresh brow part.
pub fn create() -> anyhow::Result<Part> {
    let mut options = OptionTable::new("C", "brow");
    options.register(
        "surfaceWidth",
        OptionSpec::new(DataType::Float, 4.0)
            .min(0.1)
            .rebuild_required()
            .tool_tip("Width of the lid surface."),
    )?;
    let b = Arc::new(BrowPart);
    Ok(Part::new(PART_TYPE, options, b.clone(), b))
}

/// Lid surface points, index `u * 7 + v`. Columns `u < 3` lie on the left (+X) half.
pub fn lid_points(width: f64) -> Vec<Vec3> {
    let step = width / (SURFACE_SPAN - 1) as f64;
    let mut out = Vec::with_capacity(SURFACE_SPAN * SURFACE_SPAN);
    for u in 0..SURFACE_SPAN {
        for v in 0..SURFACE_SPAN {
            let x = (3.0 - u as f64) * step;
            let y = (v as f64 - 3.0) * 0.3;
            out.push(Vec3::new(x, y, 1.0 - x.abs() * 0.1));
        }
    }
    out
}

impl GuideBuilder for BrowPart {
    fn build_guide(&self, ctx: &mut GuideContext<'_>, options: &OptionTable) -> RigResult<()> {
        let mid = Vec3::new(0.0, 20.0, 1.2);
        ctx.add(
            NodeCategory::Placers,
            &["mid"],
            NodeType::Placer,
            None,
            Transform::at(mid),
        )?;
        ctx.add(
            NodeCategory::Joints,
            &["mid"],
            NodeType::Joint,
            None,
            Transform::at(mid),
        )?;
        ctx.add_control(
            &["mid"],
            None,
            Transform::at(mid),
            CurveShape::new(circle(0.4), Some(CENTER_COLOR)),
        )?;

        let sides = [(ctx.left().to_owned(), 1.0), (ctx.right().to_owned(), -1.0)];
        for (side, sign) in &sides {
            let color = side_color(side, ctx.left(), ctx.right());
            for (tok, p) in SIDE_POINTS {
                let at = Vec3::new(p[0] * sign, p[1], p[2]);
                ctx.add(
                    NodeCategory::Placers,
                    &[side.as_str(), tok],
                    NodeType::Placer,
                    None,
                    Transform::at(at),
                )?;
                ctx.add(
                    NodeCategory::Joints,
                    &[side.as_str(), tok],
                    NodeType::Joint,
                    None,
                    Transform::at(at),
                )?;
                ctx.add_control(
                    &[side.as_str(), tok],
                    None,
                    Transform::at(at),
                    CurveShape::new(circle(0.3), Some(color)),
                )?;
            }
        }

        let width = options.get_f64("surfaceWidth").unwrap_or(4.0);
        let lid = ctx.add(
            NodeCategory::Geometry,
            &["lid"],
            NodeType::Surface,
            None,
            Transform::at(Vec3::new(0.0, 20.0, 0.0)),
        )?;
        ctx.set_shape(&lid, CurveShape::new(lid_points(width), None))
    }
}

impl RigBuilder for BrowPart {
    fn build_rig(&self, ctx: &mut RigContext<'_>, _options: &OptionTable) -> RigResult<()> {
        let joints: Vec<String> = ctx
            .guide()
            .category(NodeCategory::Joints)
            .to_vec();
        for joint in joints {
            let Some(parsed) = ctx.naming.parse(&joint) else {
                continue;
            };
            let tokens: Vec<&str> = parsed.tokens.iter().map(String::as_str).collect();
            let mut template = tokens.clone();
            template.push("guide");
            let pose = ctx.guide_transform(&joint, Space::World).unwrap_or_default();
            let shape = ctx.guide_shape(&ctx.format(&template, NodeType::Control));
            let ctl = ctx.add_control(None, None, &tokens, pose, shape)?;
            ctx.constrain(&ctl, &joint, ConstraintKind::Parent)?;
        }
        Ok(())
    }
}
