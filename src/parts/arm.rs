//! Three-joint limb with twist joints, FK chain and IK handle.

use std::sync::Arc;

use crate::foundation::core::{CurveShape, Space, Transform, Vec3};
use crate::foundation::error::RigResult;
use crate::options::{DataType, OptionSpec, OptionTable};
use crate::part::{GuideBuilder, GuideContext, NodeCategory, Part, RigBuilder, RigContext};
use crate::scene::graph::{ConstraintKind, NodeType};

use super::{circle, side_color, square};

/// Registered type key.
pub const PART_TYPE: &str = "arm";

/// Driver option the rig groups hang under.
pub const PARENT: &str = "parent";
/// Number of twist joints between shoulder and elbow.
pub const TWIST_JOINTS: &str = "numTwistJoints";
/// Whether the rig carries a stretch network.
pub const STRETCHY: &str = "stretchy";

const SEGMENTS: [(&str, [f64; 3]); 3] = [
    ("shoulder", [2.0, 15.0, 0.0]),
    ("elbow", [5.0, 15.0, -0.5]),
    ("wrist", [8.0, 15.0, 0.0]),
];

/// Builds the arm guide and rig.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArmPart;

/// Fresh arm part.
pub fn create() -> anyhow::Result<Part> {
    let mut options = OptionTable::new("L", "arm");
    options.register(
        PARENT,
        OptionSpec::new(DataType::ParentDriver, "").tool_tip("Node the arm rig follows."),
    )?;
    options.register(
        TWIST_JOINTS,
        OptionSpec::new(DataType::Int, 4)
            .range(0.0, 10.0)
            .rebuild_required()
            .tool_tip("Twist joints between shoulder and elbow."),
    )?;
    options.register(STRETCHY, OptionSpec::new(DataType::Bool, false))?;
    let b = Arc::new(ArmPart);
    Ok(Part::new(PART_TYPE, options, b.clone(), b))
}

fn position(ctx: &GuideContext<'_>, p: [f64; 3]) -> Vec3 {
    Vec3::new(p[0] * ctx.side_sign(), p[1], p[2])
}

impl GuideBuilder for ArmPart {
    fn build_guide(&self, ctx: &mut GuideContext<'_>, options: &OptionTable) -> RigResult<()> {
        let color = side_color(ctx.side(), ctx.left(), ctx.right());
        let points: Vec<Vec3> = SEGMENTS.iter().map(|(_, p)| position(ctx, *p)).collect();

        let mut prev: Option<(String, Vec3)> = None;
        let mut joints = Vec::new();
        for ((tok, _), p) in SEGMENTS.iter().zip(&points) {
            ctx.add(
                NodeCategory::Placers,
                &[*tok],
                NodeType::Placer,
                None,
                Transform::at(*p),
            )?;
            let local = prev.as_ref().map_or(*p, |(_, pp)| *p - *pp);
            let joint = ctx.add(
                NodeCategory::Joints,
                &[*tok],
                NodeType::Joint,
                prev.as_ref().map(|(j, _)| j.as_str()),
                Transform::at(local),
            )?;
            ctx.add_control(
                &[*tok, "fk"],
                None,
                Transform::at(*p),
                CurveShape::new(circle(1.0), Some(color)),
            )?;
            joints.push(joint.clone());
            prev = Some((joint, *p));
        }

        let twists = options.get_i64(TWIST_JOINTS).unwrap_or(0);
        let upper = points[1] - points[0];
        for i in 0..twists {
            let t = (i + 1) as f64 / (twists + 1) as f64;
            let tok = format!("upperTwist{i}");
            ctx.add(
                NodeCategory::Joints,
                &[tok.as_str()],
                NodeType::Joint,
                Some(joints[0].as_str()),
                Transform::at(upper * t),
            )?;
        }

        ctx.add_control(
            &["ik"],
            None,
            Transform::at(points[2]),
            CurveShape::new(square(1.5), Some(color)),
        )?;
        let proxy = ctx.add(
            NodeCategory::Geometry,
            &["proxy"],
            NodeType::Geometry,
            None,
            Transform::at(points[0]),
        )?;
        ctx.set_shape(
            &proxy,
            CurveShape::new(points.iter().map(|p| *p - points[0]).collect(), None),
        )?;
        ctx.add(
            NodeCategory::NoTransform,
            &["poleVector"],
            NodeType::Locator,
            None,
            Transform::at(points[1] + Vec3::new(0.0, 0.0, -4.0)),
        )?;
        ctx.add_history(&joints[0], &["length"])?;
        Ok(())
    }
}

impl RigBuilder for ArmPart {
    fn build_rig(&self, ctx: &mut RigContext<'_>, options: &OptionTable) -> RigResult<()> {
        let mut parent_ctl: Option<String> = None;
        for (tok, _) in SEGMENTS {
            let joint = ctx.format(&[tok], NodeType::Joint);
            let pose = ctx.guide_transform(&joint, Space::World).unwrap_or_default();
            let shape = ctx.guide_shape(&ctx.format(&[tok, "fk", "guide"], NodeType::Control));
            let ctl = ctx.add_control(
                Some(PARENT),
                parent_ctl.as_deref(),
                &[tok, "fk"],
                pose,
                shape,
            )?;
            ctx.constrain(&ctl, &joint, ConstraintKind::Orient)?;
            parent_ctl = Some(ctl);
        }

        let wrist = ctx.format(&["wrist"], NodeType::Joint);
        let pose = ctx.guide_transform(&wrist, Space::World).unwrap_or_default();
        let shape = ctx.guide_shape(&ctx.format(&["ik", "guide"], NodeType::Control));
        let ik = ctx.add_control(Some(PARENT), None, &["ik"], pose.clone(), shape)?;
        let handle = ctx.add_rig_node(Some(PARENT), None, &["ik", "handle"], NodeType::Locator, pose)?;
        ctx.constrain(&ik, &handle, ConstraintKind::Point)?;

        let pole = ctx.format(&["poleVector"], NodeType::Locator);
        if let Some(pose) = ctx.guide_transform(&pole, Space::World) {
            let pv = ctx.add_control(
                Some(PARENT),
                None,
                &["poleVector"],
                pose,
                Some(CurveShape::new(circle(0.5), None)),
            )?;
            ctx.constrain(&pv, &handle, ConstraintKind::Aim)?;
        }

        if options.get_bool(STRETCHY).unwrap_or(false) {
            ctx.add_rig_node(
                Some(PARENT),
                None,
                &["stretch"],
                NodeType::Utility,
                Transform::default(),
            )?;
        }
        Ok(())
    }
}
