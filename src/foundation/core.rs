use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

pub use glam::DVec3 as Vec3;

/// World axis used as the reflection normal for mirroring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Reflect across the YZ plane.
    #[default]
    X,
    /// Reflect across the XZ plane.
    Y,
    /// Reflect across the XY plane.
    Z,
}

impl Axis {
    /// Component index of this axis in a 3-vector.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Reflect a point or direction across the plane normal to this axis.
    pub fn reflect_point(self, p: DVec3) -> DVec3 {
        let mut out = p;
        out[self.index()] = -out[self.index()];
        out
    }

    /// Reflect Euler angles (degrees): rotation about the axis is kept, the other two flip.
    ///
    /// Holds for every rotate order because `M * R_a * M` only flips rotations about the two
    /// axes lying in the mirror plane.
    pub fn reflect_rotation(self, r: DVec3) -> DVec3 {
        let keep = self.index();
        let mut out = -r;
        out[keep] = r[keep];
        out
    }

    /// Reflect a rotation: the vector part keeps its component along this axis, the rest flips.
    pub fn reflect_quat(self, q: DQuat) -> DQuat {
        let v = DVec3::new(q.x, q.y, q.z);
        let mut out = -v;
        out[self.index()] = v[self.index()];
        DQuat::from_xyzw(out.x, out.y, out.z, q.w)
    }

    /// Flip the scale component along this axis.
    pub fn reflect_scale(self, s: DVec3) -> DVec3 {
        self.reflect_point(s)
    }
}

/// Euler rotation order, named by the order axes are applied in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateOrder {
    /// X, then Y, then Z.
    #[default]
    Xyz,
    /// Y, then Z, then X.
    Yzx,
    /// Z, then X, then Y.
    Zxy,
    /// X, then Z, then Y.
    Xzy,
    /// Y, then X, then Z.
    Yxz,
    /// Z, then Y, then X.
    Zyx,
}

impl RotateOrder {
    // The matrix is R_last * R_mid * R_first, i.e. the intrinsic glam order read back to front.
    fn euler(self) -> (EulerRot, [usize; 3]) {
        match self {
            Self::Xyz => (EulerRot::ZYX, [2, 1, 0]),
            Self::Yzx => (EulerRot::XZY, [0, 2, 1]),
            Self::Zxy => (EulerRot::YXZ, [1, 0, 2]),
            Self::Xzy => (EulerRot::YZX, [1, 2, 0]),
            Self::Yxz => (EulerRot::ZXY, [2, 0, 1]),
            Self::Zyx => (EulerRot::XYZ, [0, 1, 2]),
        }
    }

    /// Convert Euler angles in degrees to a quaternion.
    pub fn to_quat(self, degrees: DVec3) -> DQuat {
        let (rot, [a, b, c]) = self.euler();
        DQuat::from_euler(
            rot,
            degrees[a].to_radians(),
            degrees[b].to_radians(),
            degrees[c].to_radians(),
        )
    }

    /// Convert a quaternion back to Euler angles in degrees.
    pub fn euler_degrees(self, q: DQuat) -> DVec3 {
        let (rot, [a, b, c]) = self.euler();
        let (ea, eb, ec) = q.to_euler(rot);
        let mut out = DVec3::ZERO;
        out[a] = ea.to_degrees();
        out[b] = eb.to_degrees();
        out[c] = ec.to_degrees();
        out
    }
}

/// Per-node mirroring behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorMode {
    /// Reflect translate and rotate, copy scale.
    #[default]
    TranslateRotate,
    /// Reflect translate, rotate and scale.
    Full,
}

/// Coordinate space used when reading or writing transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Relative to the node's parent.
    #[default]
    Local,
    /// Composed through the full parent chain.
    World,
}

/// Local TRS transform of a scene node, plus the mirroring metadata carried with it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation.
    pub translate: DVec3,
    /// Euler rotation in degrees.
    pub rotate: DVec3,
    /// Per-axis scale.
    pub scale: DVec3,
    /// Order the Euler angles are applied in.
    #[serde(default)]
    pub rotate_order: RotateOrder,
    /// How this node is reflected by the mirror engine.
    #[serde(default)]
    pub mirror_mode: MirrorMode,
    /// Number of offset groups stacked above the node.
    #[serde(default)]
    pub offset_count: u32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: DVec3::ZERO,
            rotate: DVec3::ZERO,
            scale: DVec3::ONE,
            rotate_order: RotateOrder::default(),
            mirror_mode: MirrorMode::default(),
            offset_count: 0,
        }
    }
}

impl Transform {
    /// Identity transform positioned at `translate`.
    pub fn at(translate: DVec3) -> Self {
        Self {
            translate,
            ..Self::default()
        }
    }

    /// Rotation as a quaternion, honouring the rotate order.
    pub fn rotation(&self) -> DQuat {
        self.rotate_order.to_quat(self.rotate)
    }

    /// Affine matrix `T * R * S`.
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translate)
    }

    /// Replace translate/rotate/scale from a matrix, keeping order and mirror metadata.
    pub fn set_matrix(&mut self, m: DMat4) {
        let (scale, rotation, translate) = m.to_scale_rotation_translation();
        self.translate = translate;
        self.rotate = self.rotate_order.euler_degrees(rotation);
        self.scale = scale;
    }

    /// Reflect translate and rotate across `axis`; scale too when the mirror mode asks for it.
    pub fn reflected(&self, axis: Axis) -> Self {
        let mut out = self.clone();
        out.translate = axis.reflect_point(self.translate);
        out.rotate = axis.reflect_rotation(self.rotate);
        if self.mirror_mode == MirrorMode::Full {
            out.scale = axis.reflect_scale(self.scale);
        }
        out
    }
}

/// RGB display color in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Control-curve shape data: local-space control points plus display color.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveShape {
    /// Control points in the node's local space.
    pub points: Vec<DVec3>,
    /// Override color, if any.
    #[serde(default)]
    pub color: Option<Rgb>,
}

impl CurveShape {
    /// Shape with the given points and color.
    pub fn new(points: Vec<DVec3>, color: Option<Rgb>) -> Self {
        Self { points, color }
    }

    /// Points reflected component-wise across `axis`.
    pub fn reflected_points(&self, axis: Axis) -> Vec<DVec3> {
        self.points.iter().map(|p| axis.reflect_point(*p)).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
