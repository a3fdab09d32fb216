//! Pose helpers for 3D object transforms
//!
//! Objects store their local pose as separate position / rotation / scale
//! values and derive an affine matrix from them on demand. This module holds
//! the conversions between the two forms plus the small comparisons the
//! mutators use to decide whether a value actually changed.
//!
//! Axis convention: +Y is the forward axis an object aims along, +Z is up.

use glam::{Affine3A, EulerRot, Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation and non-uniform scale of an object relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Builds the local matrix: scale first, then rotation, then translation.
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Splits an affine matrix into translation, unit rotation and scale.
    ///
    /// Shear cannot be represented and is folded into the rotation/scale pair.
    pub fn from_affine(tm: &Affine3A) -> Self {
        let (scale, rotation, position) = tm.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }
}

impl Default for LocalPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Builds a rotation whose forward (+Y) axis points along `direction`, with
/// no roll relative to +Z.
///
/// `direction` must be normalized. A direction parallel to +Z falls back to
/// +X as the right axis.
pub fn rotation_from_direction(direction: Vec3) -> Mat3 {
    let mut right = direction.cross(Vec3::Z);
    if right.length_squared() < 1e-12 {
        right = Vec3::X;
    } else {
        right = right.normalize();
    }
    let up = right.cross(direction);
    Mat3::from_cols(right, direction, up)
}

/// Builds a matrix placed at `position` and aimed at `target`.
///
/// When the two coincide the direction is undefined, so the rotation stays
/// identity instead of producing NaNs.
pub fn look_at_matrix(position: Vec3, target: Vec3) -> Affine3A {
    if target == position {
        return Affine3A::from_translation(position);
    }
    let direction = (target - position).normalize();
    Affine3A::from_mat3_translation(rotation_from_direction(direction), position)
}

/// Component-wise comparison with an absolute tolerance. A tolerance of zero
/// means exact equality.
pub fn vectors_equal(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    if epsilon == 0.0 {
        return a == b;
    }
    a.abs_diff_eq(b, epsilon)
}

/// Exact component-wise quaternion equality.
pub fn quats_equal(a: Quat, b: Quat) -> bool {
    a.x == b.x && a.y == b.y && a.z == b.z && a.w == b.w
}

/// Checks that every component is finite and within `max_magnitude`.
pub fn is_valid_position(position: Vec3, max_magnitude: f32) -> bool {
    position.is_finite() && position.abs().max_element() <= max_magnitude
}

/// Largest deviation from unit length a rotation may have before it is
/// treated as invalid instead of being renormalized.
pub const ROTATION_LENGTH_TOLERANCE: f32 = 0.01;

/// Checks that the quaternion is finite and close enough to unit length to
/// be a rotation.
pub fn is_valid_rotation(rotation: Quat) -> bool {
    rotation.is_finite() && (rotation.length() - 1.0).abs() <= ROTATION_LENGTH_TOLERANCE
}

/// Euler angles in degrees (XYZ order) of the orthonormalized rotation part.
pub fn euler_degrees(tm: &Affine3A) -> Vec3 {
    let (_, rotation, _) = tm.to_scale_rotation_translation();
    let (x, y, z) = rotation.normalize().to_euler(EulerRot::XYZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// How far an object's scale is from the unit scale.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScaleWarningLevel {
    None,
    Rescaled,
    RescaledNonUniform,
}

/// How far an object's rotation is from identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RotationWarningLevel {
    None,
    /// Rotated by multiples of a right angle only
    Rotated,
    RotatedNonRectangular,
}

const SCALE_WARNING_THRESHOLD: f32 = 0.001;
const ROTATION_WARNING_THRESHOLD: f32 = 0.01;

pub fn scale_warning_level(scale: Vec3) -> ScaleWarningLevel {
    if (scale - Vec3::ONE).abs().max_element() <= SCALE_WARNING_THRESHOLD {
        return ScaleWarningLevel::None;
    }
    if (scale.x - scale.y).abs() < SCALE_WARNING_THRESHOLD
        && (scale.y - scale.z).abs() < SCALE_WARNING_THRESHOLD
    {
        ScaleWarningLevel::Rescaled
    } else {
        ScaleWarningLevel::RescaledNonUniform
    }
}

pub fn rotation_warning_level(rotation: Quat) -> RotationWarningLevel {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    let angles = Vec3::new(x, y, z);
    if angles.abs().max_element() <= ROTATION_WARNING_THRESHOLD {
        return RotationWarningLevel::None;
    }

    let quarter = std::f32::consts::FRAC_PI_2;
    let is_right_angle = |angle: f32| {
        let rem = (angle % quarter).abs();
        rem < ROTATION_WARNING_THRESHOLD || rem > quarter - ROTATION_WARNING_THRESHOLD
    };

    if is_right_angle(angles.x) && is_right_angle(angles.y) && is_right_angle(angles.z) {
        RotationWarningLevel::Rotated
    } else {
        RotationWarningLevel::RotatedNonRectangular
    }
}
