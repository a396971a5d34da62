//! Maps the unit cylinder template onto an arbitrary 3D segment.
//!
//! The orientation is built as a look-at basis whose forward axis is the
//! segment direction, then composed with a fixed quarter turn so the
//! template's long axis (+Y) lands on that forward axis (+Z in the look-at
//! frame).

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use rand::Rng;

use crate::options::MAX_JITTER;

/// Long axis of the template mesh.
pub const TEMPLATE_AXIS: Vec3 = Vec3::Y;

/// Segments shorter than this are degenerate.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Up vector of the look-at basis.
const LOOK_UP: Vec3 = Vec3::Y;
/// Substitute up vector when the segment runs (anti)parallel to `LOOK_UP`.
const FALLBACK_UP: Vec3 = Vec3::X;
/// |cos| above which the direction counts as parallel to `LOOK_UP`.
const PARALLEL_THRESHOLD: f32 = 0.999;

/// Endpoints too close together to orient a cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateSegment {
    /// Measured segment length (may be NaN for non-finite input).
    pub length: f32,
}

/// Translation, rotation and non-uniform scale placing one template copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTransform {
    /// Segment midpoint, possibly jittered.
    pub translation: Vec3,
    /// Unit quaternion taking [`TEMPLATE_AXIS`] onto the segment direction.
    pub rotation: Quat,
    /// Segment length (template axial scale).
    pub height: f32,
    /// Radial scale.
    pub width: f32,
}

impl SegmentTransform {
    /// Solve the transform for the segment `a -> b`.
    ///
    /// # Errors
    ///
    /// Returns [`DegenerateSegment`] when the endpoints coincide (or are
    /// not finite); the caller hides the instance instead of drawing it.
    pub fn solve(
        a: Vec3,
        b: Vec3,
        width: f32,
    ) -> Result<Self, DegenerateSegment> {
        let direction = b - a;
        let height = direction.length();
        if !(height.is_finite() && height >= DEGENERATE_EPSILON) {
            return Err(DegenerateSegment { length: height });
        }
        let forward = direction / height;
        let corrective = Quat::from_rotation_x(FRAC_PI_2);
        let rotation = (look_rotation(forward) * corrective).normalize();

        Ok(Self {
            translation: (a + b) * 0.5,
            rotation,
            height,
            width,
        })
    }

    /// Perturb the translation by at most `amplitude` per axis.
    ///
    /// Only moves the midpoint; length and orientation are untouched.
    pub fn jitter(&mut self, rng: &mut impl Rng, amplitude: f32) {
        let amplitude = amplitude.min(MAX_JITTER);
        if amplitude <= 0.0 || amplitude.is_nan() {
            return;
        }
        let offset = Vec3::new(
            rng.random_range(-amplitude..=amplitude),
            rng.random_range(-amplitude..=amplitude),
            rng.random_range(-amplitude..=amplitude),
        );
        self.translation += offset;
    }

    /// Non-uniform template scale: radial on X/Z, axial on Y.
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.width)
    }

    /// Orientation in the form uploaded per instance.
    ///
    /// The vertex stage rotates with
    /// `v + 2 * cross(cross(v, q.xyz) + q.w * v, q.xyz)`, which applies the
    /// inverse of `q`, so the conjugate is uploaded.
    #[must_use]
    pub fn packed_orientation(&self) -> [f32; 4] {
        self.rotation.conjugate().to_array()
    }

    /// Equivalent model matrix (for CPU-side consumers).
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale(),
            self.rotation,
            self.translation,
        )
    }

    /// Place a template-space point exactly as the vertex shader does.
    #[must_use]
    pub fn apply(&self, template_point: Vec3) -> Vec3 {
        rotate_packed(
            Vec4::from_array(self.packed_orientation()),
            template_point * self.scale(),
        ) + self.translation
    }
}

/// Host mirror of the shader's per-instance rotation.
#[must_use]
pub fn rotate_packed(q: Vec4, v: Vec3) -> Vec3 {
    let qv = q.truncate();
    v + 2.0 * (v.cross(qv) + q.w * v).cross(qv)
}

/// Rotation whose local +Z is `forward`.
fn look_rotation(forward: Vec3) -> Quat {
    let up = if forward.dot(LOOK_UP).abs() > PARALLEL_THRESHOLD {
        FALLBACK_UP
    } else {
        LOOK_UP
    };
    let right = up.cross(forward).normalize();
    let true_up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, true_up, forward))
}
