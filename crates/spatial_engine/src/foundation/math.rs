//! Math utilities and types
//!
//! Provides the vector and matrix aliases used throughout the engine and the
//! [`Frame`] that places a collider in world space.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3,
    UnitQuaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (colors)
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Frame of reference: position, orthonormal rotation, and non-uniform scale
///
/// Frames are owned by whatever entity or rigid body they orient. Colliders
/// never own one; they are handed one whenever a world-space version of their
/// geometry is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in world space
    pub position: Vec3,

    /// Orthonormal rotation matrix
    pub rotation: Mat3,

    /// Diagonal of the scale matrix
    pub scale: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Mat3::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Frame {
    /// Create a new identity frame
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a frame with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a frame with position and a quaternion rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: *rotation.to_rotation_matrix().matrix(),
            ..Default::default()
        }
    }

    /// Replace the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = *rotation.to_rotation_matrix().matrix();
        self
    }

    /// Replace the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// The diagonal scale matrix
    pub fn scale_matrix(&self) -> Mat3 {
        Mat3::from_diagonal(&self.scale)
    }

    /// Apply rotation to a direction
    pub fn rotate(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Apply rotation∘scale to a vector (no translation)
    pub fn orient(&self, vector: &Vec3) -> Vec3 {
        self.rotation * self.scale.component_mul(vector)
    }

    /// Carry a surface normal through the frame: rotation applied to the
    /// inverse-transpose of the scale, unnormalized.
    ///
    /// Uses the cofactors of the scale diagonal, so a zero scale factor
    /// flattens the normal onto that axis instead of dividing by zero. A
    /// mirroring scale keeps the normal pointing out of the mirrored shape.
    pub fn orient_normal(&self, normal: &Vec3) -> Vec3 {
        let s = self.scale;
        let cofactors = Vec3::new(s.y * s.z, s.x * s.z, s.x * s.y);
        let sign = (s.x * s.y * s.z).signum();
        self.rotation * cofactors.component_mul(normal) * sign
    }

    /// Apply rotation∘scale and then translation to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.orient(point) + self.position
    }

    /// Largest absolute scale factor on the diagonal
    pub fn max_scale(&self) -> f32 {
        self.scale.x.abs().max(self.scale.y.abs()).max(self.scale.z.abs())
    }

    /// Rotate the frame by an incremental rotation applied in world space
    pub fn rotate_by(&mut self, delta: Quat) {
        self.rotation = delta.to_rotation_matrix().matrix() * self.rotation;
    }
}

/// Math utility functions
pub mod utils {
    use super::Vec3;

    /// Component-wise absolute value
    pub fn abs(v: &Vec3) -> Vec3 {
        v.map(f32::abs)
    }

    /// Two directions are treated as the same axis when their cross product
    /// vanishes (parallel or anti-parallel).
    pub fn same_axis(a: &Vec3, b: &Vec3) -> bool {
        a.cross(b).norm_squared() <= 1.0e-10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_frame_identity() {
        let frame = Frame::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(frame.transform_point(&p), p);
        assert_relative_eq!(frame.max_scale(), 1.0);
    }

    #[test]
    fn test_transform_point_scales_before_rotating() {
        // 90 degrees about +Z maps +X to +Y
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2);
        let frame = Frame::from_position_rotation(Vec3::new(0.0, 0.0, 5.0), rotation)
            .with_scale(Vec3::new(2.0, 1.0, 1.0));

        let p = frame.transform_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(0.0, 2.0, 5.0), epsilon = EPSILON);
    }

    #[test]
    fn test_oriented_normal_stays_perpendicular_under_stretch() {
        let frame = Frame::from_position_rotation(
            Vec3::new(1.0, 1.0, 1.0),
            Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2),
        )
        .with_scale(Vec3::new(4.0, 1.0, 2.0));

        // Tangent of the plane x + y = 1 and its normal
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);

        let world_tangent = frame.orient(&tangent);
        let world_normal = frame.orient_normal(&normal);
        assert_relative_eq!(world_tangent.dot(&world_normal), 0.0, epsilon = EPSILON);
        assert!(frame.orient(&normal).dot(&world_tangent).abs() > 1.0);

        let mirrored = Frame::identity().with_scale(Vec3::new(-2.0, 1.0, 1.0));
        assert!(mirrored.orient_normal(&Vec3::x()).x < 0.0);
    }

    #[test]
    fn test_max_scale_uses_absolute_values() {
        let frame = Frame::identity().with_scale(Vec3::new(-3.0, 2.0, 1.0));
        assert_relative_eq!(frame.max_scale(), 3.0);
    }

    #[test]
    fn test_same_axis() {
        assert!(utils::same_axis(&Vec3::x(), &-Vec3::x()));
        assert!(!utils::same_axis(&Vec3::x(), &Vec3::y()));
    }
}
