//! Transform component for the ECS system
//!
//! Pure data component; the collision pipeline reads it as a world matrix and
//! the integrator writes the position back.

use crate::ecs::Component;
use crate::foundation::math::{Mat4, Quat, Transform as MathTransform, Vec3};

/// ECS Transform component
///
/// World-space position, rotation and scale of an entity (Y-up right-handed).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// World space position
    pub position: Vec3,

    /// World space rotation quaternion
    pub rotation: Quat,

    /// World space scale factors
    pub scale: Vec3,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl TransformComponent {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to foundation math Transform for calculations
    pub fn to_math_transform(&self) -> MathTransform {
        MathTransform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Create from a transformation matrix (decompose TRS)
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let math_transform = MathTransform::from_matrix(matrix);
        Self {
            position: math_transform.position,
            rotation: math_transform.rotation,
            scale: math_transform.scale,
        }
    }

    /// Convert to transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        self.to_math_transform().to_matrix()
    }

    /// Builder pattern: Set rotation from Euler angles (radians, XYZ order)
    pub fn with_rotation_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Quat::from_euler_angles(x, y, z);
        self
    }

    /// Builder pattern: Set scale (uniform)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_places_origin_at_position() {
        let transform = TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation_euler(0.0, 0.7, 0.0)
            .with_uniform_scale(2.0);

        let matrix = transform.to_matrix();

        assert_relative_eq!(matrix.m14, 1.0);
        assert_relative_eq!(matrix.m24, 2.0);
        assert_relative_eq!(matrix.m34, 3.0);
    }

    #[test]
    fn from_matrix_recovers_scale() {
        let transform = TransformComponent::identity().with_scale(Vec3::new(1.0, 4.0, 2.0));

        let recovered = TransformComponent::from_matrix(&transform.to_matrix());

        assert_relative_eq!(recovered.scale, transform.scale, epsilon = 1.0e-5);
    }
}
