//! Math utilities and types
//!
//! Provides the nalgebra aliases used throughout the collision pipeline plus
//! the handful of matrix helpers the volume and narrow-phase code needs.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Tolerance used when deciding a vector is too short to normalize
pub const NORMALIZE_EPSILON: f32 = 1.0e-12;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = translation(matrix);
        let scale = Vec3::new(
            basis_vector(matrix, 0).magnitude(),
            basis_vector(matrix, 1).magnitude(),
            basis_vector(matrix, 2).magnitude(),
        );
        let rotation = Quat::from_matrix(&rotation(matrix));

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Translation column of an affine matrix
pub fn translation(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

/// Upper-left 3x3 block (rotation and scale) of an affine matrix
pub fn linear_part(matrix: &Mat4) -> Mat3 {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Basis vector `axis` (a column of the linear part)
pub fn basis_vector(matrix: &Mat4, axis: usize) -> Vec3 {
    matrix.fixed_view::<3, 1>(0, axis).into_owned()
}

/// Largest basis-vector length of the matrix
///
/// Treats the scale as uniform, choosing the biggest axis so that bounding
/// spheres derived from it are never too small.
pub fn max_axis_scale(matrix: &Mat4) -> f32 {
    (0..3)
        .map(|axis| basis_vector(matrix, axis).magnitude())
        .fold(0.0, f32::max)
}

/// Rotation of an affine matrix with the per-axis scale divided out
pub fn rotation(matrix: &Mat4) -> Mat3 {
    let mut linear = linear_part(matrix);
    for axis in 0..3 {
        let mut column = linear.column_mut(axis);
        let length = column.magnitude();
        if length > NORMALIZE_EPSILON {
            column /= length;
        }
    }
    linear
}

/// Apply an affine matrix to a point
pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
    linear_part(matrix) * point + translation(matrix)
}

/// Apply the inverse of an affine matrix to a point
///
/// Returns `None` when the linear part is singular.
pub fn inverse_transform_point(matrix: &Mat4, point: &Vec3) -> Option<Vec3> {
    linear_part(matrix)
        .try_inverse()
        .map(|inverse| inverse * (point - translation(matrix)))
}

/// Normalize, falling back to `fallback` for near-zero vectors
pub fn normalize_or(vector: &Vec3, fallback: Vec3) -> Vec3 {
    let length_squared = vector.magnitude_squared();
    if length_squared > NORMALIZE_EPSILON {
        vector / length_squared.sqrt()
    } else {
        fallback
    }
}

/// Any unit vector perpendicular to `vector`
pub fn any_perpendicular(vector: &Vec3) -> Vec3 {
    let helper = if vector.x.abs() < 0.57 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    normalize_or(&vector.cross(&helper), Vec3::z())
}

/// Orthonormal tangent basis for a unit normal
pub fn tangent_basis(normal: &Vec3) -> (Vec3, Vec3) {
    let tangent = any_perpendicular(normal);
    let bitangent = normal.cross(&tangent);
    (tangent, bitangent)
}
