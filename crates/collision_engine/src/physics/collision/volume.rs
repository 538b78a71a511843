//! Convex bounding volumes
//!
//! Volumes are stored in model space and placed in the world by the owning
//! entity's transform matrix at query time. Dispatch is a plain `match` over
//! the closed set of volume kinds.

use std::sync::Arc;

use super::primitives::BoundingSphere;
use crate::foundation::math::{linear_part, max_axis_scale, normalize_or, transform_point, Mat4, Vec3};
use crate::physics::error::ColliderError;

/// Convex collision volume in model space
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingVolume {
    /// Sphere around `center`
    Sphere {
        /// Local center
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Box aligned with the local axes
    Box {
        /// Local center
        center: Vec3,
        /// Half-size along each local axis
        extents: Vec3,
        /// Half-diagonal
        max_extent: f32,
    },
    /// Segment swept by a sphere
    Capsule {
        /// First segment endpoint
        point_a: Vec3,
        /// Second segment endpoint
        point_b: Vec3,
        /// Radius around the segment
        radius: f32,
        /// Segment length plus radius
        max_extent: f32,
    },
    /// Convex hull of a shared vertex list
    ConvexHull {
        /// Hull vertices, shared with the mesh they came from
        vertices: Arc<[Vec3]>,
        /// Center of the vertices' bounding box
        center: Vec3,
        /// Half-size of the vertices' bounding box
        extents: Vec3,
        /// Distance from `center` to the farthest vertex
        max_extent: f32,
    },
}

impl BoundingVolume {
    /// Sphere volume
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    /// Box volume from half-extents
    pub fn cuboid(center: Vec3, extents: Vec3) -> Self {
        Self::Box {
            center,
            extents,
            max_extent: extents.magnitude(),
        }
    }

    /// Capsule volume between two points
    pub fn capsule(point_a: Vec3, point_b: Vec3, radius: f32) -> Self {
        Self::Capsule {
            point_a,
            point_b,
            radius,
            max_extent: (point_a - point_b).magnitude() + radius,
        }
    }

    /// Convex hull volume
    ///
    /// The vertices are used as given; they are expected to be the hull of the
    /// shape already.
    pub fn convex_hull(vertices: impl Into<Arc<[Vec3]>>) -> Result<Self, ColliderError> {
        let vertices: Arc<[Vec3]> = vertices.into();
        let first = *vertices.first().ok_or(ColliderError::EmptyHull)?;

        let (min, max) = vertices
            .iter()
            .fold((first, first), |(min, max), v| (min.inf(v), max.sup(v)));
        let center = (min + max) * 0.5;
        let extents = (max - min) * 0.5;
        let max_extent = vertices
            .iter()
            .map(|v| (v - center).magnitude())
            .fold(0.0, f32::max);

        Ok(Self::ConvexHull {
            vertices,
            center,
            extents,
            max_extent,
        })
    }

    /// Center of the volume in model space
    pub fn local_center(&self) -> Vec3 {
        match self {
            Self::Sphere { center, .. } | Self::Box { center, .. } | Self::ConvexHull { center, .. } => {
                *center
            }
            Self::Capsule {
                point_a, point_b, ..
            } => (point_a + point_b) * 0.5,
        }
    }

    /// Radius of a sphere around [`BoundingVolume::local_center`] that contains the volume
    pub fn max_extent(&self) -> f32 {
        match self {
            Self::Sphere { radius, .. } => *radius,
            Self::Box { max_extent, .. }
            | Self::Capsule { max_extent, .. }
            | Self::ConvexHull { max_extent, .. } => *max_extent,
        }
    }

    /// Reject negative or non-finite dimensions
    pub fn validate(&self) -> Result<(), ColliderError> {
        let check = |name: &'static str, value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ColliderError::InvalidDimension { name, value })
            }
        };
        let check_point = |name: &'static str, point: &Vec3| {
            match point.iter().find(|c| !c.is_finite()) {
                Some(value) => Err(ColliderError::InvalidDimension { name, value: *value }),
                None => Ok(()),
            }
        };

        match self {
            Self::Sphere { center, radius } => {
                check_point("sphere center", center)?;
                check("sphere radius", *radius)
            }
            Self::Box {
                center, extents, ..
            } => {
                check_point("box center", center)?;
                extents.iter().try_for_each(|e| check("box extent", *e))
            }
            Self::Capsule {
                point_a,
                point_b,
                radius,
                ..
            } => {
                check_point("capsule point", point_a)?;
                check_point("capsule point", point_b)?;
                check("capsule radius", *radius)
            }
            Self::ConvexHull { vertices, .. } => {
                if vertices.is_empty() {
                    return Err(ColliderError::EmptyHull);
                }
                vertices.iter().try_for_each(|v| check_point("hull vertex", v))
            }
        }
    }
}

/// Farthest point of the volume along `direction`, in model space
pub fn support(volume: &BoundingVolume, direction: &Vec3) -> Vec3 {
    match volume {
        BoundingVolume::Sphere { center, radius } => {
            center + normalize_or(direction, Vec3::x()) * *radius
        }
        BoundingVolume::Box {
            center, extents, ..
        } => {
            let corner = Vec3::new(
                if direction.x >= 0.0 { extents.x } else { -extents.x },
                if direction.y >= 0.0 { extents.y } else { -extents.y },
                if direction.z >= 0.0 { extents.z } else { -extents.z },
            );
            center + corner
        }
        BoundingVolume::Capsule {
            point_a,
            point_b,
            radius,
            ..
        } => {
            let unit = normalize_or(direction, Vec3::x());
            let endpoint = if point_a.dot(&unit) >= point_b.dot(&unit) {
                point_a
            } else {
                point_b
            };
            endpoint + unit * *radius
        }
        BoundingVolume::ConvexHull {
            vertices, center, ..
        } => vertices
            .iter()
            .copied()
            .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
            .unwrap_or(*center),
    }
}

/// Farthest point of the volume along a world `direction` once placed by `matrix`
///
/// For `M = [L | t]` this is `L · support(Lᵀ d) + t`, which holds for any
/// affine placement.
pub fn world_support(volume: &BoundingVolume, matrix: &Mat4, direction: &Vec3) -> Vec3 {
    let local_direction = linear_part(matrix).transpose() * direction;
    transform_point(matrix, &support(volume, &local_direction))
}

/// Conservative world-space bounding sphere of a placed volume
///
/// The radius is scaled by the largest basis vector of the matrix, so
/// non-uniform scale over-estimates rather than clips.
pub fn sphere_estimate(volume: &BoundingVolume, matrix: &Mat4) -> BoundingSphere {
    BoundingSphere::new(
        transform_point(matrix, &volume.local_center()),
        volume.max_extent() * max_axis_scale(matrix),
    )
}
