//! Support mappings for the narrow phase
//!
//! GJK and EPA only ever ask a shape for its farthest point along a world
//! direction. Volumes placed by a matrix, volumes already in world space and
//! static triangles all answer that question.

use super::simplex::SupportPoint;
use crate::foundation::math::{inverse_transform_point, Mat4, Vec3};
use crate::physics::collision::{support, world_support, BoundingVolume, Triangle};

/// A convex shape queried through its support function
pub trait SupportMap {
    /// Farthest world-space point along `direction`
    fn support(&self, direction: &Vec3) -> Vec3;

    /// Convert a world-space point into the shape's local space
    fn to_local(&self, world: &Vec3) -> Vec3 {
        *world
    }
}

/// A model-space volume placed in the world by a matrix
#[derive(Debug, Clone, Copy)]
pub struct Transformed<'a> {
    /// Model-space volume
    pub volume: &'a BoundingVolume,
    /// Model-to-world matrix
    pub matrix: Mat4,
}

impl<'a> Transformed<'a> {
    /// Place `volume` with `matrix`
    pub fn new(volume: &'a BoundingVolume, matrix: Mat4) -> Self {
        Self { volume, matrix }
    }
}

impl SupportMap for Transformed<'_> {
    fn support(&self, direction: &Vec3) -> Vec3 {
        world_support(self.volume, &self.matrix, direction)
    }

    fn to_local(&self, world: &Vec3) -> Vec3 {
        inverse_transform_point(&self.matrix, world).unwrap_or(*world)
    }
}

/// Volumes that are already expressed in world space
impl SupportMap for BoundingVolume {
    fn support(&self, direction: &Vec3) -> Vec3 {
        support(self, direction)
    }
}

/// World-space triangle
impl SupportMap for Triangle {
    fn support(&self, direction: &Vec3) -> Vec3 {
        let [v0, v1, v2] = self.vertices();
        let (d0, d1, d2) = (v0.dot(direction), v1.dot(direction), v2.dot(direction));
        if d0 >= d1 && d0 >= d2 {
            v0
        } else if d1 >= d2 {
            v1
        } else {
            v2
        }
    }
}

impl<T: SupportMap + ?Sized> SupportMap for &T {
    fn support(&self, direction: &Vec3) -> Vec3 {
        (**self).support(direction)
    }

    fn to_local(&self, world: &Vec3) -> Vec3 {
        (**self).to_local(world)
    }
}

/// Support point of the Minkowski difference `A - B` along `direction`
pub fn minkowski_support<A, B>(a: &A, b: &B, direction: &Vec3) -> SupportPoint
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    SupportPoint::new(a.support(direction), b.support(&-direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;

    #[test]
    fn transformed_support_and_local_round_trip() {
        let volume = BoundingVolume::sphere(Vec3::zeros(), 1.0);
        let placed = Transformed::new(&volume, Transform::from_position(Vec3::new(3.0, 0.0, 0.0)).to_matrix());

        let point = placed.support(&Vec3::x());

        assert_relative_eq!(point, Vec3::new(4.0, 0.0, 0.0), epsilon = 1.0e-6);
        assert_relative_eq!(placed.to_local(&point), Vec3::x(), epsilon = 1.0e-6);
    }

    #[test]
    fn triangle_support_picks_vertex() {
        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::y());

        assert_eq!(triangle.support(&Vec3::new(1.0, 0.2, 0.0)), Vec3::x());
        assert_eq!(triangle.support(&Vec3::new(-1.0, -1.0, 0.0)), Vec3::zeros());
    }
}
