//! Primitive collision shapes and intersection algorithms
//!
//! Rays, bounding spheres and triangles shared by the broad phase, the static
//! geometry and the narrow phase.

use crate::ecs::Entity;
use crate::foundation::math::{normalize_or, transform_point, Mat4, Vec3};
use crate::physics::error::ColliderError;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// A zero direction falls back to `-Z`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: normalize_or(&direction, -Vec3::z()),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray intersection test
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// The entity that was hit
    pub entity: Entity,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

/// A bounding sphere for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if this sphere intersects with another
    ///
    /// Spheres that only touch do not intersect.
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let distance_squared = (self.center - other.center).magnitude_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared < radius_sum * radius_sum
    }

    /// Smallest coordinate covered along `axis`
    pub fn min_extent(&self, axis: usize) -> f32 {
        self.center[axis] - self.radius
    }

    /// Largest coordinate covered along `axis`
    pub fn max_extent(&self, axis: usize) -> f32 {
        self.center[axis] + self.radius
    }

    /// Test ray intersection with this sphere
    /// Returns (distance, hit_point, normal) if hit, None otherwise
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        // Solve |origin + t*direction - center|^2 = radius^2
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);

        // Closest non-negative intersection; an origin inside the sphere hits the far side
        let t = if t1 >= 0.0 {
            t1
        } else if t2 >= 0.0 {
            t2
        } else {
            return None;
        };

        let hit_point = ray.point_at(t);
        let normal = normalize_or(&(hit_point - self.center), -ray.direction);

        Some((t, hit_point, normal))
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Build triangles from an indexed vertex list
    ///
    /// Trailing indices that do not form a whole triangle are ignored.
    pub fn from_indexed(vertices: &[Vec3], indices: &[u32]) -> Result<Vec<Self>, ColliderError> {
        let vertex = |index: u32| {
            vertices
                .get(index as usize)
                .copied()
                .ok_or(ColliderError::IndexOutOfRange {
                    index,
                    vertex_count: vertices.len(),
                })
        };

        indices
            .chunks_exact(3)
            .map(|chunk| Ok(Self::new(vertex(chunk[0])?, vertex(chunk[1])?, vertex(chunk[2])?)))
            .collect()
    }

    /// Vertices as an array
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Apply an affine matrix to every vertex
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(
            transform_point(matrix, &self.v0),
            transform_point(matrix, &self.v1),
            transform_point(matrix, &self.v2),
        )
    }

    /// Sphere around the centroid enclosing all three vertices
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let center = self.centroid();
        let radius = self
            .vertices()
            .iter()
            .map(|vertex| (vertex - center).magnitude())
            .fold(0.0, f32::max);
        BoundingSphere::new(center, radius)
    }

    /// Whether any part of the triangle lies strictly inside the sphere
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let closest = self.closest_point(sphere.center);
        (closest - sphere.center).magnitude_squared() < sphere.radius * sphere.radius
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.v0;
        }

        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.v1;
        }

        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.v2;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.v0 + edge1 * v;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.v0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.v1 + (self.v2 - self.v1) * w;
        }

        // Inside the face
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        self.v0 + edge1 * v + edge2 * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn sphere_test_matches_squared_distance() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let a = BoundingSphere::new(
                Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)),
                rng.gen_range(0.0..3.0),
            );
            let b = BoundingSphere::new(
                Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)),
                rng.gen_range(0.0..3.0),
            );

            let expected = (a.center - b.center).magnitude_squared()
                < (a.radius + b.radius) * (a.radius + b.radius);
            assert_eq!(a.intersects(&b), expected);
            assert_eq!(b.intersects(&a), expected);
        }
    }

    #[test]
    fn distant_unit_spheres_do_not_intersect() {
        let a = BoundingSphere::new(Vec3::zeros(), 1.0);
        let b = BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0);

        assert!(!a.intersects(&b));
    }

    #[test]
    fn touching_spheres_do_not_intersect() {
        let a = BoundingSphere::new(Vec3::zeros(), 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);

        assert!(!a.intersects(&b));
    }

    #[test]
    fn ray_hits_front_of_sphere() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -2.0));

        let (t, point, normal) = sphere.intersect_ray(&ray).unwrap();

        assert_relative_eq!(t, 4.0, epsilon = 1.0e-5);
        assert_relative_eq!(point, Vec3::new(0.0, 0.0, -4.0), epsilon = 1.0e-5);
        assert_relative_eq!(normal, Vec3::z(), epsilon = 1.0e-5);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::z());

        assert!(sphere.intersect_ray(&ray).is_none());
    }

    #[test]
    fn closest_point_regions() {
        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());

        assert_eq!(triangle.closest_point(Vec3::new(-1.0, 0.0, -1.0)), Vec3::zeros());
        assert_relative_eq!(
            triangle.closest_point(Vec3::new(0.25, 3.0, 0.25)),
            Vec3::new(0.25, 0.0, 0.25),
            epsilon = 1.0e-6
        );
        assert_relative_eq!(
            triangle.closest_point(Vec3::new(0.5, 0.0, -2.0)),
            Vec3::new(0.5, 0.0, 0.0),
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn indexed_triangles_reject_bad_indices() {
        let vertices = [Vec3::zeros(), Vec3::x(), Vec3::z()];

        assert_eq!(Triangle::from_indexed(&vertices, &[0, 1, 2, 0]).unwrap().len(), 1);
        assert!(matches!(
            Triangle::from_indexed(&vertices, &[0, 1, 5]),
            Err(ColliderError::IndexOutOfRange { index: 5, .. })
        ));
    }
}
