//! GJK simplex

use crate::foundation::math::Vec3;

/// A point of the Minkowski difference `A - B` with the points that produced it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupportPoint {
    /// `on_a - on_b`
    pub point: Vec3,
    /// Support point on A in world space
    pub on_a: Vec3,
    /// Support point on B in world space
    pub on_b: Vec3,
}

impl SupportPoint {
    /// Combine the support points of both shapes
    pub fn new(on_a: Vec3, on_b: Vec3) -> Self {
        Self {
            point: on_a - on_b,
            on_a,
            on_b,
        }
    }
}

/// Point, line, triangle or tetrahedron of support points
///
/// Index 0 is always the most recently added point.
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    points: [SupportPoint; 4],
    size: usize,
}

impl Simplex {
    /// Create an empty simplex
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point at the front, dropping the oldest one when full
    pub fn push_front(&mut self, point: SupportPoint) {
        self.points.copy_within(0..3, 1);
        self.points[0] = point;
        self.size = (self.size + 1).min(4);
    }

    /// Replace the contents with `points` (at most four)
    pub fn set(&mut self, points: &[SupportPoint]) {
        self.size = points.len().min(4);
        self.points[..self.size].copy_from_slice(&points[..self.size]);
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the simplex has no points
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Points, newest first
    pub fn points(&self) -> &[SupportPoint] {
        &self.points[..self.size]
    }

    /// Point by index
    pub fn get(&self, index: usize) -> Option<&SupportPoint> {
        self.points().get(index)
    }

    /// Remove every point
    pub fn clear(&mut self) {
        self.size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32) -> SupportPoint {
        SupportPoint::new(Vec3::new(x, 0.0, 0.0), Vec3::zeros())
    }

    #[test]
    fn push_front_keeps_newest_first_and_evicts_oldest() {
        let mut simplex = Simplex::new();
        for x in 1..=5 {
            simplex.push_front(point(x as f32));
        }

        let xs: Vec<f32> = simplex.points().iter().map(|p| p.point.x).collect();
        assert_eq!(xs, vec![5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn set_collapses() {
        let mut simplex = Simplex::new();
        simplex.push_front(point(1.0));
        simplex.push_front(point(2.0));
        simplex.push_front(point(3.0));

        let (a, c) = (simplex.points()[0], simplex.points()[2]);
        simplex.set(&[a, c]);

        assert_eq!(simplex.len(), 2);
        assert_eq!(simplex.get(1).map(|p| p.point.x), Some(1.0));
        assert!(simplex.get(2).is_none());
    }
}
