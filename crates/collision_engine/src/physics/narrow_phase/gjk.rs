//! Gilbert-Johnson-Keerthi intersection test
//!
//! Walks a simplex of Minkowski-difference support points toward the origin.
//! The origin is inside `A - B` exactly when the shapes overlap.

use super::simplex::{Simplex, SupportPoint};
use super::support::{minkowski_support, SupportMap};
use crate::foundation::math::{any_perpendicular, Vec3, NORMALIZE_EPSILON};

/// Iterations before a single search gives up
pub const GJK_MAX_ITERATIONS: u32 = 10;

/// Simplex and search state left behind by [`gjk`]
///
/// After a positive result the simplex is a tetrahedron enclosing the origin,
/// which is what EPA starts from.
#[derive(Debug, Clone, Default)]
pub struct GjkState {
    /// Final simplex
    pub simplex: Simplex,
    /// Last search direction
    pub direction: Vec3,
    /// Iterations used
    pub iterations: u32,
    /// The search in the given argument order hit [`GJK_MAX_ITERATIONS`]
    pub capped: bool,
}

impl GjkState {
    /// Fresh state
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    Enclosed,
    Separated,
    Capped,
}

/// Whether the two shapes overlap
///
/// A search that hits [`GJK_MAX_ITERATIONS`] is retried on `B - A`, and the
/// shapes overlap if that search encloses the origin. Both argument orders
/// therefore agree unless both searches hit the cap, which counts as no
/// intersection. On success the simplex is always expressed in `A - B`.
pub fn gjk<A, B>(a: &A, b: &B, state: &mut GjkState) -> bool
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    match search(a, b, state) {
        Search::Enclosed => {
            state.capped = false;
            true
        }
        Search::Separated => {
            state.capped = false;
            false
        }
        Search::Capped => {
            state.capped = true;
            let mut reverse = GjkState::new();
            let enclosed = search(b, a, &mut reverse) == Search::Enclosed;
            state.iterations += reverse.iterations;
            if enclosed {
                mirror_into(&reverse, state);
            } else {
                log::trace!("GJK hit the iteration cap in both orders");
            }
            enclosed
        }
    }
}

/// Express a `B - A` result as `A - B`
fn mirror_into(reverse: &GjkState, state: &mut GjkState) {
    let mirrored: Vec<SupportPoint> = reverse
        .simplex
        .points()
        .iter()
        .map(|p| SupportPoint::new(p.on_b, p.on_a))
        .collect();
    state.simplex.set(&mirrored);
    state.direction = -reverse.direction;
}

fn search<A, B>(a: &A, b: &B, state: &mut GjkState) -> Search
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    state.simplex.clear();
    state.iterations = 0;

    let first = minkowski_support(a, b, &Vec3::x());
    state.simplex.push_front(first);
    state.direction = -first.point;

    while state.iterations < GJK_MAX_ITERATIONS {
        state.iterations += 1;

        // The first support point is the origin itself: the shapes only touch
        if state.direction.magnitude_squared() < NORMALIZE_EPSILON {
            return Search::Separated;
        }

        let support = minkowski_support(a, b, &state.direction);
        if support.point.dot(&state.direction) < 0.0 {
            return Search::Separated;
        }

        state.simplex.push_front(support);
        if next_simplex(&mut state.simplex, &mut state.direction) {
            return Search::Enclosed;
        }
    }

    Search::Capped
}

/// Reduce the simplex to the feature nearest the origin
///
/// Returns `true` once the simplex encloses the origin.
fn next_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.len() {
        2 => line(simplex, direction),
        3 => triangle(simplex, direction),
        4 => tetrahedron(simplex, direction),
        _ => false,
    }
}

fn same_direction(a: &Vec3, b: &Vec3) -> bool {
    a.dot(b) > 0.0
}

/// `(a × b) × c`, perpendicular to `a` and leaning toward `c` when `c = b`
fn triple_product(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

fn line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let points = simplex.points();
    let (a, b) = (points[0], points[1]);
    let ab = b.point - a.point;
    let ao = -a.point;

    if same_direction(&ab, &ao) {
        *direction = triple_product(&ab, &ao, &ab);
        // Origin on the line itself
        if direction.magnitude_squared() < NORMALIZE_EPSILON {
            *direction = any_perpendicular(&ab);
        }
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }

    false
}

fn triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let points = simplex.points();
    let (a, b, c) = (points[0], points[1], points[2]);
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let abc = ab.cross(&ac);

    if same_direction(&abc.cross(&ac), &ao) {
        if same_direction(&ac, &ao) {
            simplex.set(&[a, c]);
            *direction = triple_product(&ac, &ao, &ac);
            return false;
        }
        return line_region(simplex, direction, a, b);
    }

    if same_direction(&ab.cross(&abc), &ao) {
        return line_region(simplex, direction, a, b);
    }

    if same_direction(&abc, &ao) {
        *direction = abc;
    } else {
        simplex.set(&[a, c, b]);
        *direction = -abc;
    }

    false
}

fn line_region(simplex: &mut Simplex, direction: &mut Vec3, a: SupportPoint, b: SupportPoint) -> bool {
    simplex.set(&[a, b]);
    line(simplex, direction)
}

fn tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let points = simplex.points();
    let (a, b, c, d) = (points[0], points[1], points[2], points[3]);
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    let abc = ab.cross(&ac);
    let acd = ac.cross(&ad);
    let adb = ad.cross(&ab);

    if same_direction(&abc, &ao) {
        simplex.set(&[a, b, c]);
        return triangle(simplex, direction);
    }

    if same_direction(&acd, &ao) {
        simplex.set(&[a, c, d]);
        return triangle(simplex, direction);
    }

    if same_direction(&adb, &ao) {
        simplex.set(&[a, d, b]);
        return triangle(simplex, direction);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform};
    use crate::physics::collision::BoundingVolume;
    use crate::physics::narrow_phase::support::Transformed;

    fn placed(volume: &BoundingVolume, position: Vec3, rotation: Quat) -> Transformed<'_> {
        Transformed::new(
            volume,
            Transform {
                position,
                rotation,
                ..Transform::default()
            }
            .to_matrix(),
        )
    }

    fn overlap(a: &Transformed<'_>, b: &Transformed<'_>) -> bool {
        gjk(a, b, &mut GjkState::new())
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let cube = BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
        let a = placed(&cube, Vec3::zeros(), Quat::identity());
        let b = placed(&cube, Vec3::new(0.5, 0.0, 0.0), Quat::identity());

        let mut state = GjkState::new();
        assert!(gjk(&a, &b, &mut state));
        assert_eq!(state.simplex.len(), 4);
    }

    #[test]
    fn distant_spheres_do_not_intersect() {
        let sphere = BoundingVolume::sphere(Vec3::zeros(), 1.0);
        let a = placed(&sphere, Vec3::zeros(), Quat::identity());
        let b = placed(&sphere, Vec3::new(3.0, 0.0, 0.0), Quat::identity());

        assert!(!overlap(&a, &b));
        assert!(!overlap(&b, &a));
    }

    #[test]
    fn symmetric_for_mixed_shapes() {
        let volumes = [
            BoundingVolume::sphere(Vec3::zeros(), 0.75),
            BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 1.0, 0.25)),
            BoundingVolume::capsule(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0), 0.3),
            BoundingVolume::convex_hull(vec![
                Vec3::new(0.0, 0.8, 0.0),
                Vec3::new(-0.6, -0.4, -0.5),
                Vec3::new(0.6, -0.4, -0.5),
                Vec3::new(0.0, -0.4, 0.7),
            ])
            .unwrap(),
        ];
        let rotation_a = Quat::from_euler_angles(0.3, -0.2, 0.5);
        let rotation_b = Quat::from_euler_angles(-0.4, 0.9, 0.1);

        for first in &volumes {
            for second in &volumes {
                // Deep overlap: centers 0.1 apart
                let a = placed(first, Vec3::zeros(), rotation_a);
                let b = placed(second, Vec3::new(0.1, 0.05, 0.0), rotation_b);
                assert!(overlap(&a, &b), "{first:?} vs {second:?}");
                assert!(overlap(&b, &a), "{second:?} vs {first:?}");

                // Far apart
                let b = placed(second, Vec3::new(6.0, -1.0, 2.0), rotation_b);
                assert!(!overlap(&a, &b));
                assert!(!overlap(&b, &a));
            }
        }
    }

    #[test]
    fn symmetric_for_random_near_touching_pairs() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::f32::consts::PI;

        let volumes = [
            BoundingVolume::sphere(Vec3::zeros(), 0.6),
            BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.8, 0.3)),
            BoundingVolume::capsule(Vec3::new(0.0, -0.6, 0.0), Vec3::new(0.0, 0.6, 0.0), 0.25),
            BoundingVolume::convex_hull(vec![
                Vec3::new(0.0, 0.8, 0.0),
                Vec3::new(-0.6, -0.4, -0.5),
                Vec3::new(0.6, -0.4, -0.5),
                Vec3::new(0.0, -0.4, 0.7),
            ])
            .unwrap(),
        ];
        let mut rng = StdRng::seed_from_u64(0x61a5);
        let rotation = |rng: &mut StdRng| {
            Quat::from_euler_angles(rng.gen_range(-PI..PI), rng.gen_range(-PI..PI), rng.gen_range(-PI..PI))
        };

        let mut hits = 0;
        for _ in 0..4000 {
            let first = &volumes[rng.gen_range(0..volumes.len())];
            let second = &volumes[rng.gen_range(0..volumes.len())];
            let direction = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
                .try_normalize(1.0e-3)
                .unwrap_or_else(Vec3::x);
            // Offsets straddle the surfaces so many pairs only graze
            let reach = first.max_extent() + second.max_extent();
            let offset = direction * reach * rng.gen_range(0.3..1.05);
            let a = placed(first, Vec3::zeros(), rotation(&mut rng));
            let b = placed(second, offset, rotation(&mut rng));

            let mut forward = GjkState::new();
            let mut backward = GjkState::new();
            let ab = gjk(&a, &b, &mut forward);
            let ba = gjk(&b, &a, &mut backward);
            assert_eq!(ab, ba, "{first:?} vs {second:?} at {offset:?}");
            if ab {
                hits += 1;
                assert_eq!(forward.simplex.len(), 4);
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn deep_overlap_resolves_without_reverse_search() {
        // Deep overlap: the forward search alone settles it
        let cube = BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
        let a = placed(&cube, Vec3::zeros(), Quat::identity());
        let b = placed(&cube, Vec3::new(0.2, 0.1, 0.0), Quat::identity());

        let mut state = GjkState::new();
        assert!(gjk(&a, &b, &mut state));
        assert!(!state.capped);
        assert!(state.iterations <= GJK_MAX_ITERATIONS);
    }

    #[test]
    fn mirrored_reverse_simplex_feeds_epa() {
        use crate::physics::narrow_phase::epa::epa;
        use approx::assert_relative_eq;

        let cube = BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
        let a = placed(&cube, Vec3::zeros(), Quat::identity());
        let b = placed(&cube, Vec3::new(0.5, 0.0, 0.0), Quat::identity());

        let mut reverse = GjkState::new();
        assert_eq!(search(&b, &a, &mut reverse), Search::Enclosed);
        let mut state = GjkState::new();
        mirror_into(&reverse, &mut state);

        let penetration = epa(&a, &b, &state).unwrap();
        assert_relative_eq!(penetration.depth, 0.5, epsilon = 1.0e-3);
        assert_relative_eq!(penetration.normal.x.abs(), 1.0, epsilon = 1.0e-3);
    }

    #[test]
    fn world_space_volumes_work_directly() {
        let a = BoundingVolume::sphere(Vec3::zeros(), 1.0);
        let b = BoundingVolume::cuboid(Vec3::new(1.2, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.5));

        assert!(gjk(&a, &b, &mut GjkState::new()));
    }
}
