//! Expanding Polytope Algorithm
//!
//! Grows the enclosing GJK tetrahedron toward the boundary of `A - B` until
//! the face closest to the origin stops moving. That face gives the contact
//! normal and depth; barycentric coordinates of the origin's projection on it
//! give the witness points on both shapes.

use super::gjk::GjkState;
use super::simplex::SupportPoint;
use super::support::{minkowski_support, SupportMap};
use crate::foundation::math::Vec3;
use crate::physics::error::EpaError;

/// Expansion rounds before the best face so far is accepted
pub const EPA_MAX_ITERATIONS: u32 = 32;

/// Convergence distance between a face and the support point beyond it
pub const EPA_TOLERANCE: f32 = 0.001;

const EPA_MAX_FACES: usize = 128;
const DEGENERATE_AREA: f32 = 1.0e-10;

/// Penetration found by EPA
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from A toward B
    pub normal: Vec3,
    /// Overlap depth along the normal
    pub depth: f32,
    /// Deepest point of A inside B, world space
    pub world_point_a: Vec3,
    /// Deepest point of B inside A, world space
    pub world_point_b: Vec3,
    /// Expansion rounds used
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

/// Penetration of two shapes GJK found overlapping
pub fn epa<A, B>(a: &A, b: &B, state: &GjkState) -> Result<Penetration, EpaError>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    if state.simplex.len() < 4 {
        return Err(EpaError::IncompleteSimplex(state.simplex.len()));
    }

    let mut vertices: Vec<SupportPoint> = state.simplex.points().to_vec();
    let interior = vertices.iter().map(|v| v.point).sum::<Vec3>() / 4.0;

    let mut faces: Vec<Face> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .into_iter()
        .filter_map(|indices| make_face(&vertices, indices, &interior))
        .collect();

    let mut iterations = 0;
    let closest = loop {
        let closest = closest_face(&faces).ok_or(EpaError::NoValidFace)?;

        if iterations >= EPA_MAX_ITERATIONS || faces.len() > EPA_MAX_FACES {
            log::debug!("EPA stopped after {iterations} iterations without converging");
            break closest;
        }
        iterations += 1;

        let support = minkowski_support(a, b, &closest.normal);
        if support.point.dot(&closest.normal) - closest.distance < EPA_TOLERANCE {
            break closest;
        }

        // Drop every face the new point can see and stitch the hole's rim to it
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        faces.retain(|face| {
            let visible = face
                .normal
                .dot(&(support.point - vertices[face.indices[0]].point))
                > 0.0;
            if visible {
                let [i, j, k] = face.indices;
                add_unique_edge(&mut horizon, i, j);
                add_unique_edge(&mut horizon, j, k);
                add_unique_edge(&mut horizon, k, i);
            }
            !visible
        });

        let new_index = vertices.len();
        vertices.push(support);
        faces.extend(
            horizon
                .into_iter()
                .filter_map(|(i, j)| make_face(&vertices, [i, j, new_index], &interior)),
        );
    };

    let [i, j, k] = closest.indices;
    let (u, v, w) = barycentric(
        &(closest.normal * closest.distance),
        &vertices[i].point,
        &vertices[j].point,
        &vertices[k].point,
    );
    let world_point_a = vertices[i].on_a * u + vertices[j].on_a * v + vertices[k].on_a * w;
    let world_point_b = vertices[i].on_b * u + vertices[j].on_b * v + vertices[k].on_b * w;
    let depth = closest.distance + EPA_TOLERANCE;

    let finite = closest.normal.iter().all(|c| c.is_finite())
        && depth.is_finite()
        && world_point_a.iter().all(|c| c.is_finite())
        && world_point_b.iter().all(|c| c.is_finite());
    if !finite {
        return Err(EpaError::NonFinite);
    }

    Ok(Penetration {
        normal: closest.normal,
        depth,
        world_point_a,
        world_point_b,
        iterations,
    })
}

/// Face through three vertices with its normal pointing away from `interior`
fn make_face(vertices: &[SupportPoint], indices: [usize; 3], interior: &Vec3) -> Option<Face> {
    let a = vertices[indices[0]].point;
    let b = vertices[indices[1]].point;
    let c = vertices[indices[2]].point;

    let normal = (b - a).cross(&(c - a));
    let length_squared = normal.magnitude_squared();
    if length_squared < DEGENERATE_AREA {
        return None;
    }

    let mut normal = normal / length_squared.sqrt();
    let mut indices = indices;
    if normal.dot(&(a - interior)) < 0.0 {
        normal = -normal;
        indices.swap(1, 2);
    }

    Some(Face {
        indices,
        normal,
        distance: normal.dot(&a),
    })
}

fn closest_face(faces: &[Face]) -> Option<Face> {
    faces
        .iter()
        .copied()
        .min_by(|x, y| x.distance.total_cmp(&y.distance))
}

/// Add an edge, or remove it if its twin is already there
fn add_unique_edge(edges: &mut Vec<(usize, usize)>, from: usize, to: usize) {
    match edges.iter().position(|&(a, b)| a == to && b == from) {
        Some(twin) => {
            edges.swap_remove(twin);
        }
        None => edges.push((from, to)),
    }
}

/// Barycentric coordinates of `p` in triangle `abc`
///
/// Degenerate triangles fall back to the centroid.
fn barycentric(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let denominator = d00 * d11 - d01 * d01;
    if denominator.abs() < f32::EPSILON {
        return (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);
    }

    let v = (d11 * d20 - d01 * d21) / denominator;
    let w = (d00 * d21 - d01 * d20) / denominator;
    (1.0 - v - w, v, w)
}
