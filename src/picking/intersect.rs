//! Closed-form ray/triangle intersection.

use super::Ray;
use crate::util::Vec3;

/// Sine of the ray/plane angle below which the ray counts as parallel.
/// Applied to the determinant scaled by both edge lengths.
const PARALLEL_EPSILON: f32 = 1e-7;

/// Moller-Trumbore ray/triangle test.
///
/// Returns the distance along the ray to the hit, if the hit lies at a
/// non-negative distance. Edges and vertices count as inside, so a ray
/// through a shared grid vertex hits both neighbouring triangles.
#[inline]
pub fn ray_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if !a.is_finite() || a.abs() <= PARALLEL_EPSILON * edge1.length() * edge2.length() {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t >= 0.0).then_some(t)
}
