//! Ray picking primitives.
//!
//! - [`Ray`] - origin + unit direction, slab test, cursor unprojection
//! - [`RayHit`] - nearest-hit result of a BVH query
//! - [`ray_triangle`] - Moller-Trumbore triangle test

mod intersect;
mod ray;

pub use intersect::ray_triangle;
pub use ray::Ray;

use crate::util::Vec3;

/// Nearest intersection of a ray with the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray.
    pub t: f32,
    /// World-space hit point (`origin + direction * t`).
    pub point: Vec3,
    /// Index of the triangle that was hit.
    pub triangle: u32,
}
