//! Ray representation, ray/box slab test and cursor unprojection.

use crate::util::{Aabb, Mat4, Vec2, Vec3};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Reciprocal of direction components for the slab test.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized and must not be zero.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!(direction.length_squared() > 0.0, "ray direction must be non-zero");
        let direction = direction.normalize();
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Build a world-space picking ray through a cursor position.
    ///
    /// `cursor` is in pixels with the origin at the top-left corner of a
    /// viewport of `viewport` pixels. The cursor is unprojected onto the near
    /// (depth 0) and far (depth 1) planes; the ray starts on the near plane.
    /// Returns `None` for an empty viewport or a singular matrix.
    pub fn from_screen(cursor: Vec2, viewport: Vec2, inv_view_proj: &Mat4) -> Option<Self> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }

        let ndc_x = 2.0 * cursor.x / viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * cursor.y / viewport.y;

        let near = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        let direction = (far - near).try_normalize()?;
        if !near.is_finite() {
            return None;
        }
        Some(Self::new(near, direction))
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` with `t_min` clamped to zero when the
    /// ray reaches the box at a non-negative distance, `None` otherwise.
    /// Boxes are closed, so a ray grazing a face or running inside a flat
    /// box still counts as a hit.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = self.origin[axis];
            let lo = aabb.min[axis];
            let hi = aabb.max[axis];

            // Parallel to this slab: either always inside it or never.
            if self.direction[axis] == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = self.inv_direction[axis];
            let (near, far) = if inv < 0.0 { (hi, lo) } else { (lo, hi) };
            t_min = t_min.max((near - o) * inv);
            t_max = t_max.min((far - o) * inv);

            if t_max < t_min {
                return None;
            }
        }

        Some((t_min, t_max))
    }
}
