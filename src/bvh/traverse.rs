//! Nearest-hit ray traversal.

use super::node::VertexSource;
use super::Bvh;
use crate::picking::{ray_triangle, Ray, RayHit};
use crate::util::Vec3;

impl Bvh {
    /// Nearest hit of `ray` against the terrain, if any.
    ///
    /// Misses of the root box are rejected before any traversal. Children are
    /// visited nearest box first and subtrees entered beyond the current
    /// nearest hit are skipped; the result is the same as testing every leaf
    /// the ray touches.
    pub fn intersect<V>(&self, vertices: &V, ray: &Ray) -> Option<RayHit>
    where
        V: VertexSource + ?Sized,
    {
        debug_assert_eq!(
            vertices.vertex_count(),
            self.vertex_count,
            "query against a vertex buffer of a different size"
        );

        let (t_root, _) = ray.intersect_aabb(&self.pool[0].aabb())?;

        let mut closest = None;
        self.intersect_node(vertices, ray, 0, t_root, &mut closest);
        closest
    }

    /// Hit point form of [`intersect`](Self::intersect).
    pub fn intersects<V>(&self, vertices: &V, origin: Vec3, direction: Vec3) -> Option<Vec3>
    where
        V: VertexSource + ?Sized,
    {
        self.intersect(vertices, &Ray::new(origin, direction))
            .map(|hit| hit.point)
    }

    /// Visit `node_idx`, whose box the ray enters at `t_entry`.
    fn intersect_node<V>(
        &self,
        vertices: &V,
        ray: &Ray,
        node_idx: usize,
        t_entry: f32,
        closest: &mut Option<RayHit>,
    ) where
        V: VertexSource + ?Sized,
    {
        if matches!(closest, Some(hit) if t_entry > hit.t) {
            return;
        }

        let node = &self.pool[node_idx];

        if let Some((first, count)) = node.primitives() {
            for &tri_idx in &self.indices[first..first + count] {
                let [v0, v1, v2] = self.triangles[tri_idx as usize].positions(vertices);
                if let Some(t) = ray_triangle(ray, v0, v1, v2) {
                    if closest.map_or(true, |hit| t < hit.t) {
                        *closest = Some(RayHit {
                            t,
                            point: ray.at(t),
                            triangle: tri_idx,
                        });
                    }
                }
            }
            return;
        }

        let Some((left, right)) = node.children() else {
            return;
        };
        let left_t = ray.intersect_aabb(&self.pool[left].aabb()).map(|(t, _)| t);
        let right_t = ray.intersect_aabb(&self.pool[right].aabb()).map(|(t, _)| t);

        match (left_t, right_t) {
            (Some(lt), Some(rt)) => {
                if lt <= rt {
                    self.intersect_node(vertices, ray, left, lt, closest);
                    self.intersect_node(vertices, ray, right, rt, closest);
                } else {
                    self.intersect_node(vertices, ray, right, rt, closest);
                    self.intersect_node(vertices, ray, left, lt, closest);
                }
            }
            (Some(lt), None) => self.intersect_node(vertices, ray, left, lt, closest),
            (None, Some(rt)) => self.intersect_node(vertices, ray, right, rt, closest),
            (None, None) => {}
        }
    }
}
