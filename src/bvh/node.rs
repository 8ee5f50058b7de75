//! BVH node, triangle and vertex-access types.
//!
//! Flat array layout shared by build, refit and traversal:
//! - 32-byte nodes (GPU-uploadable as-is)
//! - Triangles hold vertex indices, never positions

use bytemuck::{Pod, Zeroable};

use crate::util::{Aabb, Error, Result, Vec3};

/// Read access to the vertex buffer a BVH was built over.
///
/// The tree stores only vertex indices, so the owner can edit positions in
/// place and then refit without copying anything into the tree.
pub trait VertexSource {
    /// Number of vertices in the buffer.
    fn vertex_count(&self) -> usize;

    /// Position of vertex `index`. Callers only pass indices below
    /// [`vertex_count`](Self::vertex_count).
    fn position(&self, index: u32) -> Vec3;
}

impl VertexSource for [Vec3] {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn position(&self, index: u32) -> Vec3 {
        self[index as usize]
    }
}

impl VertexSource for Vec<Vec3> {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn position(&self, index: u32) -> Vec3 {
        self[index as usize]
    }
}

/// BVH node (32 bytes).
///
/// Internal node: left_or_first = left child pool index (right child is
/// left_or_first + 1), count = 0
/// Leaf node: left_or_first = offset into the primitive index array, count > 0
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub left_or_first: u32,
    pub aabb_max: [f32; 3],
    pub count: u32,
}

const _: () = assert!(std::mem::size_of::<BvhNode>() == 32);

impl BvhNode {
    /// Create a leaf owning `count` primitives starting at `first`.
    #[inline]
    pub fn leaf(aabb: Aabb, first: u32, count: u32) -> Self {
        debug_assert!(count > 0, "leaf must own at least one primitive");
        Self {
            aabb_min: aabb.min.to_array(),
            left_or_first: first,
            aabb_max: aabb.max.to_array(),
            count,
        }
    }

    /// Create an internal node whose children sit at `left` and `left + 1`.
    #[inline]
    pub fn internal(aabb: Aabb, left: u32) -> Self {
        Self {
            aabb_min: aabb.min.to_array(),
            left_or_first: left,
            aabb_max: aabb.max.to_array(),
            count: 0,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(Vec3::from_array(self.aabb_min), Vec3::from_array(self.aabb_max))
    }

    #[inline]
    pub fn set_aabb(&mut self, aabb: &Aabb) {
        self.aabb_min = aabb.min.to_array();
        self.aabb_max = aabb.max.to_array();
    }

    /// Pool indices of both children, for internal nodes.
    #[inline]
    pub fn children(&self) -> Option<(usize, usize)> {
        if self.is_leaf() {
            None
        } else {
            let left = self.left_or_first as usize;
            Some((left, left + 1))
        }
    }

    /// Primitive index range `(first, count)`, for leaves.
    #[inline]
    pub fn primitives(&self) -> Option<(usize, usize)> {
        if self.is_leaf() {
            Some((self.left_or_first as usize, self.count as usize))
        } else {
            None
        }
    }
}

/// Triangle primitive referencing three vertices of the owner's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub v: [u32; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self { v: [v0, v1, v2] }
    }

    /// Resolve the three vertex positions.
    #[inline]
    pub fn positions<V: VertexSource + ?Sized>(&self, vertices: &V) -> [Vec3; 3] {
        [
            vertices.position(self.v[0]),
            vertices.position(self.v[1]),
            vertices.position(self.v[2]),
        ]
    }

    /// Tight AABB of this triangle.
    #[inline]
    pub fn aabb<V: VertexSource + ?Sized>(&self, vertices: &V) -> Aabb {
        Aabb::from_points(&self.positions(vertices))
    }

    /// Average of the three vertices.
    #[inline]
    pub fn centroid<V: VertexSource + ?Sized>(&self, vertices: &V) -> Vec3 {
        let [a, b, c] = self.positions(vertices);
        (a + b + c) / 3.0
    }

    /// Triangulate a row-major `width x depth` vertex grid.
    ///
    /// Each quad with bottom-left vertex `i` yields `(i, i+1, i+width+1)` and
    /// `(i, i+width+1, i+width)`, quads in row-major order.
    pub fn grid(width: usize, depth: usize) -> Result<Vec<Triangle>> {
        if width < 2 || depth < 2 {
            return Err(Error::InvalidGrid { width, depth });
        }

        let mut triangles = Vec::with_capacity(2 * (width - 1) * (depth - 1));
        for z in 0..depth - 1 {
            for x in 0..width - 1 {
                let i = (z * width + x) as u32;
                let w = width as u32;

                let bottom_left = i;
                let bottom_right = i + 1;
                let top_right = i + w + 1;
                let top_left = i + w;

                triangles.push(Triangle::new(bottom_left, bottom_right, top_right));
                triangles.push(Triangle::new(bottom_left, top_right, top_left));
            }
        }
        Ok(triangles)
    }
}
