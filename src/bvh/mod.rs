//! Refittable bounding volume hierarchy over terrain triangles.
//!
//! Nodes live in a flat pool allocated once with `2N - 1` slots. Leaves own a
//! contiguous slice of the primitive index array; internal nodes point at two
//! adjacent children. After the owner edits vertex heights, [`Bvh::refit`]
//! refreshes all bounds in one reverse scan without touching topology.
//!
//! ## Architecture
//! ```text
//! vertex grid -> Triangle::grid -> build (centroid split) -> refit per edit -> intersect per frame
//! ```

mod build;
mod node;
mod refit;
mod traverse;

pub use node::{BvhNode, Triangle, VertexSource};

use serde::{Deserialize, Serialize};

use crate::util::{Aabb, Error, Result};

/// Build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Nodes with fewer triangles than this stay leaves.
    pub min_split_primitives: usize,
    /// Nodes at this depth are never split (root is depth 0), so no node
    /// is ever deeper than `max_depth`. A node at exactly `max_depth` with
    /// enough triangles to split becomes an oversized leaf instead.
    pub max_depth: u32,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            min_split_primitives: 4,
            max_depth: 16,
        }
    }
}

impl BvhConfig {
    /// Splitting fewer than two triangles would produce an empty child.
    pub(crate) fn sanitized(&self) -> Self {
        Self {
            min_split_primitives: self.min_split_primitives.max(2),
            max_depth: self.max_depth,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_split_primitives < 2 {
            return Err(Error::config(format!(
                "min_split_primitives must be at least 2, got {}",
                self.min_split_primitives
            )));
        }
        Ok(())
    }
}

/// Build statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BvhStats {
    pub triangle_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: u32,
    pub max_leaf_size: usize,
    /// Splits where every centroid fell on one side and the range was halved.
    pub degenerate_splits: usize,
    /// Leaves created by the depth cap rather than the size threshold.
    pub capped_leaves: usize,
    pub build_time_ms: f32,
}

/// Bounding volume hierarchy over a fixed triangle set.
///
/// Vertex positions are owned elsewhere and passed in through
/// [`VertexSource`] on every build, refit and query.
#[derive(Debug, Clone)]
pub struct Bvh {
    /// Node pool; slot 0 is the root, slots `pool_ptr..` are unused.
    pool: Vec<BvhNode>,
    /// Next free pool slot. Fixed once the build finishes.
    pool_ptr: usize,
    /// Permutation of triangle indices; leaves reference ranges of it.
    indices: Vec<u32>,
    triangles: Vec<Triangle>,
    /// Size of the vertex buffer the tree was built over.
    vertex_count: usize,
    config: BvhConfig,
    stats: BvhStats,
}

impl Bvh {
    /// Build a BVH over `triangles`, reading positions from `vertices`.
    pub fn build<V>(vertices: &V, triangles: Vec<Triangle>, config: &BvhConfig) -> Result<Self>
    where
        V: VertexSource + ?Sized,
    {
        build::build_bvh(vertices, triangles, config)
    }

    /// Build over a row-major `width x depth` vertex grid (two triangles per quad).
    pub fn from_grid<V>(vertices: &V, width: usize, depth: usize, config: &BvhConfig) -> Result<Self>
    where
        V: VertexSource + ?Sized,
    {
        Self::build(vertices, Triangle::grid(width, depth)?, config)
    }

    /// Used pool slots, root first.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.pool[..self.pool_ptr]
    }

    /// Primitive index array in leaf order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Total pool slots (`2N - 1`).
    pub fn pool_capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn pool_ptr(&self) -> usize {
        self.pool_ptr
    }

    pub fn root_bounds(&self) -> Aabb {
        self.pool[0].aabb()
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }
}
