//! Centroid-split BVH builder.
//!
//! Fills a pre-sized node pool (`2N - 1` slots) from a triangle list.
//! Each node is split at the center of its largest bounding-box axis;
//! triangles are assigned by centroid and the primitive index array is
//! reordered so every node owns one contiguous range.

use std::time::Instant;

use super::node::{BvhNode, Triangle, VertexSource};
use super::{Bvh, BvhConfig, BvhStats};
use crate::util::{Aabb, Error, Result};

/// Build a BVH over `triangles`, whose vertices are read from `vertices`.
///
/// Fails on an empty triangle list or a triangle that references a vertex
/// past the end of `vertices`.
#[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
pub(super) fn build_bvh<V>(vertices: &V, triangles: Vec<Triangle>, config: &BvhConfig) -> Result<Bvh>
where
    V: VertexSource + ?Sized,
{
    let start_time = Instant::now();
    let n = triangles.len();
    if n == 0 {
        return Err(Error::EmptyMesh);
    }

    let vertex_count = vertices.vertex_count();
    for tri in &triangles {
        if let Some(&index) = tri.v.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::IndexOutOfRange { index, count: vertex_count });
        }
    }

    let config = config.sanitized();

    // Identity permutation, reordered in place by partitioning
    let mut indices: Vec<u32> = (0..n as u32).collect();

    // Exact worst case for a binary tree with N non-empty leaves
    let mut pool = vec![BvhNode::default(); 2 * n - 1];

    let root_bounds = calculate_bounds(vertices, &triangles, &indices, 0, n);
    pool[0] = BvhNode::leaf(root_bounds, 0, n as u32);

    let mut builder = Builder {
        vertices,
        triangles: &triangles,
        indices: &mut indices,
        scratch: vec![0; n],
        pool: &mut pool,
        pool_ptr: 1,
        config: &config,
        stats: BvhStats {
            triangle_count: n,
            ..Default::default()
        },
    };
    builder.subdivide_root();

    let pool_ptr = builder.pool_ptr;
    let mut stats = builder.stats;
    stats.node_count = pool_ptr;
    stats.build_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    if stats.capped_leaves > 0 {
        tracing::warn!(
            "depth cap {} left {} oversized leaves (largest: {} triangles)",
            config.max_depth,
            stats.capped_leaves,
            stats.max_leaf_size
        );
    }
    tracing::debug!(
        "BVH built: {} triangles, {}/{} nodes, {} leaves, depth {}, {:.2}ms",
        n,
        pool_ptr,
        pool.len(),
        stats.leaf_count,
        stats.max_depth,
        stats.build_time_ms
    );

    Ok(Bvh {
        pool,
        pool_ptr,
        indices,
        triangles,
        vertex_count,
        config,
        stats,
    })
}

/// Tight box around the `count` triangles listed at `indices[first..]`.
///
/// Seeded from the first triangle's own box, never from a default box.
pub(super) fn calculate_bounds<V>(
    vertices: &V,
    triangles: &[Triangle],
    indices: &[u32],
    first: usize,
    count: usize,
) -> Aabb
where
    V: VertexSource + ?Sized,
{
    debug_assert!(count > 0, "calculate_bounds called on an empty range");
    debug_assert!(first + count <= indices.len(), "primitive range out of bounds");

    let range = &indices[first..first + count];
    let mut bounds = triangles[range[0] as usize].aabb(vertices);
    for &idx in &range[1..] {
        bounds.grow(&triangles[idx as usize].aabb(vertices));
    }
    bounds
}

/// Mutable build state borrowed from the tree being assembled.
struct Builder<'a, V: ?Sized> {
    vertices: &'a V,
    triangles: &'a [Triangle],
    indices: &'a mut [u32],
    scratch: Vec<u32>,
    pool: &'a mut [BvhNode],
    pool_ptr: usize,
    config: &'a BvhConfig,
    stats: BvhStats,
}

impl<V: VertexSource + ?Sized> Builder<'_, V> {
    /// Split the root until every leaf meets the leaf policy.
    ///
    /// Uses an explicit work stack; children are always allocated after their
    /// parent, so pool order is a valid bottom-up refit order.
    fn subdivide_root(&mut self) {
        struct Task {
            node_idx: usize,
            depth: u32,
        }

        let mut stack = vec![Task { node_idx: 0, depth: 0 }];

        while let Some(task) = stack.pop() {
            let count = self.pool[task.node_idx].count as usize;
            self.stats.max_depth = self.stats.max_depth.max(task.depth);

            if count < self.config.min_split_primitives {
                self.finish_leaf(count);
                continue;
            }
            if task.depth >= self.config.max_depth {
                self.stats.capped_leaves += 1;
                self.finish_leaf(count);
                continue;
            }

            let left_idx = self.partition(task.node_idx);

            // Right first so the left subtree is processed first
            stack.push(Task {
                node_idx: left_idx + 1,
                depth: task.depth + 1,
            });
            stack.push(Task {
                node_idx: left_idx,
                depth: task.depth + 1,
            });
        }
    }

    fn finish_leaf(&mut self, count: usize) {
        self.stats.leaf_count += 1;
        self.stats.max_leaf_size = self.stats.max_leaf_size.max(count);
    }

    /// Turn leaf `node_idx` into an internal node with two fresh leaf children.
    /// Returns the pool index of the left child.
    fn partition(&mut self, node_idx: usize) -> usize {
        let node = self.pool[node_idx];
        let first = node.left_or_first as usize;
        let count = node.count as usize;
        let bounds = node.aabb();

        let split_axis = bounds.largest_axis();
        let split_pos = bounds.center()[split_axis];

        let (mut count_left, mut count_right) = self.split(first, count, split_axis, split_pos);

        // All centroids on one side: fall back to an even split by count
        if count_left == 0 || count_right == 0 {
            self.stats.degenerate_splits += 1;
            count_left = count / 2;
            count_right = count - count_left;
            tracing::trace!("degenerate split at node {node_idx} ({count} triangles), halving");
        }
        tracing::trace!(
            "partition node {node_idx}: axis {split_axis} at {split_pos:.3} -> {count_left}/{count_right}"
        );

        let left_idx = self.pool_ptr;
        self.pool_ptr += 2;
        debug_assert!(self.pool_ptr <= self.pool.len(), "node pool exhausted");

        self.pool[node_idx] = BvhNode::internal(bounds, left_idx as u32);

        let left_bounds = self.bounds(first, count_left);
        self.pool[left_idx] = BvhNode::leaf(left_bounds, first as u32, count_left as u32);

        let right_first = first + count_left;
        let right_bounds = self.bounds(right_first, count_right);
        self.pool[left_idx + 1] = BvhNode::leaf(right_bounds, right_first as u32, count_right as u32);

        left_idx
    }

    /// Two-pointer partition of `indices[first..first + count]` by centroid.
    ///
    /// One pass over the range: centroids strictly below `split_pos` fill the
    /// scratch buffer from the front, the rest from the back. The result is
    /// copied back, so `count_left + count_right == count` always.
    fn split(&mut self, first: usize, count: usize, axis: usize, split_pos: f32) -> (usize, usize) {
        let mut count_left = 0;
        let mut count_right = 0;

        for i in first..first + count {
            let tri = self.indices[i];
            let centroid = self.triangles[tri as usize].centroid(self.vertices);

            if centroid[axis] < split_pos {
                self.scratch[count_left] = tri;
                count_left += 1;
            } else {
                self.scratch[count - 1 - count_right] = tri;
                count_right += 1;
            }
        }

        self.indices[first..first + count].copy_from_slice(&self.scratch[..count]);
        (count_left, count_right)
    }

    #[inline]
    fn bounds(&self, first: usize, count: usize) -> Aabb {
        calculate_bounds(self.vertices, self.triangles, self.indices, first, count)
    }
}
