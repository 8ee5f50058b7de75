//! Bottom-up refit and structural validation.

use super::build::calculate_bounds;
use super::node::VertexSource;
use super::Bvh;
use crate::util::{Aabb, Error, Result};

impl Bvh {
    /// Recompute every node's bounds after vertex positions changed.
    ///
    /// Topology is untouched. Children always sit at a higher pool index than
    /// their parent, so one descending scan over the used slots updates every
    /// child before the parent that merges it. Afterwards each internal box is
    /// exactly the union of its children's boxes.
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = self.pool_ptr))]
    pub fn refit<V>(&mut self, vertices: &V) -> Result<()>
    where
        V: VertexSource + ?Sized,
    {
        let actual = vertices.vertex_count();
        if actual != self.vertex_count {
            return Err(Error::VertexCountMismatch {
                expected: self.vertex_count,
                actual,
            });
        }

        for idx in (0..self.pool_ptr).rev() {
            let node = self.pool[idx];
            let bounds = match node.children() {
                Some((left, right)) => Aabb::merge(&self.pool[left].aabb(), &self.pool[right].aabb()),
                None => calculate_bounds(
                    vertices,
                    &self.triangles,
                    &self.indices,
                    node.left_or_first as usize,
                    node.count as usize,
                ),
            };
            self.pool[idx].set_aabb(&bounds);
        }

        Ok(())
    }

    /// Brute-force check of every structural invariant.
    ///
    /// - the pool holds `2N - 1` slots and `pool_ptr` stays within it
    /// - the primitive index array is a permutation of `[0, N)`
    /// - every used slot is reachable from the root exactly once
    /// - children sit after their parent
    /// - leaf ranges tile `[0, N)` in order, with no gaps or overlaps
    /// - leaf boxes are tight around their triangles
    /// - internal boxes contain both children's boxes
    pub fn validate<V>(&self, vertices: &V) -> Result<()>
    where
        V: VertexSource + ?Sized,
    {
        let n = self.triangles.len();
        if self.pool.len() != 2 * n - 1 {
            return Err(Error::invariant(format!(
                "pool holds {} slots for {n} triangles",
                self.pool.len()
            )));
        }
        if self.pool_ptr > self.pool.len() {
            return Err(Error::invariant(format!(
                "pool_ptr {} exceeds pool capacity {}",
                self.pool_ptr,
                self.pool.len()
            )));
        }

        let mut seen = vec![false; n];
        for &idx in &self.indices {
            let slot = seen
                .get_mut(idx as usize)
                .ok_or_else(|| Error::invariant(format!("primitive index {idx} out of range")))?;
            if *slot {
                return Err(Error::invariant(format!("primitive {idx} listed twice")));
            }
            *slot = true;
        }

        let mut visited = vec![false; self.pool_ptr];
        let (first, count) = self.validate_node(vertices, 0, &mut visited)?;
        if (first, count) != (0, n) {
            return Err(Error::invariant(format!(
                "root covers [{first}, {}) instead of [0, {n})",
                first + count
            )));
        }
        if let Some(orphan) = visited.iter().position(|&v| !v) {
            return Err(Error::invariant(format!("node {orphan} is unreachable")));
        }

        Ok(())
    }

    /// Returns the primitive range `(first, count)` covered by the subtree.
    fn validate_node<V>(&self, vertices: &V, idx: usize, visited: &mut [bool]) -> Result<(usize, usize)>
    where
        V: VertexSource + ?Sized,
    {
        if idx >= self.pool_ptr {
            return Err(Error::invariant(format!("node {idx} beyond pool_ptr {}", self.pool_ptr)));
        }
        if std::mem::replace(&mut visited[idx], true) {
            return Err(Error::invariant(format!("node {idx} reached twice")));
        }

        let node = self.pool[idx];
        let bounds = node.aabb();

        if let Some((first, count)) = node.primitives() {
            if first + count > self.indices.len() {
                return Err(Error::invariant(format!("leaf {idx} range past the index array")));
            }
            let tight = calculate_bounds(vertices, &self.triangles, &self.indices, first, count);
            if tight != bounds {
                return Err(Error::invariant(format!(
                    "leaf {idx} bounds {bounds:?} are not tight (expected {tight:?})"
                )));
            }
            return Ok((first, count));
        }

        let (left, right) = node
            .children()
            .ok_or_else(|| Error::invariant(format!("node {idx} is neither leaf nor internal")))?;
        if left <= idx {
            return Err(Error::invariant(format!("node {idx} has child {left} before it")));
        }

        let (lf, lc) = self.validate_node(vertices, left, visited)?;
        let (rf, rc) = self.validate_node(vertices, right, visited)?;
        if lf + lc != rf {
            return Err(Error::invariant(format!(
                "children of node {idx} cover [{lf}, {}) and [{rf}, {})",
                lf + lc,
                rf + rc
            )));
        }

        for child in [left, right] {
            if !bounds.contains(&self.pool[child].aabb()) {
                return Err(Error::invariant(format!(
                    "node {idx} does not contain child {child}"
                )));
            }
        }

        Ok((lf, lc + rc))
    }

    /// Boxes a debug overlay draws for tree level `depth`.
    ///
    /// Every node at exactly `depth`, plus leaves that end above it so the
    /// whole terrain stays covered.
    pub fn debug_boxes(&self, depth: u32) -> Vec<Aabb> {
        let mut boxes = Vec::new();
        let mut stack = vec![(0usize, 0u32)];

        while let Some((idx, level)) = stack.pop() {
            let node = &self.pool[idx];
            match node.children() {
                Some((left, right)) if level < depth => {
                    stack.push((right, level + 1));
                    stack.push((left, level + 1));
                }
                _ => boxes.push(node.aabb()),
            }
        }

        boxes
    }
}
