//! Bounding Volume Hierarchy (BVH) over scene triangles.
//!
//! Two phases: a boxed build tree (median split on the longest centroid
//! axis) is flattened into a pre-order array of 32-byte nodes, which is what
//! rays traverse. Traversal is iterative with a fixed-size stack, visits the
//! near child first and prunes subtrees that start beyond the closest hit.

pub mod build;
pub mod flat;

use std::time::Instant;

use lumen_core::Triangle;
use lumen_math::{Ray, Vec3};

use crate::error::RenderError;
use crate::intersect::{intersect_triangle, MAX_INTERSECT_DIST};
use build::build_tree;
pub use build::LEAF_MAX_SIZE;
pub use flat::FlatNode;

/// Traversal stack depth. Median splits keep the tree depth near
/// log2(n / LEAF_MAX_SIZE), far below this.
const STACK_SIZE: usize = 64;

/// Closest triangle hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    /// Interpolated shading normal
    pub normal: Vec3,
    /// Index into the triangle slice the BVH was built from
    pub triangle: usize,
    pub material_id: usize,
}

/// Build statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub depth: usize,
}

/// Flattened BVH owning a leaf-ordered copy of its triangles.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<FlatNode>,
    triangles: Vec<Triangle>,
    /// Maps leaf order back to the caller's triangle indices
    indices: Vec<u32>,
    stats: BvhStats,
}

impl Bvh {
    /// Build a BVH. Fails on an empty triangle list.
    pub fn build(triangles: &[Triangle]) -> Result<Self, RenderError> {
        if triangles.is_empty() {
            return Err(RenderError::EmptyBvh);
        }

        let start = Instant::now();
        let (root, order) = build_tree(triangles);
        let nodes = flat::flatten(&root);
        drop(root);

        let stats = compute_stats(&nodes);
        log::info!(
            "Built BVH over {} triangles: {} nodes, {} leaves, depth {} in {:.2?}",
            triangles.len(),
            stats.node_count,
            stats.leaf_count,
            stats.depth,
            start.elapsed()
        );

        Ok(Self {
            nodes,
            triangles: order.iter().map(|&i| triangles[i]).collect(),
            indices: order.iter().map(|&i| i as u32).collect(),
            stats,
        })
    }

    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Raw node bytes, for uploading the array as-is.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Nearest triangle hit along the ray.
    pub fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        self.intersect_within(ray, MAX_INTERSECT_DIST)
    }

    /// Nearest triangle hit closer than `t_max`.
    ///
    /// On equal distances the first triangle visited wins.
    pub fn intersect_within(&self, ray: &Ray, t_max: f32) -> Option<TriangleHit> {
        let mut best: Option<TriangleHit> = None;
        let mut best_t = t_max;

        self.traverse(ray, |bvh, start, count, best_so_far| {
            for i in start..start + count {
                let hit = intersect_triangle(&bvh.triangles[i], ray);
                if hit.t < best_t {
                    best_t = hit.t;
                    best = Some(TriangleHit {
                        t: hit.t,
                        normal: hit.normal,
                        triangle: bvh.indices[i] as usize,
                        material_id: bvh.triangles[i].material_id,
                    });
                }
            }
            *best_so_far = best_t;
            false
        }, t_max);

        best
    }

    /// True if any triangle is hit strictly closer than `t_max`.
    pub fn any_hit(&self, ray: &Ray, t_max: f32) -> bool {
        let mut found = false;
        self.traverse(ray, |bvh, start, count, _| {
            found = bvh.triangles[start..start + count]
                .iter()
                .any(|tri| intersect_triangle(tri, ray).t < t_max);
            found
        }, t_max);
        found
    }

    /// Walk the nodes overlapping the ray, calling `visit_leaf` with each
    /// leaf's triangle range and the current pruning distance. Stops early
    /// when `visit_leaf` returns true.
    fn traverse<F>(&self, ray: &Ray, mut visit_leaf: F, t_max: f32)
    where
        F: FnMut(&Self, usize, usize, &mut f32) -> bool,
    {
        let sign = ray.sign();
        let mut stack = [0u32; STACK_SIZE];
        let mut stack_len = 0;
        let mut current = 0usize;
        let mut limit = t_max;

        loop {
            let node = &self.nodes[current];
            if node.hit_distance(ray, limit).is_some() {
                if node.is_leaf() {
                    if visit_leaf(self, node.offset as usize, node.tri_count as usize, &mut limit) {
                        return;
                    }
                } else {
                    let first = current + 1;
                    let second = current + node.offset as usize;
                    let (near, far) = if sign[node.axis as usize] == 0 {
                        (first, second)
                    } else {
                        (second, first)
                    };
                    debug_assert!(stack_len < STACK_SIZE, "BVH deeper than traversal stack");
                    stack[stack_len] = far as u32;
                    stack_len += 1;
                    current = near;
                    continue;
                }
            }

            if stack_len == 0 {
                return;
            }
            stack_len -= 1;
            current = stack[stack_len] as usize;
        }
    }
}

fn compute_stats(nodes: &[FlatNode]) -> BvhStats {
    fn depth_of(nodes: &[FlatNode], i: usize) -> usize {
        let node = &nodes[i];
        if node.is_leaf() {
            1
        } else {
            1 + depth_of(nodes, i + 1).max(depth_of(nodes, i + node.offset as usize))
        }
    }

    BvhStats {
        node_count: nodes.len(),
        leaf_count: nodes.iter().filter(|n| n.is_leaf()).count(),
        depth: depth_of(nodes, 0),
    }
}
