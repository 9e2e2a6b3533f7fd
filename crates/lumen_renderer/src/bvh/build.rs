//! Build-time BVH: a boxed binary tree over triangle bounds.
//!
//! This form only exists during construction. It is flattened into the
//! traversal array and then dropped.

use lumen_core::Triangle;
use lumen_math::{Aabb, Vec3};

/// Maximum triangles per leaf node before splitting.
pub const LEAF_MAX_SIZE: usize = 4;

/// BVH build node - either a branch with two children or a leaf range.
#[derive(Debug)]
pub enum BuildNode {
    /// Internal node with two exclusively owned children.
    Branch {
        left: Box<BuildNode>,
        right: Box<BuildNode>,
        bbox: Aabb,
        axis: usize,
    },
    /// Leaf covering `start..start + count` of the reordered triangle list.
    Leaf { start: usize, count: usize, bbox: Aabb },
}

impl BuildNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BuildNode::Branch { bbox, .. } | BuildNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// Per-triangle build record.
#[derive(Debug, Clone, Copy)]
struct BuildPrimitive {
    index: usize,
    bbox: Aabb,
    centroid: Vec3,
}

/// Build a tree over `triangles`.
///
/// Returns the root and the triangle indices in leaf order; leaf ranges
/// index into that order. `triangles` must not be empty.
pub fn build_tree(triangles: &[Triangle]) -> (BuildNode, Vec<usize>) {
    let mut prims: Vec<BuildPrimitive> = triangles
        .iter()
        .enumerate()
        .map(|(index, tri)| {
            let bbox = tri.bounds();
            BuildPrimitive {
                index,
                bbox,
                centroid: bbox.centroid(),
            }
        })
        .collect();

    let root = build_recursive(&mut prims, 0);
    let order = prims.iter().map(|p| p.index).collect();
    (root, order)
}

/// Median split on the longest axis of the centroid bounds.
fn build_recursive(prims: &mut [BuildPrimitive], offset: usize) -> BuildNode {
    let n = prims.len();

    // Union of the primitives' boxes
    let bounds = prims
        .iter()
        .skip(1)
        .fold(prims[0].bbox, |acc, p| Aabb::surrounding(&acc, &p.bbox));

    if n <= LEAF_MAX_SIZE {
        return BuildNode::Leaf {
            start: offset,
            count: n,
            bbox: bounds,
        };
    }

    let mut centroid_bounds = Aabb::EMPTY;
    for p in prims.iter() {
        centroid_bounds.grow(p.centroid);
    }
    let axis = centroid_bounds.longest_axis();

    // Ties broken by input index so the build is fully deterministic.
    prims.sort_unstable_by(|a, b| {
        a.centroid[axis]
            .total_cmp(&b.centroid[axis])
            .then(a.index.cmp(&b.index))
    });

    let mid = n / 2;
    let (left_prims, right_prims) = prims.split_at_mut(mid);
    let left = build_recursive(left_prims, offset);
    let right = build_recursive(right_prims, offset + mid);

    BuildNode::Branch {
        left: Box::new(left),
        right: Box::new(right),
        bbox: bounds,
        axis,
    }
}
