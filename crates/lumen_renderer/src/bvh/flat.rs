//! Traversal-form BVH node.

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Ray};

use super::build::BuildNode;

/// Flat pre-order BVH node (32 bytes).
///
/// Internal node: `tri_count == 0`, the first child is the next slot and
/// `offset` is the distance from this node to the second child.
/// Leaf node: `tri_count > 0`, `offset` is the first triangle in the
/// reordered triangle list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatNode {
    pub min: [f32; 3],
    pub offset: u32,
    pub max: [f32; 3],
    pub tri_count: u16,
    pub axis: u16,
}

impl FlatNode {
    fn new(bbox: &Aabb, offset: u32, tri_count: u16, axis: u16) -> Self {
        Self {
            min: bbox.min_point().to_array(),
            offset,
            max: bbox.max_point().to_array(),
            tri_count,
            axis,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }

    /// Slab test against the node bounds, returning the entry distance when
    /// the box overlaps `[0, t_max]`.
    #[inline]
    pub fn hit_distance(&self, ray: &Ray, t_max: f32) -> Option<f32> {
        let origin = ray.origin();
        let inv = ray.inv_direction();
        let sign = ray.sign();

        let mut t_enter = 0.0f32;
        let mut t_exit = t_max;
        for axis in 0..3 {
            let (near, far) = if sign[axis] == 0 {
                (self.min[axis], self.max[axis])
            } else {
                (self.max[axis], self.min[axis])
            };
            let t0 = (near - origin[axis]) * inv[axis];
            let t1 = (far - origin[axis]) * inv[axis];
            // f32::max/min drop the NaN from 0 * inf.
            t_enter = t0.max(t_enter);
            t_exit = t1.min(t_exit);
            if t_exit < t_enter {
                return None;
            }
        }
        Some(t_enter)
    }
}

/// Flatten a build tree into pre-order, returning the node array.
pub fn flatten(root: &BuildNode) -> Vec<FlatNode> {
    let mut nodes = Vec::new();
    flatten_recursive(root, &mut nodes);
    nodes
}

fn flatten_recursive(node: &BuildNode, nodes: &mut Vec<FlatNode>) -> usize {
    let index = nodes.len();
    match node {
        BuildNode::Leaf { start, count, bbox } => {
            nodes.push(FlatNode::new(bbox, *start as u32, *count as u16, 0));
        }
        BuildNode::Branch {
            left,
            right,
            bbox,
            axis,
        } => {
            nodes.push(FlatNode::new(bbox, 0, 0, *axis as u16));
            flatten_recursive(left, nodes);
            let second = flatten_recursive(right, nodes);
            nodes[index].offset = (second - index) as u32;
        }
    }
    index
}
