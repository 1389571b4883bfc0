// src/bvh/tlas.rs
use super::BVHNode;
use crate::primitives::{Ray, AABB};
use glam::Vec3;
use std::cmp::Ordering;

pub type TLASNode = BVHNode;

/// Top-level tree over per-surface bounds. Leaves hold one entry each;
/// an entry is whatever index the caller passed in (a surface slot).
#[derive(Clone, Debug, Default)]
pub struct Tlas {
    nodes: Vec<TLASNode>,
    entries: Vec<usize>,
}

impl Tlas {
    pub fn build(entries: &[(usize, AABB)]) -> Self {
        TLASBuilder::new(entries).build()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pushes every entry whose box the ray overlaps.
    pub fn candidates(&self, ray: &Ray, out: &mut Vec<usize>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.aabb.intersect(ray, f32::INFINITY).is_none() {
                continue;
            }
            if node.is_leaf() {
                let first = node.left_first as usize;
                out.extend_from_slice(&self.entries[first..first + node.tri_count as usize]);
            } else {
                let left = node.left_first as usize;
                stack.push(left + 1);
                stack.push(left);
            }
        }
    }
}

pub struct TLASBuilder {
    nodes: Vec<TLASNode>,
    entry_ids: Vec<usize>,
    entry_indices: Vec<usize>,
    entry_aabbs: Vec<AABB>,
    entry_centers: Vec<Vec3>,
}

impl TLASBuilder {
    pub fn new(entries: &[(usize, AABB)]) -> Self {
        let usable: Vec<&(usize, AABB)> = entries.iter().filter(|(_, b)| !b.is_empty()).collect();
        Self {
            nodes: Vec::new(),
            entry_ids: usable.iter().map(|(id, _)| *id).collect(),
            entry_indices: (0..usable.len()).collect(),
            entry_aabbs: usable.iter().map(|(_, b)| *b).collect(),
            entry_centers: usable.iter().map(|(_, b)| b.center()).collect(),
        }
    }

    pub fn build(mut self) -> Tlas {
        if self.entry_indices.is_empty() {
            return Tlas::default();
        }

        let mut root_aabb = AABB::empty();
        for aabb in &self.entry_aabbs {
            root_aabb = root_aabb.union(aabb);
        }
        self.nodes.push(TLASNode {
            aabb: root_aabb,
            left_first: 0,
            tri_count: self.entry_indices.len() as u32,
        });

        self.subdivide(0);

        let entries = self
            .entry_indices
            .iter()
            .map(|&i| self.entry_ids[i])
            .collect();
        Tlas {
            nodes: self.nodes,
            entries,
        }
    }

    fn subdivide(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        let count = node.tri_count as usize;
        let first = node.left_first as usize;

        if count == 1 {
            return;
        }

        let extent = node.aabb.max - node.aabb.min;
        let axis = if extent.y > extent.x && extent.y >= extent.z {
            1
        } else if extent.z > extent.x && extent.z > extent.y {
            2
        } else {
            0
        };

        let centers = &self.entry_centers;
        self.entry_indices[first..first + count].sort_by(|&a, &b| {
            centers[a][axis]
                .partial_cmp(&centers[b][axis])
                .unwrap_or(Ordering::Equal)
        });

        let mid = count / 2;
        let left_child_idx = self.nodes.len();

        let bounds_of = |range: &[usize]| {
            range
                .iter()
                .fold(AABB::empty(), |acc, &i| acc.union(&self.entry_aabbs[i]))
        };
        let left_aabb = bounds_of(&self.entry_indices[first..first + mid]);
        let right_aabb = bounds_of(&self.entry_indices[first + mid..first + count]);

        self.nodes.push(TLASNode {
            aabb: left_aabb,
            left_first: first as u32,
            tri_count: mid as u32,
        });
        self.nodes.push(TLASNode {
            aabb: right_aabb,
            left_first: (first + mid) as u32,
            tri_count: (count - mid) as u32,
        });

        self.nodes[node_idx].tri_count = 0;
        self.nodes[node_idx].left_first = left_child_idx as u32;

        self.subdivide(left_child_idx);
        self.subdivide(left_child_idx + 1);
    }
}
