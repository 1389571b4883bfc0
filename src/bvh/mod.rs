// src/bvh/mod.rs
pub mod blas;
pub mod tlas;

use crate::primitives::AABB;

pub use blas::{Blas, BVHBuilder};
pub use tlas::{Tlas, TLASBuilder};

// --- Common Structures ---

#[derive(Clone, Copy, Debug, Default)]
pub struct BVHNode {
    pub aabb: AABB,
    pub left_first: u32, // BLAS: first tri slot / left child, TLAS: first entry slot / left child
    pub tri_count: u32,  // 0 for interior nodes
}

impl BVHNode {
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }
}

/// One ray/triangle intersection inside a single surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub distance: f32,
    pub triangle: usize,
}
