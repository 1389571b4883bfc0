// src/geometry.rs
use crate::primitives::{Triangle, AABB};
use glam::{Mat4, Vec3};

/// Indexed triangle soup for one surface.
#[derive(Default, Clone, Debug)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>, // [i0, i1, i2]
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_vertex(&mut self, v: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(v);
        index
    }

    pub fn add_triangle(&mut self, v0: Vec3, v1: Vec3, v2: Vec3) {
        let i0 = self.push_vertex(v0);
        let i1 = self.push_vertex(v1);
        let i2 = self.push_vertex(v2);
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Axis-aligned box made of 12 triangles.
    pub fn add_box(&mut self, center: Vec3, size: Vec3) {
        let h = size * 0.5;
        let start = self.positions.len() as u32;
        for i in 0..8u32 {
            let sx = if i & 1 == 0 { -h.x } else { h.x };
            let sy = if i & 2 == 0 { -h.y } else { h.y };
            let sz = if i & 4 == 0 { -h.z } else { h.z };
            self.push_vertex(center + Vec3::new(sx, sy, sz));
        }
        const FACES: [[u32; 4]; 6] = [
            [0, 1, 3, 2], // -z
            [4, 6, 7, 5], // +z
            [0, 4, 5, 1], // -y
            [2, 3, 7, 6], // +y
            [0, 2, 6, 4], // -x
            [1, 5, 7, 3], // +x
        ];
        for [a, b, c, d] in FACES {
            self.indices
                .extend_from_slice(&[start + a, start + b, start + c]);
            self.indices
                .extend_from_slice(&[start + a, start + c, start + d]);
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle(&self, tri: usize) -> Triangle {
        let b = tri * 3;
        Triangle {
            v0: self.positions[self.indices[b] as usize],
            v1: self.positions[self.indices[b + 1] as usize],
            v2: self.positions[self.indices[b + 2] as usize],
        }
    }

    pub fn bounds(&self) -> AABB {
        let mut aabb = AABB::empty();
        for p in &self.positions {
            aabb.grow(*p);
        }
        aabb
    }

    /// Copy with every position moved by `m`.
    pub fn transformed(&self, m: Mat4) -> Geometry {
        Geometry {
            positions: self.positions.iter().map(|p| m.transform_point3(*p)).collect(),
            indices: self.indices.clone(),
        }
    }

    /// Returns false when an index points past the vertex list.
    pub fn indices_in_range(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&i| i < n)
    }
}
