// src/bvh/blas.rs
use super::{BVHNode, TriangleHit};
use crate::geometry::Geometry;
use crate::primitives::{Ray, AABB};
use glam::Vec3;

const LEAF_SIZE: u32 = 4;
const BINS: usize = 16;

#[derive(Clone, Copy, Debug, Default)]
struct Bin {
    bounds: AABB,
    count: u32,
}

/// Triangle BVH over one surface's geometry.
#[derive(Clone, Debug, Default)]
pub struct Blas {
    nodes: Vec<BVHNode>,
    tri_indices: Vec<usize>,
}

impl Blas {
    pub fn build(geom: &Geometry) -> Self {
        BVHBuilder::new(geom).build()
    }

    pub fn bounds(&self) -> AABB {
        self.nodes.first().map(|n| n.aabb).unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Pushes every triangle the ray crosses, unordered.
    pub fn intersect_all(&self, geom: &Geometry, ray: &Ray, out: &mut Vec<TriangleHit>) {
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
                for &tri in &self.tri_indices[first..first + node.tri_count as usize] {
                    if let Some(distance) = geom.triangle(tri).intersect(ray) {
                        out.push(TriangleHit {
                            distance,
                            triangle: tri,
                        });
                    }
                }
            } else {
                let left = node.left_first as usize;
                stack.push(left + 1);
                stack.push(left);
            }
        }
    }
}

pub struct BVHBuilder {
    nodes: Vec<BVHNode>,
    tri_indices: Vec<usize>,
    tri_aabbs: Vec<AABB>,
    tri_centers: Vec<Vec3>,
}

impl BVHBuilder {
    pub fn new(geom: &Geometry) -> Self {
        let tri_count = geom.triangle_count();
        let mut tri_aabbs = Vec::with_capacity(tri_count);
        let mut tri_centers = Vec::with_capacity(tri_count);

        for i in 0..tri_count {
            let aabb = geom.triangle(i).aabb();
            tri_aabbs.push(aabb);
            tri_centers.push(aabb.center());
        }

        Self {
            nodes: Vec::new(),
            tri_indices: (0..tri_count).collect(),
            tri_aabbs,
            tri_centers,
        }
    }

    pub fn build(mut self) -> Blas {
        if self.tri_indices.is_empty() {
            return Blas::default();
        }

        self.nodes.push(BVHNode {
            left_first: 0,
            tri_count: self.tri_indices.len() as u32,
            ..Default::default()
        });
        self.update_node_bounds(0);
        self.subdivide(0);

        Blas {
            nodes: self.nodes,
            tri_indices: self.tri_indices,
        }
    }

    fn update_node_bounds(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        let mut aabb = AABB::empty();
        for i in 0..node.tri_count {
            let tri_id = self.tri_indices[(node.left_first + i) as usize];
            aabb = aabb.union(&self.tri_aabbs[tri_id]);
        }
        self.nodes[node_idx].aabb = aabb;
    }

    fn subdivide(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        if node.tri_count <= LEAF_SIZE {
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

        let split_len = extent[axis];
        let split_min = node.aabb.min[axis];
        if split_len < 1e-6 {
            return;
        }

        let mut bins = [Bin::default(); BINS];
        let first = node.left_first as usize;
        let count = node.tri_count as usize;
        let scale = BINS as f32 / split_len;

        let bin_of = |val: f32| -> usize {
            let idx = ((val - split_min) * scale).max(0.0) as usize;
            idx.min(BINS - 1)
        };

        for i in 0..count {
            let tri_id = self.tri_indices[first + i];
            let b = bin_of(self.tri_centers[tri_id][axis]);
            bins[b].count += 1;
            bins[b].bounds = bins[b].bounds.union(&self.tri_aabbs[tri_id]);
        }

        let mut left_area = [0.0; BINS];
        let mut left_count = [0; BINS];
        let mut right_area = [0.0; BINS];
        let mut right_count = [0; BINS];

        let mut curr_box = AABB::empty();
        let mut curr_sum = 0;
        for i in 0..BINS {
            curr_sum += bins[i].count;
            curr_box = curr_box.union(&bins[i].bounds);
            left_area[i] = curr_box.area();
            left_count[i] = curr_sum;
        }

        curr_box = AABB::empty();
        curr_sum = 0;
        for i in (0..BINS).rev() {
            curr_sum += bins[i].count;
            curr_box = curr_box.union(&bins[i].bounds);
            right_area[i] = curr_box.area();
            right_count[i] = curr_sum;
        }

        let mut best_cost = f32::INFINITY;
        let mut best_split = None;
        for i in 0..(BINS - 1) {
            if left_count[i] == 0 || right_count[i + 1] == 0 {
                continue;
            }
            let cost = left_area[i] * left_count[i] as f32
                + right_area[i + 1] * right_count[i + 1] as f32;
            if cost < best_cost {
                best_cost = cost;
                best_split = Some(i);
            }
        }
        let Some(best_split) = best_split else {
            return;
        };

        // Partition [first, first + count) so left-bin triangles come first
        let centers = &self.tri_centers;
        let slice = &mut self.tri_indices[first..first + count];
        let mut mid = 0;
        for i in 0..slice.len() {
            if bin_of(centers[slice[i]][axis]) <= best_split {
                slice.swap(i, mid);
                mid += 1;
            }
        }

        if mid == 0 || mid == count {
            return;
        }

        let left_child_idx = self.nodes.len();
        self.nodes.push(BVHNode {
            left_first: first as u32,
            tri_count: mid as u32,
            ..Default::default()
        });
        self.nodes.push(BVHNode {
            left_first: (first + mid) as u32,
            tri_count: (count - mid) as u32,
            ..Default::default()
        });

        self.nodes[node_idx].left_first = left_child_idx as u32;
        self.nodes[node_idx].tri_count = 0;

        self.update_node_bounds(left_child_idx);
        self.update_node_bounds(left_child_idx + 1);
        self.subdivide(left_child_idx);
        self.subdivide(left_child_idx + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn slab_stack(layers: usize) -> Geometry {
        let mut geom = Geometry::new();
        for i in 0..layers {
            geom.add_box(vec3(0.0, 0.0, -(i as f32) * 2.0), vec3(1.0, 1.0, 0.5));
        }
        geom
    }

    #[test]
    fn finds_every_crossed_face() {
        let geom = slab_stack(6);
        let blas = Blas::build(&geom);
        assert!(blas.node_count() > 1);

        let ray = Ray::new(vec3(0.1, 0.2, 10.0), vec3(0.0, 0.0, -1.0));
        let mut hits = Vec::new();
        blas.intersect_all(&geom, &ray, &mut hits);
        // Two faces per box
        assert_eq!(hits.len(), 12);
    }

    #[test]
    fn matches_brute_force() {
        let geom = slab_stack(9);
        let blas = Blas::build(&geom);
        let ray = Ray::new(vec3(-3.0, 0.1, -4.0), vec3(1.0, 0.0, 0.05));

        let mut hits = Vec::new();
        blas.intersect_all(&geom, &ray, &mut hits);
        let mut got: Vec<usize> = hits.iter().map(|h| h.triangle).collect();
        got.sort_unstable();

        let expected: Vec<usize> = (0..geom.triangle_count())
            .filter(|&t| geom.triangle(t).intersect(&ray).is_some())
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_geometry_builds_empty_tree() {
        let geom = Geometry::new();
        let blas = Blas::build(&geom);
        assert_eq!(blas.node_count(), 0);
        assert!(blas.bounds().is_empty());
        let mut hits = Vec::new();
        blas.intersect_all(&geom, &Ray::new(Vec3::ZERO, Vec3::X), &mut hits);
        assert!(hits.is_empty());
    }
}
