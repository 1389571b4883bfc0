// src/scene/mod.rs
pub mod camera;
pub mod material;
pub mod node;

use crate::bvh::{Blas, Tlas};
use crate::clip::{PlaneHandle, SliceAxis, SlicingPlane};
use crate::geometry::Geometry;
use crate::primitives::AABB;
use glam::{Mat4, Vec3};
use tracing::debug;

pub use camera::{CameraConfig, OrbitControls};
pub use material::{MaterialSlots, SurfaceMaterial};
pub use node::{MaterialGroup, Node, NodeId, Surface, SurfaceId};

/// Decoded model: an arena of nodes under a synthetic root. The root's
/// direct children are the region nodes; surfaces hang off nodes by id.
///
/// Parent links are plain indices, so dropping the asset frees the whole
/// tree at once.
#[derive(Clone, Debug)]
pub struct SceneAsset {
    nodes: Vec<Node>,
    surfaces: Vec<Surface>,
    planes: Vec<SlicingPlane>,
    pick_tree: Tlas,
}

impl Default for SceneAsset {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneAsset {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "Scene".to_string(),
                ..Default::default()
            }],
            surfaces: Vec::new(),
            planes: Vec::new(),
            pick_tree: Tlas::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_node(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            parent: Some(parent),
            ..Default::default()
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn attach_surface(
        &mut self,
        node: NodeId,
        geometry: Geometry,
        materials: MaterialSlots,
    ) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(Surface::new(node, geometry, materials));
        self.nodes[node.0].surfaces.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Top-level children of the root.
    pub fn region_roots(&self) -> &[NodeId] {
        &self.nodes[0].children
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id.0)
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Every surface in the subtree rooted at `id`, depth first.
    pub fn surfaces_under(&self, id: NodeId) -> Vec<SurfaceId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes.get(n.0) else {
                continue;
            };
            out.extend_from_slice(&node.surfaces);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    // --- Transforms ---

    pub fn update_global_transforms(&mut self) {
        let mut stack = vec![(NodeId(0), Mat4::IDENTITY)];
        while let Some((id, parent_mat)) = stack.pop() {
            let global = parent_mat * self.nodes[id.0].local_transform();
            self.nodes[id.0].global_transform = global;
            for &child in &self.nodes[id.0].children {
                stack.push((child, global));
            }
        }
    }

    /// Exact bounds of every surface's vertices under current transforms.
    pub fn transformed_bounds(&self) -> AABB {
        let mut aabb = AABB::empty();
        for surface in &self.surfaces {
            let m = self.nodes[surface.node.0].global_transform;
            for p in &surface.local.positions {
                aabb.grow(m.transform_point3(*p));
            }
        }
        aabb
    }

    /// Uniform scale on the root, then shift so the bounding-box center
    /// lands on the origin.
    pub fn normalize(&mut self, scale: f32) {
        self.nodes[0].scale = Vec3::splat(scale);
        self.nodes[0].translation = Vec3::ZERO;
        self.update_global_transforms();

        let aabb = self.transformed_bounds();
        if !aabb.is_empty() {
            self.nodes[0].translation = -aabb.center();
            self.update_global_transforms();
        }
        debug!(scale, center = ?aabb.center(), "normalized asset");
    }

    /// Bake world-space geometry and rebuild the picking trees. Call after
    /// the last transform change.
    pub fn finalize(&mut self) {
        self.update_global_transforms();
        let mut entries = Vec::with_capacity(self.surfaces.len());
        for (i, surface) in self.surfaces.iter_mut().enumerate() {
            let m = self.nodes[surface.node.0].global_transform;
            surface.world = surface.local.transformed(m);
            surface.blas = Blas::build(&surface.world);
            entries.push((i, surface.blas.bounds()));
        }
        self.pick_tree = Tlas::build(&entries);
    }

    /// Exact vertex bounds of the baked world geometry. BVH boxes are
    /// padded and only serve traversal.
    pub fn world_bounds(&self) -> AABB {
        self.surfaces
            .iter()
            .fold(AABB::empty(), |acc, s| acc.union(&s.world.bounds()))
    }

    pub fn pick_tree(&self) -> &Tlas {
        &self.pick_tree
    }

    // --- Clip planes ---

    pub fn add_clip_plane(&mut self, axis: SliceAxis) -> PlaneHandle {
        self.planes.push(SlicingPlane::new(axis));
        PlaneHandle(self.planes.len() - 1)
    }

    pub fn plane(&self, handle: PlaneHandle) -> Option<&SlicingPlane> {
        self.planes.get(handle.0)
    }

    pub fn plane_mut(&mut self, handle: PlaneHandle) -> Option<&mut SlicingPlane> {
        self.planes.get_mut(handle.0)
    }

    pub fn planes(&self) -> &[SlicingPlane] {
        &self.planes
    }

    /// The shared slicing plane, if one has been created.
    pub fn clip_plane(&self) -> Option<&SlicingPlane> {
        self.planes.first()
    }

    pub fn clip_plane_mut(&mut self) -> Option<&mut SlicingPlane> {
        self.planes.first_mut()
    }

    pub fn clip_plane_handle(&self) -> Option<PlaneHandle> {
        (!self.planes.is_empty()).then_some(PlaneHandle(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::vec3;

    fn two_boxes() -> SceneAsset {
        let mut asset = SceneAsset::new();
        let a = asset.add_node(asset.root(), "A");
        let b = asset.add_node(asset.root(), "B");
        let mut ga = Geometry::new();
        ga.add_box(vec3(1.0, 1.0, 1.0), Vec3::ONE);
        let mut gb = Geometry::new();
        gb.add_box(vec3(3.0, 1.0, 1.0), Vec3::ONE);
        asset.attach_surface(a, ga, MaterialSlots::default());
        asset.attach_surface(b, gb, MaterialSlots::default());
        asset
    }

    #[test]
    fn normalize_scales_then_centers() {
        let mut asset = two_boxes();
        asset.normalize(2.0);
        asset.finalize();
        let aabb = asset.world_bounds();
        assert_relative_eq!(aabb.center().length(), 0.0, epsilon = 1e-5);
        // x extent 0.5..3.5 scaled by 2
        assert_relative_eq!(aabb.max.x - aabb.min.x, 6.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.y - aabb.min.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn world_bounds_ignore_bvh_padding() {
        let mut asset = SceneAsset::new();
        let node = asset.add_node(asset.root(), "Flat");
        let mut g = Geometry::new();
        g.add_box(Vec3::ZERO, Vec3::ONE);
        asset.attach_surface(node, g, MaterialSlots::default());
        asset.finalize();
        let aabb = asset.world_bounds();
        assert_eq!(aabb.min, Vec3::splat(-0.5));
        assert_eq!(aabb.max, Vec3::splat(0.5));
    }

    #[test]
    fn surfaces_under_walks_nested_children() {
        let mut asset = SceneAsset::new();
        let region = asset.add_node(asset.root(), "Region");
        let group = asset.add_node(region, "group");
        let leaf = asset.add_node(group, "leaf");
        let s1 = asset.attach_surface(group, Geometry::new(), MaterialSlots::default());
        let s2 = asset.attach_surface(leaf, Geometry::new(), MaterialSlots::default());

        assert_eq!(asset.surfaces_under(region), vec![s1, s2]);
        assert_eq!(asset.parent(leaf), Some(group));
        assert_eq!(asset.region_roots(), &[region]);
    }

    #[test]
    fn nested_transforms_are_baked() {
        let mut asset = SceneAsset::new();
        let region = asset.add_node(asset.root(), "Region");
        let child = asset.add_node(region, "child");
        if let Some(n) = asset.node_mut(region) {
            n.translation = vec3(10.0, 0.0, 0.0);
        }
        if let Some(n) = asset.node_mut(child) {
            n.scale = Vec3::splat(2.0);
        }
        let mut g = Geometry::new();
        g.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        let s = asset.attach_surface(child, g, MaterialSlots::default());
        asset.finalize();

        let world = &asset.surface(s).map(|s| s.world.positions.clone()).unwrap_or_default();
        assert_eq!(world[1], vec3(12.0, 0.0, 0.0));
    }
}
