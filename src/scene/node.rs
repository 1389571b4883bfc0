// src/scene/node.rs
use super::material::MaterialSlots;
use crate::bvh::Blas;
use crate::geometry::Geometry;
use glam::{Mat4, Quat, Vec3};
use std::ops::Range;

// --- Scene Graph Nodes ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub usize);

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub surfaces: Vec<SurfaceId>,

    // Local Transform
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    // Computed Global Transform
    pub global_transform: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            surfaces: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            global_transform: Mat4::IDENTITY,
        }
    }
}

impl Node {
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Triangle range drawn with one material slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialGroup {
    pub triangles: Range<u32>,
    pub slot: usize,
}

// --- Renderable surface ---

/// A mesh hanging off a node. `local` is authored geometry, `world` is the
/// baked copy that picking and bounds work against.
#[derive(Clone, Debug)]
pub struct Surface {
    pub node: NodeId,
    pub local: Geometry,
    pub world: Geometry,
    pub blas: Blas,
    pub materials: MaterialSlots,
    pub groups: Vec<MaterialGroup>,
}

impl Surface {
    pub fn new(node: NodeId, local: Geometry, materials: MaterialSlots) -> Self {
        Self {
            node,
            world: local.clone(),
            local,
            blas: Blas::default(),
            materials,
            groups: Vec::new(),
        }
    }
}
