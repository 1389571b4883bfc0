// src/render_buffers.rs
use crate::scene::{CameraConfig, SceneAsset};

/// `[r, g, b, metalness, er, eg, eb, emissive_intensity, roughness, plane, clip_shadows, pad]`
/// where `plane` is the clip plane index or -1.
pub const MATERIAL_STRIDE: usize = 12;
/// `[nx, ny, nz, offset]`
pub const PLANE_STRIDE: usize = 4;
/// `[first_index, index_count, material_index, surface_index]`
pub const DRAW_STRIDE: usize = 4;

/// Flat host-side copies of the scene. Geometry is packed once per load,
/// materials and planes every frame.
#[derive(Default)]
pub struct RenderBuffers {
    pub(crate) vertices: Vec<f32>, // vec4 stride
    pub(crate) indices: Vec<u32>,
    pub(crate) draws: Vec<u32>,
    pub(crate) materials: Vec<f32>,
    pub(crate) planes: Vec<f32>,
    pub(crate) camera_data: Vec<f32>,
}

impl RenderBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draws.clear();
        self.materials.clear();
        self.planes.clear();
    }

    /// Pack baked world geometry and one draw per material group.
    pub fn rebuild_geometry(&mut self, asset: &SceneAsset) {
        self.clear();

        let mut material_base = 0u32;
        for (surface_index, surface) in asset.surfaces().iter().enumerate() {
            let vertex_offset = (self.vertices.len() / 4) as u32;
            let index_offset = self.indices.len() as u32;

            for p in &surface.world.positions {
                self.vertices.extend_from_slice(&[p.x, p.y, p.z, 1.0]);
            }
            self.indices
                .extend(surface.world.indices.iter().map(|&i| i + vertex_offset));

            if surface.groups.is_empty() {
                self.draws.extend_from_slice(&[
                    index_offset,
                    surface.world.indices.len() as u32,
                    material_base,
                    surface_index as u32,
                ]);
            } else {
                for group in &surface.groups {
                    let slot = group.slot.min(surface.materials.len().saturating_sub(1));
                    self.draws.extend_from_slice(&[
                        index_offset + group.triangles.start * 3,
                        (group.triangles.end - group.triangles.start) * 3,
                        material_base + slot as u32,
                        surface_index as u32,
                    ]);
                }
            }
            material_base += surface.materials.len() as u32;
        }
        self.update_materials(asset);
    }

    /// Refresh material and plane state. Call after highlight or slice
    /// changes.
    pub fn update_materials(&mut self, asset: &SceneAsset) {
        self.materials.clear();
        let slots: usize = asset.surfaces().iter().map(|s| s.materials.len()).sum();
        self.materials.reserve(slots * MATERIAL_STRIDE);
        for surface in asset.surfaces() {
            for m in surface.materials.iter() {
                let plane = m.clipping_plane.map_or(-1.0, |h| h.0 as f32);
                self.materials.extend_from_slice(&[
                    m.base_color.x,
                    m.base_color.y,
                    m.base_color.z,
                    m.metalness,
                    m.emissive.x,
                    m.emissive.y,
                    m.emissive.z,
                    m.emissive_intensity,
                    m.roughness,
                    plane,
                    if m.clip_shadows { 1.0 } else { 0.0 },
                    0.0,
                ]);
            }
        }

        self.planes.clear();
        self.planes.reserve(asset.planes().len() * PLANE_STRIDE);
        for plane in asset.planes() {
            self.planes.extend_from_slice(&[
                plane.normal.x,
                plane.normal.y,
                plane.normal.z,
                plane.offset,
            ]);
        }
    }

    pub fn update_camera(&mut self, camera: &CameraConfig, width: f32, height: f32) {
        if height == 0.0 {
            return;
        }
        self.camera_data = camera.create_buffer(width / height).to_vec();
    }

    pub fn material_count(&self) -> usize {
        self.materials.len() / MATERIAL_STRIDE
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len() / DRAW_STRIDE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SliceAxis;
    use crate::geometry::Geometry;
    use crate::scene::{MaterialGroup, MaterialSlots, SurfaceMaterial};
    use glam::{vec3, Vec3};

    fn scene() -> SceneAsset {
        let mut asset = SceneAsset::new();
        let a = asset.add_node(asset.root(), "A");
        let mut g = Geometry::new();
        g.add_box(Vec3::ZERO, Vec3::ONE);
        asset.attach_surface(a, g, MaterialSlots::default());

        let b = asset.add_node(asset.root(), "B");
        let mut g = Geometry::new();
        g.add_box(vec3(3.0, 0.0, 0.0), Vec3::ONE);
        let sid = asset.attach_surface(
            b,
            g,
            MaterialSlots::Multi(vec![SurfaceMaterial::default(); 2]),
        );
        if let Some(surface) = asset.surface_mut(sid) {
            surface.groups = vec![
                MaterialGroup { triangles: 0..4, slot: 0 },
                MaterialGroup { triangles: 4..12, slot: 1 },
            ];
        }
        asset.finalize();
        asset
    }

    #[test]
    fn geometry_offsets_are_global() {
        let asset = scene();
        let mut buffers = RenderBuffers::new();
        buffers.rebuild_geometry(&asset);

        let first_vertices = asset.surfaces()[0].world.positions.len() as u32;
        assert_eq!(buffers.vertices.len(), 4 * 2 * first_vertices as usize);
        assert_eq!(buffers.indices.len(), 2 * 36);
        assert!(buffers.indices[36..].iter().all(|&i| i >= first_vertices));

        assert_eq!(buffers.draw_count(), 3);
        assert_eq!(&buffers.draws[..4], &[0, 36, 0, 0]);
        assert_eq!(&buffers.draws[4..8], &[36, 12, 1, 1]);
        assert_eq!(&buffers.draws[8..], &[48, 24, 2, 1]);
        assert_eq!(buffers.material_count(), 3);
    }

    #[test]
    fn material_state_follows_scene() {
        let mut asset = scene();
        let plane = asset.add_clip_plane(SliceAxis::Z);
        if let Some(s) = asset.surface_mut(crate::scene::SurfaceId(0)) {
            for m in s.materials.iter_mut() {
                m.clip_with(plane);
                m.highlight(vec3(0.0, 1.0, 0.5), 1.2, 0.2);
            }
        }
        if let Some(p) = asset.plane_mut(plane) {
            p.offset = 0.25;
        }

        let mut buffers = RenderBuffers::new();
        buffers.rebuild_geometry(&asset);
        let first = &buffers.materials[..MATERIAL_STRIDE];
        assert_eq!(&first[4..8], &[0.0, 1.0, 0.5, 1.2]);
        assert_eq!(first[8], 0.2);
        assert_eq!(first[9], 0.0);
        assert_eq!(first[10], 1.0);
        // Second surface is not clipped
        assert_eq!(buffers.materials[MATERIAL_STRIDE + 9], -1.0);
        assert_eq!(buffers.planes, vec![0.0, 0.0, -1.0, 0.25]);
    }

    #[test]
    fn camera_ignores_zero_height() {
        let mut buffers = RenderBuffers::new();
        buffers.update_camera(&CameraConfig::default(), 800.0, 0.0);
        assert!(buffers.camera_data.is_empty());
        buffers.update_camera(&CameraConfig::default(), 800.0, 600.0);
        assert_eq!(buffers.camera_data.len(), 32);
    }
}
