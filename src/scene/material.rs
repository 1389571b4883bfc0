// src/scene/material.rs
use crate::clip::PlaneHandle;
use glam::Vec3;

/// Per-surface material state. A plain value owned by its surface, so
/// highlight and clip changes never leak to other surfaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMaterial {
    pub base_color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    authored_roughness: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub clipping_plane: Option<PlaneHandle>,
    pub clip_shadows: bool,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self::new(Vec3::splat(0.8), 0.0, 1.0)
    }
}

impl SurfaceMaterial {
    pub const NEUTRAL_EMISSIVE: Vec3 = Vec3::ZERO;
    pub const NEUTRAL_INTENSITY: f32 = 1.0;

    pub fn new(base_color: Vec3, metalness: f32, roughness: f32) -> Self {
        Self {
            base_color,
            metalness,
            roughness,
            authored_roughness: roughness,
            emissive: Self::NEUTRAL_EMISSIVE,
            emissive_intensity: Self::NEUTRAL_INTENSITY,
            clipping_plane: None,
            clip_shadows: false,
        }
    }

    pub fn with_emissive(mut self, emissive: Vec3) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn clip_with(&mut self, plane: PlaneHandle) {
        self.clipping_plane = Some(plane);
        self.clip_shadows = true;
    }

    pub fn highlight(&mut self, color: Vec3, intensity: f32, roughness: f32) {
        self.emissive = color;
        self.emissive_intensity = intensity;
        self.roughness = roughness;
    }

    /// Back to neutral emissive and the roughness the asset shipped with.
    pub fn clear_highlight(&mut self) {
        self.emissive = Self::NEUTRAL_EMISSIVE;
        self.emissive_intensity = Self::NEUTRAL_INTENSITY;
        self.roughness = self.authored_roughness;
    }

    pub fn is_highlighted(&self) -> bool {
        self.emissive != Self::NEUTRAL_EMISSIVE
    }
}

/// Keeps the single-vs-array shape of the source mesh's materials.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialSlots {
    Single(SurfaceMaterial),
    Multi(Vec<SurfaceMaterial>),
}

impl Default for MaterialSlots {
    fn default() -> Self {
        MaterialSlots::Single(SurfaceMaterial::default())
    }
}

impl MaterialSlots {
    pub fn len(&self) -> usize {
        match self {
            MaterialSlots::Single(_) => 1,
            MaterialSlots::Multi(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, MaterialSlots::Multi(_))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SurfaceMaterial> {
        match self {
            MaterialSlots::Single(m) => std::slice::from_ref(m).iter(),
            MaterialSlots::Multi(v) => v.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SurfaceMaterial> {
        match self {
            MaterialSlots::Single(m) => std::slice::from_mut(m).iter_mut(),
            MaterialSlots::Multi(v) => v.iter_mut(),
        }
    }
}
