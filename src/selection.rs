// src/selection.rs
use crate::bvh::TriangleHit;
use crate::clip::{SliceAxis, SlicingPlane, CLIP_EPSILON};
use crate::primitives::Ray;
use crate::region::{RegionId, RegionIndex};
use crate::scene::{CameraConfig, SceneAsset, SurfaceId};
use glam::{vec2, Vec2, Vec3};
use std::cmp::Ordering;
use tracing::trace;

/// Canvas rectangle in device pixels, relative to the same origin as the
/// pointer coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    /// Device pixels to `[-1, 1]` on both axes, +y up.
    pub fn to_ndc(&self, x: f32, y: f32) -> Option<Vec2> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        Some(vec2(
            (x - self.left) / self.width * 2.0 - 1.0,
            -((y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub surface: SurfaceId,
    pub distance: f32,
    pub point: Vec3,
}

/// Every surface hit along `ray`, nearest first.
pub fn intersect_surfaces(asset: &SceneAsset, ray: &Ray) -> Vec<SurfaceHit> {
    let mut candidates = Vec::new();
    asset.pick_tree().candidates(ray, &mut candidates);

    let mut hits = Vec::new();
    let mut tri_hits: Vec<TriangleHit> = Vec::new();
    for slot in candidates {
        let sid = SurfaceId(slot);
        let Some(surface) = asset.surface(sid) else {
            continue;
        };
        tri_hits.clear();
        surface.blas.intersect_all(&surface.world, ray, &mut tri_hits);
        hits.extend(tri_hits.iter().map(|h| SurfaceHit {
            surface: sid,
            distance: h.distance,
            point: ray.at(h.distance),
        }));
    }
    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    hits
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionResolver {
    pub axis: SliceAxis,
    pub epsilon: f32,
}

impl Default for SelectionResolver {
    fn default() -> Self {
        Self {
            axis: SliceAxis::Z,
            epsilon: CLIP_EPSILON,
        }
    }
}

impl SelectionResolver {
    pub fn new(axis: SliceAxis) -> Self {
        Self {
            axis,
            ..Default::default()
        }
    }

    /// Nearest region whose hit point is not clipped away. `None` means no
    /// new selection; the caller keeps whatever was selected before.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &self,
        pointer_x: f32,
        pointer_y: f32,
        viewport: &Viewport,
        camera: &CameraConfig,
        index: &RegionIndex,
        asset: &SceneAsset,
        plane: &SlicingPlane,
    ) -> Option<RegionId> {
        let ndc = viewport.to_ndc(pointer_x, pointer_y)?;
        let ray = camera.ray_from_ndc(ndc, viewport.aspect_ratio());
        self.resolve_ray(&ray, index, asset, plane)
    }

    pub fn resolve_ray(
        &self,
        ray: &Ray,
        index: &RegionIndex,
        asset: &SceneAsset,
        plane: &SlicingPlane,
    ) -> Option<RegionId> {
        if index.is_empty() {
            return None;
        }
        for hit in intersect_surfaces(asset, ray) {
            if self.is_clipped(hit.point, plane) {
                trace!(distance = hit.distance, "hit beyond slice, skipping");
                continue;
            }
            let node = asset.surface(hit.surface)?.node;
            if let Some(id) = index.enclosing_region(asset, node) {
                return Some(id.clone());
            }
        }
        None
    }

    pub fn is_clipped(&self, point: Vec3, plane: &SlicingPlane) -> bool {
        self.axis.coord(point) > plane.offset + self.epsilon
    }
}
