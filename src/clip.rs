// src/clip.rs
// Visible half-space: coord along the slicing axis <= offset.
use crate::scene::SceneAsset;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Hits further than this past the plane still count as visible.
pub const CLIP_EPSILON: f32 = 1e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceAxis {
    X,
    Y,
    #[default]
    Z,
}

impl SliceAxis {
    pub fn index(self) -> usize {
        match self {
            SliceAxis::X => 0,
            SliceAxis::Y => 1,
            SliceAxis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            SliceAxis::X => Vec3::X,
            SliceAxis::Y => Vec3::Y,
            SliceAxis::Z => Vec3::Z,
        }
    }

    pub fn coord(self, p: Vec3) -> f32 {
        p[self.index()]
    }
}

impl FromStr for SliceAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(SliceAxis::X),
            "y" => Ok(SliceAxis::Y),
            "z" => Ok(SliceAxis::Z),
            other => Err(format!("unknown slice axis '{other}'")),
        }
    }
}

impl fmt::Display for SliceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SliceAxis::X => "x",
            SliceAxis::Y => "y",
            SliceAxis::Z => "z",
        };
        f.write_str(s)
    }
}

// Index into the owning asset's planes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaneHandle(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlicingPlane {
    pub normal: Vec3,
    pub offset: f32,
}

impl SlicingPlane {
    pub fn new(axis: SliceAxis) -> Self {
        Self {
            normal: -axis.unit(),
            offset: 0.0,
        }
    }

    /// Signed distance; negative means clipped away.
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.offset
    }

    pub fn is_visible(&self, p: Vec3) -> bool {
        self.distance(p) >= -CLIP_EPSILON
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    /// `max <= min` means the asset has not been measured yet.
    pub fn is_degenerate(&self) -> bool {
        !(self.max > self.min)
    }

    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

#[derive(Clone, Debug)]
pub struct ClipPlaneController {
    axis: SliceAxis,
    bounds: Bounds,
    fraction: f32,
}

impl Default for ClipPlaneController {
    fn default() -> Self {
        Self::new(SliceAxis::default())
    }
}

impl ClipPlaneController {
    pub fn new(axis: SliceAxis) -> Self {
        Self {
            axis,
            bounds: Bounds::default(),
            fraction: 100.0,
        }
    }

    pub fn axis(&self) -> SliceAxis {
        self.axis
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// World-space extent of the asset along `axis`. Empty assets give
    /// degenerate bounds.
    pub fn compute_bounds(asset: &SceneAsset, axis: SliceAxis) -> Bounds {
        let aabb = asset.world_bounds();
        if aabb.is_empty() {
            return Bounds::default();
        }
        Bounds {
            min: axis.coord(aabb.min),
            max: axis.coord(aabb.max),
        }
    }

    /// Measure the freshly loaded asset and re-apply the current fraction.
    pub fn attach(&mut self, asset: &mut SceneAsset) {
        self.bounds = Self::compute_bounds(asset, self.axis);
        debug!(axis = %self.axis, min = self.bounds.min, max = self.bounds.max, "slice bounds");
        let axis = self.axis;
        let fraction = self.fraction;
        if let Some(plane) = asset.clip_plane_mut() {
            plane.normal = -axis.unit();
            self.apply(fraction, plane);
        }
    }

    /// `fraction` in percent. Pure in bounds and fraction; no-op while the
    /// bounds are degenerate.
    pub fn set_slice_fraction(&mut self, fraction: f32, plane: &mut SlicingPlane) {
        let fraction = if fraction.is_nan() {
            self.fraction
        } else {
            fraction.clamp(0.0, 100.0)
        };
        self.fraction = fraction;
        self.apply(fraction, plane);
    }

    /// Switch axis; bounds are recomputed against `asset` before the plane
    /// moves again.
    pub fn set_axis(&mut self, axis: SliceAxis, asset: &mut SceneAsset) {
        if axis == self.axis && !self.bounds.is_degenerate() {
            return;
        }
        self.axis = axis;
        self.attach(asset);
    }

    pub fn offset_for(&self, fraction: f32) -> Option<f32> {
        if self.bounds.is_degenerate() {
            return None;
        }
        Some(self.bounds.lerp(fraction.clamp(0.0, 100.0) / 100.0))
    }

    fn apply(&self, fraction: f32, plane: &mut SlicingPlane) {
        if let Some(offset) = self.offset_for(fraction) {
            plane.offset = offset;
        }
    }
}
