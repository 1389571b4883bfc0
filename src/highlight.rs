// src/highlight.rs
// Every selection change clears the previous set before lighting the next.
use crate::region::{RegionId, RegionIndex};
use crate::scene::{SceneAsset, SurfaceId};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightStyle {
    pub color: Vec3,
    pub baseline: f32,
    pub amplitude: f32,
    pub roughness: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            // #00FFDD
            color: Vec3::new(0.0, 1.0, 221.0 / 255.0),
            baseline: 0.8,
            amplitude: 0.4,
            roughness: 0.2,
        }
    }
}

impl HighlightStyle {
    pub fn intensity_at(&self, t: f32) -> f32 {
        self.baseline + self.amplitude * (2.0 * t).sin()
    }
}

/// Regions to light for `selected`: both sides of an `_L`/`_R` pair when
/// present, otherwise the region itself, otherwise nothing.
pub fn highlight_set(selected: &RegionId, index: &RegionIndex) -> Vec<RegionId> {
    if let Some((base, _)) = selected.bilateral_base() {
        let pair: Vec<RegionId> = ["L", "R"]
            .iter()
            .map(|side| RegionId::from(format!("{base}_{side}")))
            .filter(|id| index.contains(id.as_str()))
            .collect();
        if !pair.is_empty() {
            return pair;
        }
    }
    if index.contains(selected.as_str()) {
        vec![selected.clone()]
    } else {
        Vec::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum State {
    #[default]
    Idle,
    Highlighted {
        selected: RegionId,
        regions: Vec<RegionId>,
        surfaces: Vec<SurfaceId>,
        elapsed: f32,
    },
}

#[derive(Clone, Debug, Default)]
pub struct HighlightAnimator {
    style: HighlightStyle,
    state: State,
}

impl HighlightAnimator {
    pub fn new(style: HighlightStyle) -> Self {
        Self {
            style,
            state: State::Idle,
        }
    }

    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Highlighted { .. })
    }

    pub fn selected(&self) -> Option<&RegionId> {
        match &self.state {
            State::Idle => None,
            State::Highlighted { selected, .. } => Some(selected),
        }
    }

    /// Regions currently glowing.
    pub fn active_set(&self) -> &[RegionId] {
        match &self.state {
            State::Idle => &[],
            State::Highlighted { regions, .. } => regions,
        }
    }

    /// Feed the host's current selection. Same selection twice is a no-op;
    /// anything else clears the old set before lighting the new one.
    pub fn set_selection(
        &mut self,
        selected: Option<&RegionId>,
        index: &RegionIndex,
        asset: &mut SceneAsset,
    ) {
        if self.selected() == selected {
            return;
        }

        self.clear(asset);

        let Some(selected) = selected else {
            return;
        };
        let regions = highlight_set(selected, index);
        if regions.is_empty() {
            debug!(region = %selected, "selection not in index, nothing to highlight");
        }

        let surfaces: Vec<SurfaceId> = regions
            .iter()
            .flat_map(|id| index.surfaces_of(asset, id.as_str()))
            .collect();
        let intensity = self.style.intensity_at(0.0);
        for &sid in &surfaces {
            if let Some(surface) = asset.surface_mut(sid) {
                for m in surface.materials.iter_mut() {
                    m.highlight(self.style.color, intensity, self.style.roughness);
                }
            }
        }
        debug!(region = %selected, lit = ?regions, "highlight applied");

        self.state = State::Highlighted {
            selected: selected.clone(),
            regions,
            surfaces,
            elapsed: 0.0,
        };
    }

    /// Reset every surface of the current set and go idle.
    pub fn clear(&mut self, asset: &mut SceneAsset) {
        if let State::Highlighted { surfaces, .. } = std::mem::take(&mut self.state) {
            for sid in surfaces {
                if let Some(surface) = asset.surface_mut(sid) {
                    for m in surface.materials.iter_mut() {
                        m.clear_highlight();
                    }
                }
            }
        }
    }

    /// Advance the pulse by `dt` seconds. No-op while idle.
    pub fn advance(&mut self, dt: f32, asset: &mut SceneAsset) {
        let State::Highlighted {
            surfaces, elapsed, ..
        } = &mut self.state
        else {
            return;
        };
        *elapsed += dt.max(0.0);
        let intensity = self.style.intensity_at(*elapsed);
        for &sid in surfaces.iter() {
            if let Some(surface) = asset.surface_mut(sid) {
                for m in surface.materials.iter_mut() {
                    m.emissive_intensity = intensity;
                }
            }
        }
    }

    /// Forget the current set without touching surfaces, for when the asset
    /// it referred to has been dropped.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}
