// src/region.rs
use crate::clip::PlaneHandle;
use crate::scene::{NodeId, SceneAsset, SurfaceId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Normalize a raw node name. Returns `None` when nothing is left.
    pub fn from_node_name(raw: &str) -> Option<Self> {
        let id: String = raw
            .trim_start_matches('_')
            .chars()
            .filter(|c| !matches!(c, '*' | '?'))
            .collect();
        (!id.is_empty()).then_some(RegionId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(base, side)` for names ending in `_L` or `_R`.
    pub fn bilateral_base(&self) -> Option<(&str, Side)> {
        let (base, side) = self.0.rsplit_once('_')?;
        if base.is_empty() {
            return None;
        }
        match side {
            "L" => Some((base, Side::Left)),
            "R" => Some((base, Side::Right)),
            _ => None,
        }
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        RegionId(s.to_string())
    }
}

impl From<String> for RegionId {
    fn from(s: String) -> Self {
        RegionId(s)
    }
}

impl Borrow<str> for RegionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Mapping from region identifier to its region node, plus the reverse
/// map used to recognise a region node by identity.
#[derive(Clone, Debug, Default)]
pub struct RegionIndex {
    by_id: HashMap<RegionId, NodeId>,
    by_node: HashMap<NodeId, RegionId>,
}

impl RegionIndex {
    // Later duplicates replace earlier ones
    pub fn build(asset: &mut SceneAsset, plane: PlaneHandle) -> Self {
        let mut index = RegionIndex::default();
        let roots: Vec<NodeId> = asset.region_roots().to_vec();

        for node in roots {
            let raw = asset.node(node).map(|n| n.name.clone()).unwrap_or_default();
            let Some(id) = RegionId::from_node_name(&raw) else {
                warn!(node = node.0, raw = %raw, "region node has no usable name, skipping");
                continue;
            };

            let surfaces = asset.surfaces_under(node);
            if surfaces.is_empty() {
                debug!(region = %id, "region has no surfaces");
            }
            for sid in surfaces {
                if let Some(surface) = asset.surface_mut(sid) {
                    for material in surface.materials.iter_mut() {
                        material.clip_with(plane);
                    }
                }
            }

            if let Some(previous) = index.by_id.insert(id.clone(), node) {
                warn!(region = %id, raw = %raw, "duplicate region name, later node wins");
                index.by_node.remove(&previous);
            }
            index.by_node.insert(node, id);
        }

        debug!(regions = index.len(), "built region index");
        index
    }

    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Identifier of `node` if it is itself a region node.
    pub fn region_of_node(&self, node: NodeId) -> Option<&RegionId> {
        self.by_node.get(&node)
    }

    /// Walk from `node` up through its ancestors to the nearest region node.
    pub fn enclosing_region(&self, asset: &SceneAsset, node: NodeId) -> Option<&RegionId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(id) = self.by_node.get(&n) {
                return Some(id);
            }
            current = asset.parent(n);
        }
        None
    }

    pub fn surfaces_of(&self, asset: &SceneAsset, id: &str) -> Vec<SurfaceId> {
        self.get(id)
            .map(|node| asset.surfaces_under(node))
            .unwrap_or_default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.by_id.keys()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SliceAxis;
    use crate::geometry::Geometry;
    use crate::scene::{MaterialSlots, SurfaceMaterial};
    use glam::Vec3;

    fn tri() -> Geometry {
        let mut g = Geometry::new();
        g.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        g
    }

    #[test]
    fn normalizes_raw_names() {
        assert_eq!(
            RegionId::from_node_name("__Hippocampus_L*"),
            Some(RegionId::from("Hippocampus_L"))
        );
        assert_eq!(
            RegionId::from_node_name("_Inferior frontal sulcus?_R"),
            Some(RegionId::from("Inferior frontal sulcus_R"))
        );
        assert_eq!(RegionId::from_node_name("Pons_mid_*"), Some(RegionId::from("Pons_mid_")));
        assert_eq!(RegionId::from_node_name("__*?"), None);
    }

    #[test]
    fn bilateral_suffix_detection() {
        let left = RegionId::from("Amygdala_L");
        assert_eq!(left.bilateral_base(), Some(("Amygdala", Side::Left)));
        assert_eq!(RegionId::from("Thal_R").bilateral_base(), Some(("Thal", Side::Right)));
        assert_eq!(RegionId::from("Vermis").bilateral_base(), None);
        assert_eq!(RegionId::from("_L").bilateral_base(), None);
        assert_eq!(RegionId::from("Area_LR").bilateral_base(), None);
    }

    #[test]
    fn build_assigns_plane_to_every_material() {
        let mut asset = SceneAsset::new();
        let plane = asset.add_clip_plane(SliceAxis::Z);
        let region = asset.add_node(asset.root(), "_Cortex");
        let part = asset.add_node(region, "part");
        let s1 = asset.attach_surface(region, tri(), MaterialSlots::default());
        let s2 = asset.attach_surface(
            part,
            tri(),
            MaterialSlots::Multi(vec![SurfaceMaterial::default(); 2]),
        );

        let index = RegionIndex::build(&mut asset, plane);
        assert_eq!(index.get("Cortex"), Some(region));
        for sid in [s1, s2] {
            let surface = asset.surface(sid).map(|s| s.materials.clone()).unwrap_or_default();
            assert!(surface
                .iter()
                .all(|m| m.clipping_plane == Some(plane) && m.clip_shadows));
        }
        let multi = asset.surface(s2).map(|s| s.materials.is_multi());
        assert_eq!(multi, Some(true));
    }

    #[test]
    fn later_duplicate_overwrites_earlier() {
        let mut asset = SceneAsset::new();
        let plane = asset.add_clip_plane(SliceAxis::Z);
        let first = asset.add_node(asset.root(), "Insula*");
        let second = asset.add_node(asset.root(), "__Insula");

        let index = RegionIndex::build(&mut asset, plane);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Insula"), Some(second));
        assert_eq!(index.region_of_node(first), None);
        assert_eq!(index.region_of_node(second), Some(&RegionId::from("Insula")));
    }

    #[test]
    fn empty_region_is_indexed_and_unnamed_is_skipped() {
        let mut asset = SceneAsset::new();
        let plane = asset.add_clip_plane(SliceAxis::Z);
        let empty = asset.add_node(asset.root(), "Empty");
        asset.add_node(asset.root(), "___");

        let index = RegionIndex::build(&mut asset, plane);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Empty"), Some(empty));
        assert!(index.surfaces_of(&asset, "Empty").is_empty());
    }

    #[test]
    fn enclosing_region_walks_ancestors() {
        let mut asset = SceneAsset::new();
        let plane = asset.add_clip_plane(SliceAxis::Z);
        let region = asset.add_node(asset.root(), "Cerebellum");
        let mid = asset.add_node(region, "lobe");
        let leaf = asset.add_node(mid, "folium");

        let index = RegionIndex::build(&mut asset, plane);
        assert_eq!(
            index.enclosing_region(&asset, leaf),
            Some(&RegionId::from("Cerebellum"))
        );
        assert_eq!(index.enclosing_region(&asset, asset.root()), None);
    }
}
