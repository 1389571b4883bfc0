// src/engine.rs
use crate::clip::{ClipPlaneController, SliceAxis, SlicingPlane};
use crate::config::ViewerConfig;
use crate::error::{AssetLoadError, LoadResult};
use crate::highlight::HighlightAnimator;
use crate::loader::{AssetLoader, PrimitiveCodec};
use crate::region::{RegionId, RegionIndex};
use crate::scene::{CameraConfig, OrbitControls, SceneAsset};
use crate::selection::{SelectionResolver, Viewport};
use tracing::{info, warn};

/// Identifies one load request. Only the newest ticket may install its
/// result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u32);

impl LoadTicket {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl From<u32> for LoadTicket {
    fn from(id: u32) -> Self {
        LoadTicket(id)
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Installed,
    Superseded,
    Failed(AssetLoadError),
}

struct Loaded {
    asset: SceneAsset,
    index: RegionIndex,
}

pub struct ViewerEngine {
    config: ViewerConfig,
    loader: AssetLoader,
    loaded: Option<Loaded>,
    generation: u32,
    clip: ClipPlaneController,
    resolver: SelectionResolver,
    highlight: HighlightAnimator,
    selected: Option<RegionId>,
    camera: CameraConfig,
    orbit: OrbitControls,
}

impl Default for ViewerEngine {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl ViewerEngine {
    pub fn new(config: ViewerConfig) -> Self {
        let resolver = SelectionResolver {
            axis: config.slice_axis,
            epsilon: config.clip_epsilon,
        };
        let mut camera = config.camera;
        config.orbit.sync(&mut camera);
        Self {
            loader: AssetLoader::new(config.model_scale),
            loaded: None,
            generation: 0,
            clip: ClipPlaneController::new(config.slice_axis),
            resolver,
            highlight: HighlightAnimator::new(config.highlight),
            selected: None,
            camera,
            orbit: config.orbit,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn register_codec(&mut self, codec: Box<dyn PrimitiveCodec>) {
        self.loader.register_codec(codec);
    }

    // --- Loading ---

    /// Start a load. Any earlier outstanding ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation = self.generation.wrapping_add(1);
        LoadTicket(self.generation)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Decode `bytes` for `ticket` and install the result if still current.
    pub fn finish_load_bytes(&mut self, ticket: LoadTicket, bytes: &[u8]) -> LoadOutcome {
        if ticket.0 != self.generation {
            warn!(ticket = ticket.0, current = self.generation, "stale load discarded before decode");
            return LoadOutcome::Superseded;
        }
        let result = self.loader.load_slice(bytes);
        self.finish_load(ticket, result)
    }

    /// Install a decoded asset. Stale or failed results leave the current
    /// asset and index untouched.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: LoadResult<SceneAsset>) -> LoadOutcome {
        if ticket.0 != self.generation {
            warn!(ticket = ticket.0, current = self.generation, "stale load discarded");
            return LoadOutcome::Superseded;
        }
        let mut asset = match result {
            Ok(asset) => asset,
            Err(err) => {
                warn!(error = %err, "asset load failed");
                return LoadOutcome::Failed(err);
            }
        };

        // The previous asset's surfaces go away with it
        self.highlight.reset();

        // Materials and picking must share one plane
        let plane = match asset.clip_plane_handle() {
            Some(handle) => handle,
            None => asset.add_clip_plane(self.clip.axis()),
        };
        let index = RegionIndex::build(&mut asset, plane);
        self.clip.attach(&mut asset);
        info!(regions = index.len(), "viewer ready");

        self.loaded = Some(Loaded { asset, index });
        self.sync_highlight();
        LoadOutcome::Installed
    }

    /// Convenience for native hosts: read and install in one step.
    pub fn load_path(&mut self, path: impl AsRef<std::path::Path>) -> LoadOutcome {
        let ticket = self.begin_load();
        let result = self.loader.load_path(path);
        self.finish_load(ticket, result)
    }

    pub fn asset(&self) -> Option<&SceneAsset> {
        self.loaded.as_ref().map(|l| &l.asset)
    }

    pub fn index(&self) -> Option<&RegionIndex> {
        self.loaded.as_ref().map(|l| &l.index)
    }

    // --- Downward inputs ---

    pub fn set_slice_fraction(&mut self, fraction: f32) {
        match self.loaded.as_mut().and_then(|l| l.asset.clip_plane_mut()) {
            Some(plane) => self.clip.set_slice_fraction(fraction, plane),
            None => {
                // Remember it for when the asset arrives
                let mut scratch = SlicingPlane::new(self.clip.axis());
                self.clip.set_slice_fraction(fraction, &mut scratch);
            }
        }
    }

    pub fn set_slice_axis(&mut self, axis: SliceAxis) {
        self.resolver.axis = axis;
        match self.loaded.as_mut() {
            Some(l) => self.clip.set_axis(axis, &mut l.asset),
            None => {
                let fraction = self.clip.fraction();
                self.clip = ClipPlaneController::new(axis);
                let mut scratch = SlicingPlane::new(axis);
                self.clip.set_slice_fraction(fraction, &mut scratch);
            }
        }
    }

    pub fn slice_axis(&self) -> SliceAxis {
        self.clip.axis()
    }

    pub fn slice_fraction(&self) -> f32 {
        self.clip.fraction()
    }

    pub fn clip_plane(&self) -> Option<&SlicingPlane> {
        self.asset().and_then(|a| a.clip_plane())
    }

    /// The host's current selection. Stale ids highlight nothing.
    pub fn set_selected_region(&mut self, selected: Option<RegionId>) {
        self.selected = selected;
        self.sync_highlight();
    }

    pub fn selected_region(&self) -> Option<&RegionId> {
        self.selected.as_ref()
    }

    fn sync_highlight(&mut self) {
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        self.highlight
            .set_selection(self.selected.as_ref(), &loaded.index, &mut loaded.asset);
    }

    // --- Events ---

    /// Resolve a pointer-down. `Some` is the region to report upward; a
    /// miss returns `None` and leaves the current selection alone.
    pub fn pointer_down(&self, x: f32, y: f32, viewport: &Viewport) -> Option<RegionId> {
        let loaded = self.loaded.as_ref()?;
        let plane = loaded.asset.clip_plane()?;
        self.resolver
            .resolve(x, y, viewport, &self.camera, &loaded.index, &loaded.asset, plane)
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(loaded) = self.loaded.as_mut() {
            self.highlight.advance(dt, &mut loaded.asset);
        }
    }

    pub fn highlighted(&self) -> &[RegionId] {
        self.highlight.active_set()
    }

    // --- Camera ---

    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    pub fn orbit_rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.orbit.rotate(&mut self.camera, d_azimuth, d_polar);
    }

    pub fn orbit_zoom(&mut self, delta: f32) {
        self.orbit.zoom(&mut self.camera, delta);
    }

    pub fn orbit_pan(&mut self, dx: f32, dy: f32) {
        self.orbit.pan(&mut self.camera, dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::loader::tests::build_glb;
    use crate::scene::MaterialSlots;
    use approx::assert_relative_eq;
    use glam::{vec3, Vec3};

    fn lobes() -> SceneAsset {
        let mut asset = SceneAsset::new();
        for (name, center) in [
            ("Frontal_L", vec3(-1.0, 0.0, 0.0)),
            ("Frontal_R", vec3(1.0, 0.0, 0.0)),
            ("Brainstem", Vec3::ZERO),
        ] {
            let node = asset.add_node(asset.root(), name);
            let mut g = Geometry::new();
            g.add_box(center, vec3(1.0, 1.0, 2.0));
            asset.attach_surface(node, g, MaterialSlots::default());
        }
        asset.normalize(1.0);
        asset.finalize();
        asset
    }

    fn loaded_engine() -> ViewerEngine {
        let mut engine = ViewerEngine::default();
        let ticket = engine.begin_load();
        assert!(matches!(
            engine.finish_load(ticket, Ok(lobes())),
            LoadOutcome::Installed
        ));
        engine
    }

    fn front_camera(engine: &mut ViewerEngine, x: f32, y: f32) {
        engine.camera = CameraConfig {
            lookfrom: vec3(x, y, 5.0),
            lookat: vec3(x, y, 0.0),
            ..Default::default()
        };
    }

    #[test]
    fn inputs_before_load_are_harmless() {
        let mut engine = ViewerEngine::default();
        engine.set_slice_fraction(30.0);
        engine.set_selected_region(Some(RegionId::from("Frontal_L")));
        engine.advance(0.016);
        let vp = Viewport::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(engine.pointer_down(50.0, 50.0, &vp), None);
        assert!(engine.highlighted().is_empty());
        assert!(engine.clip_plane().is_none());
    }

    #[test]
    fn slice_fraction_set_early_applies_on_load() {
        let mut engine = ViewerEngine::default();
        engine.set_slice_fraction(50.0);
        engine.set_slice_axis(SliceAxis::Z);
        assert_eq!(engine.slice_fraction(), 50.0);
        let ticket = engine.begin_load();
        engine.finish_load(ticket, Ok(lobes()));
        let offset = engine.clip_plane().map(|p| p.offset).unwrap_or(f32::NAN);
        // z spans -1..1 after centering
        assert_relative_eq!(offset, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn selection_made_before_load_lights_up_after() {
        let mut engine = ViewerEngine::default();
        engine.set_selected_region(Some(RegionId::from("Frontal_L")));
        let ticket = engine.begin_load();
        engine.finish_load(ticket, Ok(lobes()));
        assert_eq!(engine.highlighted().len(), 2);
    }

    #[test]
    fn existing_plane_is_shared_with_materials() {
        let mut asset = lobes();
        let existing = asset.add_clip_plane(SliceAxis::Z);
        let mut engine = ViewerEngine::default();
        let ticket = engine.begin_load();
        engine.finish_load(ticket, Ok(asset));
        engine.set_slice_fraction(0.0);

        let asset = engine.asset().expect("asset");
        assert_eq!(asset.planes().len(), 1);
        assert!(asset
            .surfaces()
            .iter()
            .flat_map(|s| s.materials.iter())
            .all(|m| m.clipping_plane == Some(existing)));
        let offset = asset.plane(existing).map(|p| p.offset).unwrap_or(f32::NAN);
        // Exact vertex extent, z spans -1..1
        assert_eq!(offset, -1.0);
        assert_eq!(engine.clip_plane().map(|p| p.offset), Some(offset));
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut engine = loaded_engine();
        let stale = engine.begin_load();
        let fresh = engine.begin_load();

        let mut other = SceneAsset::new();
        let n = other.add_node(other.root(), "Other");
        let mut g = Geometry::new();
        g.add_box(Vec3::ZERO, Vec3::ONE);
        other.attach_surface(n, g, MaterialSlots::default());
        other.finalize();

        assert!(matches!(engine.finish_load(stale, Ok(other)), LoadOutcome::Superseded));
        assert!(engine.index().map(|i| i.contains("Brainstem")).unwrap_or(false));

        assert!(matches!(engine.finish_load_bytes(stale, b"x"), LoadOutcome::Superseded));
        assert!(matches!(
            engine.finish_load(fresh, Err(AssetLoadError::Empty)),
            LoadOutcome::Failed(AssetLoadError::Empty)
        ));
        assert!(engine.is_loaded());
    }

    #[test]
    fn pointer_selects_and_miss_keeps_selection() {
        let mut engine = loaded_engine();
        engine.set_slice_fraction(100.0);
        let vp = Viewport::new(0.0, 0.0, 400.0, 400.0);

        front_camera(&mut engine, -1.1, 0.2);
        let hit = engine.pointer_down(200.0, 200.0, &vp);
        assert_eq!(hit, Some(RegionId::from("Frontal_L")));
        engine.set_selected_region(hit);
        assert_eq!(
            engine.highlighted(),
            &[RegionId::from("Frontal_L"), RegionId::from("Frontal_R")]
        );

        front_camera(&mut engine, 9.0, 9.0);
        assert_eq!(engine.pointer_down(200.0, 200.0, &vp), None);
        assert_eq!(engine.selected_region(), Some(&RegionId::from("Frontal_L")));
    }

    #[test]
    fn fully_sliced_model_is_not_pickable() {
        let mut engine = loaded_engine();
        engine.set_slice_fraction(0.0);
        front_camera(&mut engine, -1.1, 0.2);
        let vp = Viewport::new(0.0, 0.0, 400.0, 400.0);
        // Near face at z=1 is clipped; far face sits exactly on the plane
        // and still counts as visible
        assert_eq!(
            engine.pointer_down(200.0, 200.0, &vp),
            Some(RegionId::from("Frontal_L"))
        );

        engine.set_slice_axis(SliceAxis::X);
        assert_eq!(engine.slice_fraction(), 0.0);
        assert_eq!(engine.clip_plane().map(|p| p.normal), Some(-Vec3::X));
        // x spans -1.5..1.5 so the plane sits at -1.5 and the whole
        // brainstem lies beyond it
        front_camera(&mut engine, 0.0, 0.2);
        assert_eq!(engine.pointer_down(200.0, 200.0, &vp), None);
    }

    #[test]
    fn reload_resets_highlight_state() {
        let mut engine = loaded_engine();
        engine.set_selected_region(Some(RegionId::from("Brainstem")));
        assert_eq!(engine.highlighted(), &[RegionId::from("Brainstem")]);

        let glb = build_glb(&[("Cerebellum", Vec3::ZERO)], false);
        let ticket = engine.begin_load();
        assert!(matches!(
            engine.finish_load_bytes(ticket, &glb),
            LoadOutcome::Installed
        ));
        // Selection is stale against the new asset
        assert!(engine.highlighted().is_empty());
        assert_eq!(engine.index().map(|i| i.len()), Some(1));
    }
}
