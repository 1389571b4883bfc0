// src/lib.rs
use crate::catalog::RegionCatalog;
use crate::clip::SliceAxis;
use crate::config::ViewerConfig;
use crate::engine::{LoadOutcome, LoadTicket, ViewerEngine};
use crate::loader::{CompressedPrimitive, DecodedPrimitive, PrimitiveCodec};
use crate::region::RegionId;
use crate::render_buffers::RenderBuffers;
use crate::selection::Viewport;
use glam::Vec3;
use wasm_bindgen::prelude::*;

pub mod bvh;
pub mod catalog;
pub mod clip;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod loader;
pub mod primitives;
pub mod region;
pub mod render_buffers;
pub mod scene;
pub mod selection;

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Mesh decoder supplied by the page. Called as
/// `decode(bytes: Uint8Array, extension: string)` and expected to return
/// `{ positions: Float32Array, indices: Uint32Array }`.
struct JsCodec {
    extension: String,
    decode: js_sys::Function,
}

impl PrimitiveCodec for JsCodec {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn decode(&self, primitive: &CompressedPrimitive<'_>) -> Result<DecodedPrimitive, String> {
        let extension = serde_json::to_string(primitive.extension).map_err(|e| e.to_string())?;
        let bytes = js_sys::Uint8Array::from(primitive.data);
        let out = self
            .decode
            .call2(&JsValue::NULL, &bytes.into(), &JsValue::from_str(&extension))
            .map_err(|e| js_message(&e))?;

        let field = |name: &str| {
            js_sys::Reflect::get(&out, &JsValue::from_str(name)).map_err(|e| js_message(&e))
        };
        let positions = js_sys::Float32Array::new(&field("positions")?).to_vec();
        let indices = js_sys::Uint32Array::new(&field("indices")?).to_vec();
        if positions.len() % 3 != 0 {
            return Err(format!(
                "{}: position count {} is not a multiple of 3",
                primitive.mesh,
                positions.len()
            ));
        }
        Ok(DecodedPrimitive {
            positions: positions
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect(),
            indices,
        })
    }
}

#[wasm_bindgen]
pub struct Viewer {
    engine: ViewerEngine,
    buffers: RenderBuffers,
    on_select: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl Viewer {
    /// `config_json` may be omitted for the shipped defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Viewer, JsValue> {
        let config = match config_json {
            Some(json) => ViewerConfig::from_json(&json).map_err(to_js)?,
            None => ViewerConfig::default(),
        };
        Ok(Viewer {
            engine: ViewerEngine::new(config),
            buffers: RenderBuffers::new(),
            on_select: None,
        })
    }

    pub fn asset_path(&self) -> String {
        self.engine.config().asset_path.clone()
    }

    pub fn codec_path(&self) -> String {
        self.engine.config().codec_path.clone()
    }

    pub fn region_feed_path(&self) -> String {
        self.engine.config().region_feed_path.clone()
    }

    pub fn register_codec(&mut self, extension: String, decode: js_sys::Function) {
        self.engine
            .register_codec(Box::new(JsCodec { extension, decode }));
    }

    /// Ticket for the fetch the host is about to start.
    pub fn begin_load(&mut self) -> u32 {
        self.engine.begin_load().id()
    }

    /// `false` when a newer load superseded this one.
    pub fn finish_load(&mut self, ticket: u32, bytes: &[u8]) -> Result<bool, JsValue> {
        match self
            .engine
            .finish_load_bytes(LoadTicket::from(ticket), bytes)
        {
            LoadOutcome::Installed => {
                if let Some(asset) = self.engine.asset() {
                    self.buffers.rebuild_geometry(asset);
                }
                Ok(true)
            }
            LoadOutcome::Superseded => Ok(false),
            LoadOutcome::Failed(err) => Err(to_js(err)),
        }
    }

    /// Logs feed and model disagreements; returns how many there were.
    pub fn check_region_feed(&self, json: &str) -> Result<u32, JsValue> {
        let catalog = RegionCatalog::from_json(json).map_err(to_js)?;
        let Some(index) = self.engine.index() else {
            return Ok(0);
        };
        let mismatch = catalog.reconcile(index);
        Ok((mismatch.without_region.len() + mismatch.without_entry.len()) as u32)
    }

    pub fn set_on_select(&mut self, callback: Option<js_sys::Function>) {
        self.on_select = callback;
    }

    pub fn set_slice_fraction(&mut self, fraction: f32) {
        self.engine.set_slice_fraction(fraction);
    }

    pub fn set_slice_axis(&mut self, axis: &str) -> Result<(), JsValue> {
        let axis: SliceAxis = axis.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.engine.set_slice_axis(axis);
        Ok(())
    }

    pub fn set_selected_region(&mut self, region: Option<String>) {
        self.engine.set_selected_region(region.map(RegionId::from));
    }

    /// Resolve a click and report a hit through `on_select`. A miss
    /// reports nothing.
    pub fn pointer_down(
        &self,
        x: f32,
        y: f32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> Result<Option<String>, JsValue> {
        let viewport = Viewport::new(left, top, width, height);
        let Some(region) = self.engine.pointer_down(x, y, &viewport) else {
            return Ok(None);
        };
        if let Some(callback) = &self.on_select {
            callback.call1(&JsValue::NULL, &JsValue::from_str(region.as_str()))?;
        }
        Ok(Some(region.as_str().to_string()))
    }

    pub fn orbit_rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.engine.orbit_rotate(d_azimuth, d_polar);
    }

    pub fn orbit_zoom(&mut self, delta: f32) {
        self.engine.orbit_zoom(delta);
    }

    pub fn orbit_pan(&mut self, dx: f32, dy: f32) {
        self.engine.orbit_pan(dx, dy);
    }

    /// Per-frame tick: pulse the highlight and refresh material, plane and
    /// camera buffers.
    pub fn frame(&mut self, dt: f32, width: f32, height: f32) {
        self.engine.advance(dt);
        if let Some(asset) = self.engine.asset() {
            self.buffers.update_materials(asset);
        }
        self.buffers
            .update_camera(self.engine.camera(), width, height);
    }

    // Pointers
    pub fn vertices_ptr(&self) -> *const f32 {
        self.buffers.vertices.as_ptr()
    }
    pub fn vertices_len(&self) -> usize {
        self.buffers.vertices.len()
    }
    pub fn indices_ptr(&self) -> *const u32 {
        self.buffers.indices.as_ptr()
    }
    pub fn indices_len(&self) -> usize {
        self.buffers.indices.len()
    }
    pub fn draws_ptr(&self) -> *const u32 {
        self.buffers.draws.as_ptr()
    }
    pub fn draws_len(&self) -> usize {
        self.buffers.draws.len()
    }
    pub fn materials_ptr(&self) -> *const f32 {
        self.buffers.materials.as_ptr()
    }
    pub fn materials_len(&self) -> usize {
        self.buffers.materials.len()
    }
    pub fn planes_ptr(&self) -> *const f32 {
        self.buffers.planes.as_ptr()
    }
    pub fn planes_len(&self) -> usize {
        self.buffers.planes.len()
    }
    pub fn camera_ptr(&self) -> *const f32 {
        self.buffers.camera_data.as_ptr()
    }
}
