// src/loader.rs
use crate::error::{AssetLoadError, LoadResult};
use crate::geometry::Geometry;
use crate::scene::{MaterialGroup, MaterialSlots, NodeId, SceneAsset, SurfaceMaterial};
use glam::{vec3, Quat, Vec3};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Uniform scale applied to every loaded asset before centering.
pub const DEFAULT_MODEL_SCALE: f32 = 6.0;

/// Positions and triangle indices produced by a codec.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedPrimitive {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

/// What a codec gets to decode one compressed primitive.
pub struct CompressedPrimitive<'a> {
    pub mesh: &'a str,
    /// The extension object as stored on the primitive.
    pub extension: &'a Value,
    /// Bytes of the buffer view the extension points at.
    pub data: &'a [u8],
}

/// Decoder for one mesh-compression extension. Hosts register one per
/// extension they ship a decoder for.
pub trait PrimitiveCodec {
    fn extension(&self) -> &str;
    fn decode(&self, primitive: &CompressedPrimitive<'_>) -> Result<DecodedPrimitive, String>;
}

pub struct AssetLoader {
    scale: f32,
    codecs: Vec<Box<dyn PrimitiveCodec>>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_SCALE)
    }
}

impl AssetLoader {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            codecs: Vec::new(),
        }
    }

    pub fn with_codec(mut self, codec: Box<dyn PrimitiveCodec>) -> Self {
        self.register_codec(codec);
        self
    }

    pub fn register_codec(&mut self, codec: Box<dyn PrimitiveCodec>) {
        self.codecs.retain(|c| c.extension() != codec.extension());
        self.codecs.push(codec);
    }

    pub fn has_codec(&self, extension: &str) -> bool {
        self.codecs.iter().any(|c| c.extension() == extension)
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> LoadResult<SceneAsset> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_slice(&bytes)
    }

    /// Parse a GLB (or self-contained glTF) and normalize it.
    pub fn load_slice(&self, data: &[u8]) -> LoadResult<SceneAsset> {
        // Compressed files list their codec under extensionsRequired, which
        // the validating parser rejects
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(data)?;
        let buffers = gltf::import_buffers(&document, None, blob)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetLoadError::Malformed("document has no scene".into()))?;

        let mut asset = SceneAsset::new();
        let root = asset.root();
        let ctx = BuildContext {
            document: &document,
            buffers: &buffers,
            codecs: &self.codecs,
        };
        for node in scene.nodes() {
            ctx.add_node(&mut asset, root, &node)?;
        }

        if asset.surfaces().iter().all(|s| s.local.is_empty()) {
            return Err(AssetLoadError::Empty);
        }

        asset.normalize(self.scale);
        asset.finalize();
        info!(
            nodes = asset.node_count(),
            surfaces = asset.surface_count(),
            regions = asset.region_roots().len(),
            "asset loaded"
        );
        Ok(asset)
    }
}

struct BuildContext<'a> {
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    codecs: &'a [Box<dyn PrimitiveCodec>],
}

impl BuildContext<'_> {
    fn add_node(
        &self,
        asset: &mut SceneAsset,
        parent: NodeId,
        node: &gltf::Node<'_>,
    ) -> LoadResult<()> {
        let id = asset.add_node(parent, node.name().unwrap_or_default());
        let (t, r, s) = node.transform().decomposed();
        if let Some(n) = asset.node_mut(id) {
            n.translation = Vec3::from(t);
            n.rotation = Quat::from_array(r);
            n.scale = Vec3::from(s);
        }

        if let Some(mesh) = node.mesh() {
            let (geometry, materials, groups) = self.read_mesh(&mesh)?;
            let sid = asset.attach_surface(id, geometry, materials);
            if let Some(surface) = asset.surface_mut(sid) {
                surface.groups = groups;
            }
        }

        for child in node.children() {
            self.add_node(asset, id, &child)?;
        }
        Ok(())
    }

    fn read_mesh(
        &self,
        mesh: &gltf::Mesh<'_>,
    ) -> LoadResult<(Geometry, MaterialSlots, Vec<MaterialGroup>)> {
        let mesh_name = mesh.name().unwrap_or("<unnamed>");
        let mut geom = Geometry::new();
        let mut materials = Vec::new();
        let mut groups = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(mesh = mesh_name, mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }

            let decoded = match primitive.extension_value(DRACO_EXTENSION) {
                Some(ext) => self.decode_compressed(mesh_name, DRACO_EXTENSION, ext)?,
                None => self.read_plain(&primitive),
            };

            // Checked per primitive, before offsetting into the shared buffer
            let part = Geometry {
                positions: decoded.positions,
                indices: decoded.indices,
            };
            if !part.indices_in_range() {
                return Err(AssetLoadError::Malformed(format!(
                    "mesh '{mesh_name}' has a primitive with indices past its vertex count"
                )));
            }
            let start_vertex = u32::try_from(geom.positions.len()).map_err(|_| {
                AssetLoadError::Malformed(format!("mesh '{mesh_name}' has too many vertices"))
            })?;
            let start_tri = geom.triangle_count() as u32;
            geom.positions.extend_from_slice(&part.positions);
            for &i in &part.indices {
                let index = i.checked_add(start_vertex).ok_or_else(|| {
                    AssetLoadError::Malformed(format!(
                        "mesh '{mesh_name}' index overflows the vertex buffer"
                    ))
                })?;
                geom.indices.push(index);
            }

            groups.push(MaterialGroup {
                triangles: start_tri..geom.triangle_count() as u32,
                slot: materials.len(),
            });
            materials.push(read_material(&primitive.material()));
        }

        debug!(
            mesh = mesh_name,
            triangles = geom.triangle_count(),
            slots = materials.len(),
            "mesh decoded"
        );

        let slots = match materials.len() {
            0 => MaterialSlots::default(),
            1 => MaterialSlots::Single(materials[0]),
            _ => MaterialSlots::Multi(materials),
        };
        Ok((geom, slots, groups))
    }

    fn read_plain(&self, primitive: &gltf::Primitive<'_>) -> DecodedPrimitive {
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|d| &d.0[..]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .map(|iter| iter.map(|p| vec3(p[0], p[1], p[2])).collect())
            .unwrap_or_default();

        let indices: Vec<u32> = reader
            .read_indices()
            .map(|iter| iter.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        DecodedPrimitive { positions, indices }
    }

    fn decode_compressed(
        &self,
        mesh: &str,
        extension: &str,
        value: &Value,
    ) -> LoadResult<DecodedPrimitive> {
        let codec = self
            .codecs
            .iter()
            .find(|c| c.extension() == extension)
            .ok_or_else(|| AssetLoadError::MissingCodec {
                extension: extension.to_string(),
            })?;

        let data = self.view_bytes(value).ok_or_else(|| {
            AssetLoadError::Malformed(format!("mesh '{mesh}': {extension} has no valid bufferView"))
        })?;

        codec
            .decode(&CompressedPrimitive {
                mesh,
                extension: value,
                data,
            })
            .map_err(|message| AssetLoadError::Codec {
                mesh: mesh.to_string(),
                message,
            })
    }

    fn view_bytes(&self, ext: &Value) -> Option<&[u8]> {
        let idx = ext.get("bufferView")?.as_u64()? as usize;
        let view = self.document.views().nth(idx)?;
        let buffer = self.buffers.get(view.buffer().index())?;
        buffer.0.get(view.offset()..view.offset() + view.length())
    }
}

fn read_material(material: &gltf::Material<'_>) -> SurfaceMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    SurfaceMaterial::new(vec3(r, g, b), pbr.metallic_factor(), pbr.roughness_factor())
        .with_emissive(Vec3::from(material.emissive_factor()))
}
