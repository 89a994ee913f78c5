use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use base64::Engine as _;

use crate::animation::{AnimationClip, Interpolation, Keyframes};
use crate::asset_pipeline::gltf_document::*;
use crate::asset_pipeline::materials::{MaterialId, TextureId};
use crate::asset_pipeline::AssetResources;
use crate::error::ExportError;
use crate::model::{GeometryId, Vertex};
use crate::scene_graph::object3d::{Light, LightKind, NodeKind, ObjectId};
use crate::scene_graph::scene::SceneGraph;

pub const GLB_MIME_TYPE: &str = "model/gltf-binary";
pub const GLTF_MIME_TYPE: &str = "application/json";
pub const GLB_FILENAME: &str = "export.glb";
pub const GLTF_FILENAME: &str = "export.gltf";

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Prefer a single `.glb` container. JSON is still produced if the
    /// container cannot be written.
    pub binary: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { binary: true }
    }
}

#[derive(Debug, Clone)]
pub enum ExportPayload {
    Binary(Vec<u8>),
    Json(String),
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub payload: ExportPayload,
    pub mime_type: &'static str,
    pub suggested_filename: &'static str,
}

impl ExportArtifact {
    pub fn bytes(&self) -> &[u8] {
        match &self.payload {
            ExportPayload::Binary(bytes) => bytes,
            ExportPayload::Json(json) => json.as_bytes(),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.payload, ExportPayload::Binary(_))
    }
}

/// Serializes the subtree at `graph.root()` with its resources and clips.
pub fn export_scene<'c>(
    graph: &SceneGraph,
    resources: &AssetResources,
    clips: impl IntoIterator<Item = &'c AnimationClip>,
    options: ExportOptions,
) -> Result<ExportArtifact, ExportError> {
    let mut writer = DocumentWriter::new(resources);
    writer.write_nodes(graph);
    for clip in clips {
        writer.write_animation(clip);
    }

    let DocumentWriter {
        mut document,
        bin,
        lights,
        ..
    } = writer;

    if !lights.is_empty() {
        document.extensions_used.push(KHR_LIGHTS_PUNCTUAL);
        document.extensions = Some(RootExtensions {
            lights_punctual: LightsDef { lights },
        });
    }

    let byte_length = u32::try_from(bin.len()).map_err(|_| ExportError::BufferTooLarge(bin.len()))?;

    if options.binary {
        if !bin.is_empty() {
            document.buffers.push(BufferDef {
                byte_length,
                uri: None,
            });
        }

        match write_glb(&document, &bin) {
            Ok(bytes) => {
                log::info!("Exported {} byte GLB", bytes.len());
                return Ok(ExportArtifact {
                    payload: ExportPayload::Binary(bytes),
                    mime_type: GLB_MIME_TYPE,
                    suggested_filename: GLB_FILENAME,
                });
            }
            Err(err) => {
                log::warn!("GLB container failed ({}), falling back to glTF JSON", err);
                document.buffers.clear();
            }
        }
    }

    if !bin.is_empty() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bin);
        document.buffers.push(BufferDef {
            byte_length,
            uri: Some(format!("data:application/octet-stream;base64,{}", encoded)),
        });
    }

    let json = serde_json::to_string_pretty(&document)?;
    log::info!("Exported {} byte glTF JSON", json.len());
    Ok(ExportArtifact {
        payload: ExportPayload::Json(json),
        mime_type: GLTF_MIME_TYPE,
        suggested_filename: GLTF_FILENAME,
    })
}

fn write_glb(document: &Document, bin: &[u8]) -> anyhow::Result<Vec<u8>> {
    let json = serde_json::to_vec(document)?;
    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            // Recomputed by the writer
            length: 0,
        },
        json: Cow::Owned(json),
        bin: (!bin.is_empty()).then(|| Cow::Borrowed(bin)),
    };
    Ok(glb.to_vec()?)
}

struct DocumentWriter<'r> {
    resources: &'r AssetResources,
    document: Document,
    bin: Vec<u8>,
    lights: Vec<LightDef>,
    object_to_node: HashMap<ObjectId, u32>,
    mesh_cache: HashMap<(GeometryId, MaterialId), u32>,
    material_cache: HashMap<MaterialId, u32>,
    texture_cache: HashMap<TextureId, u32>,
}

fn gltf_index(len: usize) -> u32 {
    len as u32
}

impl<'r> DocumentWriter<'r> {
    fn new(resources: &'r AssetResources) -> Self {
        Self {
            resources,
            document: Document {
                extensions_used: Vec::new(),
                extensions: None,
                asset: AssetInfo::default(),
                scene: 0,
                scenes: Vec::new(),
                nodes: Vec::new(),
                meshes: Vec::new(),
                materials: Vec::new(),
                textures: Vec::new(),
                images: Vec::new(),
                accessors: Vec::new(),
                buffer_views: Vec::new(),
                buffers: Vec::new(),
                animations: Vec::new(),
            },
            bin: Vec::new(),
            lights: Vec::new(),
            object_to_node: HashMap::new(),
            mesh_cache: HashMap::new(),
            material_cache: HashMap::new(),
            texture_cache: HashMap::new(),
        }
    }

    fn write_nodes(&mut self, graph: &SceneGraph) {
        // Indices first so children can be referenced before they are written
        for (node_index, object_id) in graph.traverse(graph.root()).enumerate() {
            self.object_to_node.insert(object_id, gltf_index(node_index));
        }

        for object_id in graph.traverse(graph.root()) {
            let Some(object) = graph.get_object(object_id) else {
                continue;
            };

            let transform = &object.transform;
            let translation = transform.translation();
            let rotation = transform.rotation();
            let scale = transform.scale();

            let mesh = object.as_mesh().and_then(|mesh| {
                if mesh.materials.len() > 1 {
                    log::warn!(
                        "{}: only the first of {} materials is exported",
                        object.name,
                        mesh.materials.len()
                    );
                }
                let mesh_index = self.write_mesh(mesh.geometry, mesh.materials.first());
                if mesh_index.is_none() {
                    log::warn!("{}: mesh dropped from export", object.name);
                }
                mesh_index
            });

            let extensions = match &object.kind {
                NodeKind::Light(light) => Some(NodeExtensions {
                    lights_punctual: NodeLightDef {
                        light: self.write_light(&object.name, light),
                    },
                }),
                _ => None,
            };

            let node = NodeDef {
                name: (!object.name.is_empty()).then(|| object.name.clone()),
                children: object
                    .child_ids
                    .iter()
                    .filter_map(|child| self.object_to_node.get(child).copied())
                    .collect(),
                mesh,
                translation: (translation != glam::Vec3::ZERO).then(|| translation.to_array()),
                rotation: (rotation != glam::Quat::IDENTITY).then(|| rotation.to_array()),
                scale: (scale != glam::Vec3::ONE).then(|| scale.to_array()),
                extensions,
            };
            self.document.nodes.push(node);
        }

        self.document.scenes.push(SceneDef { nodes: vec![0] });
    }

    fn write_light(&mut self, name: &str, light: &Light) -> u32 {
        let (kind, range, spot) = match light.kind {
            LightKind::Directional => ("directional", None, None),
            LightKind::Point { range } => ("point", range, None),
            LightKind::Spot {
                inner_cone_angle,
                outer_cone_angle,
            } => (
                "spot",
                None,
                Some(SpotDef {
                    inner_cone_angle,
                    outer_cone_angle,
                }),
            ),
        };

        self.lights.push(LightDef {
            name: (!name.is_empty()).then(|| name.to_string()),
            color: light.color.to_array(),
            intensity: light.intensity,
            kind,
            range,
            spot,
        });
        gltf_index(self.lights.len() - 1)
    }

    fn push_view(&mut self, bytes: &[u8], byte_stride: Option<u32>, target: Option<u32>) -> u32 {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let byte_offset = gltf_index(self.bin.len());
        self.bin.extend_from_slice(bytes);

        self.document.buffer_views.push(BufferViewDef {
            buffer: 0,
            byte_offset,
            byte_length: gltf_index(bytes.len()),
            byte_stride,
            target,
        });
        gltf_index(self.document.buffer_views.len() - 1)
    }

    fn push_accessor(&mut self, accessor: AccessorDef) -> u32 {
        self.document.accessors.push(accessor);
        gltf_index(self.document.accessors.len() - 1)
    }

    fn write_mesh(&mut self, geometry_id: GeometryId, material_id: MaterialId) -> Option<u32> {
        if let Some(mesh) = self.mesh_cache.get(&(geometry_id, material_id)) {
            return Some(*mesh);
        }

        let resources = self.resources;
        let geometry = resources.geometries.get(geometry_id)?;
        if geometry.vertices.is_empty() {
            log::warn!("{}: skipping geometry without vertices", geometry.name);
            return None;
        }

        let stride = std::mem::size_of::<Vertex>() as u32;
        let count = gltf_index(geometry.vertex_count());
        let vertex_view = self.push_view(
            bytemuck::cast_slice(&geometry.vertices),
            Some(stride),
            Some(TARGET_ARRAY_BUFFER),
        );

        let bounds = geometry.bounding_box();
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "POSITION",
            self.push_accessor(AccessorDef {
                buffer_view: vertex_view,
                byte_offset: std::mem::offset_of!(Vertex, position) as u32,
                component_type: COMPONENT_FLOAT,
                count,
                kind: "VEC3",
                min: Some(bounds.min.to_array().to_vec()),
                max: Some(bounds.max.to_array().to_vec()),
            }),
        );
        if geometry.attributes.normals {
            attributes.insert(
                "NORMAL",
                self.push_accessor(AccessorDef {
                    buffer_view: vertex_view,
                    byte_offset: std::mem::offset_of!(Vertex, normal) as u32,
                    component_type: COMPONENT_FLOAT,
                    count,
                    kind: "VEC3",
                    min: None,
                    max: None,
                }),
            );
        }
        if geometry.attributes.tex_coords {
            attributes.insert(
                "TEXCOORD_0",
                self.push_accessor(AccessorDef {
                    buffer_view: vertex_view,
                    byte_offset: std::mem::offset_of!(Vertex, tex_coords) as u32,
                    component_type: COMPONENT_FLOAT,
                    count,
                    kind: "VEC2",
                    min: None,
                    max: None,
                }),
            );
        }

        let indices = geometry.indices.as_ref().map(|indices| {
            let view = self.push_view(
                bytemuck::cast_slice(indices),
                None,
                Some(TARGET_ELEMENT_ARRAY_BUFFER),
            );
            self.push_accessor(AccessorDef {
                buffer_view: view,
                byte_offset: 0,
                component_type: COMPONENT_UNSIGNED_INT,
                count: gltf_index(indices.len()),
                kind: "SCALAR",
                min: None,
                max: None,
            })
        });

        let material = self.write_material(material_id);
        self.document.meshes.push(MeshDef {
            name: (!geometry.name.is_empty()).then(|| geometry.name.clone()),
            primitives: vec![PrimitiveDef {
                attributes,
                indices,
                material,
            }],
        });

        let mesh = gltf_index(self.document.meshes.len() - 1);
        self.mesh_cache.insert((geometry_id, material_id), mesh);
        Some(mesh)
    }

    fn write_material(&mut self, material_id: MaterialId) -> Option<u32> {
        if let Some(material) = self.material_cache.get(&material_id) {
            return Some(*material);
        }

        let resources = self.resources;
        let material = resources.materials.get(material_id)?;
        let base_color_texture = material
            .pbr
            .base_color_texture
            .and_then(|texture| self.write_texture(texture))
            .map(|index| TextureInfoDef { index });

        self.document.materials.push(MaterialDef {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: PbrMetallicRoughnessDef {
                base_color_factor: material.pbr.base_color_factor.to_array(),
                base_color_texture,
                metallic_factor: material.pbr.metallic_factor,
                roughness_factor: material.pbr.roughness_factor,
            },
            emissive_factor: material.pbr.emissive_factor.to_array(),
            double_sided: material.double_sided,
        });

        let index = gltf_index(self.document.materials.len() - 1);
        self.material_cache.insert(material_id, index);
        Some(index)
    }

    fn write_texture(&mut self, texture_id: TextureId) -> Option<u32> {
        if let Some(texture) = self.texture_cache.get(&texture_id) {
            return Some(*texture);
        }

        let resources = self.resources;
        let texture = resources.textures.get(texture_id)?;
        let view = self.push_view(&texture.encoded, None, None);
        self.document.images.push(ImageDef {
            name: Some(texture.name.clone()),
            buffer_view: view,
            mime_type: texture.mime_type.clone(),
        });
        let source = gltf_index(self.document.images.len() - 1);
        self.document.textures.push(TextureDef { source });

        let index = gltf_index(self.document.textures.len() - 1);
        self.texture_cache.insert(texture_id, index);
        Some(index)
    }

    fn write_animation(&mut self, clip: &AnimationClip) {
        let mut channels = Vec::new();
        let mut samplers = Vec::new();

        for channel in &clip.channels {
            let Some(&node) = self.object_to_node.get(&channel.target) else {
                log::warn!("{}: channel targets a node outside the export", clip.name);
                continue;
            };
            if channel.timestamps.is_empty() || channel.keyframes.is_empty() {
                log::warn!("{}: skipping channel without keyframes", clip.name);
                continue;
            }

            let input_view = self.push_view(bytemuck::cast_slice(&channel.timestamps), None, None);
            let input = self.push_accessor(AccessorDef {
                buffer_view: input_view,
                byte_offset: 0,
                component_type: COMPONENT_FLOAT,
                count: gltf_index(channel.timestamps.len()),
                kind: "SCALAR",
                min: channel.timestamps.first().map(|t| vec![*t]),
                max: channel.timestamps.last().map(|t| vec![*t]),
            });

            let (path, kind, bytes, count): (&'static str, &'static str, &[u8], usize) =
                match &channel.keyframes {
                    Keyframes::Translation(values) => {
                        ("translation", "VEC3", bytemuck::cast_slice(values), values.len())
                    }
                    Keyframes::Rotation(values) => {
                        ("rotation", "VEC4", bytemuck::cast_slice(values), values.len())
                    }
                    Keyframes::Scale(values) => {
                        ("scale", "VEC3", bytemuck::cast_slice(values), values.len())
                    }
                };

            let output_view = self.push_view(bytes, None, None);
            let output = self.push_accessor(AccessorDef {
                buffer_view: output_view,
                byte_offset: 0,
                component_type: COMPONENT_FLOAT,
                count: gltf_index(count),
                kind,
                min: None,
                max: None,
            });

            samplers.push(AnimationSamplerDef {
                input,
                output,
                interpolation: match channel.interpolation {
                    Interpolation::Step => "STEP",
                    Interpolation::Linear => "LINEAR",
                    Interpolation::CubicSpline => "CUBICSPLINE",
                },
            });
            channels.push(AnimationChannelDef {
                sampler: gltf_index(samplers.len() - 1),
                target: AnimationTargetDef { node, path },
            });
        }

        self.document.animations.push(AnimationDef {
            name: Some(clip.name.clone()),
            channels,
            samplers,
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{export_scene, ExportOptions, ExportPayload, GLB_MIME_TYPE, GLTF_FILENAME};
    use crate::animation::{AnimationClip, Channel, Interpolation, Keyframes};
    use crate::asset_pipeline::materials::Material;
    use crate::asset_pipeline::DecodedScene;
    use crate::model::Geometry;
    use crate::scene_graph::object3d::{Light, LightKind, MaterialSlots, NodeKind, Object3D};

    fn export_json(scene: &DecodedScene) -> serde_json::Value {
        let artifact = export_scene(
            &scene.graph,
            &scene.resources,
            &scene.clips,
            ExportOptions { binary: false },
        )
        .unwrap();
        serde_json::from_slice(artifact.bytes()).unwrap()
    }

    fn triangle_scene() -> DecodedScene {
        let mut decoded = DecodedScene::new("root");
        let geometry = decoded.resources.geometries.alloc(Geometry::from_positions(
            "tri",
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            Some(vec![0, 1, 2]),
        ));
        let material = decoded.resources.materials.alloc(Material::new("red"));
        let root = decoded.graph.root();
        decoded
            .graph
            .add_child(root, Object3D::mesh("tri", geometry, MaterialSlots::single(material)));
        decoded
    }

    #[test]
    fn binary_export_is_a_glb_container() {
        let scene = triangle_scene();
        let artifact = export_scene(
            &scene.graph,
            &scene.resources,
            &scene.clips,
            ExportOptions::default(),
        )
        .unwrap();

        assert_eq!(artifact.mime_type, GLB_MIME_TYPE);
        let ExportPayload::Binary(bytes) = &artifact.payload else {
            panic!("expected binary payload");
        };
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn json_export_embeds_the_buffer() {
        let scene = triangle_scene();
        let artifact = export_scene(
            &scene.graph,
            &scene.resources,
            &scene.clips,
            ExportOptions { binary: false },
        )
        .unwrap();

        assert_eq!(artifact.suggested_filename, GLTF_FILENAME);
        let ExportPayload::Json(json) = &artifact.payload else {
            panic!("expected JSON payload");
        };
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["asset"]["version"], "2.0");
        assert!(value["buffers"][0]["uri"]
            .as_str()
            .unwrap()
            .starts_with("data:application/octet-stream;base64,"));
        assert_eq!(value["accessors"][0]["min"], serde_json::json!([0.0, 0.0, 0.0]));
    }

    #[test]
    fn empty_scene_exports_without_buffers() {
        let scene = DecodedScene::new("empty");
        let artifact = export_scene(
            &scene.graph,
            &scene.resources,
            &scene.clips,
            ExportOptions { binary: false },
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(artifact.bytes()).unwrap();
        assert!(value.get("buffers").is_none());
        assert_eq!(value["nodes"][0]["name"], "empty");
    }

    #[test]
    fn lights_are_written_as_punctual_extension() {
        let mut scene = DecodedScene::new("lit");
        let root = scene.graph.root();
        scene.graph.add_child(
            root,
            Object3D::new(
                "spot",
                NodeKind::Light(Light {
                    kind: LightKind::Spot {
                        inner_cone_angle: 0.25,
                        outer_cone_angle: 0.5,
                    },
                    color: Vec3::new(1.0, 0.5, 0.25),
                    intensity: 8.0,
                }),
            ),
        );

        let value = export_json(&scene);
        assert_eq!(value["extensionsUsed"], serde_json::json!(["KHR_lights_punctual"]));
        let light = &value["extensions"]["KHR_lights_punctual"]["lights"][0];
        assert_eq!(light["type"], "spot");
        assert_eq!(light["intensity"], 8.0);
        assert_eq!(light["spot"]["outerConeAngle"], 0.5);
        assert_eq!(value["nodes"][1]["extensions"]["KHR_lights_punctual"]["light"], 0);
    }

    #[test]
    fn scenes_without_lights_declare_no_extensions() {
        let value = export_json(&triangle_scene());
        assert!(value.get("extensionsUsed").is_none());
        assert!(value.get("extensions").is_none());
    }

    #[test]
    fn empty_geometry_keeps_its_node() {
        let mut scene = DecodedScene::new("root");
        let geometry = scene
            .resources
            .geometries
            .alloc(Geometry::from_positions("nothing", Vec::<Vec3>::new(), None));
        let material = scene.resources.materials.alloc(Material::new("unused"));
        let root = scene.graph.root();
        scene
            .graph
            .add_child(root, Object3D::mesh("hollow", geometry, MaterialSlots::single(material)));

        let value = export_json(&scene);
        assert_eq!(value["nodes"][1]["name"], "hollow");
        assert!(value["nodes"][1].get("mesh").is_none());
        assert!(value.get("meshes").is_none());
    }

    #[test]
    fn channels_without_keyframes_are_skipped() {
        let mut scene = triangle_scene();
        let target = scene.graph.get_object_by_name("tri").unwrap();
        scene.clips.push(AnimationClip::new(
            "sparse",
            vec![
                Channel {
                    target,
                    interpolation: Interpolation::Linear,
                    timestamps: vec![0.0, 1.0],
                    keyframes: Keyframes::Scale(Vec::new()),
                },
                Channel {
                    target,
                    interpolation: Interpolation::Step,
                    timestamps: vec![0.0, 1.0],
                    keyframes: Keyframes::Translation(vec![Vec3::ZERO, Vec3::X]),
                },
            ],
        ));

        let value = export_json(&scene);
        let animation = &value["animations"][0];
        assert_eq!(animation["channels"].as_array().unwrap().len(), 1);
        assert_eq!(animation["channels"][0]["target"]["path"], "translation");
        assert!(value["accessors"]
            .as_array()
            .unwrap()
            .iter()
            .all(|accessor| accessor["count"].as_u64().unwrap() > 0));
    }
}
