use std::collections::HashMap;
use std::path::Path;

use base64::Engine as _;
use glam::{Quat, Vec2, Vec3, Vec4};

use crate::animation::{AnimationClip, Channel, Interpolation, Keyframes};
use crate::asset_pipeline::materials::{Material, MaterialId, PbrMaterialData, Texture, TextureId};
use crate::asset_pipeline::DecodedScene;
use crate::error::{DecodeError, DecodeResult};
use crate::model::{Geometry, GeometryId, Vertex, VertexAttributes};
use crate::scene_graph::object3d::{Light, LightKind, MaterialSlots, NodeKind, Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

/// Turns raw asset bytes into a [`DecodedScene`]. `base_dir` resolves
/// relative buffer and image URIs.
pub trait SceneDecoder {
    fn decode(&self, bytes: &[u8], base_dir: Option<&Path>) -> DecodeResult;
}

/// Decodes `.glb` containers and `.gltf` JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfDecoder;

impl SceneDecoder for GltfDecoder {
    fn decode(&self, bytes: &[u8], base_dir: Option<&Path>) -> DecodeResult {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base_dir, blob)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(DecodeError::NoScene)?;

        let mut builder = SceneBuilder::new(&buffers, base_dir);
        let root = builder.decoded.graph.root();
        for node in scene.nodes() {
            builder.spawn_node(&node, root)?;
        }
        for animation in document.animations() {
            let clip = builder.read_animation(&animation);
            builder.decoded.clips.push(clip);
        }

        let decoded = builder.decoded;
        log::debug!(
            "Decoded glTF scene: {} objects, {} geometries, {} materials, {} clips",
            decoded.graph.len(),
            decoded.resources.geometries.len(),
            decoded.resources.materials.len(),
            decoded.clips.len()
        );
        Ok(decoded)
    }
}

fn buffer_slice<'s>(buffers: &'s [gltf::buffer::Data], buffer: gltf::Buffer) -> Option<&'s [u8]> {
    buffers.get(buffer.index()).map(|data| &**data)
}

struct SceneBuilder<'a> {
    buffers: &'a [gltf::buffer::Data],
    base_dir: Option<&'a Path>,
    decoded: DecodedScene,
    gltf_mesh_to_primitives: HashMap<usize, Vec<(GeometryId, MaterialId)>>,
    gltf_material_to_material: HashMap<Option<usize>, MaterialId>,
    gltf_image_to_texture: HashMap<usize, Option<TextureId>>,
    gltf_node_to_object: HashMap<usize, ObjectId>,
}

impl<'a> SceneBuilder<'a> {
    fn new(buffers: &'a [gltf::buffer::Data], base_dir: Option<&'a Path>) -> Self {
        Self {
            buffers,
            base_dir,
            decoded: DecodedScene::new("Scene"),
            gltf_mesh_to_primitives: HashMap::new(),
            gltf_material_to_material: HashMap::new(),
            gltf_image_to_texture: HashMap::new(),
            gltf_node_to_object: HashMap::new(),
        }
    }

    fn spawn_node(&mut self, node: &gltf::Node, parent: ObjectId) -> Result<ObjectId, DecodeError> {
        let node_name = node
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Node {}", node.index()));
        let (translation, rotation, scale) = node.transform().decomposed();
        let transform = Transform::new(
            Vec3::from(translation),
            Quat::from_array(rotation),
            Vec3::from(scale),
        );

        let primitives = match node.mesh() {
            Some(mesh) => self.load_mesh(&mesh)?,
            None => Vec::new(),
        };

        let kind = match primitives.as_slice() {
            [(geometry, material)] => NodeKind::Mesh(crate::scene_graph::Mesh {
                geometry: *geometry,
                materials: MaterialSlots::single(*material),
            }),
            [] => match node.light() {
                Some(light) => NodeKind::Light(read_light(&light)),
                None if node.children().next().is_some() => NodeKind::Group,
                None => NodeKind::Empty,
            },
            _ => NodeKind::Group,
        };

        let object = Object3D::new(node_name.clone(), kind).with_transform(transform);
        let object_id = self.decoded.graph.add_child(parent, object);
        self.gltf_node_to_object.insert(node.index(), object_id);

        // One child per primitive, like a multi-material mesh split into parts
        if primitives.len() > 1 {
            for (index, (geometry, material)) in primitives.into_iter().enumerate() {
                self.decoded.graph.add_child(
                    object_id,
                    Object3D::mesh(
                        format!("{}_{}", node_name, index),
                        geometry,
                        MaterialSlots::single(material),
                    ),
                );
            }
        }

        for child in node.children() {
            self.spawn_node(&child, object_id)?;
        }

        Ok(object_id)
    }

    fn load_mesh(&mut self, mesh: &gltf::Mesh) -> Result<Vec<(GeometryId, MaterialId)>, DecodeError> {
        if let Some(primitives) = self.gltf_mesh_to_primitives.get(&mesh.index()) {
            return Ok(primitives.clone());
        }

        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Mesh {}", mesh.index()));

        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let geometry = self.read_geometry(&mesh_name, &primitive)?;
            let geometry_id = self.decoded.resources.geometries.alloc(geometry);
            let material_id = self.load_material(&primitive.material());
            primitives.push((geometry_id, material_id));
        }

        self.gltf_mesh_to_primitives
            .insert(mesh.index(), primitives.clone());
        Ok(primitives)
    }

    fn read_geometry(
        &self,
        mesh_name: &str,
        primitive: &gltf::Primitive,
    ) -> Result<Geometry, DecodeError> {
        use gltf::mesh::Mode;

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffer_slice(buffers, buffer));

        let mut vertices: Vec<Vertex> = reader
            .read_positions()
            .ok_or_else(|| DecodeError::MissingPositions {
                mesh: mesh_name.to_string(),
            })?
            .map(|position| Vertex {
                position: Vec3::from(position),
                ..Default::default()
            })
            .collect();

        let mut attributes = VertexAttributes::default();
        if let Some(normals) = reader.read_normals() {
            attributes.normals = true;
            for (vertex, normal) in vertices.iter_mut().zip(normals) {
                vertex.normal = Vec3::from(normal);
            }
        }
        if let Some(tex_coords) = reader.read_tex_coords(0) {
            attributes.tex_coords = true;
            for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
                vertex.tex_coords = Vec2::from(uv);
            }
        }

        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect::<Vec<u32>>());

        let indices = match primitive.mode() {
            Mode::Triangles => indices,
            Mode::TriangleStrip => Some(strip_to_list(&sequence_or(indices, vertices.len()))),
            Mode::TriangleFan => Some(fan_to_list(&sequence_or(indices, vertices.len()))),
            mode => {
                return Err(DecodeError::UnsupportedPrimitive {
                    mesh: mesh_name.to_string(),
                    mode,
                })
            }
        };

        let name = format!("{} (primitive {})", mesh_name, primitive.index());
        Ok(Geometry::new(name, vertices, indices, attributes))
    }

    fn load_material(&mut self, material: &gltf::Material) -> MaterialId {
        if let Some(id) = self.gltf_material_to_material.get(&material.index()) {
            return *id;
        }

        let pbr = material.pbr_metallic_roughness();
        let base_color_texture = pbr
            .base_color_texture()
            .and_then(|info| self.load_image(&info.texture().source()));

        let name = match material.index() {
            Some(index) => material
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("Material {}", index)),
            None => "Default".to_string(),
        };

        let material_data = Material {
            name,
            pbr: PbrMaterialData {
                base_color_factor: Vec4::from(pbr.base_color_factor()),
                base_color_texture,
                metallic_factor: pbr.metallic_factor(),
                roughness_factor: pbr.roughness_factor(),
                emissive_factor: Vec3::from(material.emissive_factor()),
            },
            double_sided: material.double_sided(),
            wireframe: false,
        };

        let id = self.decoded.resources.materials.alloc(material_data);
        self.gltf_material_to_material.insert(material.index(), id);
        id
    }

    fn load_image(&mut self, image: &gltf::Image) -> Option<TextureId> {
        if let Some(texture) = self.gltf_image_to_texture.get(&image.index()) {
            return *texture;
        }

        let name = image
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Image {}", image.index()));

        let encoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => self
                .buffers
                .get(view.buffer().index())
                .and_then(|data| data.get(view.offset()..view.offset() + view.length()))
                .map(|bytes| (bytes.to_vec(), mime_type.to_string())),
            gltf::image::Source::Uri { uri, mime_type } => self.read_image_uri(uri, mime_type),
        };

        let texture = match encoded {
            Some((encoded, mime_type)) => Some(self.decoded.resources.textures.alloc(Texture {
                name,
                mime_type,
                encoded,
            })),
            None => {
                log::warn!("Could not resolve image {}, material will be untextured", name);
                None
            }
        };

        self.gltf_image_to_texture.insert(image.index(), texture);
        texture
    }

    fn read_image_uri(&self, uri: &str, mime_type: Option<&str>) -> Option<(Vec<u8>, String)> {
        if let Some(rest) = uri.strip_prefix("data:") {
            let (header, payload) = rest.split_once(',')?;
            let media_type = header.strip_suffix(";base64")?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload)
                .ok()?;
            return Some((bytes, mime_type.unwrap_or(media_type).to_string()));
        }

        let path = self.base_dir?.join(uri);
        let bytes = std::fs::read(&path)
            .map_err(|err| log::warn!("Failed to read image {}: {}", path.display(), err))
            .ok()?;
        let mime_type = mime_type
            .map(String::from)
            .or_else(|| mime_type_from_extension(&path))?;
        Some((bytes, mime_type))
    }

    fn read_animation(&self, animation: &gltf::Animation) -> AnimationClip {
        use gltf::animation::util::ReadOutputs;

        let name = animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Animation {}", animation.index()));

        let buffers = self.buffers;
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let Some(&target) = self
                .gltf_node_to_object
                .get(&channel.target().node().index())
            else {
                log::warn!("Animation {} targets a node outside the scene", name);
                continue;
            };

            let reader = channel.reader(|buffer| buffer_slice(buffers, buffer));
            let timestamps: Vec<f32> = match reader.read_inputs() {
                Some(inputs) => inputs.collect(),
                None => continue,
            };

            let keyframes = match reader.read_outputs() {
                Some(ReadOutputs::Translations(values)) => {
                    Keyframes::Translation(values.map(Vec3::from).collect())
                }
                Some(ReadOutputs::Rotations(values)) => {
                    Keyframes::Rotation(values.into_f32().map(Quat::from_array).collect())
                }
                Some(ReadOutputs::Scales(values)) => Keyframes::Scale(values.map(Vec3::from).collect()),
                Some(ReadOutputs::MorphTargetWeights(_)) => {
                    log::warn!("Animation {}: morph target weights are not supported", name);
                    continue;
                }
                None => continue,
            };

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
            };

            channels.push(Channel {
                target,
                interpolation,
                timestamps,
                keyframes,
            });
        }

        AnimationClip::new(name, channels)
    }
}

fn read_light(light: &gltf::khr_lights_punctual::Light) -> Light {
    use gltf::khr_lights_punctual::Kind;

    let kind = match light.kind() {
        Kind::Directional => LightKind::Directional,
        Kind::Point => LightKind::Point {
            range: light.range(),
        },
        Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => LightKind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        },
    };

    Light {
        kind,
        color: Vec3::from(light.color()),
        intensity: light.intensity(),
    }
}

fn mime_type_from_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime_type.to_string())
}

fn sequence_or(indices: Option<Vec<u32>>, vertex_count: usize) -> Vec<u32> {
    indices.unwrap_or_else(|| (0..vertex_count as u32).collect())
}

fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    strip
        .windows(3)
        .enumerate()
        .flat_map(|(i, w)| {
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .collect()
}

fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    match fan.split_first() {
        Some((&center, rest)) => rest
            .windows(2)
            .flat_map(|w| [center, w[0], w[1]])
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{fan_to_list, strip_to_list, GltfDecoder, SceneDecoder};
    use crate::error::DecodeError;

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(strip_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn fans_share_the_first_vertex() {
        assert_eq!(fan_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
        assert!(fan_to_list(&[]).is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = GltfDecoder.decode(b"definitely not a model", None);
        assert!(matches!(result, Err(DecodeError::Gltf(_))));
    }

    #[test]
    fn minimal_document_decodes_to_an_empty_group() {
        let json = br#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"name":"lonely"}]}"#;
        let decoded = GltfDecoder.decode(json, None).unwrap();

        assert_eq!(decoded.graph.len(), 2);
        assert!(decoded.graph.get_object_by_name("lonely").is_some());
        assert!(decoded.clips.is_empty());
    }

    #[test]
    fn document_without_scenes_is_rejected() {
        let json = br#"{"asset":{"version":"2.0"}}"#;
        assert!(matches!(
            GltfDecoder.decode(json, None),
            Err(DecodeError::NoScene)
        ));
    }
}
