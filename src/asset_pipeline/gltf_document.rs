//! The subset of the glTF 2.0 JSON schema that the exporter writes.

use std::collections::BTreeMap;

use serde::Serialize;

pub const COMPONENT_FLOAT: u32 = 5126;
pub const COMPONENT_UNSIGNED_INT: u32 = 5125;
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<RootExtensions>,
    pub asset: AssetInfo,
    pub scene: u32,
    pub scenes: Vec<SceneDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<MeshDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<TextureDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<AccessorDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferViewDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<BufferDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<AnimationDef>,
}

#[derive(Debug, Serialize)]
pub struct AssetInfo {
    pub version: &'static str,
    pub generator: &'static str,
}

impl Default for AssetInfo {
    fn default() -> Self {
        Self {
            version: "2.0",
            generator: concat!("glb-studio ", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SceneDef {
    pub nodes: Vec<u32>,
}

#[derive(Debug, Default, Serialize)]
pub struct NodeDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<NodeExtensions>,
}

#[derive(Debug, Serialize)]
pub struct RootExtensions {
    #[serde(rename = "KHR_lights_punctual")]
    pub lights_punctual: LightsDef,
}

#[derive(Debug, Serialize)]
pub struct LightsDef {
    pub lights: Vec<LightDef>,
}

#[derive(Debug, Serialize)]
pub struct LightDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub color: [f32; 3],
    pub intensity: f32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotDef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotDef {
    pub inner_cone_angle: f32,
    pub outer_cone_angle: f32,
}

#[derive(Debug, Serialize)]
pub struct NodeExtensions {
    #[serde(rename = "KHR_lights_punctual")]
    pub lights_punctual: NodeLightDef,
}

#[derive(Debug, Serialize)]
pub struct NodeLightDef {
    pub light: u32,
}

#[derive(Debug, Serialize)]
pub struct MeshDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveDef>,
}

#[derive(Debug, Serialize)]
pub struct PrimitiveDef {
    pub attributes: BTreeMap<&'static str, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pbr_metallic_roughness: PbrMetallicRoughnessDef,
    pub emissive_factor: [f32; 3],
    pub double_sided: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughnessDef {
    pub base_color_factor: [f32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfoDef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

#[derive(Debug, Serialize)]
pub struct TextureInfoDef {
    pub index: u32,
}

#[derive(Debug, Serialize)]
pub struct TextureDef {
    pub source: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub buffer_view: u32,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorDef {
    pub buffer_view: u32,
    pub byte_offset: u32,
    pub component_type: u32,
    pub count: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewDef {
    pub buffer: u32,
    pub byte_offset: u32,
    pub byte_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDef {
    pub byte_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnimationDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub channels: Vec<AnimationChannelDef>,
    pub samplers: Vec<AnimationSamplerDef>,
}

#[derive(Debug, Serialize)]
pub struct AnimationChannelDef {
    pub sampler: u32,
    pub target: AnimationTargetDef,
}

#[derive(Debug, Serialize)]
pub struct AnimationTargetDef {
    pub node: u32,
    pub path: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnimationSamplerDef {
    pub input: u32,
    pub output: u32,
    pub interpolation: &'static str,
}
