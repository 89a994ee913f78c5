use glam::{Vec3, Vec4};
use id_arena::Id;

pub type MaterialId = Id<Material>;
pub type TextureId = Id<Texture>;

/// An encoded image as it appeared in the source asset. Kept encoded so it
/// can be written back out unchanged.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub mime_type: String,
    pub encoded: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterialData {
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureId>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,
}

impl Default for PbrMaterialData {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub pbr: PbrMaterialData,
    pub double_sided: bool,
    pub wireframe: bool,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pbr: PbrMaterialData::default(),
            double_sided: false,
            wireframe: false,
        }
    }

    pub fn textures(&self) -> impl Iterator<Item = TextureId> {
        self.pbr.base_color_texture.into_iter()
    }
}
