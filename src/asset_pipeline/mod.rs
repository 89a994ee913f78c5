use id_arena::Arena;

use crate::animation::AnimationClip;
use crate::model::Geometry;
use crate::scene_graph::scene::SceneGraph;

pub mod gltf_decoder;
pub mod gltf_export;
pub mod gltf_document;
pub mod loader;
pub mod materials;

use materials::{Material, Texture};

/// Geometry, materials and textures referenced by one asset's mesh nodes.
pub struct AssetResources {
    pub geometries: Arena<Geometry>,
    pub materials: Arena<Material>,
    pub textures: Arena<Texture>,
}

impl AssetResources {
    pub fn new() -> Self {
        Self {
            geometries: Arena::new(),
            materials: Arena::new(),
            textures: Arena::new(),
        }
    }
}

impl Default for AssetResources {
    fn default() -> Self {
        Self::new()
    }
}

/// The output of a [`gltf_decoder::SceneDecoder`]: a complete asset that has
/// not been handed to the engine yet.
pub struct DecodedScene {
    pub graph: SceneGraph,
    pub resources: AssetResources,
    pub clips: Vec<AnimationClip>,
}

impl DecodedScene {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            graph: SceneGraph::new(root_name),
            resources: AssetResources::new(),
            clips: Vec::new(),
        }
    }
}
