use std::collections::HashSet;
use std::fmt;

use crate::asset_pipeline::AssetResources;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::SceneGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelSummary {
    pub mesh_count: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub material_count: usize,
    pub animation_count: usize,
}

impl ModelSummary {
    /// Counts mesh nodes under `root`. Triangles are `index_count / 3` per
    /// mesh, summed before rounding; non-indexed meshes contribute none.
    pub fn compute(
        graph: &SceneGraph,
        root: ObjectId,
        resources: &AssetResources,
        animation_count: usize,
    ) -> Self {
        let mut mesh_count = 0;
        let mut vertex_count = 0;
        let mut triangles = 0.0f64;
        let mut materials = HashSet::new();

        for (_, mesh) in graph.meshes(root) {
            mesh_count += 1;
            materials.extend(mesh.materials.iter());

            if let Some(geometry) = resources.geometries.get(mesh.geometry) {
                vertex_count += geometry.vertex_count();
                triangles += geometry.index_count() as f64 / 3.0;
            }
        }

        Self {
            mesh_count,
            vertex_count,
            triangle_count: triangles.round() as usize,
            material_count: materials.len(),
            animation_count,
        }
    }
}

/// What the info panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelInfo {
    NoModel,
    Loaded { name: String, summary: ModelSummary },
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelInfo::NoModel => write!(f, "No model loaded"),
            ModelInfo::Loaded { name, summary } => write!(
                f,
                "{}\nMeshes: {} • Verts: {} • Tris: {}\nMaterials: {} • Animations: {}",
                name,
                summary.mesh_count,
                summary.vertex_count,
                summary.triangle_count,
                summary.material_count,
                summary.animation_count
            ),
        }
    }
}
