use std::fmt;

use itertools::Itertools;

use crate::asset_pipeline::materials::MaterialId;
use crate::asset_pipeline::AssetResources;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::SceneGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub wireframe: bool,
    pub shadows: bool,
    pub grid: bool,
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            wireframe: false,
            shadows: true,
            grid: true,
        }
    }
}

/// Button caption for a toggle, e.g. "Wire: On".
pub struct ToggleLabel {
    pub name: &'static str,
    pub on: bool,
}

impl fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, if self.on { "On" } else { "Off" })
    }
}

impl ToggleState {
    pub fn wireframe_label(&self) -> ToggleLabel {
        ToggleLabel {
            name: "Wire",
            on: self.wireframe,
        }
    }

    pub fn shadows_label(&self) -> ToggleLabel {
        ToggleLabel {
            name: "Shadows",
            on: self.shadows,
        }
    }

    pub fn grid_label(&self) -> ToggleLabel {
        ToggleLabel {
            name: "Grid",
            on: self.grid,
        }
    }
}

/// Distinct materials used by mesh nodes under `root`, in traversal order.
pub fn mesh_materials(graph: &SceneGraph, root: ObjectId) -> Vec<MaterialId> {
    graph
        .meshes(root)
        .flat_map(|(_, mesh)| mesh.materials.iter())
        .unique()
        .collect()
}

/// Sets the wireframe flag on every material under `root`. Returns the
/// materials whose flag actually changed.
pub fn set_wireframe(
    graph: &SceneGraph,
    root: ObjectId,
    resources: &mut AssetResources,
    enabled: bool,
) -> Vec<MaterialId> {
    mesh_materials(graph, root)
        .into_iter()
        .filter(|id| match resources.materials.get_mut(*id) {
            Some(material) if material.wireframe != enabled => {
                material.wireframe = enabled;
                true
            }
            _ => false,
        })
        .collect()
}

/// Wireframe flag of the first mesh's first material, in pre-order.
pub fn first_wireframe(
    graph: &SceneGraph,
    root: ObjectId,
    resources: &AssetResources,
) -> Option<bool> {
    graph
        .meshes(root)
        .next()
        .and_then(|(_, mesh)| resources.materials.get(mesh.materials.first()))
        .map(|material| material.wireframe)
}

/// Sets cast and receive flags on every mesh under `root`.
pub fn set_shadows(graph: &mut SceneGraph, root: ObjectId, enabled: bool) -> usize {
    let meshes = graph.meshes(root).map(|(id, _)| id).collect::<Vec<_>>();
    for id in &meshes {
        if let Some(object) = graph.get_object_mut(*id) {
            object.cast_shadow = enabled;
            object.receive_shadow = enabled;
        }
    }
    meshes.len()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{first_wireframe, set_shadows, set_wireframe, ToggleState};
    use crate::asset_pipeline::materials::Material;
    use crate::asset_pipeline::DecodedScene;
    use crate::model::Geometry;
    use crate::scene_graph::object3d::{MaterialSlots, Object3D};

    fn two_material_scene() -> DecodedScene {
        let mut scene = DecodedScene::new("root");
        let geometry = scene
            .resources
            .geometries
            .alloc(Geometry::from_positions("g", [Vec3::ZERO], None));
        let a = scene.resources.materials.alloc(Material::new("a"));
        let b = scene.resources.materials.alloc(Material::new("b"));
        let root = scene.graph.root();
        scene.graph.add_child(
            root,
            Object3D::mesh("multi", geometry, MaterialSlots::from_vec(vec![a, b]).unwrap()),
        );
        scene
            .graph
            .add_child(root, Object3D::mesh("single", geometry, MaterialSlots::single(b)));
        scene
    }

    #[test]
    fn labels() {
        let state = ToggleState::default();
        assert_eq!(state.wireframe_label().to_string(), "Wire: Off");
        assert_eq!(state.shadows_label().to_string(), "Shadows: On");
        assert_eq!(state.grid_label().to_string(), "Grid: On");
    }

    #[test]
    fn wireframe_reaches_every_material_slot() {
        let mut scene = two_material_scene();
        let root = scene.graph.root();

        let changed = set_wireframe(&scene.graph, root, &mut scene.resources, true);
        assert_eq!(changed.len(), 2);
        assert!(scene.resources.materials.iter().all(|(_, m)| m.wireframe));

        let changed = set_wireframe(&scene.graph, root, &mut scene.resources, true);
        assert!(changed.is_empty());
    }

    #[test]
    fn mixed_flags_follow_the_first_material() {
        let mut scene = two_material_scene();
        let root = scene.graph.root();
        let second = scene.resources.materials.iter().nth(1).map(|(id, _)| id).unwrap();
        scene.resources.materials[second].wireframe = true;

        assert_eq!(first_wireframe(&scene.graph, root, &scene.resources), Some(false));
        set_wireframe(&scene.graph, root, &mut scene.resources, true);
        assert_eq!(first_wireframe(&scene.graph, root, &scene.resources), Some(true));
        assert!(scene.resources.materials.iter().all(|(_, m)| m.wireframe));
    }

    #[test]
    fn no_meshes_no_flag() {
        let scene = DecodedScene::new("root");
        let root = scene.graph.root();
        assert_eq!(first_wireframe(&scene.graph, root, &scene.resources), None);
    }

    #[test]
    fn shadows_set_both_flags() {
        let mut scene = two_material_scene();
        let root = scene.graph.root();

        assert_eq!(set_shadows(&mut scene.graph, root, false), 2);
        assert!(scene
            .graph
            .meshes(root)
            .map(|(id, _)| id)
            .collect::<Vec<_>>()
            .into_iter()
            .all(|id| {
                let object = scene.graph.get_object(id).unwrap();
                !object.cast_shadow && !object.receive_shadow
            }));
    }
}
