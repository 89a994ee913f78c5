use itertools::Itertools;

use crate::asset_pipeline::AssetResources;
use crate::render_backend::RenderBackend;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::SceneGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposalReport {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
    /// Handles that did not resolve to a resource and were passed over.
    pub skipped: usize,
}

impl DisposalReport {
    pub fn released(&self) -> usize {
        self.geometries + self.materials + self.textures
    }
}

/// Releases every geometry, material and texture reachable from mesh nodes
/// under `root`, each exactly once even when shared between meshes.
pub fn dispose<B: RenderBackend + ?Sized>(
    graph: &SceneGraph,
    root: ObjectId,
    resources: &AssetResources,
    backend: &mut B,
) -> DisposalReport {
    let mut report = DisposalReport::default();

    let meshes = graph.meshes(root).map(|(_, mesh)| mesh).collect::<Vec<_>>();

    for geometry in meshes.iter().map(|mesh| mesh.geometry).unique() {
        if resources.geometries.get(geometry).is_some() {
            backend.release_geometry(geometry);
            report.geometries += 1;
        } else {
            report.skipped += 1;
        }
    }

    let materials = meshes
        .iter()
        .flat_map(|mesh| mesh.materials.iter())
        .unique()
        .collect::<Vec<_>>();

    let mut textures = Vec::new();
    for material_id in materials {
        match resources.materials.get(material_id) {
            Some(material) => {
                textures.extend(material.textures());
                backend.release_material(material_id);
                report.materials += 1;
            }
            None => report.skipped += 1,
        }
    }

    for texture in textures.into_iter().unique() {
        if resources.textures.get(texture).is_some() {
            backend.release_texture(texture);
            report.textures += 1;
        } else {
            report.skipped += 1;
        }
    }

    log::debug!(
        "Disposed {} geometries, {} materials, {} textures ({} skipped)",
        report.geometries,
        report.materials,
        report.textures,
        report.skipped
    );

    report
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::dispose;
    use crate::asset_pipeline::materials::{Material, Texture};
    use crate::asset_pipeline::{AssetResources, DecodedScene};
    use crate::model::Geometry;
    use crate::render_backend::{HeadlessBackend, RenderBackend};
    use crate::scene_graph::object3d::{MaterialSlots, Object3D};

    #[test]
    fn shared_resources_are_released_once() {
        let mut scene = DecodedScene::new("root");
        let geometry = scene
            .resources
            .geometries
            .alloc(Geometry::from_positions("g", [Vec3::ZERO], None));
        let texture = scene.resources.textures.alloc(Texture {
            name: "albedo".into(),
            mime_type: "image/png".into(),
            encoded: vec![1, 2, 3],
        });
        let mut material = Material::new("shared");
        material.pbr.base_color_texture = Some(texture);
        let material = scene.resources.materials.alloc(material);

        let root = scene.graph.root();
        let group = scene.graph.add_child(root, Object3D::group("group"));
        scene
            .graph
            .add_child(group, Object3D::mesh("a", geometry, MaterialSlots::single(material)));
        scene
            .graph
            .add_child(root, Object3D::mesh("b", geometry, MaterialSlots::single(material)));

        let mut backend = HeadlessBackend::default();
        backend.upload_resources(&scene.resources);

        let report = dispose(&scene.graph, root, &scene.resources, &mut backend);
        assert_eq!(report.geometries, 1);
        assert_eq!(report.materials, 1);
        assert_eq!(report.textures, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(backend.resident_count(), 0);
        assert_eq!(backend.double_releases(), 0);
    }

    #[test]
    fn unresolved_handles_are_skipped() {
        let mut foreign = AssetResources::new();
        let foreign_geometry = foreign
            .geometries
            .alloc(Geometry::from_positions("elsewhere", [Vec3::ZERO], None));
        let foreign_material = foreign.materials.alloc(Material::new("elsewhere"));

        let mut scene = DecodedScene::new("root");
        let root = scene.graph.root();
        scene.graph.add_child(
            root,
            Object3D::mesh("dangling", foreign_geometry, MaterialSlots::single(foreign_material)),
        );
        scene.graph.add_child(root, Object3D::group("empty"));

        let mut backend = HeadlessBackend::default();
        let report = dispose(&scene.graph, root, &scene.resources, &mut backend);
        assert_eq!(report.geometries, 0);
        assert_eq!(report.materials, 0);
        assert_eq!(report.skipped, 2);
    }
}
