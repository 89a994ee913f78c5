use std::collections::HashSet;

use image::RgbaImage;

use crate::asset_pipeline::materials::{Material, MaterialId, Texture, TextureId};
use crate::asset_pipeline::AssetResources;
use crate::model::{Geometry, GeometryId};

/// The GPU side of the studio. The engine owns the CPU copies of every
/// resource and tells the backend when one becomes resident or is released.
pub trait RenderBackend {
    fn upload_geometry(&mut self, id: GeometryId, geometry: &Geometry);
    fn upload_material(&mut self, id: MaterialId, material: &Material);
    fn upload_texture(&mut self, id: TextureId, texture: &Texture);

    fn release_geometry(&mut self, id: GeometryId);
    fn release_material(&mut self, id: MaterialId);
    fn release_texture(&mut self, id: TextureId);

    /// Called after a resident material changed, e.g. its wireframe flag.
    fn update_material(&mut self, id: MaterialId, material: &Material) {
        self.upload_material(id, material);
    }

    /// The most recently rendered frame, if the backend has produced one.
    fn capture_frame(&mut self) -> Option<RgbaImage>;

    fn upload_resources(&mut self, resources: &AssetResources) {
        for (id, texture) in resources.textures.iter() {
            self.upload_texture(id, texture);
        }
        for (id, material) in resources.materials.iter() {
            self.upload_material(id, material);
        }
        for (id, geometry) in resources.geometries.iter() {
            self.upload_geometry(id, geometry);
        }
    }
}

/// A backend without a device. Tracks residency so tests and the CLI can
/// check that nothing leaks between loads.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    geometries: HashSet<GeometryId>,
    materials: HashSet<MaterialId>,
    textures: HashSet<TextureId>,
    double_releases: usize,
    material_updates: usize,
    frame: Option<RgbaImage>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_geometry_resident(&self, id: GeometryId) -> bool {
        self.geometries.contains(&id)
    }

    pub fn is_material_resident(&self, id: MaterialId) -> bool {
        self.materials.contains(&id)
    }

    pub fn is_texture_resident(&self, id: TextureId) -> bool {
        self.textures.contains(&id)
    }

    pub fn resident_count(&self) -> usize {
        self.geometries.len() + self.materials.len() + self.textures.len()
    }

    /// Releases of handles that were not resident at the time.
    pub fn double_releases(&self) -> usize {
        self.double_releases
    }

    pub fn material_updates(&self) -> usize {
        self.material_updates
    }

    /// Stands in for a presented frame.
    pub fn set_frame(&mut self, frame: RgbaImage) {
        self.frame = Some(frame);
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_geometry(&mut self, id: GeometryId, _geometry: &Geometry) {
        self.geometries.insert(id);
    }

    fn upload_material(&mut self, id: MaterialId, _material: &Material) {
        self.materials.insert(id);
    }

    fn upload_texture(&mut self, id: TextureId, _texture: &Texture) {
        self.textures.insert(id);
    }

    fn release_geometry(&mut self, id: GeometryId) {
        if !self.geometries.remove(&id) {
            self.double_releases += 1;
        }
    }

    fn release_material(&mut self, id: MaterialId) {
        if !self.materials.remove(&id) {
            self.double_releases += 1;
        }
    }

    fn release_texture(&mut self, id: TextureId) {
        if !self.textures.remove(&id) {
            self.double_releases += 1;
        }
    }

    fn update_material(&mut self, id: MaterialId, _material: &Material) {
        if self.materials.contains(&id) {
            self.material_updates += 1;
        }
    }

    fn capture_frame(&mut self) -> Option<RgbaImage> {
        self.frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{HeadlessBackend, RenderBackend};
    use crate::asset_pipeline::materials::Material;
    use crate::asset_pipeline::AssetResources;
    use crate::model::Geometry;

    #[test]
    fn residency_follows_upload_and_release() {
        let mut resources = AssetResources::new();
        let geometry = resources
            .geometries
            .alloc(Geometry::from_positions("g", [Vec3::ZERO], None));
        let material = resources.materials.alloc(Material::new("m"));

        let mut backend = HeadlessBackend::new();
        backend.upload_resources(&resources);
        assert!(backend.is_geometry_resident(geometry));
        assert!(backend.is_material_resident(material));
        assert_eq!(backend.resident_count(), 2);

        backend.release_geometry(geometry);
        backend.release_geometry(geometry);
        assert!(!backend.is_geometry_resident(geometry));
        assert_eq!(backend.double_releases(), 1);
    }

    #[test]
    fn capture_without_frame_is_none() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.capture_frame().is_none());

        backend.set_frame(image::RgbaImage::new(2, 2));
        assert_eq!(backend.capture_frame().map(|frame| frame.dimensions()), Some((2, 2)));
    }
}
