use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use id_arena::Id;

use crate::math::bounds::AABB;

pub type GeometryId = Id<Geometry>;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

/// Which optional attributes the source actually provided. Missing ones are
/// zero-filled in [`Vertex`] and are not written back out on export.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexAttributes {
    pub normals: bool,
    pub tex_coords: bool,
}

/// Triangle-list geometry, optionally indexed.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
    pub attributes: VertexAttributes,
    bounding_box: AABB,
}

impl Geometry {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Option<Vec<u32>>,
        attributes: VertexAttributes,
    ) -> Self {
        let bounding_box = AABB::from_points(vertices.iter().map(|vertex| vertex.position));
        Self {
            name: name.into(),
            vertices,
            indices,
            attributes,
            bounding_box,
        }
    }

    /// Positions only; normals and UVs are absent.
    pub fn from_positions(
        name: impl Into<String>,
        positions: impl IntoIterator<Item = Vec3>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let vertices = positions
            .into_iter()
            .map(|position| Vertex {
                position,
                ..Default::default()
            })
            .collect();
        Self::new(name, vertices, indices, VertexAttributes::default())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Zero for non-indexed geometry.
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    pub fn bounding_box(&self) -> AABB {
        self.bounding_box
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|vertex| vertex.position)
    }
}
