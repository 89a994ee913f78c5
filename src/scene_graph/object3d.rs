use glam::Vec3;
use id_arena::Id;

use crate::asset_pipeline::materials::MaterialId;
use crate::model::GeometryId;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

/// One or more material handles. A mesh always has at least one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSlots {
    first: MaterialId,
    rest: Vec<MaterialId>,
}

impl MaterialSlots {
    pub fn single(material: MaterialId) -> Self {
        Self {
            first: material,
            rest: Vec::new(),
        }
    }

    /// `None` when `materials` is empty.
    pub fn from_vec(mut materials: Vec<MaterialId>) -> Option<Self> {
        if materials.is_empty() {
            return None;
        }
        let first = materials.remove(0);
        Some(Self {
            first,
            rest: materials,
        })
    }

    pub fn first(&self) -> MaterialId {
        self.first
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = MaterialId> + '_ {
        std::iter::once(self.first).chain(self.rest.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point { range: Option<f32> },
    Spot { inner_cone_angle: f32, outer_cone_angle: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub materials: MaterialSlots,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Mesh),
    Group,
    Light(Light),
    Empty,
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: GeometryId, materials: MaterialSlots) -> Self {
        Self::new(
            name,
            NodeKind::Mesh(Mesh {
                geometry,
                materials,
            }),
        )
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::from_translation(Vec3::ZERO),
            kind: NodeKind::Empty,
            cast_shadow: false,
            receive_shadow: false,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
