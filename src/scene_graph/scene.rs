use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::asset_pipeline::AssetResources;
use crate::math::bounds::AABB;
use crate::scene_graph::object3d::{Mesh, Object3D, ObjectId};

/// A tree of [`Object3D`]s rooted at a single group node.
pub struct SceneGraph {
    objects: Arena<Object3D>,
    root: ObjectId,
}

impl SceneGraph {
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut objects = Arena::new();
        let root = objects.alloc(Object3D::group(root_name));
        Self { objects, root }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn root_object(&self) -> &Object3D {
        &self.objects[self.root]
    }

    pub fn set_root_name(&mut self, name: impl Into<String>) {
        self.objects[self.root].name = name.into();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Adds `object` under `parent`. The parent must belong to this graph.
    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let object_id = self.objects.alloc(object);
        self.set_object_parent(object_id, Some(parent));
        object_id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Pre-order walk of the subtree rooted at `start`, children in order.
    pub fn traverse(&self, start: ObjectId) -> Traverse<'_> {
        let stack = if self.objects.get(start).is_some() {
            vec![start]
        } else {
            Vec::new()
        };
        Traverse { scene: self, stack }
    }

    /// Mesh nodes of the subtree at `start`, in traversal order.
    pub fn meshes(&self, start: ObjectId) -> impl Iterator<Item = (ObjectId, &Mesh)> + '_ {
        self.traverse(start).filter_map(move |id| {
            self.objects[id].as_mesh().map(|mesh| (id, mesh))
        })
    }

    fn is_descendant_of(&self, object_id: ObjectId, ancestor: ObjectId) -> bool {
        self.traverse(ancestor).any(|id| id == object_id)
    }

    /// Sets the parent of an object and updates child relationships.
    ///
    /// Returns `false` and leaves the graph untouched if the move would
    /// create a cycle.
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) -> bool {
        if let Some(new_parent_id) = new_parent_id {
            if self.is_descendant_of(new_parent_id, child_id) {
                log::warn!("Refusing to parent an object under its own descendant");
                return false;
            }
        }

        // Remove from old parent's children list
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
        true
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        for id in self.traverse(object_id) {
            self.objects[id].transform.invalidate_world();
        }
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    /// Recomputes world matrices of every dirty object reachable from a
    /// parentless object.
    pub fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            // Reading the local matrix flushes a pending local change into world_dirty
            let local_matrix = *object.transform.get_local_matrix();
            let changed = parent_changed || object.transform.is_world_dirty();
            if changed {
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// World-space box of every mesh geometry under `start`. Call
    /// [`SceneGraph::update_transforms`] first.
    pub fn world_bounds(&self, start: ObjectId, resources: &AssetResources) -> AABB {
        self.meshes(start)
            .filter_map(|(id, mesh)| {
                let geometry = resources.geometries.get(mesh.geometry)?;
                let world = *self.objects[id].transform.get_world_matrix();
                Some(geometry.bounding_box().transformed(&world))
            })
            .fold(AABB::empty(), |acc, aabb| acc.union(&aabb))
    }
}

pub struct Traverse<'a> {
    scene: &'a SceneGraph,
    stack: Vec<ObjectId>,
}

impl Iterator for Traverse<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        let id = self.stack.pop()?;
        if let Some(object) = self.scene.objects.get(id) {
            self.stack.extend(object.child_ids.iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use crate::scene_graph::object3d::Object3D;
    use crate::scene_graph::scene::SceneGraph;
    use crate::scene_graph::transform::Transform;

    #[test]
    fn traversal_is_pre_order() {
        let mut scene = SceneGraph::new("root");
        let a = scene.add_child(scene.root(), Object3D::group("a"));
        scene.add_child(a, Object3D::group("a1"));
        scene.add_child(scene.root(), Object3D::group("b"));

        let names: Vec<_> = scene
            .traverse(scene.root())
            .map(|id| scene.get_object(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["root", "a", "a1", "b"]);
    }

    #[test]
    fn world_matrices_compose_down_the_tree() {
        let mut scene = SceneGraph::new("root");
        let parent = scene.add_child(
            scene.root(),
            Object3D::group("parent")
                .with_transform(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0))),
        );
        let child = scene.add_child(
            parent,
            Object3D::group("child")
                .with_transform(Transform::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        );

        scene.update_transforms();
        let world = *scene.get_object(child).unwrap().transform.get_world_matrix();
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));

        scene.set_object_transform(parent, Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        scene.update_transforms();
        let world = *scene.get_object(child).unwrap().transform.get_world_matrix();
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(5.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn reparenting_under_a_descendant_is_refused() {
        let mut scene = SceneGraph::new("root");
        let a = scene.add_child(scene.root(), Object3D::group("a"));
        let b = scene.add_child(a, Object3D::group("b"));

        assert!(!scene.set_object_parent(a, Some(b)));
        assert_eq!(scene.get_object(b).unwrap().parent_id, Some(a));
        assert_eq!(scene.traverse(scene.root()).count(), 3);
    }
}
