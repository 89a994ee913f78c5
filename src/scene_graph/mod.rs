pub mod object3d;
pub mod scene;
pub mod transform;

// Re-export main types for convenience
pub use object3d::{Light, LightKind, MaterialSlots, Mesh, NodeKind, Object3D, ObjectId};
pub use scene::SceneGraph;
pub use transform::Transform;
