pub mod animation;
pub mod asset_pipeline;
pub mod camera;
pub mod config;
pub mod disposal;
pub mod engine;
pub mod environment;
pub mod error;
pub mod math;
pub mod model;
pub mod render_backend;
pub mod scene_graph;
pub mod stage;
pub mod summary;
pub mod toggles;

pub use asset_pipeline::gltf_decoder::{GltfDecoder, SceneDecoder};
pub use asset_pipeline::gltf_export::{ExportArtifact, ExportOptions, ExportPayload};
pub use asset_pipeline::DecodedScene;
pub use config::StudioConfig;
pub use engine::{LoadOutcome, LoadTicket, Notice, NoticeLevel, Studio};
pub use error::{DecodeError, EngineError};
pub use render_backend::{HeadlessBackend, RenderBackend};
pub use summary::{ModelInfo, ModelSummary};
