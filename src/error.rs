use std::path::PathBuf;

/// Malformed or unsupported source input. The engine never mutates the
/// current asset when it sees one of these.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("asset contains no scenes")]
    NoScene,
    #[error("mesh {mesh} uses unsupported primitive mode {mode:?}")]
    UnsupportedPrimitive { mesh: String, mode: gltf::mesh::Mode },
    #[error("mesh {mesh} has a primitive without positions")]
    MissingPositions { mesh: String },
    #[error("decode task failed: {0}")]
    Task(String),
}

pub type DecodeResult = Result<crate::asset_pipeline::DecodedScene, DecodeError>;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize glTF JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene is too large for a single buffer ({0} bytes)")]
    BufferTooLarge(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode HDR image: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported environment source: {0}")]
    UnsupportedSource(String),
    #[error("environment image is empty")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("load failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("no model loaded")]
    NoAssetLoaded,
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("environment failed: {0}")]
    Environment(#[from] EnvironmentError),
    #[error("no rendered frame to capture")]
    NoFrame,
    #[error("failed to encode screenshot: {0}")]
    Screenshot(#[from] image::ImageError),
}
