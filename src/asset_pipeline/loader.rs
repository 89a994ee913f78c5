use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset_pipeline::gltf_decoder::SceneDecoder;
use crate::error::{DecodeError, DecodeResult};

/// Reads `path` and decodes it on the blocking pool. Relative URIs inside the
/// asset resolve against the file's directory.
pub async fn decode_file<D>(decoder: Arc<D>, path: impl AsRef<Path>) -> DecodeResult
where
    D: SceneDecoder + Send + Sync + 'static,
{
    let path = path.as_ref().to_path_buf();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| DecodeError::Read {
            path: path.clone(),
            source,
        })?;

    let base_dir = path.parent().map(Path::to_path_buf);
    decode_bytes(decoder, bytes, base_dir).await
}

pub async fn decode_bytes<D>(decoder: Arc<D>, bytes: Vec<u8>, base_dir: Option<PathBuf>) -> DecodeResult
where
    D: SceneDecoder + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || decoder.decode(&bytes, base_dir.as_deref()))
        .await
        .map_err(|err| DecodeError::Task(err.to_string()))?
}

/// File name used as the asset's display name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::{decode_bytes, decode_file, display_name};
    use crate::asset_pipeline::gltf_decoder::GltfDecoder;
    use crate::error::DecodeError;

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let result = decode_file(Arc::new(GltfDecoder), "/definitely/not/here.glb").await;
        assert!(matches!(result, Err(DecodeError::Read { .. })));
    }

    #[tokio::test]
    async fn bytes_decode_off_thread() {
        let json = br#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[]}]}"#.to_vec();
        let decoded = decode_bytes(Arc::new(GltfDecoder), json, None).await.unwrap();
        assert_eq!(decoded.graph.len(), 1);
    }

    #[test]
    fn display_name_is_the_file_name() {
        assert_eq!(display_name(Path::new("/models/helmet.glb")), "helmet.glb");
    }
}
