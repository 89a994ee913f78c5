use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use glb_studio::{GltfDecoder, HeadlessBackend, LoadOutcome, NoticeLevel, Studio, StudioConfig};

#[derive(Parser, Debug)]
#[command(name = "glb-studio")]
#[command(about = "Load a glTF/GLB model, inspect it and export it again")]
struct Args {
    /// Model to load (.glb or .gltf)
    model: PathBuf,

    /// Write the loaded asset back out to this path
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export as embedded JSON instead of GLB
    #[arg(long)]
    json: bool,

    /// Equirectangular Radiance HDR to use as environment
    #[arg(long)]
    hdri: Option<PathBuf>,

    /// Fixed frames to step before reporting
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,

    #[arg(long)]
    screenshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let mut config = StudioConfig::default();
    if let Some(fov) = args.fov {
        config.camera.fov_degrees = fov;
    }
    if args.json {
        config.binary_export = false;
    }

    let mut studio = Studio::new(HeadlessBackend::new(), config);

    if let Some(hdri) = &args.hdri {
        // Lighting falls back to the plain background.
        if let Err(err) = studio.load_environment(hdri) {
            log::warn!("Continuing without HDRI: {}", err);
        }
    }

    match studio
        .load_file(Arc::new(GltfDecoder), &args.model)
        .await
        .with_context(|| format!("Failed to load {}", args.model.display()))?
    {
        LoadOutcome::Loaded(_) => {}
        LoadOutcome::Superseded => bail!("load of {} was superseded", args.model.display()),
    }

    for _ in 0..args.frames {
        studio.step();
    }

    println!("{}", studio.model_info());
    let camera = studio.camera();
    println!("Camera: eye {:?} target {:?}", camera.eye, camera.target);
    println!(
        "{} | {} | {}",
        studio.toggles().wireframe_label(),
        studio.toggles().shadows_label(),
        studio.toggles().grid_label()
    );
    if let Some(session) = studio.animation() {
        println!(
            "Animation: {} clip(s), t = {:.3}s, {}",
            session.clip_count(),
            session.clock(),
            if session.playing() { "playing" } else { "finished" }
        );
    }

    if let Some(path) = &args.export {
        let artifact = studio
            .export(studio.default_export_options())
            .context("Export failed")?;
        tokio::fs::write(path, artifact.bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "Exported {} ({}, suggested name {})",
            path.display(),
            artifact.mime_type,
            artifact.suggested_filename
        );
    }

    if let Some(path) = &args.screenshot {
        match studio.screenshot() {
            Ok(shot) => {
                tokio::fs::write(path, &shot.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved screenshot to {}", path.display());
            }
            Err(err) => log::warn!("Screenshot skipped: {}", err),
        }
    }

    for notice in studio.drain_notices() {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Args;

    #[test]
    fn parses_flags() {
        let parsed = Args::try_parse_from(["glb-studio", "duck.glb", "--json", "--frames", "3", "--fov", "45"]).unwrap();
        assert_eq!(parsed.model.to_str(), Some("duck.glb"));
        assert!(parsed.json);
        assert_eq!(parsed.frames, 3);
        assert_eq!(parsed.fov, Some(45.0));
        assert!(parsed.export.is_none());
    }

    #[test]
    fn model_is_required() {
        assert!(Args::try_parse_from(["glb-studio", "--json"]).is_err());
        assert!(Args::try_parse_from(["glb-studio", "a.glb", "--frames"]).is_err());
        assert!(Args::try_parse_from(["glb-studio", "a.glb", "--frames", "many"]).is_err());
        assert!(Args::try_parse_from(["glb-studio", "a.glb", "--bogus"]).is_err());
    }
}
