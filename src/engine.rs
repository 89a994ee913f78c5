use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;

use crate::animation::AnimationSession;
use crate::asset_pipeline::gltf_decoder::SceneDecoder;
use crate::asset_pipeline::gltf_export::{export_scene, ExportArtifact, ExportOptions};
use crate::asset_pipeline::loader::{decode_file, display_name};
use crate::asset_pipeline::{AssetResources, DecodedScene};
use crate::camera::{fit_camera, Camera, CameraFit};
use crate::config::StudioConfig;
use crate::disposal::{dispose, DisposalReport};
use crate::environment::load_equirect_hdr;
use crate::error::{DecodeResult, EngineError};
use crate::render_backend::RenderBackend;
use crate::scene_graph::scene::SceneGraph;
use crate::stage::Stage;
use crate::summary::{ModelInfo, ModelSummary};
use crate::toggles::{self, ToggleState};

pub const SCREENSHOT_MIME_TYPE: &str = "image/png";
pub const SCREENSHOT_FILENAME: &str = "glb-studio-screenshot.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient status message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Issued by [`Studio::begin_load`]. Only the most recent ticket may
/// install its asset.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ModelSummary),
    /// A newer load was requested while this one was decoding.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_filename: &'static str,
}

struct CurrentAsset {
    graph: SceneGraph,
    resources: AssetResources,
    display_name: String,
    summary: ModelSummary,
    animation: Option<AnimationSession>,
}

/// The viewer's engine state: at most one loaded asset, the camera that
/// frames it, the stage around it and the toggles applied to it.
pub struct Studio<B: RenderBackend> {
    config: StudioConfig,
    camera: Camera,
    toggles: ToggleState,
    stage: Stage,
    backend: B,
    current: Option<CurrentAsset>,
    latest_generation: u64,
    notices: Vec<Notice>,
}

impl<B: RenderBackend> Studio<B> {
    pub fn new(backend: B, config: StudioConfig) -> Self {
        let mut camera = Camera::new(
            config.camera.default_eye,
            config.camera.default_target,
            config.fov_y(),
        );
        camera.near = config.camera.near;
        camera.far = config.camera.far;

        let toggles = config.initial_toggles;
        let stage = Stage::new(&config.stage, toggles.grid, toggles.shadows);

        Self {
            config,
            camera,
            toggles,
            stage,
            backend,
            current: None,
            latest_generation: 0,
            notices: Vec::new(),
        }
    }

    /// Replaces the current asset with `decoded`. Loads still decoding are
    /// superseded by this one.
    pub fn load_asset(&mut self, decoded: DecodedScene, display_name: impl Into<String>) -> ModelSummary {
        self.latest_generation += 1;
        self.install(decoded, display_name.into())
    }

    /// Disposal of the previous asset always happens before anything of the
    /// new one is touched.
    fn install(&mut self, decoded: DecodedScene, display_name: String) -> ModelSummary {
        if let Some(report) = self.dispose_current() {
            log::debug!("Replaced previous asset ({} resources released)", report.released());
        }

        let DecodedScene {
            mut graph,
            mut resources,
            clips,
        } = decoded;
        let root = graph.root();

        self.backend.upload_resources(&resources);
        graph.set_root_name(display_name.clone());

        toggles::set_shadows(&mut graph, root, self.toggles.shadows);
        for id in toggles::set_wireframe(&graph, root, &mut resources, self.toggles.wireframe) {
            if let Some(material) = resources.materials.get(id) {
                self.backend.update_material(id, material);
            }
        }

        let animation_count = clips.len();
        let animation = AnimationSession::start(clips);

        graph.update_transforms();
        let bounds = graph.world_bounds(root, &resources);
        let fit = fit_camera(&bounds, self.camera.fov_y, self.config.camera.fit_offset)
            .clamped(self.config.camera.min_fit_distance);
        self.camera.apply_fit(&fit);

        let summary = ModelSummary::compute(&graph, root, &resources, animation_count);

        log::info!(
            "Loaded {}: {} meshes, {} vertices, {} triangles, {} materials, {} animations",
            display_name,
            summary.mesh_count,
            summary.vertex_count,
            summary.triangle_count,
            summary.material_count,
            summary.animation_count
        );
        self.notify(NoticeLevel::Info, format!("Loaded {}", display_name));

        self.current = Some(CurrentAsset {
            graph,
            resources,
            display_name,
            summary,
            animation,
        });

        summary
    }

    pub fn begin_load(&mut self, display_name: impl Into<String>) -> LoadTicket {
        self.latest_generation += 1;
        LoadTicket {
            generation: self.latest_generation,
            display_name: display_name.into(),
        }
    }

    /// Installs a finished decode. A failed decode leaves the current asset
    /// as it was.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: DecodeResult) -> Result<LoadOutcome, EngineError> {
        if ticket.generation != self.latest_generation {
            log::debug!("Dropping superseded load of {}", ticket.display_name);
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(decoded) => Ok(LoadOutcome::Loaded(self.install(decoded, ticket.display_name))),
            Err(err) => {
                log::error!("Failed to load {}: {}", ticket.display_name, err);
                self.notify(
                    NoticeLevel::Error,
                    format!("Failed to load {}: {}", ticket.display_name, err),
                );
                Err(err.into())
            }
        }
    }

    pub async fn load_file<D>(&mut self, decoder: Arc<D>, path: impl AsRef<Path>) -> Result<LoadOutcome, EngineError>
    where
        D: SceneDecoder + Send + Sync + 'static,
    {
        let path = path.as_ref();
        let ticket = self.begin_load(display_name(path));
        let result = decode_file(decoder, path).await;
        self.complete_load(ticket, result)
    }

    /// Drops the current asset. Loads still decoding are superseded.
    pub fn clear_asset(&mut self) -> ModelInfo {
        self.latest_generation += 1;
        if self.dispose_current().is_some() {
            log::info!("Cleared current asset");
        }
        ModelInfo::NoModel
    }

    fn dispose_current(&mut self) -> Option<DisposalReport> {
        let asset = self.current.as_ref()?;
        let report = dispose(
            &asset.graph,
            asset.graph.root(),
            &asset.resources,
            &mut self.backend,
        );
        self.current = None;
        Some(report)
    }

    /// Steps animation and world transforms by `delta` seconds.
    pub fn advance(&mut self, delta: f32) {
        let Some(asset) = self.current.as_mut() else {
            return;
        };

        if let Some(session) = asset.animation.as_mut() {
            session.advance(delta, &mut asset.graph);
        }
        asset.graph.update_transforms();
    }

    /// Advances by the configured fixed frame delta.
    pub fn step(&mut self) {
        self.advance(self.config.frame_delta);
    }

    pub fn set_wireframe(&mut self, enabled: bool) {
        self.toggles.wireframe = enabled;

        let Some(asset) = self.current.as_mut() else {
            return;
        };
        let root = asset.graph.root();
        for id in toggles::set_wireframe(&asset.graph, root, &mut asset.resources, enabled) {
            if let Some(material) = asset.resources.materials.get(id) {
                self.backend.update_material(id, material);
            }
        }
    }

    /// Negates the first mesh's wireframe flag and writes the result to
    /// every material. `false` when nothing is loaded.
    pub fn toggle_wireframe(&mut self) -> bool {
        let Some(asset) = self.current.as_ref() else {
            return false;
        };
        let Some(current) = toggles::first_wireframe(&asset.graph, asset.graph.root(), &asset.resources) else {
            return false;
        };

        self.set_wireframe(!current);
        !current
    }

    pub fn set_shadows(&mut self, enabled: bool) {
        self.toggles.shadows = enabled;
        self.stage.key_light.cast_shadow = enabled;

        if let Some(asset) = self.current.as_mut() {
            let root = asset.graph.root();
            toggles::set_shadows(&mut asset.graph, root, enabled);
        }
    }

    pub fn toggle_shadows(&mut self) -> bool {
        let enabled = !self.toggles.shadows;
        self.set_shadows(enabled);
        enabled
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.toggles.grid = visible;
        self.stage.grid.visible = visible;
    }

    pub fn toggle_grid(&mut self) -> bool {
        let visible = !self.toggles.grid;
        self.set_grid_visible(visible);
        visible
    }

    pub fn export(&self, options: ExportOptions) -> Result<ExportArtifact, EngineError> {
        let asset = self.current.as_ref().ok_or(EngineError::NoAssetLoaded)?;
        let clips = asset.animation.iter().flat_map(AnimationSession::clips);
        let artifact = export_scene(&asset.graph, &asset.resources, clips, options)?;

        log::info!(
            "Exported {} as {} ({} bytes)",
            asset.display_name,
            artifact.suggested_filename,
            artifact.bytes().len()
        );
        Ok(artifact)
    }

    pub fn default_export_options(&self) -> ExportOptions {
        ExportOptions {
            binary: self.config.binary_export,
        }
    }

    pub fn reset_view(&mut self) {
        self.camera.eye = self.config.camera.default_eye;
        self.camera.target = self.config.camera.default_target;
    }

    /// Frames the current asset again without reloading it.
    pub fn refit(&mut self) -> Option<CameraFit> {
        let asset = self.current.as_ref()?;
        asset.graph.update_transforms();
        let bounds = asset.graph.world_bounds(asset.graph.root(), &asset.resources);
        let fit = fit_camera(&bounds, self.camera.fov_y, self.config.camera.fit_offset)
            .clamped(self.config.camera.min_fit_distance);
        self.camera.apply_fit(&fit);
        Some(fit)
    }

    pub fn screenshot(&mut self) -> Result<Screenshot, EngineError> {
        let Some(frame) = self.backend.capture_frame() else {
            self.notify(NoticeLevel::Warning, "Nothing rendered yet".to_string());
            return Err(EngineError::NoFrame);
        };

        let mut bytes = Vec::new();
        frame.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        Ok(Screenshot {
            bytes,
            mime_type: SCREENSHOT_MIME_TYPE,
            suggested_filename: SCREENSHOT_FILENAME,
        })
    }

    /// Applies an HDR environment. On failure the current background stays.
    pub fn load_environment(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        match load_equirect_hdr(path, self.config.environment_width) {
            Ok(environment) => {
                self.notify(NoticeLevel::Info, format!("HDRI loaded: {}", environment.name));
                self.stage.set_environment(environment);
                Ok(())
            }
            Err(err) => {
                log::warn!("HDRI load failed: {}", err);
                self.notify(NoticeLevel::Warning, format!("HDRI load failed: {}", err));
                Err(err.into())
            }
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        match &self.current {
            Some(asset) => ModelInfo::Loaded {
                name: asset.display_name.clone(),
                summary: asset.summary,
            },
            None => ModelInfo::NoModel,
        }
    }

    pub fn current_graph(&self) -> Option<&SceneGraph> {
        self.current.as_ref().map(|asset| &asset.graph)
    }

    pub fn current_resources(&self) -> Option<&AssetResources> {
        self.current.as_ref().map(|asset| &asset.resources)
    }

    pub fn animation(&self) -> Option<&AnimationSession> {
        self.current.as_ref()?.animation.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut AnimationSession> {
        self.current.as_mut()?.animation.as_mut()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn toggles(&self) -> ToggleState {
        self.toggles
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }
}
