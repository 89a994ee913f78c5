use glam::Vec3;

use crate::camera::DEFAULT_FIT_OFFSET;
use crate::toggles::ToggleState;

#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub fit_offset: f32,
    /// Lower bound for the fitted distance.
    pub min_fit_distance: f32,
    pub default_eye: Vec3,
    pub default_target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 2000.0,
            fit_offset: DEFAULT_FIT_OFFSET,
            min_fit_distance: 1e-3,
            default_eye: Vec3::new(3.0, 2.2, 4.0),
            default_target: Vec3::new(0.0, 0.9, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageConfig {
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub hemisphere_intensity: f32,
    pub key_light_position: Vec3,
    pub key_light_intensity: f32,
    /// 0xRRGGBB
    pub clear_color: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            grid_divisions: 20,
            hemisphere_intensity: 0.7,
            key_light_position: Vec3::new(5.0, 10.0, 7.0),
            key_light_intensity: 1.2,
            clear_color: 0x05050a,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub camera: CameraConfig,
    pub stage: StageConfig,
    pub initial_toggles: ToggleState,
    /// Seconds per frame when the host doesn't supply a measured delta.
    pub frame_delta: f32,
    /// Width the HDR environment is downsampled to.
    pub environment_width: u32,
    pub binary_export: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            stage: StageConfig::default(),
            initial_toggles: ToggleState::default(),
            frame_delta: 0.016,
            environment_width: 256,
            binary_export: true,
        }
    }
}

impl StudioConfig {
    pub fn fov_y(&self) -> f32 {
        self.camera.fov_degrees.to_radians()
    }
}
