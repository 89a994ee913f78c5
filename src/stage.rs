use std::sync::Arc;

use glam::Vec3;

use crate::config::StageConfig;
use crate::environment::EnvironmentMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub size: f32,
    pub divisions: u32,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyLight {
    pub position: Vec3,
    pub intensity: f32,
    pub cast_shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundPlane {
    pub size: f32,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone)]
pub enum Background {
    Color(Vec3),
    Environment(Arc<EnvironmentMap>),
}

/// Fixed scenery around the loaded asset. Never touched by disposal.
#[derive(Debug, Clone)]
pub struct Stage {
    pub grid: Grid,
    pub hemisphere: HemisphereLight,
    pub key_light: KeyLight,
    pub ground: GroundPlane,
    pub background: Background,
    /// Image based lighting source, when one is loaded.
    pub environment: Option<Arc<EnvironmentMap>>,
}

impl Stage {
    pub fn new(config: &StageConfig, grid_visible: bool, shadows: bool) -> Self {
        Self {
            grid: Grid {
                size: config.grid_size,
                divisions: config.grid_divisions,
                visible: grid_visible,
            },
            hemisphere: HemisphereLight {
                sky_color: Vec3::ONE,
                ground_color: Vec3::splat(0.27),
                intensity: config.hemisphere_intensity,
            },
            key_light: KeyLight {
                position: config.key_light_position,
                intensity: config.key_light_intensity,
                cast_shadow: shadows,
            },
            ground: GroundPlane {
                size: config.grid_size * 2.0,
                receive_shadow: true,
            },
            background: Background::Color(hex_to_rgb(config.clear_color)),
            environment: None,
        }
    }

    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        let environment = Arc::new(environment);
        self.background = Background::Environment(environment.clone());
        self.environment = Some(environment);
    }
}

pub fn hex_to_rgb(color: u32) -> Vec3 {
    Vec3::new(
        ((color >> 16) & 0xff) as f32 / 255.0,
        ((color >> 8) & 0xff) as f32 / 255.0,
        (color & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{hex_to_rgb, Background, Stage};
    use crate::config::StageConfig;
    use crate::environment::EnvironmentMap;

    #[test]
    fn defaults_from_config() {
        let stage = Stage::new(&StageConfig::default(), true, true);
        assert_eq!(stage.grid.size, 10.0);
        assert_eq!(stage.grid.divisions, 20);
        assert_eq!(stage.key_light.position, Vec3::new(5.0, 10.0, 7.0));
        assert!(stage.key_light.cast_shadow);
        assert!(stage.environment.is_none());
        assert!(matches!(stage.background, Background::Color(_)));
    }

    #[test]
    fn environment_replaces_background() {
        let mut stage = Stage::new(&StageConfig::default(), true, true);
        let image = image::Rgb32FImage::from_pixel(2, 1, image::Rgb([1.0, 1.0, 1.0]));
        stage.set_environment(EnvironmentMap::from_image("sky", &image, 2).unwrap());

        assert!(matches!(stage.background, Background::Environment(_)));
        assert_eq!(stage.environment.as_ref().map(|env| env.width), Some(2));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(hex_to_rgb(0xff0000), Vec3::X);
        assert!(hex_to_rgb(0x05050a).abs_diff_eq(Vec3::new(5.0, 5.0, 10.0) / 255.0, 1e-6));
    }
}
