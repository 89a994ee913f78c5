use glam::Vec3;

use crate::math::bounds::AABB;

/// Distance multiplier that leaves a margin around a fitted subject.
pub const DEFAULT_FIT_OFFSET: f32 = 1.4;

/// Elevated three-quarter view direction, scaled by the fit distance.
const FIT_DIRECTION: Vec3 = Vec3::new(1.0, 0.6, 1.0);

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    /// Also the orbit controller's pivot.
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3, fov_y: f32) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            fov_y,
            near: 0.1,
            far: 2000.0,
        }
    }

    pub fn apply_fit(&mut self, fit: &CameraFit) {
        self.eye = fit.position;
        self.target = fit.target;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFit {
    pub position: Vec3,
    pub target: Vec3,
    pub distance: f32,
}

impl CameraFit {
    /// Same framing with the distance raised to at least `min_distance`, so
    /// a point-sized subject doesn't put the eye on the target.
    pub fn clamped(&self, min_distance: f32) -> CameraFit {
        let distance = self.distance.max(min_distance);
        CameraFit {
            position: self.target + FIT_DIRECTION * distance,
            target: self.target,
            distance,
        }
    }
}

/// Frames `bounds` for a camera with vertical field of view `fov_y`
/// (radians). Empty and point-sized bounds give a zero distance.
pub fn fit_camera(bounds: &AABB, fov_y: f32, offset: f32) -> CameraFit {
    let size = bounds.size();
    let target = bounds.center();
    let max_dim = size.max_element();

    let distance = (max_dim / (2.0 * (fov_y / 2.0).tan())).abs() * offset;

    CameraFit {
        position: target + FIT_DIRECTION * distance,
        target,
        distance,
    }
}
