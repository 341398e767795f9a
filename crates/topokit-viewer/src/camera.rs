//! Perspective camera and asset framing.

use glam::{Mat4, Vec3};
use topokit_settings::ViewerSettings;

/// Extra room around a fitted asset
pub const FIT_MARGIN: f32 = 1.2;

/// Perspective camera looking at `target`, Y up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov: f32, // degrees, vertical
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov: 75.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            ..Default::default()
        }
    }

    /// Camera for a surface of the given pixel size
    pub fn for_surface(settings: &ViewerSettings, width: u32, height: u32) -> Self {
        let mut camera = Self::new(settings.fov, 1.0, settings.near, settings.far);
        camera.update_aspect_ratio(width, height);
        camera
    }

    /// Recompute aspect from a surface size; the field of view is unchanged
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.target - self.position).normalize_or_zero();

        // Looking straight up or down the Y axis
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Place the camera on the +Z view axis of `center`, far enough back to
    /// frame a box of `size`
    ///
    /// Returns the chosen distance.
    pub fn frame(&mut self, center: Vec3, size: Vec3) -> f32 {
        let distance = fit_distance(size, self.fov, self.aspect).max(self.near * 10.0);
        self.position = center + Vec3::new(0.0, 0.0, distance);
        self.target = center;
        distance
    }
}

/// Viewing distance that frames a box of `size` with [`FIT_MARGIN`]
///
/// Uses the largest box extent against the vertical field of view, widened
/// when the surface is taller than it is wide.
pub fn fit_distance(size: Vec3, fov: f32, aspect: f32) -> f32 {
    let max_size = size.max_element().max(0.0);
    let fit_height = max_size / (2.0 * (std::f32::consts::PI * fov / 360.0).atan());
    let fit_width = if aspect > 0.0 {
        fit_height / aspect
    } else {
        fit_height
    };
    fit_height.max(fit_width) * FIT_MARGIN
}
