//! Orbit-style camera controls with damping.

use crate::camera::PerspectiveCamera;
use glam::Vec3;
use topokit_settings::ViewerSettings;
use tracing::debug;

const MIN_POLAR: f32 = 1e-4;
const EPS: f32 = 1e-6;

/// Rotates and zooms a camera around a fixed target
///
/// Input is accumulated as pending deltas and applied by [`update`], which
/// runs once per frame. With damping enabled only a fraction of the pending
/// motion is applied each frame, so the camera eases to a stop.
///
/// [`update`]: OrbitControls::update
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    disposed: bool,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: 0.1,
            rotate_speed: 0.5,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            disposed: false,
        }
    }
}

impl OrbitControls {
    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self {
            damping_factor: settings.damping_factor,
            rotate_speed: settings.rotate_speed,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            ..Default::default()
        }
    }

    /// Queue a rotation; angles in radians, scaled by `rotate_speed`
    pub fn rotate(&mut self, left: f32, up: f32) {
        if self.disposed {
            return;
        }
        self.delta_theta -= left * self.rotate_speed;
        self.delta_phi -= up * self.rotate_speed;
    }

    /// Queue a zoom; `factor` > 1 moves the camera away from the target
    pub fn dolly(&mut self, factor: f32) {
        if self.disposed || factor <= 0.0 {
            return;
        }
        self.scale *= factor;
    }

    /// Apply pending motion to the camera
    ///
    /// Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.disposed {
            return false;
        }

        let offset = camera.position - self.target;
        let mut radius = offset.length();
        let (mut theta, mut phi) = if radius > EPS {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, std::f32::consts::FRAC_PI_2)
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * step;
        phi = (phi + self.delta_phi * step).clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        radius = (radius * self.scale)
            .max(self.min_distance)
            .min(self.max_distance);

        let sin_phi = phi.sin();
        let new_position = self.target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        let moved = new_position.distance_squared(camera.position) > EPS
            || camera.target.distance_squared(self.target) > EPS;
        if radius > EPS {
            camera.position = new_position;
        }
        camera.look_at(self.target);
        moved
    }

    /// Release the controls; further input and updates are ignored
    ///
    /// Returns false if the controls were already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        debug!("Orbit controls disposed");
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(z: f32) -> PerspectiveCamera {
        PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, z),
            ..Default::default()
        }
    }

    #[test]
    fn test_idle_update_keeps_camera() {
        let mut controls = OrbitControls::default();
        let mut camera = camera_at(5.0);
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_damped_rotation_eases_out() {
        let mut controls = OrbitControls::default();
        let mut camera = camera_at(5.0);
        controls.rotate(1.0, 0.0);

        let mut steps = Vec::new();
        let mut last = camera.position;
        for _ in 0..5 {
            controls.update(&mut camera);
            steps.push(camera.position.distance(last));
            last = camera.position;
        }
        assert!(steps.windows(2).all(|w| w[1] < w[0]));
        assert!((camera.distance() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_dolly_respects_distance_bounds() {
        let mut controls = OrbitControls {
            min_distance: 2.0,
            max_distance: 8.0,
            ..Default::default()
        };
        let mut camera = camera_at(5.0);

        controls.dolly(10.0);
        controls.update(&mut camera);
        assert!((camera.distance() - 8.0).abs() < 1e-4);

        controls.dolly(0.01);
        controls.update(&mut camera);
        assert!((camera.distance() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut controls = OrbitControls::default();
        assert!(controls.dispose());
        assert!(!controls.dispose());

        let mut camera = camera_at(5.0);
        controls.rotate(1.0, 1.0);
        assert!(!controls.update(&mut camera));
    }
}
