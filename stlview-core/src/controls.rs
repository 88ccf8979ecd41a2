/// Orbit/zoom interaction around a fixed target
use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::projection::OrthographicCamera;

/// Keeps the camera off the poles, where the up vector degenerates
const POLAR_EPSILON: f32 = 1e-6;

/// Spherical coordinates around the orbit target: `phi` is the polar angle
/// from +Y, `theta` the azimuth around Y measured from +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

pub const DEFAULT_MIN_ZOOM: f32 = 0.01;
pub const DEFAULT_MAX_ZOOM: f32 = 100.0;

/// Orbit controller bound to an orthographic camera.
///
/// Input handlers only accumulate pending rotation and zoom; `update` applies
/// them to the camera once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            enable_rotate: true,
            enable_zoom: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
        }
    }

    /// Rotate the camera left around the target by `angle` radians
    pub fn rotate_left(&mut self, angle: f32) {
        if self.enable_rotate {
            self.pending_theta -= angle;
        }
    }

    /// Rotate the camera up over the target by `angle` radians
    pub fn rotate_up(&mut self, angle: f32) {
        if self.enable_rotate {
            self.pending_phi -= angle;
        }
    }

    /// Magnify by `factor` (> 1 zooms in)
    pub fn zoom_by(&mut self, factor: f32) {
        if self.enable_zoom && factor > 0.0 {
            self.pending_scale *= factor;
        }
    }

    /// Pointer drag of `(dx, dy)` pixels over an element `element_height`
    /// pixels tall. A drag across the full height turns a full circle.
    pub fn handle_drag(&mut self, dx: f32, dy: f32, element_height: f32) {
        if element_height <= 0.0 {
            return;
        }
        self.rotate_left(2.0 * PI * dx / element_height * self.rotate_speed);
        self.rotate_up(2.0 * PI * dy / element_height * self.rotate_speed);
    }

    /// Wheel scroll; negative `delta_y` (scrolling up) zooms in
    pub fn handle_wheel(&mut self, delta_y: f32) {
        let step = 0.95f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.zoom_by(1.0 / step);
        } else if delta_y > 0.0 {
            self.zoom_by(step);
        }
    }

    /// Apply pending input to `camera`. Returns whether the camera changed.
    pub fn update(&mut self, camera: &mut OrthographicCamera) -> bool {
        let rotated = self.pending_theta != 0.0 || self.pending_phi != 0.0;
        if rotated {
            let mut spherical = Spherical::from_offset(&(camera.position - self.target));
            spherical.theta += self.pending_theta;
            spherical.phi =
                (spherical.phi + self.pending_phi).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            camera.position = self.target + spherical.to_offset();
        }
        camera.look_at(self.target);

        let zoomed = self.pending_scale != 1.0;
        if zoomed {
            camera.zoom = (camera.zoom * self.pending_scale).clamp(self.min_zoom, self.max_zoom);
            camera.update_projection_matrix();
        }

        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_scale = 1.0;

        rotated || zoomed
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Viewport;

    fn camera() -> OrthographicCamera {
        OrthographicCamera::isometric(
            Viewport::new(800, 600),
            50.0,
            Point3::new(100.0, 100.0, 100.0),
            0.1,
            1000.0,
        )
    }

    #[test]
    fn test_spherical_round_trip() {
        let offset = Vector3::new(100.0, 100.0, 100.0);
        let back = Spherical::from_offset(&offset).to_offset();
        assert!((back - offset).norm() < 1e-3);
    }

    #[test]
    fn test_idle_update_keeps_camera() {
        let mut camera = camera();
        let before = camera.position;
        let mut controls = OrbitControls::default();

        assert!(!controls.update(&mut camera));
        assert_eq!(camera.position, before);
    }

    #[test]
    fn test_rotation_preserves_distance_to_target() {
        let mut camera = camera();
        let distance = (camera.position - Point3::origin()).norm();
        let mut controls = OrbitControls::default();

        controls.rotate_left(0.5);
        controls.rotate_up(0.2);
        assert!(controls.update(&mut camera));

        let after = (camera.position - Point3::origin()).norm();
        assert!((after - distance).abs() < 1e-2);
        assert_eq!(camera.target, Point3::origin());
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();

        controls.rotate_up(10.0);
        controls.update(&mut camera);

        assert!(camera.position.y > 0.0);
        assert!(camera.view_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_wheel_zooms_camera() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();

        controls.handle_wheel(-120.0);
        assert!(controls.update(&mut camera));
        assert!(camera.zoom > 1.0);

        controls.handle_wheel(120.0);
        controls.handle_wheel(120.0);
        controls.update(&mut camera);
        assert!(camera.zoom < 1.0);
    }

    #[test]
    fn test_wheel_zoom_stays_recoverable() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();

        for _ in 0..2100 {
            controls.handle_wheel(120.0);
            controls.update(&mut camera);
        }
        assert_eq!(camera.zoom, DEFAULT_MIN_ZOOM);
        assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));

        for _ in 0..100 {
            controls.handle_wheel(-120.0);
            controls.update(&mut camera);
        }
        assert!(camera.zoom > DEFAULT_MIN_ZOOM * 100.0);

        for _ in 0..2100 {
            controls.handle_wheel(-120.0);
            controls.update(&mut camera);
        }
        assert_eq!(camera.zoom, DEFAULT_MAX_ZOOM);
    }

    #[test]
    fn test_disabled_controls_ignore_input() {
        let mut camera = camera();
        let before = camera.clone();
        let mut controls = OrbitControls::default();
        controls.enable_rotate = false;
        controls.enable_zoom = false;

        controls.handle_drag(200.0, 50.0, 600.0);
        controls.handle_wheel(-120.0);
        assert!(!controls.update(&mut camera));
        assert_eq!(camera.zoom, before.zoom);
    }
}
