// src/scene/camera.rs
use crate::primitives::Ray;
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective camera. `vfov` is the vertical field of view in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub lookfrom: Vec3,
    pub lookat: Vec3,
    pub vup: Vec3,
    pub vfov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            lookfrom: Vec3::new(1.5, 1.0, 3.0),
            lookat: Vec3::ZERO,
            vup: Vec3::Y,
            vfov: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    /// Orthonormal basis (u right, v up, w backwards).
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let w = (self.lookfrom - self.lookat).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);
        (u, v, w)
    }

    /// Ray through a point in normalized device coordinates, both axes in
    /// `[-1, 1]` with +y up.
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect_ratio: f32) -> Ray {
        let (u, v, w) = self.basis();
        let h = (self.vfov.to_radians() / 2.0).tan();
        let dir = -w + u * (ndc.x * h * aspect_ratio) + v * (ndc.y * h);
        Ray::new(self.lookfrom, dir)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.lookfrom, self.lookat, self.vup)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.vfov.to_radians(), aspect_ratio, self.near, self.far)
    }

    // Packed as 16 view + 16 projection floats, column major
    pub fn create_buffer(&self, aspect_ratio: f32) -> [f32; 32] {
        let mut out = [0.0; 32];
        out[..16].copy_from_slice(&self.view_matrix().to_cols_array());
        out[16..].copy_from_slice(&self.projection_matrix(aspect_ratio).to_cols_array());
        out
    }
}

/// Orbit-style camera manipulation around a fixed target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub zoom_speed: f32,
    pub rotate_speed: f32,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 1.0,
            max_distance: 4.0,
            zoom_speed: 2.0,
            rotate_speed: 1.0,
            enable_pan: false,
            enable_zoom: true,
            enable_rotate: true,
        }
    }
}

const MIN_POLAR: f32 = 1e-3;

impl OrbitControls {
    /// Spherical (radius, polar from +y, azimuth around y) of the camera
    /// relative to the target.
    fn spherical(&self, camera: &CameraConfig) -> (f32, f32, f32) {
        let offset = camera.lookfrom - self.target;
        let radius = offset.length();
        if radius == 0.0 {
            return (0.0, std::f32::consts::FRAC_PI_2, 0.0);
        }
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);
        (radius, polar, azimuth)
    }

    fn place(&self, camera: &mut CameraConfig, radius: f32, polar: f32, azimuth: f32) {
        let polar = polar.clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        let offset = Vec3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );
        camera.lookfrom = self.target + offset;
        camera.lookat = self.target;
    }

    /// Angles in radians.
    pub fn rotate(&self, camera: &mut CameraConfig, d_azimuth: f32, d_polar: f32) {
        if !self.enable_rotate {
            return;
        }
        let (radius, polar, azimuth) = self.spherical(camera);
        self.place(
            camera,
            radius,
            polar - d_polar * self.rotate_speed,
            azimuth - d_azimuth * self.rotate_speed,
        );
    }

    /// Positive `delta` moves closer. Distance stays in `[min, max]`.
    pub fn zoom(&self, camera: &mut CameraConfig, delta: f32) {
        if !self.enable_zoom {
            return;
        }
        let (radius, polar, azimuth) = self.spherical(camera);
        let factor = 0.95f32.powf(self.zoom_speed * delta);
        let radius = (radius * factor).clamp(self.min_distance, self.max_distance);
        self.place(camera, radius, polar, azimuth);
    }

    /// Shift target and camera together in the view plane.
    pub fn pan(&mut self, camera: &mut CameraConfig, dx: f32, dy: f32) {
        if !self.enable_pan {
            return;
        }
        let (u, v, _) = camera.basis();
        let shift = u * -dx + v * dy;
        self.target += shift;
        camera.lookfrom += shift;
        camera.lookat = self.target;
    }

    /// Clamp the camera into the allowed distance band.
    pub fn sync(&self, camera: &mut CameraConfig) {
        let (radius, polar, azimuth) = self.spherical(camera);
        self.place(
            camera,
            radius.clamp(self.min_distance, self.max_distance),
            polar,
            azimuth,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::vec2;

    #[test]
    fn center_ray_points_at_target() {
        let cam = CameraConfig::default();
        let ray = cam.ray_from_ndc(Vec2::ZERO, 1.5);
        let expected = (cam.lookat - cam.lookfrom).normalize();
        assert!(ray.direction.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn ndc_corners_match_field_of_view() {
        let cam = CameraConfig {
            lookfrom: Vec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        };
        let ray = cam.ray_from_ndc(vec2(0.0, 1.0), 1.0);
        let angle = ray.direction.angle_between(-Vec3::Z).to_degrees();
        assert_relative_eq!(angle, 22.5, epsilon = 1e-3);
        assert!(ray.direction.y > 0.0);

        let right = cam.ray_from_ndc(vec2(1.0, 0.0), 2.0);
        assert!(right.direction.x > 0.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let controls = OrbitControls::default();
        let mut cam = CameraConfig::default();
        controls.zoom(&mut cam, 100.0);
        assert_relative_eq!(cam.lookfrom.length(), 1.0, epsilon = 1e-4);
        controls.zoom(&mut cam, -100.0);
        assert_relative_eq!(cam.lookfrom.length(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn rotate_keeps_distance() {
        let controls = OrbitControls::default();
        let mut cam = CameraConfig::default();
        let before = cam.lookfrom.length();
        controls.rotate(&mut cam, 0.7, -0.3);
        assert_relative_eq!(cam.lookfrom.length(), before, epsilon = 1e-4);
        assert_eq!(cam.lookat, Vec3::ZERO);
    }

    #[test]
    fn pan_is_disabled_by_default() {
        let mut controls = OrbitControls::default();
        let mut cam = CameraConfig::default();
        let before = cam;
        controls.pan(&mut cam, 1.0, 1.0);
        assert_eq!(cam, before);
    }
}
