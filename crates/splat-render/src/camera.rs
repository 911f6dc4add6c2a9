//! Orbit camera for inspecting a point cloud

use splat_raster::CameraUniform;

use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Camera orbiting a target point at a given distance
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Mouse sensitivity (radians per pixel)
    pub sensitivity: f32,

    yaw: f32,
    pitch: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, distance: f32) -> Self {
        Self {
            target,
            distance: distance.max(1e-3),
            fov_y: 60.0_f32.to_radians(),
            near: 0.01,
            far: 1000.0,
            sensitivity: 0.005,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Frame an axis-aligned box so it fits the vertical field of view
    pub fn framing(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(0.1);
        let fov_y = 60.0_f32.to_radians();
        let distance = radius / (fov_y * 0.5).sin() * 1.1;

        let mut camera = Self::new(center, distance);
        camera.far = (distance + radius) * 4.0;
        camera
    }

    /// Eye position in world space
    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    /// Update yaw/pitch from a mouse drag in pixels
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;

        // Clamp pitch to avoid flipping over the pole
        self.pitch = self.pitch.clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);
    }

    /// Scale the orbit distance; positive `steps` moves closer
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * 0.9_f32.powf(steps)).max(1e-3);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Perspective projection with wgpu's [0, 1] depth range
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn uniform(&self, width: u32, height: u32) -> CameraUniform {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        CameraUniform::from_matrices(self.view_matrix(), self.projection_matrix(aspect), self.fov_y, width, height)
    }
}
