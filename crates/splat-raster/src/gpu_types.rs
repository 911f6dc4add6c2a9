//! GPU-compatible data types shared by the preprocess and render shaders

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Vertices emitted per splat (two triangles forming a quad)
pub const VERTICES_PER_SPLAT: u32 = 6;

/// Screen-space splat written by the preprocess pass
///
/// Half-float packed so one record stays at 32 bytes. Entries whose Gaussian
/// failed the validity test keep whatever the previous frame left there; the
/// sorted index buffer never references them.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Splat {
    /// Quad center in NDC
    pub center: [f32; 2],      // 8 bytes (offset 0)
    /// Quad half-size in NDC (3 sigma along the major axis)
    pub extent: [f32; 2],      // 8 bytes (offset 8)
    /// f16 pairs: (conic.a, conic.b), (conic.c, opacity)
    pub conic_opacity: [u32; 2], // 8 bytes (offset 16)
    /// f16 pairs: (r, g), (b, unused)
    pub color: [u32; 2],       // 8 bytes (offset 24)
    // Total: 32 bytes
}

impl Splat {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Byte size of a splat buffer holding `num_points` records
    pub fn buffer_size(num_points: u32) -> u64 {
        num_points as u64 * Self::SIZE as u64
    }
}

/// Largest point count `RenderSettings::num_points` holds exactly
///
/// The count is stored as `f32`; above 2^24 it rounds and the shader guards
/// would skip trailing Gaussians.
pub const MAX_POINTS: u32 = 1 << f32::MANTISSA_DIGITS;

/// Render settings uniform
///
/// Four 4-byte floats: `{gaussian_multiplier, sh_degree, num_points, reserved}`.
/// The integer fields are stored as floats because that is the layout the
/// shaders read.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderSettings {
    /// Scaling factor applied to every Gaussian before projection
    pub gaussian_multiplier: f32,
    /// Spherical harmonics degree used for view-dependent color
    pub sh_degree: f32,
    /// Number of Gaussians in the point cloud
    pub num_points: f32,
    pub reserved: f32,
}

impl RenderSettings {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(sh_degree: u32, num_points: u32) -> Self {
        Self {
            gaussian_multiplier: 1.0,
            sh_degree: sh_degree as f32,
            num_points: num_points as f32,
            reserved: 0.0,
        }
    }

    pub fn with_multiplier(mut self, gaussian_multiplier: f32) -> Self {
        self.gaussian_multiplier = gaussian_multiplier;
        self
    }
}

/// Indirect draw arguments
///
/// `instance_count` is rewritten on the GPU every frame from the sort count.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Byte offset of `instance_count`, the copy destination for the sort count
    pub const INSTANCE_COUNT_OFFSET: u64 = std::mem::offset_of!(DrawIndirectArgs, instance_count) as u64;

    /// Arguments uploaded at construction: one quad per point
    pub fn initial(num_points: u32) -> Self {
        Self {
            vertex_count: VERTICES_PER_SPLAT,
            instance_count: num_points,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Camera uniform read by both the preprocess and render shaders
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// World to view
    pub view: [[f32; 4]; 4],
    pub view_inv: [[f32; 4]; 4],
    /// View to clip (wgpu depth range)
    pub proj: [[f32; 4]; 4],
    pub proj_inv: [[f32; 4]; 4],
    /// Surface size in pixels
    pub viewport: [f32; 2],
    /// Focal lengths in pixels
    pub focal: [f32; 2],
}

impl CameraUniform {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Build the uniform from view/projection matrices and the vertical field of view
    pub fn from_matrices(view: Mat4, proj: Mat4, fov_y: f32, width: u32, height: u32) -> Self {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        // Square pixels: both focal lengths follow from the vertical fov
        let focal = height / (2.0 * (fov_y * 0.5).tan());

        Self {
            view: view.to_cols_array_2d(),
            view_inv: view.inverse().to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            proj_inv: proj.inverse().to_cols_array_2d(),
            viewport: [width, height],
            focal: [focal, focal],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        // Byte-exact layouts the shaders rely on
        assert_eq!(Splat::SIZE, 32);
        assert_eq!(RenderSettings::SIZE, 16);
        assert_eq!(DrawIndirectArgs::SIZE, 16);
        assert_eq!(CameraUniform::SIZE, 272);
    }

    #[test]
    fn test_max_points_exact_in_settings() {
        let settings = RenderSettings::new(0, MAX_POINTS);
        assert_eq!(settings.num_points as u32, MAX_POINTS);
        let past = RenderSettings::new(0, MAX_POINTS + 1);
        assert_ne!(past.num_points as u32, MAX_POINTS + 1);
    }

    #[test]
    fn test_splat_buffer_size() {
        for n in [0u32, 1, 1000, 1_000_000] {
            assert_eq!(Splat::buffer_size(n), n as u64 * 32);
        }
    }

    #[test]
    fn test_initial_draw_args() {
        let args = DrawIndirectArgs::initial(1234);
        assert_eq!(args.vertex_count, 6);
        assert_eq!(args.instance_count, 1234);
        assert_eq!(args.first_vertex, 0);
        assert_eq!(args.first_instance, 0);
        assert_eq!(DrawIndirectArgs::INSTANCE_COUNT_OFFSET, 4);
    }

    #[test]
    fn test_render_settings_layout() {
        let settings = RenderSettings::new(3, 1000).with_multiplier(0.5);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&settings));
        assert_eq!(floats, &[0.5, 3.0, 1000.0, 0.0]);
    }

    #[test]
    fn test_camera_focal() {
        let fov_y = 90.0_f32.to_radians();
        let camera = CameraUniform::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, fov_y, 800, 600);
        // tan(45°) = 1, so focal = height / 2
        assert!((camera.focal[1] - 300.0).abs() < 1e-3);
        assert_eq!(camera.focal[0], camera.focal[1]);
        assert_eq!(camera.viewport, [800.0, 600.0]);
    }
}
