//! GPU-resident Gaussian point cloud

use crate::error::RenderResult;
use crate::renderer::with_error_scope;
use crate::resources::check_buffer_size;

use splat_data::{Gaussian, GaussianCloud, ShCoefficients};

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

/// Gaussian and SH buffers for one point cloud
///
/// Owned by the caller; a renderer only borrows it while binding. Contents
/// never change after upload.
#[derive(Debug)]
pub struct PointCloud {
    num_points: u32,
    sh_deg: u32,
    gaussian_buffer: wgpu::Buffer,
    sh_buffer: wgpu::Buffer,
}

impl PointCloud {
    /// Wrap buffers that already hold `num_points` Gaussians and SH records
    pub fn new(num_points: u32, sh_deg: u32, gaussian_buffer: wgpu::Buffer, sh_buffer: wgpu::Buffer) -> Self {
        Self {
            num_points,
            sh_deg,
            gaussian_buffer,
            sh_buffer,
        }
    }

    /// Upload a host-side cloud
    ///
    /// An empty cloud still gets one zeroed record per buffer, since wgpu
    /// rejects zero-sized storage bindings. Fails when either buffer exceeds
    /// the device's storage limits.
    pub fn upload(device: &wgpu::Device, cloud: &GaussianCloud) -> RenderResult<Self> {
        let zero_gaussian = [Gaussian::zeroed()];
        let zero_sh = [ShCoefficients::zeroed()];
        let (gaussians, sh) = if cloud.is_empty() {
            (&zero_gaussian[..], &zero_sh[..])
        } else {
            (cloud.gaussians(), cloud.sh_coefficients())
        };

        let limits = device.limits();
        check_buffer_size("Gaussian Buffer", std::mem::size_of_val(gaussians) as u64, &limits)?;
        check_buffer_size("SH Coefficient Buffer", std::mem::size_of_val(sh) as u64, &limits)?;

        let (gaussian_buffer, sh_buffer) = with_error_scope(device, "point cloud", || {
            let gaussian_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Gaussian Buffer"),
                contents: bytemuck::cast_slice(gaussians),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
            let sh_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("SH Coefficient Buffer"),
                contents: bytemuck::cast_slice(sh),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
            (gaussian_buffer, sh_buffer)
        })?;

        tracing::info!(
            "Uploaded {} Gaussians ({:.1} MB, SH degree {})",
            cloud.len(),
            (gaussian_buffer.size() + sh_buffer.size()) as f64 / (1024.0 * 1024.0),
            cloud.sh_degree()
        );

        Ok(Self::new(cloud.len() as u32, cloud.sh_degree(), gaussian_buffer, sh_buffer))
    }

    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    pub fn sh_deg(&self) -> u32 {
        self.sh_deg
    }

    pub fn gaussian_buffer(&self) -> &wgpu::Buffer {
        &self.gaussian_buffer
    }

    pub fn sh_buffer(&self) -> &wgpu::Buffer {
        &self.sh_buffer
    }
}
