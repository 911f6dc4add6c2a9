//! Per-renderer GPU buffers: splats, render settings and draw arguments

use crate::error::{RenderError, RenderResult};

use splat_raster::{DrawIndirectArgs, RenderSettings, Splat};

use wgpu::util::DeviceExt;

/// Byte size of the splat buffer for `num_points` splats
pub fn splat_buffer_size(num_points: u32) -> u64 {
    Splat::buffer_size(num_points)
}

/// Bytes actually allocated for a buffer of `logical` bytes
///
/// Zero-sized bindings are invalid in wgpu, so an empty buffer still
/// reserves one `min_size` record.
pub fn allocation_size(logical: u64, min_size: u64) -> u64 {
    logical.max(min_size)
}

/// Largest storage buffer `limits` lets a shader bind
pub fn max_storage_size(limits: &wgpu::Limits) -> u64 {
    limits.max_buffer_size.min(limits.max_storage_buffer_binding_size as u64)
}

/// Reject a storage buffer the device could not create or bind
///
/// wgpu reports oversized buffers as uncaptured errors, and mapping an
/// invalid buffer at creation panics, so sizes are checked up front.
pub fn check_buffer_size(label: &'static str, size: u64, limits: &wgpu::Limits) -> RenderResult<()> {
    let limit = max_storage_size(limits);
    if size > limit {
        return Err(RenderError::BufferTooLarge { label, size, limit });
    }
    Ok(())
}

/// Buffers allocated once per renderer and never resized
#[derive(Debug)]
pub struct ResourceSet {
    pub splat_buffer: wgpu::Buffer,
    pub settings_buffer: wgpu::Buffer,
    pub draw_args_buffer: wgpu::Buffer,
    splat_buffer_size: u64,
}

impl ResourceSet {
    pub fn new(device: &wgpu::Device, settings: &RenderSettings, num_points: u32) -> Self {
        let splat_buffer_size = splat_buffer_size(num_points);

        let splat_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Splat Buffer"),
            size: allocation_size(splat_buffer_size, Splat::SIZE as u64),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let settings_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Settings Buffer"),
            contents: bytemuck::bytes_of(settings),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let draw_args_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Indirect Buffer"),
            contents: bytemuck::bytes_of(&DrawIndirectArgs::initial(num_points)),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        });

        tracing::debug!(num_points, splat_bytes = splat_buffer_size, "Allocated renderer resources");

        Self {
            splat_buffer,
            settings_buffer,
            draw_args_buffer,
            splat_buffer_size,
        }
    }

    /// Logical splat buffer size, `num_points * 32`
    pub fn splat_buffer_size(&self) -> u64 {
        self.splat_buffer_size
    }
}
