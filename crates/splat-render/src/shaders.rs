//! Shader sources as compiled by the renderer

use splat_raster::shaders;

/// Preprocess compute shader with the sort constants prepended
pub fn preprocess_source() -> String {
    format!("{}\n{}", splat_sort::wgsl_constants(), shaders::PREPROCESS)
}

/// Splat render shader
pub fn render_source() -> &'static str {
    shaders::GAUSSIAN
}

pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub(crate) fn buffer_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
