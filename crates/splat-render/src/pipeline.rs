//! Splat render stage: one indirect draw of screen-space quads

use crate::resources::ResourceSet;
use crate::shaders::{buffer_entry, create_module, render_source};

use splat_sort::SortCoordinator;

/// Clear color of the output view: transparent black
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::TRANSPARENT;

pub struct SplatPipeline {
    pipeline: wgpu::RenderPipeline,
    camera_bind_group: wgpu::BindGroup,
    splat_bind_group: wgpu::BindGroup,
}

impl SplatPipeline {
    pub fn new(
        device: &wgpu::Device,
        presentation_format: wgpu::TextureFormat,
        camera_buffer: &wgpu::Buffer,
        resources: &ResourceSet,
        sorter: &dyn SortCoordinator,
    ) -> Self {
        let shader = create_module(device, "Gaussian Shader", render_source());

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Camera Layout"),
            entries: &[buffer_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                wgpu::BufferBindingType::Uniform,
            )],
        });

        let storage = wgpu::BufferBindingType::Storage { read_only: true };
        let splat_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Splat Layout"),
            entries: &[
                // Splats
                buffer_entry(0, wgpu::ShaderStages::VERTEX, storage),
                // Sorted indices
                buffer_entry(1, wgpu::ShaderStages::VERTEX, storage),
                // Render settings
                buffer_entry(2, wgpu::ShaderStages::VERTEX, wgpu::BufferBindingType::Uniform),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gaussian Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &splat_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Gaussian Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                // Quad corners come from vertex_index
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: presentation_format,
                    // One / OneMinusSrcAlpha on premultiplied color
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Back-to-front order replaces the depth test
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let splat_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Splat Bind Group"),
            layout: &splat_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: resources.splat_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sorter.sorted().indices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: resources.settings_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            pipeline,
            camera_bind_group,
            splat_bind_group,
        }
    }

    /// Record the render pass and its single indirect draw
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, draw_args: &wgpu::Buffer) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Gaussian Splat Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.splat_bind_group, &[]);
        render_pass.draw_indirect(draw_args, 0);
    }
}
