//! Preprocess stage: one compute dispatch projecting every Gaussian
//!
//! Reads the camera, the point cloud and the render settings; writes splat
//! records, `(key, index)` pairs into the sorter's input slot, the key count
//! and the sorter's indirect dispatch size.

use crate::point_cloud::PointCloud;
use crate::resources::ResourceSet;
use crate::shaders::{buffer_entry, create_module, preprocess_source};

use splat_sort::SortCoordinator;

use wgpu::BufferBindingType as Binding;

const STORAGE_RO: Binding = Binding::Storage { read_only: true };
const STORAGE_RW: Binding = Binding::Storage { read_only: false };

pub struct PreprocessStage {
    pipeline: wgpu::ComputePipeline,
    // group 0: camera + point cloud, group 1: splats + settings, group 2: sort
    bind_groups: [wgpu::BindGroup; 3],
}

impl PreprocessStage {
    pub fn new(
        device: &wgpu::Device,
        pc: &PointCloud,
        camera_buffer: &wgpu::Buffer,
        resources: &ResourceSet,
        sorter: &dyn SortCoordinator,
    ) -> Self {
        let shader = create_module(device, "Preprocess Shader", &preprocess_source());
        let compute = wgpu::ShaderStages::COMPUTE;

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Preprocess Scene Layout"),
            entries: &[
                buffer_entry(0, compute, Binding::Uniform),
                buffer_entry(1, compute, STORAGE_RO),
                buffer_entry(2, compute, STORAGE_RO),
            ],
        });

        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Preprocess Output Layout"),
            entries: &[buffer_entry(0, compute, STORAGE_RW), buffer_entry(1, compute, Binding::Uniform)],
        });

        let sort_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Preprocess Sort Layout"),
            entries: &[
                // Sort info (atomic keys_size)
                buffer_entry(0, compute, STORAGE_RW),
                // Keys / indices
                buffer_entry(1, compute, STORAGE_RW),
                buffer_entry(2, compute, STORAGE_RW),
                // Dispatch args (atomic x)
                buffer_entry(3, compute, STORAGE_RW),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Preprocess Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &output_layout, &sort_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Preprocess Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("preprocess"),
            compilation_options: Default::default(),
            cache: None,
        });

        let scene = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Preprocess Scene Bind Group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: pc.gaussian_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: pc.sh_buffer().as_entire_binding(),
                },
            ],
        });

        let output = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Preprocess Output Bind Group"),
            layout: &output_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: resources.splat_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: resources.settings_buffer.as_entire_binding(),
                },
            ],
        });

        let input = sorter.input();
        let sort = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Preprocess Sort Bind Group"),
            layout: &sort_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sorter.sort_info_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input.keys.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: input.indices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: sorter.dispatch_indirect_buffer().as_entire_binding(),
                },
            ],
        });

        Self {
            pipeline,
            bind_groups: [scene, output, sort],
        }
    }

    /// Record the dispatch; the bookkeeping resets must already be queued
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, workgroups: u32) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Preprocess Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        for (index, bind_group) in self.bind_groups.iter().enumerate() {
            pass.set_bind_group(index as u32, bind_group, &[]);
        }
        pass.dispatch_workgroups(workgroups, 1, 1);
    }
}
