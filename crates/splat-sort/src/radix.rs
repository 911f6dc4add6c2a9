//! wgpu radix sorter
//!
//! Four 8-bit passes, each made of three dispatches:
//! 1. Histogram: per-block digit counts (indirect, one workgroup per block)
//! 2. Scan: exclusive prefix sum over all block histograms (one workgroup)
//! 3. Scatter: stable move of keys and indices to their digit offsets (indirect)
//!
//! Passes alternate between two key/index slots. The pass count is even, so
//! the input slot also holds the final order.

use crate::gpu_types::{DispatchIndirectArgs, PassParams, SortInfo};
use crate::{SortBuffers, SortCoordinator, RADIX_BITS, RADIX_PASSES, RADIX_SIZE, SORT_BLOCK_SIZE};

use wgpu::util::DeviceExt;

/// Radix sort shader body; needs [`crate::wgsl_constants`] prepended
pub const RADIX_SORT_SHADER: &str = include_str!("shaders/radix_sort.wgsl");

/// Full shader source as compiled by the sorter
pub fn shader_source() -> String {
    format!("{}\n{}", crate::wgsl_constants(), RADIX_SORT_SHADER)
}

/// Blocks needed for `capacity` keys, never zero
pub fn max_blocks(capacity: u32) -> u32 {
    capacity.div_ceil(SORT_BLOCK_SIZE).max(1)
}

/// Histogram entries needed for `capacity` keys
pub fn histogram_len(capacity: u32) -> u64 {
    RADIX_SIZE as u64 * max_blocks(capacity) as u64
}

/// Indirect-dispatch LSD radix sort over `u32` keys with `u32` payloads
pub struct RadixSorter {
    capacity: u32,

    histogram_pipeline: wgpu::ComputePipeline,
    scan_pipeline: wgpu::ComputePipeline,
    scatter_pipeline: wgpu::ComputePipeline,

    // One bind group per pass; pass `p` reads slot p % 2 and writes the other
    pass_bind_groups: Vec<wgpu::BindGroup>,

    ping_pong: [SortBuffers; 2],
    sort_info_buffer: wgpu::Buffer,
    dispatch_buffer: wgpu::Buffer,
    // Kept alive for the bind groups
    _histogram_buffer: wgpu::Buffer,
    _pass_params: Vec<wgpu::Buffer>,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_slot(device: &wgpu::Device, slot: usize, capacity: u32) -> SortBuffers {
    // Zero-size bindings are invalid, so an empty sorter still owns one entry
    let size = capacity.max(1) as u64 * std::mem::size_of::<u32>() as u64;
    let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;

    SortBuffers {
        keys: device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Sort Keys {slot}")),
            size,
            usage,
            mapped_at_creation: false,
        }),
        indices: device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Sort Indices {slot}")),
            size,
            usage,
            mapped_at_creation: false,
        }),
    }
}

impl RadixSorter {
    /// Allocate every buffer and pipeline for up to `capacity` keys
    pub fn new(device: &wgpu::Device, capacity: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Radix Sort Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source().into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Radix Sort Bind Group Layout"),
            entries: &[
                // Sort info (keys_size)
                storage_entry(0, true),
                // Dispatch args (block count)
                storage_entry(1, true),
                // Source keys / indices
                storage_entry(2, true),
                storage_entry(3, true),
                // Destination keys / indices
                storage_entry(4, false),
                storage_entry(5, false),
                // Block histograms
                storage_entry(6, false),
                // Pass params
                wgpu::BindGroupLayoutEntry {
                    binding: 7,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Radix Sort Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let histogram_pipeline = make_pipeline("Radix Histogram Pipeline", "histogram_pass");
        let scan_pipeline = make_pipeline("Radix Scan Pipeline", "scan_pass");
        let scatter_pipeline = make_pipeline("Radix Scatter Pipeline", "scatter_pass");

        let ping_pong = [create_slot(device, 0, capacity), create_slot(device, 1, capacity)];

        let sort_info_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sort Info Buffer"),
            contents: bytemuck::bytes_of(&SortInfo::reset()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        });

        let dispatch_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sort Dispatch Buffer"),
            contents: bytemuck::bytes_of(&DispatchIndirectArgs::reset()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        });

        let histogram_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sort Histogram Buffer"),
            size: histogram_len(capacity) * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let pass_params: Vec<wgpu::Buffer> = (0..RADIX_PASSES)
            .map(|pass| {
                let params = PassParams {
                    shift: pass as u32 * RADIX_BITS,
                    _pad: [0; 3],
                };
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Radix Pass {pass} Params")),
                    contents: bytemuck::bytes_of(&params),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
            })
            .collect();

        let pass_bind_groups = (0..RADIX_PASSES)
            .map(|pass| {
                let src = &ping_pong[pass % 2];
                let dst = &ping_pong[(pass + 1) % 2];
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Radix Pass {pass} Bind Group")),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: sort_info_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: dispatch_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: src.keys.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: src.indices.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: dst.keys.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 5,
                            resource: dst.indices.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 6,
                            resource: histogram_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 7,
                            resource: pass_params[pass].as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();

        tracing::debug!(
            capacity,
            blocks = max_blocks(capacity),
            passes = RADIX_PASSES,
            "Radix sorter created"
        );

        Self {
            capacity,
            histogram_pipeline,
            scan_pipeline,
            scatter_pipeline,
            pass_bind_groups,
            ping_pong,
            sort_info_buffer,
            dispatch_buffer,
            _histogram_buffer: histogram_buffer,
            _pass_params: pass_params,
        }
    }
}

impl SortCoordinator for RadixSorter {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn sort_info_buffer(&self) -> &wgpu::Buffer {
        &self.sort_info_buffer
    }

    fn dispatch_indirect_buffer(&self) -> &wgpu::Buffer {
        &self.dispatch_buffer
    }

    fn input(&self) -> &SortBuffers {
        &self.ping_pong[0]
    }

    fn sorted(&self) -> &SortBuffers {
        &self.ping_pong[RADIX_PASSES % 2]
    }

    fn sort(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Radix Sort Pass"),
            timestamp_writes: None,
        });

        for bind_group in &self.pass_bind_groups {
            pass.set_bind_group(0, bind_group, &[]);

            pass.set_pipeline(&self.histogram_pipeline);
            pass.dispatch_workgroups_indirect(&self.dispatch_buffer, 0);

            pass.set_pipeline(&self.scan_pipeline);
            pass.dispatch_workgroups(1, 1, 1);

            pass.set_pipeline(&self.scatter_pipeline);
            pass.dispatch_workgroups_indirect(&self.dispatch_buffer, 0);
        }

        tracing::trace!(passes = self.pass_bind_groups.len(), "Recorded radix sort");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_validate(source: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(source).expect("radix shader should parse");
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
            .validate(&module)
            .expect("radix shader should validate");
        module
    }

    #[test]
    fn test_shader_validates() {
        let module = parse_and_validate(&shader_source());
        let entry_points: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(entry_points.contains(&"histogram_pass"));
        assert!(entry_points.contains(&"scan_pass"));
        assert!(entry_points.contains(&"scatter_pass"));
    }

    #[test]
    fn test_shader_workgroup_size() {
        let module = parse_and_validate(&shader_source());
        for ep in &module.entry_points {
            assert_eq!(ep.workgroup_size, [crate::SORT_WORKGROUP_SIZE, 1, 1], "{}", ep.name);
        }
    }

    #[test]
    fn test_block_counts() {
        assert_eq!(max_blocks(0), 1);
        assert_eq!(max_blocks(1), 1);
        assert_eq!(max_blocks(SORT_BLOCK_SIZE), 1);
        assert_eq!(max_blocks(SORT_BLOCK_SIZE + 1), 2);
        assert_eq!(histogram_len(1_000_000), 256 * 1954);
    }
}
