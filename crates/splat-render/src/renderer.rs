//! Gaussian renderer: owns the per-frame pipeline for one point cloud

use crate::error::{RenderError, RenderResult};
use crate::frame::{record_frame, update_multiplier, BufferWriter, FrameBuffer, FrameEncoder};
use crate::pipeline::SplatPipeline;
use crate::point_cloud::PointCloud;
use crate::preprocess::PreprocessStage;
use crate::resources::{check_buffer_size, splat_buffer_size, ResourceSet};

use splat_raster::{RenderSettings, MAX_POINTS};
use splat_sort::{RadixSorter, SortCoordinator};

use std::sync::Arc;

/// Run `create` inside validation and out-of-memory error scopes
pub(crate) fn with_error_scope<T>(device: &wgpu::Device, stage: &'static str, create: impl FnOnce() -> T) -> RenderResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = create();

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    match validation.or(out_of_memory) {
        Some(source) => {
            tracing::error!("Device error while creating {}: {}", stage, source);
            Err(RenderError::Device { stage, source })
        }
        None => Ok(value),
    }
}

/// Build a renderer for `pc` with a radix sorter sized to the cloud
///
/// `camera_buffer` must hold a `CameraUniform`; the caller keeps updating it
/// through [`GaussianRenderer::camera_buffer`].
pub fn get_renderer(
    pc: &PointCloud,
    device: &wgpu::Device,
    queue: Arc<wgpu::Queue>,
    presentation_format: wgpu::TextureFormat,
    camera_buffer: wgpu::Buffer,
) -> RenderResult<GaussianRenderer> {
    check_device_limits(device, pc.num_points())?;
    let sorter = with_error_scope(device, "sorter", || RadixSorter::new(device, pc.num_points()))?;
    get_renderer_with_sorter(pc, device, queue, presentation_format, camera_buffer, sorter)
}

/// Build a renderer around an existing sorter
///
/// Fails with [`RenderError::SortCapacity`] when the sorter cannot hold one
/// key per point.
pub fn get_renderer_with_sorter<S: SortCoordinator>(
    pc: &PointCloud,
    device: &wgpu::Device,
    queue: Arc<wgpu::Queue>,
    presentation_format: wgpu::TextureFormat,
    camera_buffer: wgpu::Buffer,
    sorter: S,
) -> RenderResult<GaussianRenderer<S>> {
    let num_points = pc.num_points();
    check_capacity(sorter.capacity(), num_points)?;
    check_device_limits(device, num_points)?;

    let settings = RenderSettings::new(pc.sh_deg(), num_points);

    let resources = with_error_scope(device, "renderer resources", || {
        ResourceSet::new(device, &settings, num_points)
    })?;

    let (preprocess, pipeline) = with_error_scope(device, "pipelines", || {
        (
            PreprocessStage::new(device, pc, &camera_buffer, &resources, &sorter),
            SplatPipeline::new(device, presentation_format, &camera_buffer, &resources, &sorter),
        )
    })?;

    tracing::info!(
        "Gaussian renderer ready: {} points, SH degree {}, sort capacity {}, format {:?}",
        num_points,
        pc.sh_deg(),
        sorter.capacity(),
        presentation_format
    );

    Ok(GaussianRenderer {
        queue,
        camera_buffer,
        settings,
        num_points,
        resources,
        sorter,
        preprocess,
        pipeline,
    })
}

/// Reject clouds whose count the settings uniform cannot hold exactly
pub fn check_point_count(num_points: u32) -> RenderResult<()> {
    if num_points > MAX_POINTS {
        return Err(RenderError::TooManyPoints {
            num_points,
            max: MAX_POINTS,
        });
    }
    Ok(())
}

/// Reject sorters that cannot hold a key per point
pub fn check_capacity(capacity: u32, num_points: u32) -> RenderResult<()> {
    check_point_count(num_points)?;
    if capacity < num_points {
        return Err(RenderError::SortCapacity { capacity, num_points });
    }
    Ok(())
}

fn check_device_limits(device: &wgpu::Device, num_points: u32) -> RenderResult<()> {
    check_point_count(num_points)?;
    check_buffer_size("Splat Buffer", splat_buffer_size(num_points), &device.limits())
}

pub struct GaussianRenderer<S: SortCoordinator = RadixSorter> {
    queue: Arc<wgpu::Queue>,
    camera_buffer: wgpu::Buffer,
    settings: RenderSettings,
    num_points: u32,
    resources: ResourceSet,
    sorter: S,
    preprocess: PreprocessStage,
    pipeline: SplatPipeline,
}

impl<S: SortCoordinator> GaussianRenderer<S> {
    /// Record one frame into `encoder`, drawing onto `view`
    ///
    /// Queues the bookkeeping resets on the renderer's queue; submit
    /// `encoder` on that same queue afterwards.
    pub fn frame(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut frame = WgpuFrame {
            writer: QueueWriter::new(&self.queue, &self.resources, &self.sorter),
            encoder,
            view,
            preprocess: &self.preprocess,
            sorter: &self.sorter,
            pipeline: &self.pipeline,
            draw_args: &self.resources.draw_args_buffer,
        };
        record_frame(&mut frame, &self.settings, self.num_points);
    }

    /// Change the Gaussian scale factor; uploaded immediately
    pub fn set_gaussian_multiplier(&mut self, value: f32) {
        let mut writer = QueueWriter::new(&self.queue, &self.resources, &self.sorter);
        update_multiplier(&mut writer, &mut self.settings, value);
        tracing::debug!(value, "Gaussian multiplier updated");
    }

    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.camera_buffer
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    pub fn sorter(&self) -> &S {
        &self.sorter
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }
}

/// Maps frame buffers to real ones and writes through the queue
struct QueueWriter<'a> {
    queue: &'a wgpu::Queue,
    resources: &'a ResourceSet,
    sort_info: &'a wgpu::Buffer,
    sort_dispatch: &'a wgpu::Buffer,
}

impl<'a> QueueWriter<'a> {
    fn new(queue: &'a wgpu::Queue, resources: &'a ResourceSet, sorter: &'a dyn SortCoordinator) -> Self {
        Self {
            queue,
            resources,
            sort_info: sorter.sort_info_buffer(),
            sort_dispatch: sorter.dispatch_indirect_buffer(),
        }
    }

    fn buffer(&self, target: FrameBuffer) -> &wgpu::Buffer {
        match target {
            FrameBuffer::SortInfo => self.sort_info,
            FrameBuffer::SortDispatch => self.sort_dispatch,
            FrameBuffer::Settings => &self.resources.settings_buffer,
            FrameBuffer::DrawArgs => &self.resources.draw_args_buffer,
        }
    }
}

impl BufferWriter for QueueWriter<'_> {
    fn write_buffer(&mut self, target: FrameBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(self.buffer(target), offset, data);
    }
}

/// Frame recording onto a real command encoder
struct WgpuFrame<'a> {
    writer: QueueWriter<'a>,
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    preprocess: &'a PreprocessStage,
    sorter: &'a dyn SortCoordinator,
    pipeline: &'a SplatPipeline,
    draw_args: &'a wgpu::Buffer,
}

impl BufferWriter for WgpuFrame<'_> {
    fn write_buffer(&mut self, target: FrameBuffer, offset: u64, data: &[u8]) {
        self.writer.write_buffer(target, offset, data);
    }
}

impl FrameEncoder for WgpuFrame<'_> {
    fn preprocess(&mut self, workgroups: u32) {
        self.preprocess.record(self.encoder, workgroups);
    }

    fn sort(&mut self) {
        self.sorter.sort(self.encoder);
    }

    fn copy_buffer(&mut self, src: FrameBuffer, src_offset: u64, dst: FrameBuffer, dst_offset: u64, size: u64) {
        self.encoder.copy_buffer_to_buffer(
            self.writer.buffer(src),
            src_offset,
            self.writer.buffer(dst),
            dst_offset,
            size,
        );
    }

    fn draw(&mut self) {
        self.pipeline.record(self.encoder, self.view, self.draw_args);
    }
}
