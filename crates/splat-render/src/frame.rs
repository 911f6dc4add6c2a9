//! Per-frame command sequence
//!
//! A frame is a fixed list of steps recorded over one encoder:
//!
//! | step             | records                                              |
//! |------------------|------------------------------------------------------|
//! | `Preprocess`     | reset sort info, dispatch args, settings; dispatch   |
//! | `Sort`           | every sort pass, sized from the GPU-side count       |
//! | `PropagateCount` | 4-byte copy `keys_size` -> `instance_count`          |
//! | `Draw`           | render pass with one indirect draw                   |
//!
//! [`FrameEncoder`] abstracts the recording target so the sequence can be
//! driven against a real `wgpu::CommandEncoder` or a simulated one.

use splat_raster::{DrawIndirectArgs, RenderSettings};
use splat_sort::{DispatchIndirectArgs, SortInfo, SORT_WORKGROUP_SIZE};

/// Buffers the frame sequence writes or copies between
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameBuffer {
    SortInfo,
    SortDispatch,
    Settings,
    DrawArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStep {
    Preprocess,
    Sort,
    PropagateCount,
    Draw,
}

/// Steps of every frame, in recording order
pub const FRAME_SEQUENCE: [FrameStep; 4] = [
    FrameStep::Preprocess,
    FrameStep::Sort,
    FrameStep::PropagateCount,
    FrameStep::Draw,
];

/// Queued buffer writes; they land before any command of the same submission
pub trait BufferWriter {
    fn write_buffer(&mut self, target: FrameBuffer, offset: u64, data: &[u8]);
}

/// Recording target for one frame
pub trait FrameEncoder: BufferWriter {
    fn preprocess(&mut self, workgroups: u32);

    fn sort(&mut self);

    fn copy_buffer(&mut self, src: FrameBuffer, src_offset: u64, dst: FrameBuffer, dst_offset: u64, size: u64);

    fn draw(&mut self);
}

/// Workgroups covering `num_points` Gaussians
pub fn preprocess_workgroups(num_points: u32) -> u32 {
    num_points.div_ceil(SORT_WORKGROUP_SIZE)
}

/// Record the whole frame sequence
pub fn record_frame<E: FrameEncoder + ?Sized>(encoder: &mut E, settings: &RenderSettings, num_points: u32) {
    for step in FRAME_SEQUENCE {
        tracing::trace!(?step, "Recording frame step");
        match step {
            FrameStep::Preprocess => {
                encoder.write_buffer(FrameBuffer::SortInfo, 0, bytemuck::bytes_of(&SortInfo::reset()));
                encoder.write_buffer(
                    FrameBuffer::SortDispatch,
                    0,
                    bytemuck::bytes_of(&DispatchIndirectArgs::reset()),
                );
                encoder.write_buffer(FrameBuffer::Settings, 0, bytemuck::bytes_of(settings));
                encoder.preprocess(preprocess_workgroups(num_points));
            }
            FrameStep::Sort => encoder.sort(),
            FrameStep::PropagateCount => encoder.copy_buffer(
                FrameBuffer::SortInfo,
                SortInfo::KEYS_SIZE_OFFSET,
                FrameBuffer::DrawArgs,
                DrawIndirectArgs::INSTANCE_COUNT_OFFSET,
                SortInfo::KEYS_SIZE_BYTES,
            ),
            FrameStep::Draw => encoder.draw(),
        }
    }
}

/// Store a new multiplier and queue the settings upload right away
pub fn update_multiplier<W: BufferWriter + ?Sized>(writer: &mut W, settings: &mut RenderSettings, value: f32) {
    settings.gaussian_multiplier = value;
    writer.write_buffer(FrameBuffer::Settings, 0, bytemuck::bytes_of(settings));
}
