//! Sort bookkeeping records shared with the shaders

use bytemuck::{Pod, Zeroable};

/// Count of keys written this frame
///
/// `keys_size` is an atomic counter on the GPU side.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SortInfo {
    pub keys_size: u32,
    pub _pad: [u32; 3],
}

impl SortInfo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Byte offset of the count field
    pub const KEYS_SIZE_OFFSET: u64 = std::mem::offset_of!(SortInfo, keys_size) as u64;

    /// Byte size of the count field
    pub const KEYS_SIZE_BYTES: u64 = std::mem::size_of::<u32>() as u64;

    /// Value written at the start of every frame
    pub fn reset() -> Self {
        Self::zeroed()
    }
}

/// Workgroup counts for `dispatch_workgroups_indirect`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchIndirectArgs {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Value written at the start of every frame: no blocks yet
    pub fn reset() -> Self {
        Self { x: 0, y: 1, z: 1 }
    }
}

/// Per-pass uniform for the radix shaders
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct PassParams {
    pub shift: u32,
    pub _pad: [u32; 3],
}
