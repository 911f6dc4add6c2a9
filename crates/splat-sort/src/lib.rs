//! GPU-resident key/index sorting for splat rendering
//!
//! The renderer only talks to the [`SortCoordinator`] trait. [`RadixSorter`]
//! is the wgpu implementation: an 8-bit LSD radix sort whose workgroup count
//! is driven by a dispatch-indirect buffer the key producer fills in, so the
//! number of keys never has to travel back to the host.
//!
//! Key producers and the sorter share one compile-time constant pair,
//! [`SORT_WORKGROUP_SIZE`] and [`SORT_KEYS_PER_THREAD`]. Use
//! [`wgsl_constants`] to prepend them to a producer shader.

pub mod cpu;
pub mod gpu_types;
pub mod radix;

pub use gpu_types::{DispatchIndirectArgs, SortInfo};
pub use radix::RadixSorter;

/// Threads per sort workgroup (also the radix, one digit per thread)
pub const SORT_WORKGROUP_SIZE: u32 = 256;

/// Keys each sort thread handles
pub const SORT_KEYS_PER_THREAD: u32 = 2;

/// Keys covered by one sort workgroup
pub const SORT_BLOCK_SIZE: u32 = SORT_WORKGROUP_SIZE * SORT_KEYS_PER_THREAD;

/// Bits consumed per radix pass
pub const RADIX_BITS: u32 = 8;

/// Buckets per radix pass
pub const RADIX_SIZE: u32 = 1 << RADIX_BITS;

/// Passes needed to cover a 32-bit key
pub const RADIX_PASSES: usize = (u32::BITS / RADIX_BITS) as usize;

// Each pass flips ping-pong slots; an even count lands the result in slot 0.
const _: () = assert!(RADIX_PASSES % 2 == 0);
// The histogram pass gives every thread exactly one bucket.
const _: () = assert!(SORT_WORKGROUP_SIZE == RADIX_SIZE);

/// WGSL `const` declarations for the shared sort constants
pub fn wgsl_constants() -> String {
    format!(
        "const SORT_WORKGROUP_SIZE: u32 = {SORT_WORKGROUP_SIZE}u;\n\
         const SORT_KEYS_PER_THREAD: u32 = {SORT_KEYS_PER_THREAD}u;\n\
         const SORT_BLOCK_SIZE: u32 = {SORT_BLOCK_SIZE}u;\n"
    )
}

/// One ping-pong slot: keys plus the payload indices travelling with them
#[derive(Debug)]
pub struct SortBuffers {
    pub keys: wgpu::Buffer,
    pub indices: wgpu::Buffer,
}

/// Contract between the frame orchestrator and a GPU sorter
///
/// A key producer writes `(key, index)` pairs into [`input`](Self::input),
/// bumps the `keys_size` field of the sort-info buffer, and increments the
/// dispatch-indirect `x` once per started block of [`SORT_BLOCK_SIZE`] keys.
/// Both bookkeeping buffers are reset by the caller before every frame.
pub trait SortCoordinator {
    /// Maximum number of keys, fixed at construction
    fn capacity(&self) -> u32;

    /// Holds [`SortInfo`]; `keys_size` at byte offset 0 is the sorted count
    fn sort_info_buffer(&self) -> &wgpu::Buffer;

    /// Holds [`DispatchIndirectArgs`] sized to the written keys
    fn dispatch_indirect_buffer(&self) -> &wgpu::Buffer;

    /// Slot the key producer writes into
    fn input(&self) -> &SortBuffers;

    /// Slot holding the final ascending order once `sort` has executed
    fn sorted(&self) -> &SortBuffers;

    /// Record every pass needed to sort the written keys
    ///
    /// Only records into `encoder`; never submits. Must be recorded after the
    /// key producer in the same encoder. Leaves `keys_size` equal to the
    /// number of keys sorted.
    fn sort(&self, encoder: &mut wgpu::CommandEncoder);
}
