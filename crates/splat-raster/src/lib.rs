//! Gaussian splat rasterization building blocks
//!
//! This crate holds everything the GPU passes agree on byte-for-byte:
//! the record layouts written by the preprocess compute shader and read by
//! the splat render shader, the CPU mirror of the projection math, and the
//! WGSL sources themselves.
//!
//! # Architecture
//!
//! Each frame runs in four steps on a single command encoder:
//! 1. **Preprocess**: project every Gaussian, write a 32-byte [`Splat`] and a depth key
//! 2. **Sort**: order the keys back-to-front on the GPU
//! 3. **Count propagation**: copy the sorted key count into [`DrawIndirectArgs`]
//! 4. **Render**: one indirect draw, six vertices per splat, alpha blended

pub mod covariance;
pub mod gpu_types;

// Re-export shader source strings
pub mod shaders {
    /// Preprocess compute shader. Expects the sort constants
    /// (`SORT_WORKGROUP_SIZE`, `SORT_KEYS_PER_THREAD`, `SORT_BLOCK_SIZE`)
    /// to be prepended before compilation.
    pub const PREPROCESS: &str = include_str!("shaders/preprocess.wgsl");
    /// Splat render shader (`vs_main` / `fs_main`).
    pub const GAUSSIAN: &str = include_str!("shaders/gaussian.wgsl");
}

pub use covariance::*;
pub use gpu_types::*;
