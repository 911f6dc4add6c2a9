//! Error types for renderer construction

use thiserror::Error;

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while building a renderer
///
/// Per-frame recording never fails; everything here aborts construction.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Sort capacity {capacity} is smaller than the point count {num_points}")]
    SortCapacity { capacity: u32, num_points: u32 },

    #[error("Point count {num_points} exceeds the supported maximum {max}")]
    TooManyPoints { num_points: u32, max: u32 },

    #[error("{label} needs {size} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("Device error while creating {stage}: {source}")]
    Device {
        stage: &'static str,
        #[source]
        source: wgpu::Error,
    },
}
