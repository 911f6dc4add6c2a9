//! Error types for point cloud loading

use thiserror::Error;

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;

/// Errors that can occur while reading a point cloud
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing vertex property: {0}")]
    MissingProperty(&'static str),

    #[error("Unsupported number of f_rest properties: {0}")]
    UnsupportedShRest(usize),

    #[error("Truncated vertex data: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}
