//! Error types for image I/O.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Decoding error (corrupt or unsupported input).
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Image dimensions the format cannot represent.
    #[error("invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Decoded data violated a pixel buffer invariant.
    #[error(transparent)]
    Core(#[from] graybench_core::Error),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
