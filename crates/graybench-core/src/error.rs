//! Error types for graybench-core.
//!
//! # Usage
//!
//! ```rust
//! use graybench_core::{Error, PixelBuffer, Rgb8};
//!
//! let err = PixelBuffer::from_pixels(vec![Rgb8::default(); 3], 2, 2).unwrap_err();
//! assert!(matches!(err, Error::BufferSizeMismatch { expected: 4, actual: 3 }));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or slicing pixel buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel count does not match `width * height`.
    #[error("buffer size mismatch: expected {expected} pixels, got {actual}")]
    BufferSizeMismatch {
        /// Pixels required by the dimensions.
        expected: usize,
        /// Pixels actually supplied.
        actual: usize,
    },

    /// Interleaved byte data is not a whole number of RGB triples.
    #[error("interleaved data of {len} bytes is not a multiple of 3")]
    PartialPixel {
        /// Length of the rejected byte slice.
        len: usize,
    },

    /// Dimensions overflow the addressable pixel count.
    #[error("invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),
}
