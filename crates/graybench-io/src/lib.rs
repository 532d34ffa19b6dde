//! Image I/O for graybench.
//!
//! The benchmark reads one JPEG and writes one JPEG, so this crate is the
//! whole codec adapter:
//!
//! - [`read`] / [`jpeg::JpegReader`] decode any JPEG into an RGB
//!   [`PixelBuffer`](graybench_core::PixelBuffer); grayscale sources have
//!   their single channel replicated into green and blue.
//! - [`write`] / [`jpeg::JpegWriter`] encode a buffer as a 3-channel RGB JPEG.
//!
//! ```rust,ignore
//! let image = graybench_io::read("photo.jpg")?;
//! graybench_io::write("out.jpg", &image)?;
//! ```

pub mod error;
pub mod jpeg;

pub use error::{IoError, IoResult};
pub use jpeg::{JpegReader, JpegWriter, JpegWriterOptions, read, write};
