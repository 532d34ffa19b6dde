//! # graybench-core
//!
//! Core types shared by every graybench crate:
//!
//! - [`Rgb8`] - one interleaved 8-bit RGB triple
//! - [`PixelBuffer`] - an owned, row-major image of [`Rgb8`] triples
//! - [`grayscale`] - the per-pixel transform every backend must reproduce
//!
//! ## Crate Structure
//!
//! ```text
//! graybench-core (this crate)
//!    ^
//!    |
//!    +-- graybench-io (JPEG decode/encode)
//!    +-- graybench-compute (platforms, strategies, dispatcher)
//!    +-- graybench-cli (interactive benchmark)
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod pixel;
pub mod transform;

pub use error::{Error, Result};
pub use pixel::{PixelBuffer, Rgb8};
pub use transform::{grayscale, grayscale_into, grayscale_value};
