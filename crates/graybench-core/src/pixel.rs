//! Pixel types and the owned pixel buffer.
//!
//! # Memory Layout
//!
//! [`Rgb8`] is `#[repr(C)]` with three `u8` fields and no padding, so a
//! `[Rgb8]` slice has exactly the interleaved `RGBRGB...` layout that the
//! JPEG codec and the device kernels expect. Conversions to and from byte
//! slices go through `bytemuck` and never copy.
//!
//! # Ownership
//!
//! [`PixelBuffer`] owns its storage. Buffers are handed from codec to
//! dispatcher to strategy by value and freed when the last owner drops them.

use bytemuck::{Pod, Zeroable};
use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// Rgb8
// ============================================================================

/// One interleaved 8-bit RGB triple.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Creates a triple from its channels.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a triple with all three channels set to `v`.
    #[inline]
    pub const fn splat(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }
}

impl fmt::Debug for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rgb8({}, {}, {})", self.r, self.g, self.b)
    }
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Row-major image of [`Rgb8`] triples.
///
/// Invariant: `pixels.len() == width * height`. Every constructor checks it,
/// and nothing hands out a way to resize the storage.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<Rgb8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Wraps `pixels` as a `width x height` image.
    ///
    /// # Errors
    ///
    /// [`Error::BufferSizeMismatch`] if the pixel count is not `width * height`.
    pub fn from_pixels(pixels: Vec<Rgb8>, width: u32, height: u32) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels, width, height })
    }

    /// Builds a buffer from interleaved `RGBRGB...` bytes.
    pub fn from_interleaved(data: &[u8], width: u32, height: u32) -> Result<Self> {
        if data.len() % 3 != 0 {
            return Err(Error::PartialPixel { len: data.len() });
        }
        let pixels: Vec<Rgb8> = bytemuck::cast_slice(data).to_vec();
        Self::from_pixels(pixels, width, height)
    }

    /// Creates a black `width x height` image.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            pixels: vec![Rgb8::default(); len],
            width,
            height,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count (`width * height`).
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True for a zero-area image.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixels in raster order.
    pub fn pixels(&self) -> &[Rgb8] {
        &self.pixels
    }

    /// Mutable pixels in raster order.
    pub fn pixels_mut(&mut self) -> &mut [Rgb8] {
        &mut self.pixels
    }

    /// Interleaved `RGBRGB...` view of the pixels.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Size of the pixel storage in bytes.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Rgb8>()
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(Error::InvalidDimensions(width, height))
}
