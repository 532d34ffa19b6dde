//! JPEG format support.
//!
//! # Overview
//!
//! The benchmark only ever sees 8-bit interleaved RGB:
//! - RGB sources decode as-is.
//! - Grayscale sources (1 component) replicate their channel into green and
//!   blue so every decoded buffer has three channels.
//! - 16-bit lossless grayscale keeps its high byte.
//! - CMYK sources are rejected; there is no colour management here.
//!
//! Output is always a 3-component RGB JPEG, even for grayscaled data.
//!
//! # Examples
//!
//! ```rust,ignore
//! use graybench_io::jpeg::{JpegWriter, JpegWriterOptions};
//!
//! let image = graybench_io::jpeg::read("photo.jpg")?;
//! let writer = JpegWriter::with_options(JpegWriterOptions { quality: 95 });
//! writer.write("highq.jpg", &image)?;
//! ```

use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use graybench_core::PixelBuffer;
use tracing::{debug, trace};

use crate::{IoError, IoResult};

/// Quality used by libjpeg's `jpeg_set_defaults`.
pub const DEFAULT_QUALITY: u8 = 75;

// ============================================================================
// Writer Options
// ============================================================================

/// Options for writing JPEG files.
#[derive(Debug, Clone)]
pub struct JpegWriterOptions {
    /// Quality level 1-100. Higher = better quality, larger files.
    pub quality: u8,
}

impl Default for JpegWriterOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

// ============================================================================
// JpegReader
// ============================================================================

/// JPEG file reader producing RGB [`PixelBuffer`]s.
#[derive(Debug, Clone, Default)]
pub struct JpegReader;

impl JpegReader {
    /// Creates a new reader.
    pub fn new() -> Self {
        Self
    }

    /// Reads a JPEG file from disk.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> IoResult<PixelBuffer> {
        let path = path.as_ref();
        trace!(path = %path.display(), "jpeg::read");
        let file = std::fs::File::open(path)?;
        self.read_impl(file)
    }

    /// Reads a JPEG from an in-memory byte slice.
    pub fn read_from_memory(&self, data: &[u8]) -> IoResult<PixelBuffer> {
        self.read_impl(Cursor::new(data))
    }

    fn read_impl<R: Read>(&self, reader: R) -> IoResult<PixelBuffer> {
        let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(reader));
        let pixels = decoder
            .decode()
            .map_err(|e| IoError::DecodeError(e.to_string()))?;

        let info = decoder
            .info()
            .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

        let width = info.width as u32;
        let height = info.height as u32;

        let rgb = match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => pixels,
            jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
            jpeg_decoder::PixelFormat::L16 => pixels
                .chunks_exact(2)
                .flat_map(|l16| {
                    let g = l16[0]; // high byte
                    [g, g, g]
                })
                .collect(),
            jpeg_decoder::PixelFormat::CMYK32 => {
                return Err(IoError::DecodeError(
                    "CMYK JPEGs are not supported".into(),
                ));
            }
        };

        debug!(width, height, format = ?info.pixel_format, "decoded JPEG");
        Ok(PixelBuffer::from_interleaved(&rgb, width, height)?)
    }
}

// ============================================================================
// JpegWriter
// ============================================================================

/// JPEG file writer for RGB [`PixelBuffer`]s.
#[derive(Debug, Clone, Default)]
pub struct JpegWriter {
    options: JpegWriterOptions,
}

impl JpegWriter {
    /// Creates a writer with default options.
    pub fn new() -> Self {
        Self::with_options(JpegWriterOptions::default())
    }

    /// Creates a writer with custom options.
    pub fn with_options(options: JpegWriterOptions) -> Self {
        Self { options }
    }

    /// Writes a JPEG file to disk.
    ///
    /// The file is only created once encoding has succeeded, so a failed
    /// encode never leaves a truncated output behind.
    pub fn write<P: AsRef<Path>>(&self, path: P, image: &PixelBuffer) -> IoResult<()> {
        let path = path.as_ref();
        trace!(path = %path.display(), quality = self.options.quality, "jpeg::write");
        let data = self.write_to_memory(image)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Encodes a JPEG into a byte vector.
    pub fn write_to_memory(&self, image: &PixelBuffer) -> IoResult<Vec<u8>> {
        use jpeg_encoder::{ColorType, Encoder};

        let (width, height) = (image.width(), image.height());
        let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(IoError::InvalidDimensions(width, height)),
        };

        let quality = self.options.quality.clamp(1, 100);
        let mut buffer = Vec::new();
        let encoder = Encoder::new(&mut buffer, quality);
        encoder
            .encode(image.as_bytes(), w, h, ColorType::Rgb)
            .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;

        Ok(buffer)
    }
}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Reads a JPEG file.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<PixelBuffer> {
    JpegReader::new().read(path)
}

/// Writes a JPEG file with default options (quality 75).
pub fn write<P: AsRef<Path>>(path: P, image: &PixelBuffer) -> IoResult<()> {
    JpegWriter::new().write(path, image)
}

// ============================================================================
// Tests
// ============================================================================
