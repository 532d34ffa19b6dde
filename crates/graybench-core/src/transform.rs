//! The grayscale transform.
//!
//! `gray = (max(r, g, b) + min(r, g, b)) / 2`, truncating, written back to
//! all three channels. Every execution backend (host reference, host device
//! pool, OpenCL program, WGSL shader) computes exactly this value; the device
//! kernels under `graybench-compute/src/shaders/` restate it line for line.

use crate::pixel::Rgb8;

/// Gray level of one triple: the midpoint of its brightest and darkest channel.
///
/// ```
/// use graybench_core::grayscale_value;
///
/// assert_eq!(grayscale_value(200, 100, 50), 125);
/// assert_eq!(grayscale_value(255, 0, 0), 127);
/// ```
#[inline]
pub const fn grayscale_value(r: u8, g: u8, b: u8) -> u8 {
    let max = max3(r, g, b) as u16;
    let min = min3(r, g, b) as u16;
    // max + min <= 510, so the halved sum always fits in a u8
    ((max + min) / 2) as u8
}

/// Grayscale version of one triple.
#[inline]
pub const fn grayscale(px: Rgb8) -> Rgb8 {
    Rgb8::splat(grayscale_value(px.r, px.g, px.b))
}

/// Applies [`grayscale`] to `src`, writing into the same positions of `dst`.
///
/// # Panics
///
/// If the slices differ in length.
pub fn grayscale_into(src: &[Rgb8], dst: &mut [Rgb8]) {
    assert_eq!(src.len(), dst.len(), "grayscale_into: slice length mismatch");
    for (out, &inp) in dst.iter_mut().zip(src) {
        *out = grayscale(inp);
    }
}

#[inline]
const fn max3(a: u8, b: u8, c: u8) -> u8 {
    let ab = if a > b { a } else { b };
    if ab > c { ab } else { c }
}

#[inline]
const fn min3(a: u8, b: u8, c: u8) -> u8 {
    let ab = if a < b { a } else { b };
    if ab < c { ab } else { c }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_triple() {
        assert_eq!(grayscale(Rgb8::new(200, 100, 50)), Rgb8::splat(125));
    }

    #[test]
    fn test_channel_order_irrelevant() {
        let expected = grayscale_value(10, 20, 250);
        for (r, g, b) in [(10, 250, 20), (20, 10, 250), (250, 20, 10), (250, 10, 20)] {
            assert_eq!(grayscale_value(r, g, b), expected);
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(grayscale_value(0, 0, 0), 0);
        assert_eq!(grayscale_value(255, 255, 255), 255);
        assert_eq!(grayscale_value(255, 0, 0), 127);
        assert_eq!(grayscale_value(1, 0, 0), 0);
    }

    #[test]
    fn test_matches_wide_formula_exhaustively() {
        // Checked against the plain i32 formula over the full 8-bit cube.
        for r in 0..=255u8 {
            for g in 0..=255u8 {
                for b in 0..=255u8 {
                    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
                    let wide = (ri.max(gi).max(bi) + ri.min(gi).min(bi)) / 2;
                    assert_eq!(grayscale_value(r, g, b) as i32, wide);
                }
            }
        }
    }

    #[test]
    fn test_grayscale_into() {
        let src = [Rgb8::new(200, 100, 50), Rgb8::new(0, 0, 255)];
        let mut dst = [Rgb8::default(); 2];
        grayscale_into(&src, &mut dst);
        assert_eq!(dst, [Rgb8::splat(125), Rgb8::splat(127)]);
    }
}
