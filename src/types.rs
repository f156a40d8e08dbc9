// Core types shared by the camera, the compositor and the window.

use crate::error::{Error, Result};

/// Bytes per pixel: R, G, B, A.
pub const CHANNELS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,     // how wide the frame is on screen (pixels)
    pub height: usize,    // how tall the frame is on screen (pixels)
    pub pixels: Vec<u8>,  // row-major RGBA, length = width * height * 4
}

impl FrameBuffer {
    /// A frame filled with one RGBA colour.
    #[cfg(test)]
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Self { width, height, pixels }
    }

    /// Wrap raw RGBA bytes, rejecting buffers that don't cover `width * height` pixels.
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        let expected = width * height * CHANNELS;
        if pixels.len() != expected {
            return Err(Error::BufferSize { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn same_size(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// RGBA of pixel `idx` (row-major index, not byte offset).
    #[cfg(test)]
    #[inline]
    pub fn rgba(&self, idx: usize) -> [u8; 4] {
        let o = idx * CHANNELS;
        [self.pixels[o], self.pixels[o + 1], self.pixels[o + 2], self.pixels[o + 3]]
    }

    #[cfg(test)]
    #[inline]
    pub fn set_rgba(&mut self, idx: usize, rgba: [u8; 4]) {
        let o = idx * CHANNELS;
        self.pixels[o..o + CHANNELS].copy_from_slice(&rgba);
    }

    /// Flip every row left-to-right (selfie view).
    pub fn mirror_horizontally(&mut self) {
        let row_bytes = self.width * CHANNELS;
        if row_bytes == 0 {
            return;
        }
        for row in self.pixels.chunks_exact_mut(row_bytes) {
            let (mut l, mut r) = (0, self.width - 1);
            while l < r {
                for c in 0..CHANNELS {
                    row.swap(l * CHANNELS + c, r * CHANNELS + c);
                }
                l += 1;
                r -= 1;
            }
        }
    }
}

/// Hue in degrees [0,360), saturation and lightness in percent [0,100].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_rejects_short_buffer() {
        let err = FrameBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::BufferSize { expected: 16, actual: 15 }));
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn mirror_swaps_columns_and_keeps_rows() {
        let mut fb = FrameBuffer::filled(3, 2, [0, 0, 0, 255]);
        fb.set_rgba(0, [1, 2, 3, 4]); // row 0, x=0
        fb.set_rgba(5, [9, 9, 9, 9]); // row 1, x=2
        fb.mirror_horizontally();
        assert_eq!(fb.rgba(2), [1, 2, 3, 4]);
        assert_eq!(fb.rgba(3), [9, 9, 9, 9]);
        assert_eq!(fb.rgba(1), [0, 0, 0, 255]);
    }
}
