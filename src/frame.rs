//! Frame value type.
//!
//! Frames are plain owned RGB24 buffers. The ingest layer produces them with
//! a monotonically increasing index (starting at 1); the index drives the
//! sampling cadence and appears in evidence filenames and alert log lines.

use anyhow::{anyhow, Result};

/// One decoded video frame, tightly packed RGB24.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, `width * height * 3` bytes, row-major RGB.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 1-based position in the stream. Survives source loops: the counter
    /// keeps increasing when a file source restarts from the beginning.
    pub index: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = rgb24_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame {}: expected {} RGB bytes for {}x{}, received {}",
                index,
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            index,
        })
    }
}

/// Byte length of a tightly packed RGB24 buffer, guarding against overflow.
pub fn rgb24_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions {}x{} overflow", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_rgb24_buffer() {
        let frame = Frame::new(vec![0u8; 4 * 3 * 3], 4, 3, 1).expect("valid frame");
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.index, 1);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::new(vec![0u8; 10], 4, 3, 7).unwrap_err();
        assert!(err.to_string().contains("frame 7"));
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        assert!(rgb24_len(u32::MAX, u32::MAX).is_err());
    }
}
