use std::sync::Arc;

use crate::clock::now_millis;

/// One tightly packed RGB24 picture (`width * height * 3` bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u128,
    pub bytes: Arc<Vec<u8>>,
}

impl VideoFrame {
    #[must_use]
    pub fn new(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            timestamp_ms: now_millis(),
            bytes: Arc::new(bytes),
        }
    }

    /// Byte length a frame of this size must have.
    #[must_use]
    pub const fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.bytes.len() == Self::expected_len(self.width, self.height)
    }

    /// Diagonal colour bands that drift with `tick`, plus a bar sweeping
    /// left to right so motion is obvious in a preview.
    #[must_use]
    pub fn synthetic(width: u32, height: u32, tick: u32) -> Self {
        let mut data = Vec::with_capacity(Self::expected_len(width, height));
        let bar_x = if width == 0 { 0 } else { (tick * 4) % width };
        for y in 0..height {
            for x in 0..width {
                if x.abs_diff(bar_x) < 4 {
                    data.extend_from_slice(&[255, 255, 255]);
                    continue;
                }
                let band = x.wrapping_add(y).wrapping_add(tick) as u8;
                data.push(band);
                data.push(y.wrapping_mul(2) as u8 ^ tick as u8);
                data.push(255 - band);
            }
        }
        Self::new(width, height, data)
    }

    /// Nearest-neighbour resize; returns a clone when the size already matches.
    #[must_use]
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        if (width, height) == (self.width, self.height) || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let mut out = Vec::with_capacity(Self::expected_len(width, height));
        for y in 0..height {
            let sy = (u64::from(y) * u64::from(self.height) / u64::from(height.max(1))) as usize;
            for x in 0..width {
                let sx = (u64::from(x) * u64::from(self.width) / u64::from(width.max(1))) as usize;
                let idx = (sy * self.width as usize + sx) * 3;
                match self.bytes.get(idx..idx + 3) {
                    Some(px) => out.extend_from_slice(px),
                    None => out.extend_from_slice(&[0, 0, 0]),
                }
            }
        }
        Self {
            width,
            height,
            timestamp_ms: self.timestamp_ms,
            bytes: Arc::new(out),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn synthetic_frames_are_packed_rgb_and_move() {
        let a = VideoFrame::synthetic(32, 24, 0);
        let b = VideoFrame::synthetic(32, 24, 1);
        assert!(a.is_well_formed());
        assert_ne!(a.bytes, b.bytes);
    }

    #[test]
    fn scaling_halves_dimensions() {
        let f = VideoFrame::synthetic(64, 48, 3);
        let s = f.scaled_to(32, 24);
        assert_eq!((s.width, s.height), (32, 24));
        assert!(s.is_well_formed());
        // top-left pixel survives nearest-neighbour sampling
        assert_eq!(&s.bytes[..3], &f.bytes[..3]);
    }
}
