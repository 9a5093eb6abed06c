//! Single-channel sample grids.
//!
//! A [`Channel`] is a row-major `width × height` grid of `f64` samples in
//! `[0, 1]`. Every piece of pixel math in the crate is expressed as
//! operations on channels, and every operation allocates a fresh output.

use crate::error::{BlitError, Result};

/// Convert a unit-range sample to an 8-bit value.
pub fn to_u8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert an 8-bit value to a unit-range sample.
pub fn from_u8(value: u8) -> f64 {
    value as f64 / 255.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl Channel {
    /// Zero-filled channel.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: u32, height: u32, value: f64) -> Self {
        Channel { width, height, data: vec![value; width as usize * height as usize] }
    }

    /// Wrap existing row-major samples. The length must be `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<f64>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(BlitError::DimensionMismatch {
                expected: (width, height),
                found: (data.len() as u32, 1),
            });
        }
        Ok(Channel { width, height, data })
    }

    /// Build from 8-bit row-major samples, scaled into `[0, 1]`.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        Self::from_vec(width, height, bytes.iter().map(|&b| from_u8(b)).collect())
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn size(&self) -> (u32, u32) { (self.width, self.height) }
    pub fn data(&self) -> &[f64] { &self.data }

    /// Sample at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn get(&self, x: u32, y: u32) -> f64 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside {}x{} channel", self.width, self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Elementwise transform into a new channel.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Channel {
        Channel { width: self.width, height: self.height, data: self.data.iter().map(|&v| f(v)).collect() }
    }

    /// Elementwise transform that also sees each sample's flat index.
    pub fn map_indexed(&self, f: impl Fn(usize, f64) -> f64) -> Channel {
        let data = self.data.iter().enumerate().map(|(i, &v)| f(i, v)).collect();
        Channel { width: self.width, height: self.height, data }
    }

    /// Elementwise combination of two same-shaped channels.
    pub fn zip_map(&self, other: &Channel, f: impl Fn(f64, f64) -> f64) -> Result<Channel> {
        self.check_same_size(other)?;
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
        Ok(Channel { width: self.width, height: self.height, data })
    }

    pub fn check_same_size(&self, other: &Channel) -> Result<()> {
        if self.size() != other.size() {
            return Err(BlitError::DimensionMismatch { expected: self.size(), found: other.size() });
        }
        Ok(())
    }

    /// True when at least one sample is non-zero.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v != 0.0)
    }

    /// Crop or zero-pad to the requested size, keeping the top-left region.
    pub fn crop_pad(&self, width: u32, height: u32) -> Channel {
        let mut out = Channel::new(width, height);
        let w = self.width.min(width) as usize;
        let h = self.height.min(height);
        for y in 0..h {
            let src = (y * self.width) as usize;
            let dst = (y * width) as usize;
            out.data[dst..dst + w].copy_from_slice(&self.data[src..src + w]);
        }
        out
    }

    /// 8-bit row-major samples.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|&v| to_u8(v)).collect()
    }
}
