//! Raster layers and flat colors.
//!
//! A [`Layer`] is either a bitmap with four same-shaped channels or a flat
//! [`Color`] with no intrinsic size. Both answer [`Layer::rgba`], which
//! materializes channels at whatever size the caller needs; the compositing
//! and adjustment code only ever goes through that call.

use std::borrow::Cow;

use crate::adjustments::Adjustment;
use crate::blends::{self, BlendMode};
use crate::channel::{from_u8, to_u8, Channel};
use crate::error::{BlitError, Result};

/// Luminance weights applied to masks (YUV conversion), in thousandths so
/// that white maps to exactly 1.
pub const LUMA_WEIGHTS: [f64; 3] = [299.0, 587.0, 114.0];

/// Four same-shaped channels: red, green, blue, alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct Rgba {
    red: Channel,
    green: Channel,
    blue: Channel,
    alpha: Channel,
}

impl Rgba {
    pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Result<Self> {
        for other in [&green, &blue, &alpha] {
            red.check_same_size(other)?;
        }
        Ok(Rgba { red, green, blue, alpha })
    }

    /// Every pixel set to one unit-range RGBA value.
    pub fn filled(width: u32, height: u32, components: [f64; 4]) -> Self {
        let [r, g, b, a] = components;
        Rgba {
            red: Channel::filled(width, height, r),
            green: Channel::filled(width, height, g),
            blue: Channel::filled(width, height, b),
            alpha: Channel::filled(width, height, a),
        }
    }

    /// Split interleaved 8-bit RGBA pixels into channels.
    pub fn from_interleaved(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let count = width as usize * height as usize;
        if pixels.len() != count * 4 {
            return Err(BlitError::DimensionMismatch {
                expected: (width, height),
                found: ((pixels.len() / 4) as u32, 1),
            });
        }
        let plane = |offset: usize| -> Vec<f64> {
            pixels.chunks_exact(4).map(|px| from_u8(px[offset])).collect()
        };
        Rgba::new(
            Channel::from_vec(width, height, plane(0))?,
            Channel::from_vec(width, height, plane(1))?,
            Channel::from_vec(width, height, plane(2))?,
            Channel::from_vec(width, height, plane(3))?,
        )
    }

    /// Interleaved 8-bit RGBA pixels, row-major.
    pub fn to_interleaved(&self) -> Vec<u8> {
        let planes = self.channels().map(Channel::to_bytes);
        let mut out = Vec::with_capacity(planes[0].len() * 4);
        for i in 0..planes[0].len() {
            out.extend(planes.iter().map(|p| p[i]));
        }
        out
    }

    pub fn size(&self) -> (u32, u32) {
        self.red.size()
    }

    pub fn red(&self) -> &Channel { &self.red }
    pub fn green(&self) -> &Channel { &self.green }
    pub fn blue(&self) -> &Channel { &self.blue }
    pub fn alpha(&self) -> &Channel { &self.alpha }

    pub fn into_channels(self) -> [Channel; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    pub fn channels(&self) -> [&Channel; 4] {
        [&self.red, &self.green, &self.blue, &self.alpha]
    }

    /// Replace red, green and blue through `f(index, channel)`, keeping alpha.
    /// `f` must preserve the channel shape.
    pub(crate) fn map_colors(&self, f: impl Fn(usize, &Channel) -> Channel) -> Rgba {
        Rgba {
            red: f(0, &self.red),
            green: f(1, &self.green),
            blue: f(2, &self.blue),
            alpha: self.alpha.clone(),
        }
    }

    pub fn crop_pad(&self, width: u32, height: u32) -> Rgba {
        Rgba {
            red: self.red.crop_pad(width, height),
            green: self.green.crop_pad(width, height),
            blue: self.blue.crop_pad(width, height),
            alpha: self.alpha.crop_pad(width, height),
        }
    }

    /// One 8-bit RGBA pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.channels().map(|c| to_u8(c.get(x, y)))
    }
}

/// Mask luminance `0.299·R + 0.587·G + 0.114·B`, alpha ignored.
pub fn luminance(rgba: &Rgba) -> Channel {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    let (green, blue) = (rgba.green.data(), rgba.blue.data());
    rgba.red.map_indexed(|i, r| (wr * r + wg * green[i] + wb * blue[i]) / 1000.0)
}

/// Flat color of indeterminate size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    components: [f64; 4],
}

impl Color {
    /// Opaque color from 8-bit components.
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self::with_alpha(red, green, blue, 0xFF)
    }

    pub fn with_alpha(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color { components: [red, green, blue, alpha].map(from_u8) }
    }

    /// Color from unit-range components; each is clamped to `[0, 1]`.
    pub fn from_unit(components: [f64; 4]) -> Self {
        Color { components: components.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) }) }
    }

    pub fn components(&self) -> [f64; 4] {
        self.components
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.components.map(to_u8)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Bitmap(Rgba),
    Color(Color),
}

impl From<Rgba> for Layer {
    fn from(rgba: Rgba) -> Self {
        Layer::Bitmap(rgba)
    }
}

impl From<Color> for Layer {
    fn from(color: Color) -> Self {
        Layer::Color(color)
    }
}

impl Layer {
    /// Width and height in pixels, `None` for a flat color.
    pub fn size(&self) -> Option<(u32, u32)> {
        match self {
            Layer::Bitmap(rgba) => Some(rgba.size()),
            Layer::Color(_) => None,
        }
    }

    /// Channels at the requested size.
    ///
    /// Bitmaps of matching size are borrowed as-is; others are cropped or
    /// zero-padded from the top-left corner. Colors fill a fresh buffer.
    pub fn rgba(&self, width: u32, height: u32) -> Cow<'_, Rgba> {
        match self {
            Layer::Bitmap(rgba) if rgba.size() == (width, height) => Cow::Borrowed(rgba),
            Layer::Bitmap(rgba) => Cow::Owned(rgba.crop_pad(width, height)),
            Layer::Color(color) => Cow::Owned(Rgba::filled(width, height, color.components)),
        }
    }

    /// Blend `other` on top of this layer. See [`blends::blend`].
    pub fn blend(&self, other: &Layer, mask: Option<&Layer>, opacity: f64, mode: Option<BlendMode>) -> Result<Layer> {
        blends::blend(self, other, mask, opacity, mode)
    }

    /// Apply an adjustment, producing a new layer.
    pub fn adjust(&self, adjustment: &Adjustment) -> Layer {
        match self {
            Layer::Bitmap(rgba) => Layer::Bitmap(adjustment.apply(rgba)),
            Layer::Color(color) => {
                let out = adjustment.apply(&Rgba::filled(1, 1, color.components));
                Layer::Color(Color::from_unit(out.channels().map(|c| c.get(0, 0))))
            }
        }
    }

    /// One 8-bit pixel. Colors return their value for any position.
    ///
    /// # Panics
    ///
    /// Panics if a bitmap is read outside its size.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        match self {
            Layer::Bitmap(rgba) => rgba.pixel(x, y),
            Layer::Color(color) => color.to_bytes(),
        }
    }
}
