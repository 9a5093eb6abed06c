//! Blend modes and the compositing engine.
//!
//! A blend mode combines two same-position samples (bottom, top) in `[0, 1]`
//! into one. [`blend`] applies a mode channel by channel and then composites
//! the result over the bottom layer with Porter-Duff "over", using the top
//! layer's alpha scaled by an optional mask's luminance and by opacity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::channel::Channel;
use crate::error::{BlitError, Result};
use crate::layer::{luminance, Color, Layer, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Screen,
    Multiply,
    Add,
    Subtract,
    LinearLight,
    HardLight,
}

impl BlendMode {
    pub const ALL: [BlendMode; 6] = [
        BlendMode::Screen,
        BlendMode::Multiply,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::LinearLight,
        BlendMode::HardLight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Screen => "screen",
            BlendMode::Multiply => "multiply",
            BlendMode::Add => "add",
            BlendMode::Subtract => "subtract",
            BlendMode::LinearLight => "linear_light",
            BlendMode::HardLight => "hard_light",
        }
    }

    /// Combine one bottom sample with one top sample.
    pub fn apply(self, bottom: f64, top: f64) -> f64 {
        match self {
            BlendMode::Screen => screen(bottom, top),
            BlendMode::Multiply => multiply(bottom, top),
            BlendMode::Add => add(bottom, top),
            BlendMode::Subtract => subtract(bottom, top),
            BlendMode::LinearLight => linear_light(bottom, top),
            BlendMode::HardLight => hard_light(bottom, top),
        }
    }

    /// Combine two same-shaped channels elementwise.
    pub fn blend_channels(self, bottom: &Channel, top: &Channel) -> Result<Channel> {
        bottom.zip_map(top, |b, t| self.apply(b, t))
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = BlitError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.name() == key)
            .ok_or_else(|| BlitError::UnknownBlendMode(s.to_string()))
    }
}

pub fn screen(bottom: f64, top: f64) -> f64 {
    1.0 - (1.0 - bottom) * (1.0 - top)
}

pub fn multiply(bottom: f64, top: f64) -> f64 {
    bottom * top
}

pub fn add(bottom: f64, top: f64) -> f64 {
    (bottom + top).clamp(0.0, 1.0)
}

pub fn subtract(bottom: f64, top: f64) -> f64 {
    (bottom - top).clamp(0.0, 1.0)
}

pub fn linear_light(bottom: f64, top: f64) -> f64 {
    (bottom + 2.0 * top - 1.0).clamp(0.0, 1.0)
}

pub fn hard_light(bottom: f64, top: f64) -> f64 {
    if top < 0.5 {
        2.0 * bottom * top
    } else {
        1.0 - 2.0 * (1.0 - bottom) * (1.0 - top)
    }
}

/// Blend `top` over `bottom`.
///
/// The output takes the size of the first of `bottom`, `top`, `mask` that has
/// one; when none do, the result is a flat [`Color`]. With `mode` unset the
/// top color is pasted as-is wherever it covers.
pub fn blend(bottom: &Layer, top: &Layer, mask: Option<&Layer>, opacity: f64, mode: Option<BlendMode>) -> Result<Layer> {
    let dim = bottom.size().or_else(|| top.size()).or_else(|| mask.and_then(Layer::size));
    let (width, height) = dim.unwrap_or((1, 1));
    trace!(width, height, sized = dim.is_some(), ?mode, opacity, "blend");

    let bottom_rgba = bottom.rgba(width, height);
    let top_rgba = top.rgba(width, height);

    let coverage = match mask {
        Some(mask) => {
            let lum = luminance(&mask.rgba(width, height));
            top_rgba.alpha().zip_map(&lum, |a, l| a * l)?
        }
        None => top_rgba.alpha().clone(),
    };

    let output = combine(&bottom_rgba, &top_rgba, &coverage, opacity, mode)?;

    Ok(match dim {
        Some(_) => Layer::Bitmap(output),
        None => Layer::Color(Color::from_unit(output.channels().map(|c| c.get(0, 0)))),
    })
}

/// Composite already-materialized channels.
///
/// `coverage` is the top alpha multiplied by mask luminance; opacity is
/// folded in here.
pub fn combine(bottom: &Rgba, top: &Rgba, coverage: &Channel, opacity: f64, mode: Option<BlendMode>) -> Result<Rgba> {
    bottom.red().check_same_size(top.red())?;
    bottom.red().check_same_size(coverage)?;

    if opacity == 0.0 || !coverage.any() {
        debug!(opacity, "nothing to composite, keeping bottom layer");
        return Ok(bottom.clone());
    }

    let [bottom_r, bottom_g, bottom_b, bottom_a] = bottom.channels();
    let [top_r, top_g, top_b, _] = top.channels();

    let blended = match mode {
        None => [top_r.clone(), top_g.clone(), top_b.clone()],
        Some(mode) => [
            mode.blend_channels(bottom_r, top_r)?,
            mode.blend_channels(bottom_g, top_g)?,
            mode.blend_channels(bottom_b, top_b)?,
        ],
    };

    let effective = if opacity < 1.0 { coverage.map(|c| c * opacity) } else { coverage.clone() };
    let eff = effective.data();
    let under_alpha = bottom_a.data();

    let over = |blended: &Channel, under: &Channel| -> Channel {
        let under = under.data();
        blended.map_indexed(|i, color| {
            let e = eff[i];
            if e == 1.0 {
                return color;
            }
            let alpha_denom = 1.0 - (1.0 - e) * (1.0 - under_alpha[i]);
            if alpha_denom > 0.0 {
                let ratio = e / alpha_denom;
                color * ratio + under[i] * (1.0 - ratio)
            } else {
                0.0
            }
        })
    };

    let [r, g, b] = &blended;
    Rgba::new(
        over(r, bottom_r),
        over(g, bottom_g),
        over(b, bottom_b),
        bottom_a.zip_map(&effective, screen)?,
    )
}
