//! Threshold and curves adjustments.
//!
//! The factory functions solve everything up front and return an
//! [`Adjustment`] that can be applied to any number of layers. Alpha always
//! passes through unchanged.

use tracing::debug;

use crate::channel::{from_u8, Channel};
use crate::error::{BlitError, Result};
use crate::layer::Rgba;

/// Three `(input, output)` control points in the 8-bit `0..=255` range.
pub type CurveMap = [(f64, f64); 3];

/// `f(x) = a·x² + b·x + c` over unit-range samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    /// The unique quadratic through three points, by Cramer's rule.
    ///
    /// Fails with [`BlitError::InvalidCurve`] when two inputs coincide.
    pub fn through(points: [(f64, f64); 3]) -> Result<Self> {
        let [(x0, y0), (x1, y1), (x2, y2)] = points;
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(BlitError::InvalidCurve(format!("non-finite control point in {points:?}")));
        }

        let det3 = |m: [[f64; 3]; 3]| {
            m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
                + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
        };

        // Rows [x², x, 1]; zero exactly when two inputs coincide.
        let det = det3([[x0 * x0, x0, 1.0], [x1 * x1, x1, 1.0], [x2 * x2, x2, 1.0]]);
        if det.abs() < f64::EPSILON {
            return Err(BlitError::InvalidCurve(format!("control point inputs must differ: {x0}, {x1}, {x2}")));
        }

        let det_a = det3([[y0, x0, 1.0], [y1, x1, 1.0], [y2, x2, 1.0]]);
        let det_b = det3([[x0 * x0, y0, 1.0], [x1 * x1, y1, 1.0], [x2 * x2, y2, 1.0]]);
        let det_c = det3([[x0 * x0, x0, y0], [x1 * x1, x1, y1], [x2 * x2, x2, y2]]);

        Ok(Quadratic { a: det_a / det, b: det_b / det, c: det_c / det })
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    /// Per-channel cut values; samples above the cut become 1, others 0.
    Threshold([f64; 3]),
    /// Per-channel quadratics, clipped to `[0, 1]`.
    Curves([Quadratic; 3]),
}

impl Adjustment {
    /// Transform red, green and blue; alpha is carried over as-is.
    pub fn apply(&self, rgba: &Rgba) -> Rgba {
        rgba.map_colors(|index, channel| self.apply_channel(index, channel))
    }

    fn apply_channel(&self, index: usize, channel: &Channel) -> Channel {
        match self {
            Adjustment::Threshold(cuts) => {
                let cut = cuts[index];
                channel.map(|v| if v > cut { 1.0 } else { 0.0 })
            }
            Adjustment::Curves(curves) => {
                let curve = curves[index];
                channel.map(|v| curve.eval(v).clamp(0.0, 1.0))
            }
        }
    }
}

/// Threshold all three color channels at one 8-bit cut.
pub fn threshold(cut: u8) -> Adjustment {
    threshold_rgb(cut, cut, cut)
}

pub fn threshold_rgb(red: u8, green: u8, blue: u8) -> Adjustment {
    debug!(red, green, blue, "threshold adjustment");
    Adjustment::Threshold([red, green, blue].map(from_u8))
}

/// Curves with one control-point map shared by red, green and blue.
pub fn curve(map: CurveMap) -> Result<Adjustment> {
    curve_rgb(map, None, None)
}

/// Curves with separate maps per channel. Green and blue fall back to the
/// red map when either is missing.
pub fn curve_rgb(red: CurveMap, green: Option<CurveMap>, blue: Option<CurveMap>) -> Result<Adjustment> {
    let (green, blue) = match (green, blue) {
        (Some(green), Some(blue)) => (green, blue),
        _ => (red, red),
    };
    let solve = |map: CurveMap| Quadratic::through(map.map(|(x, y)| (x / 255.0, y / 255.0)));
    let curves = [solve(red)?, solve(green)?, solve(blue)?];
    debug!(?curves, "curves adjustment");
    Ok(Adjustment::Curves(curves))
}

/// Curves that send `black` to 0, `grey` to one half and `white` to 1.
pub fn curves_levels(black: u8, grey: u8, white: u8) -> Result<Adjustment> {
    curve([(black as f64, 0.0), (grey as f64, 127.5), (white as f64, 255.0)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Color, Layer};

    fn gradient() -> Layer {
        Layer::from(Rgba::from_interleaved(3, 1, &[0x00, 0x00, 0x00, 0xFF, 0x80, 0x80, 0x80, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap())
    }

    #[test]
    fn quadratic_passes_through_points() {
        let points = [(0.1, 0.3), (0.45, 0.2), (0.9, 0.95)];
        let q = Quadratic::through(points).unwrap();
        for (x, y) in points {
            assert!((q.eval(x) - y).abs() < 1e-6, "f({x}) = {} != {y}", q.eval(x));
        }
    }

    #[test]
    fn straight_line_has_no_square_term() {
        let q = Quadratic::through([(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)]).unwrap();
        assert!(q.a.abs() < 1e-12);
        assert!((q.b - 1.0).abs() < 1e-12);
        assert!(q.c.abs() < 1e-12);
    }

    #[test]
    fn repeated_input_is_invalid() {
        let err = curve([(10.0, 0.0), (10.0, 128.0), (255.0, 255.0)]).unwrap_err();
        assert!(matches!(err, BlitError::InvalidCurve(_)));
        assert!(curves_levels(0x80, 0x80, 0xFF).is_err());
    }

    #[test]
    fn threshold_single_cut() {
        let out = gradient().adjust(&threshold(0x99));
        assert_eq!(out.pixel(0, 0), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(out.pixel(1, 0), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(out.pixel(2, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn threshold_per_channel_cuts() {
        let out = gradient().adjust(&threshold_rgb(0x99, 0x66, 0x66));
        assert_eq!(out.pixel(0, 0), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(out.pixel(1, 0), [0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(out.pixel(2, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn threshold_leaves_alpha_alone() {
        let layer = Layer::from(Rgba::filled(2, 2, [0.9, 0.1, 0.5, 0.4]));
        let out = layer.adjust(&threshold(0x80));
        assert_eq!(out.pixel(1, 1), [0xFF, 0x00, 0x00, 0x66]);
    }

    #[test]
    fn levels_curve_inverts_and_bends() {
        let out = gradient().adjust(&curves_levels(0xFF, 0xC0, 0x00).unwrap());
        assert_eq!(out.pixel(0, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(out.pixel(1, 0), [0xD6, 0xD6, 0xD6, 0xFF]);
        assert_eq!(out.pixel(2, 0), [0x00, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn shared_curve_darkens_midtones() {
        let out = gradient().adjust(&curve([(0.0, 0.0), (128.0, 64.0), (255.0, 255.0)]).unwrap());
        assert_eq!(out.pixel(0, 0), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(out.pixel(1, 0), [0x40, 0x40, 0x40, 0xFF]);
        assert_eq!(out.pixel(2, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn per_channel_curves() {
        let red = [(0.0, 22.0), (128.0, 128.0), (255.0, 255.0)];
        let green = [(0.0, 29.0), (128.0, 128.0), (255.0, 255.0)];
        let blue = [(0.0, 65.0), (128.0, 128.0), (255.0, 228.0)];
        let out = gradient().adjust(&curve_rgb(red, Some(green), Some(blue)).unwrap());
        assert_eq!(out.pixel(0, 0), [22, 29, 65, 0xFF]);
        assert_eq!(out.pixel(1, 0), [128, 128, 128, 0xFF]);
        assert_eq!(out.pixel(2, 0), [255, 255, 228, 0xFF]);
    }

    #[test]
    fn one_adjustment_applies_to_many_layers() {
        let invert = curve([(0.0, 255.0), (128.0, 128.0), (255.0, 0.0)]).unwrap();
        let first = gradient().adjust(&invert);
        let second = Layer::from(Color::new(0, 0, 0)).adjust(&invert);
        assert_eq!(first.pixel(0, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(first.pixel(1, 0), [0x80, 0x80, 0x80, 0xFF]);
        assert_eq!(second.pixel(0, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn colors_stay_colors() {
        let gray = Layer::from(Color::new(0x80, 0x80, 0x80));
        let dark = gray.adjust(&threshold(0x99));
        assert_eq!(dark.size(), None);
        assert_eq!(dark.pixel(0, 0), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(gray.adjust(&threshold(0x66)).pixel(0, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
