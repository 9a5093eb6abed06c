//! Pixel compositing with blend modes, masks and adjustments, plus layered
//! Photoshop output of the stacks built from them.

pub mod error;
pub mod channel;
pub mod layer;
pub mod blends;
pub mod adjustments;
pub mod codec;
pub mod stack;
pub mod psd;
pub mod wasm;

pub use adjustments::{curve, curve_rgb, curves_levels, threshold, threshold_rgb, Adjustment, CurveMap};
pub use blends::{blend, BlendMode};
pub use channel::Channel;
pub use error::{BlitError, Result};
pub use layer::{Color, Layer, Rgba};
pub use psd::{ParsedPsd, PsdDocument};
pub use stack::{LayerOptions, LayerStack};
pub use wasm::Document;
