//! Conversion between the `image` crate and layers.
//!
//! Everything decodes to RGBA8 first; samples are scaled by 1/255 with no
//! color-space conversion.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use tracing::debug;

use crate::error::{BlitError, Result};
use crate::layer::{Layer, Rgba};

impl Layer {
    pub fn from_image(image: &RgbaImage) -> Result<Layer> {
        let (width, height) = image.dimensions();
        Ok(Layer::Bitmap(Rgba::from_interleaved(width, height, image.as_raw())?))
    }

    /// Decode a png or jpeg file.
    pub fn open(path: impl AsRef<Path>) -> Result<Layer> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded image");
        Layer::from_image(&image)
    }

    /// Decode png or jpeg bytes held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Layer> {
        let image = image::load_from_memory(data)?.to_rgba8();
        Layer::from_image(&image)
    }

    /// Encode to an 8-bit RGBA image. Colors become a single pixel.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let rgba = match self.size() {
            Some((width, height)) => self.rgba(width, height),
            None => self.rgba(1, 1),
        };
        let (width, height) = rgba.size();
        RgbaImage::from_raw(width, height, rgba.to_interleaved())
            .ok_or(BlitError::DimensionMismatch { expected: (width, height), found: (0, 0) })
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut png_bytes: Vec<u8> = Vec::new();
        DynamicImage::ImageRgba8(self.to_image()?).write_to(&mut Cursor::new(&mut png_bytes), ImageOutputFormat::Png)?;
        Ok(png_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Color;
    use image::Rgba as Pixel;

    #[test]
    fn image_round_trip_keeps_pixels() {
        let image = RgbaImage::from_pixel(10, 20, Pixel([0xFF, 0x00, 0xFF, 0xFF]));
        let layer = Layer::from_image(&image).unwrap();
        assert_eq!(layer.size(), Some((10, 20)));

        let back = layer.to_image().unwrap();
        assert_eq!(back.dimensions(), (10, 20));
        assert_eq!(back.get_pixel(0, 0), &Pixel([0xFF, 0x00, 0xFF, 0xFF]));
        assert_eq!(back.get_pixel(9, 19), &Pixel([0xFF, 0x00, 0xFF, 0xFF]));
    }

    #[test]
    fn color_encodes_as_one_pixel() {
        let image = Layer::from(Color::with_alpha(1, 2, 3, 4)).to_image().unwrap();
        assert_eq!(image.dimensions(), (1, 1));
        assert_eq!(image.get_pixel(0, 0), &Pixel([1, 2, 3, 4]));
    }

    #[test]
    fn png_bytes_decode_back() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(2, 1, Pixel([0x12, 0x34, 0x56, 0x78]));
        let png = Layer::from_image(&image).unwrap().to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let layer = Layer::from_bytes(&png).unwrap();
        assert_eq!(layer.pixel(2, 1), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(layer.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn garbage_bytes_are_a_codec_error() {
        assert!(matches!(Layer::from_bytes(b"not an image"), Err(BlitError::Image(_))));
    }
}
