use blit::{BlendMode, Color, Layer, LayerOptions, LayerStack, Rgba};

const FFF: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const CCC: [u8; 4] = [0xCC, 0xCC, 0xCC, 0xFF];
const N99: [u8; 4] = [0x99, 0x99, 0x99, 0xFF];
const GRY: [u8; 4] = [0x80, 0x80, 0x80, 0xFF];
const BLK: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];
const NIL: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

fn bitmap(pixels: [[u8; 4]; 9]) -> Layer {
    Layer::from(Rgba::from_interleaved(3, 3, &pixels.concat()).unwrap())
}

fn assert_pixels(layer: &Layer, expected: [[u8; 4]; 9]) {
    for (i, want) in expected.iter().enumerate() {
        let (x, y) = ((i % 3) as u32, (i / 3) as u32);
        assert_eq!(&layer.pixel(x, y), want, "pixel ({x}, {y})");
    }
}

fn over(bottom: &Layer, top: &Layer, mask: Option<&Layer>) -> Layer {
    bottom.blend(top, mask, 1.0, None).unwrap()
}

/// A diagonal street with outlines and a top-left halo, drawn over a base.
mod streets {
    use super::*;

    pub fn base() -> Layer { bitmap([CCC; 9]) }
    pub fn halos() -> Layer { bitmap([FFF, FFF, BLK, FFF, FFF, BLK, BLK, BLK, BLK]) }
    pub fn outlines() -> Layer { bitmap([NIL, N99, N99, N99, N99, N99, N99, N99, NIL]) }
    pub fn streets() -> Layer { bitmap([NIL, NIL, FFF, NIL, FFF, NIL, FFF, NIL, NIL]) }
}

#[test]
fn outlines_then_streets() {
    let out = over(&over(&streets::base(), &streets::outlines(), None), &streets::streets(), None);
    assert_pixels(&out, [CCC, N99, FFF, N99, FFF, N99, FFF, N99, CCC]);
}

#[test]
fn halo_masked_outlines() {
    let out = over(&over(&streets::base(), &streets::outlines(), Some(&streets::halos())), &streets::streets(), None);
    assert_pixels(&out, [CCC, N99, FFF, N99, FFF, CCC, FFF, CCC, CCC]);
}

#[test]
fn color_base_takes_bitmap_size() {
    let base = Layer::from(Color::new(0xCC, 0xCC, 0xCC));
    let out = over(&over(&base, &streets::outlines(), Some(&streets::halos())), &streets::streets(), None);
    assert_eq!(out.size(), Some((3, 3)));
    assert_pixels(&out, [CCC, N99, FFF, N99, FFF, CCC, FFF, CCC, CCC]);
}

#[test]
fn color_over_color_through_mask() {
    let base = Layer::from(Color::new(0xCC, 0xCC, 0xCC));
    let out = over(&over(&base, &Color::new(0x99, 0x99, 0x99).into(), Some(&streets::halos())), &streets::streets(), None);
    assert_pixels(&out, [N99, N99, FFF, N99, FFF, CCC, FFF, CCC, CCC]);
}

#[test]
fn transparent_base_stays_transparent_outside_mask() {
    let base = Layer::from(Color::with_alpha(0, 0, 0, 0));
    let out = over(&over(&base, &Color::new(0x99, 0x99, 0x99).into(), Some(&streets::halos())), &streets::streets(), None);
    assert_pixels(&out, [N99, N99, FFF, N99, FFF, NIL, FFF, NIL, NIL]);
}

#[test]
fn color_over_transparent_color() {
    let out = over(&Color::with_alpha(0, 0, 0, 0).into(), &Color::new(0x99, 0x99, 0x99).into(), None);
    assert_eq!(out.size(), None);
    assert_eq!(out.pixel(0, 0), N99);
}

mod alpha {
    use super::*;

    const WHITE_CLEAR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0x00];
    const WHITE_HALF: [u8; 4] = [0xFF, 0xFF, 0xFF, 0x80];
    const BLACK_HALF: [u8; 4] = [0x00, 0x00, 0x00, 0x80];

    pub fn gray() -> Layer { bitmap([GRY; 9]) }
    pub fn h_gradient() -> Layer { bitmap([BLK, GRY, FFF, BLK, GRY, FFF, BLK, GRY, FFF]) }
    pub fn white_wipe() -> Layer { bitmap([WHITE_CLEAR, WHITE_CLEAR, WHITE_CLEAR, WHITE_HALF, WHITE_HALF, WHITE_HALF, FFF, FFF, FFF]) }
    pub fn black_wipe() -> Layer { bitmap([NIL, NIL, NIL, BLACK_HALF, BLACK_HALF, BLACK_HALF, BLK, BLK, BLK]) }

    const C0: [u8; 4] = [0xC0, 0xC0, 0xC0, 0xFF];
    const A0: [u8; 4] = [0xA0, 0xA0, 0xA0, 0xFF];
    const S60: [u8; 4] = [0x60, 0x60, 0x60, 0xFF];
    const S40: [u8; 4] = [0x40, 0x40, 0x40, 0xFF];

    #[test]
    fn white_wipe_over_gray() {
        assert_pixels(&over(&gray(), &white_wipe(), None), [GRY, GRY, GRY, C0, C0, C0, FFF, FFF, FFF]);
    }

    #[test]
    fn black_wipe_over_gray() {
        assert_pixels(&over(&gray(), &black_wipe(), None), [GRY, GRY, GRY, S40, S40, S40, BLK, BLK, BLK]);
    }

    #[test]
    fn white_wipe_through_gradient_mask() {
        let out = over(&gray(), &white_wipe(), Some(&h_gradient()));
        assert_pixels(&out, [GRY, GRY, GRY, GRY, A0, C0, GRY, C0, FFF]);
    }

    #[test]
    fn black_wipe_through_gradient_mask() {
        let out = over(&gray(), &black_wipe(), Some(&h_gradient()));
        assert_pixels(&out, [GRY, GRY, GRY, GRY, S60, S40, GRY, S40, BLK]);
    }

    #[test]
    fn white_wipe_over_nothing() {
        let out = over(&bitmap([NIL; 9]), &white_wipe(), None);
        assert_pixels(&out, [NIL, NIL, NIL, WHITE_HALF, WHITE_HALF, WHITE_HALF, FFF, FFF, FFF]);
    }
}

mod modes {
    use super::*;

    const S40: [u8; 4] = [0x40, 0x40, 0x40, 0xFF];
    const S01: [u8; 4] = [0x01, 0x01, 0x01, 0xFF];
    const S81: [u8; 4] = [0x81, 0x81, 0x81, 0xFF];
    const C0: [u8; 4] = [0xC0, 0xC0, 0xC0, 0xFF];

    fn h_gradient() -> Layer { bitmap([BLK, GRY, FFF, BLK, GRY, FFF, BLK, GRY, FFF]) }
    fn v_gradient() -> Layer { bitmap([BLK, BLK, BLK, GRY, GRY, GRY, FFF, FFF, FFF]) }

    fn gradients(mode: Option<BlendMode>, opacity: f64) -> Layer {
        h_gradient().blend(&v_gradient(), None, opacity, mode).unwrap()
    }

    #[test]
    fn screen() {
        assert_pixels(&gradients(Some(BlendMode::Screen), 1.0), [BLK, GRY, FFF, GRY, C0, FFF, FFF, FFF, FFF]);
    }

    #[test]
    fn multiply() {
        assert_pixels(&gradients(Some(BlendMode::Multiply), 1.0), [BLK, BLK, BLK, BLK, S40, GRY, BLK, GRY, FFF]);
    }

    #[test]
    fn linear_light() {
        assert_pixels(&gradients(Some(BlendMode::LinearLight), 1.0), [BLK, BLK, BLK, S01, S81, FFF, FFF, FFF, FFF]);
    }

    #[test]
    fn hard_light() {
        assert_pixels(&gradients(Some(BlendMode::HardLight), 1.0), [BLK, BLK, BLK, S01, GRY, FFF, FFF, FFF, FFF]);
    }

    #[test]
    fn half_opacity_paste() {
        assert_pixels(&gradients(None, 0.5), [BLK, S40, GRY, S40, GRY, C0, GRY, C0, FFF]);
    }
}

#[test]
fn stack_keeps_its_size() {
    let mut stack = LayerStack::new(3, 6);
    stack.append("dark", Color::new(0, 0, 0).into(), None, LayerOptions::default().with_opacity(0.5)).unwrap();
    assert_eq!(stack.size(), (3, 6));
    assert_eq!(stack.flatten().size(), Some((3, 6)));
}

#[test]
fn loaded_image_keeps_size_and_pixels() {
    let image = image::RgbaImage::from_pixel(10, 20, image::Rgba([0xFF, 0x00, 0xFF, 0xFF]));
    let layer = Layer::from_image(&image).unwrap();
    assert_eq!(layer.size(), Some((10, 20)));
    let back = layer.rgba(10, 20);
    assert_eq!(back.size(), (10, 20));
    assert_eq!(back.pixel(0, 0), [0xFF, 0x00, 0xFF, 0xFF]);
    assert_eq!(back.pixel(9, 19), [0xFF, 0x00, 0xFF, 0xFF]);
}
