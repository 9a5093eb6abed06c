//! Layered Photoshop document (PSD) output and read-back.
//!
//! The writer emits the five sections of the format in order: file header,
//! color mode data (empty), image resources (empty), layer and mask
//! information, and the flattened composite. Every integer is big-endian and
//! every channel is stored uncompressed at 8 bits per sample.
//!
//! <https://www.adobe.com/devnet-apps/photoshop/fileformatashtml/>

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::{debug, warn};

use crate::blends::BlendMode;
use crate::channel::Channel;
use crate::error::{BlitError, Result};
use crate::layer::{luminance, Layer, Rgba};
use crate::stack::LayerStack;

pub const SIGNATURE: &[u8; 4] = b"8BPS";
pub const RESOURCE_SIGNATURE: &[u8; 4] = b"8BIM";

pub const CHANNEL_RED: i16 = 0;
pub const CHANNEL_GREEN: i16 = 1;
pub const CHANNEL_BLUE: i16 = 2;
pub const CHANNEL_ALPHA: i16 = -1;
pub const CHANNEL_USER_MASK: i16 = -2;

const COMPRESSION_RAW: u16 = 0;
const DEPTH: u16 = 8;
/// Channels in the header and the composite image: red, green, blue.
const COMPOSITE_CHANNELS: u16 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum PsdError {
    InvalidSignature,
    UnsupportedVersion,
    UnsupportedColorMode,
    UnsupportedDepth,
    UnexpectedEndOfFile,
    InvalidLayerData,
    DecompressionError,
    ZipError,
    SectionTooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9,
}

impl ColorMode {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ColorMode::Bitmap),
            1 => Some(ColorMode::Grayscale),
            2 => Some(ColorMode::Indexed),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Cmyk),
            7 => Some(ColorMode::Multichannel),
            8 => Some(ColorMode::Duotone),
            9 => Some(ColorMode::Lab),
            _ => None,
        }
    }
}

/// Four-character blend key stored in a layer record.
///
/// Modes without a key of their own (subtract) are written as `norm`.
pub fn blend_key(mode: Option<BlendMode>) -> [u8; 4] {
    match mode {
        None => *b"norm",
        Some(BlendMode::Screen) => *b"scrn",
        Some(BlendMode::Add) => *b"lddg",
        Some(BlendMode::Multiply) => *b"mul ",
        Some(BlendMode::LinearLight) => *b"lLit",
        Some(BlendMode::HardLight) => *b"hLit",
        Some(mode @ BlendMode::Subtract) => {
            debug!(%mode, "no layered-file key for blend mode, writing norm");
            *b"norm"
        }
    }
}

/// Inverse of [`blend_key`]; `None` for `norm` and for keys with no
/// matching mode.
pub fn mode_from_key(key: &[u8; 4]) -> Option<BlendMode> {
    match key {
        b"scrn" => Some(BlendMode::Screen),
        b"lddg" => Some(BlendMode::Add),
        b"mul " => Some(BlendMode::Multiply),
        b"lLit" => Some(BlendMode::LinearLight),
        b"hLit" => Some(BlendMode::HardLight),
        b"fsub" => Some(BlendMode::Subtract),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PsdChannel {
    pub id: i16,
    pub data: Channel,
}

/// One layer record plus its channel image data.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdLayer {
    pub name: String,
    pub channels: Vec<PsdChannel>,
    pub blend_key: [u8; 4],
    pub opacity: u8,
    pub clipping: bool,
    /// Fill color in 0-255 units, written as a `SoCo` block.
    pub solid_color: Option<[f64; 3]>,
}

/// A complete document ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdDocument {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<PsdLayer>,
    pub composite: Rgba,
}

impl PsdDocument {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = PsdWriter::new();
        writer.write_document(self)?;
        debug!(width = self.width, height = self.height, layers = self.layers.len(), bytes = writer.buf.len(), "wrote layered document");
        Ok(writer.buf)
    }

    fn check_size(&self, channel: &Channel) -> Result<()> {
        if channel.size() != (self.width, self.height) {
            return Err(BlitError::DimensionMismatch { expected: (self.width, self.height), found: channel.size() });
        }
        Ok(())
    }
}

/// Lay out a stack as document layers, oldest first.
///
/// The background keeps red, green and blue only; every later entry adds
/// alpha, and a mask luminance channel when it was appended with a mask.
pub(crate) fn document_from_stack(stack: &LayerStack) -> PsdDocument {
    let (width, height) = stack.size();
    let layers = stack
        .entries()
        .enumerate()
        .map(|(index, entry)| {
            let rgba = entry.layer.rgba(width, height);
            let [red, green, blue, alpha] = rgba.channels();
            let mut channels = vec![
                PsdChannel { id: CHANNEL_RED, data: red.clone() },
                PsdChannel { id: CHANNEL_GREEN, data: green.clone() },
                PsdChannel { id: CHANNEL_BLUE, data: blue.clone() },
            ];
            let mut solid_color = None;
            if index > 0 {
                channels.push(PsdChannel { id: CHANNEL_ALPHA, data: alpha.clone() });
                if let Layer::Color(color) = entry.layer {
                    let [r, g, b, _] = color.components();
                    solid_color = Some([r * 255.0, g * 255.0, b * 255.0]);
                }
            }
            if let Some(mask) = entry.mask {
                channels.push(PsdChannel { id: CHANNEL_USER_MASK, data: luminance(&mask.rgba(width, height)) });
            }
            PsdLayer {
                name: entry.name.to_string(),
                channels,
                blend_key: blend_key(entry.mode),
                opacity: entry.opacity,
                clipping: entry.clipped,
                solid_color,
            }
        })
        .collect();

    PsdDocument { width, height, layers, composite: stack.flatten().rgba(width, height).into_owned() }
}

/// Big-endian byte sink with length-prefixed sections.
struct PsdWriter {
    buf: Vec<u8>,
}

impl PsdWriter {
    fn new() -> Self { PsdWriter { buf: Vec::new() } }
    fn u8(&mut self, v: u8) { self.buf.push(v); }
    fn u16(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn i16(&mut self, v: i16) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn u32(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn i32(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn f64(&mut self, v: f64) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn bytes(&mut self, v: &[u8]) { self.buf.extend_from_slice(v); }

    /// Write a 4-byte length, then `body`, then patch the length to the
    /// number of bytes `body` wrote.
    fn section(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let start = self.buf.len();
        self.u32(0);
        body(self)?;
        let len = u32::try_from(self.buf.len() - start - 4).map_err(|_| PsdError::SectionTooLarge)?;
        self.buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    /// Length byte plus up to 255 bytes of name, zero-padded so the whole
    /// field is a multiple of `pad_to`.
    fn pascal_string(&mut self, s: &str, pad_to: usize) {
        let mut end = s.len().min(255);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.u8(end as u8);
        self.bytes(&s.as_bytes()[..end]);
        let written = end + 1;
        self.bytes(&vec![0u8; (pad_to - written % pad_to) % pad_to]);
    }

    /// Descriptor unicode string: code-unit count including a terminating
    /// null, then UTF-16 code units.
    fn unicode_string(&mut self, s: &str) {
        let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
        self.u32(units.len() as u32);
        for unit in units {
            self.u16(unit);
        }
    }

    /// Descriptor key or class id in its four-character form.
    fn descriptor_id(&mut self, id: &[u8; 4]) {
        self.u32(0);
        self.bytes(id);
    }

    fn write_document(&mut self, doc: &PsdDocument) -> Result<()> {
        for layer in &doc.layers {
            for channel in &layer.channels {
                doc.check_size(&channel.data)?;
            }
        }
        for channel in doc.composite.channels() {
            doc.check_size(channel)?;
        }
        let pixel_count = u32::try_from(doc.width as u64 * doc.height as u64).map_err(|_| PsdError::SectionTooLarge)?;
        let channel_len = pixel_count.checked_add(2).ok_or(PsdError::SectionTooLarge)?;
        let layer_count = u16::try_from(doc.layers.len()).map_err(|_| PsdError::SectionTooLarge)?;

        // File header
        self.bytes(SIGNATURE);
        self.u16(1);
        self.bytes(&[0u8; 6]);
        self.u16(COMPOSITE_CHANNELS);
        self.u32(doc.height);
        self.u32(doc.width);
        self.u16(DEPTH);
        self.u16(ColorMode::Rgb as u16);

        // Color mode data, image resources
        self.u32(0);
        self.u32(0);

        // Layer and mask information
        self.section(|w| {
            w.section(|w| {
                w.u16(layer_count);
                for layer in &doc.layers {
                    w.layer_record(doc, layer, channel_len)?;
                }
                for layer in &doc.layers {
                    for channel in &layer.channels {
                        w.u16(COMPRESSION_RAW);
                        w.bytes(&channel.data.to_bytes());
                    }
                }
                Ok(())
            })?;
            // Global layer mask
            w.u32(0);
            Ok(())
        })?;

        // Composite image data
        self.u16(COMPRESSION_RAW);
        for channel in [doc.composite.red(), doc.composite.green(), doc.composite.blue()] {
            self.bytes(&channel.to_bytes());
        }
        Ok(())
    }

    fn layer_record(&mut self, doc: &PsdDocument, layer: &PsdLayer, channel_len: u32) -> Result<()> {
        let bottom = i32::try_from(doc.height).map_err(|_| PsdError::SectionTooLarge)?;
        let right = i32::try_from(doc.width).map_err(|_| PsdError::SectionTooLarge)?;
        for edge in [0, 0, bottom, right] {
            self.i32(edge);
        }
        self.u16(layer.channels.len() as u16);
        for channel in &layer.channels {
            self.i16(channel.id);
            self.u32(channel_len);
        }
        self.bytes(RESOURCE_SIGNATURE);
        self.bytes(&layer.blend_key);
        self.u8(layer.opacity);
        self.u8(layer.clipping as u8);
        self.u8(0);
        self.u8(0);
        self.section(|w| {
            // Layer mask adjustment data, blending ranges
            w.u32(0);
            w.u32(0);
            w.pascal_string(&layer.name, 4);
            if let Some(rgb) = layer.solid_color {
                w.additional_info(b"SoCo", &solid_color_descriptor(rgb));
            }
            Ok(())
        })
    }

    fn additional_info(&mut self, key: &[u8; 4], data: &[u8]) {
        self.bytes(RESOURCE_SIGNATURE);
        self.bytes(key);
        self.u32(data.len() as u32);
        self.bytes(data);
    }
}

/// Solid color sheet setting: a versioned descriptor holding one `RGBC`
/// object with `Rd  `, `Grn ` and `Bl  ` doubles.
fn solid_color_descriptor([red, green, blue]: [f64; 3]) -> Vec<u8> {
    let mut w = PsdWriter::new();
    w.u32(16);
    w.unicode_string("");
    w.descriptor_id(b"null");
    w.u32(1);
    w.descriptor_id(b"Clr ");
    w.bytes(b"Objc");
    w.unicode_string("");
    w.descriptor_id(b"RGBC");
    w.u32(3);
    for (key, value) in [(b"Rd  ", red), (b"Grn ", green), (b"Bl  ", blue)] {
        w.descriptor_id(key);
        w.bytes(b"doub");
        w.f64(value);
    }
    w.buf
}

fn descriptor_double(data: &[u8], key: &[u8; 4]) -> Option<f64> {
    let mut pattern = [0u8; 8];
    pattern[..4].copy_from_slice(key);
    pattern[4..].copy_from_slice(b"doub");
    let at = data.windows(8).position(|w| w == pattern)? + 8;
    let bytes: [u8; 8] = data.get(at..at + 8)?.try_into().ok()?;
    Some(f64::from_be_bytes(bytes))
}

fn parse_solid_color(data: &[u8]) -> Option<[f64; 3]> {
    Some([descriptor_double(data, b"Rd  ")?, descriptor_double(data, b"Grn ")?, descriptor_double(data, b"Bl  ")?])
}

#[derive(Debug, Clone, PartialEq)]
pub struct PsdHeader {
    pub version: u16,
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PsdMaskInfo {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub default_color: u8,
    pub flags: u8,
}

/// A layer record as read back from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLayer {
    pub name: String,
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    /// Declared `(id, byte length)` pairs in record order.
    pub channel_info: Vec<(i16, u64)>,
    /// Decoded 8-bit samples per channel id.
    pub channels: HashMap<i16, Vec<u8>>,
    pub blend_key: [u8; 4],
    pub opacity: u8,
    pub clipping: bool,
    pub visible: bool,
    pub mask_info: Option<PsdMaskInfo>,
    pub solid_color: Option<[f64; 3]>,
}

impl ParsedLayer {
    pub fn width(&self) -> u32 { (self.right - self.left).max(0) as u32 }
    pub fn height(&self) -> u32 { (self.bottom - self.top).max(0) as u32 }
    pub fn mode(&self) -> Option<BlendMode> { mode_from_key(&self.blend_key) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPsd {
    pub header: PsdHeader,
    pub layers: Vec<ParsedLayer>,
    /// Composite planes in header channel order.
    pub composite: Vec<Vec<u8>>,
}

impl ParsedPsd {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(PsdParser::new(data).parse()?)
    }
}

fn decode_rle(data: &[u8], expected: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected);
    let mut i = 0;
    while i < data.len() && out.len() < expected {
        let n = data[i] as i8;
        i += 1;
        if n >= 0 {
            let count = n as usize + 1;
            let end = (i + count).min(data.len());
            out.extend_from_slice(&data[i..end]);
            i = end;
        } else if n > -128 {
            let count = (-(n as i16)) as usize + 1;
            if let Some(&v) = data.get(i) {
                out.extend(std::iter::repeat(v).take(count));
                i += 1;
            }
        }
    }
    out.resize(expected, 0);
    out
}

pub struct PsdParser<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> PsdParser<'a> {
    pub fn new(data: &'a [u8]) -> Self { PsdParser { data, cursor: 0 } }

    fn read_bytes(&mut self, len: usize) -> std::result::Result<&'a [u8], PsdError> {
        let end = self.cursor.checked_add(len).filter(|&end| end <= self.data.len()).ok_or(PsdError::UnexpectedEndOfFile)?;
        let val = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(val)
    }
    fn read_array<const N: usize>(&mut self) -> std::result::Result<[u8; N], PsdError> { self.read_bytes(N)?.try_into().map_err(|_| PsdError::UnexpectedEndOfFile) }
    fn read_u8(&mut self) -> std::result::Result<u8, PsdError> { Ok(self.read_array::<1>()?[0]) }
    fn read_u16(&mut self) -> std::result::Result<u16, PsdError> { Ok(u16::from_be_bytes(self.read_array()?)) }
    fn read_i16(&mut self) -> std::result::Result<i16, PsdError> { Ok(i16::from_be_bytes(self.read_array()?)) }
    fn read_u32(&mut self) -> std::result::Result<u32, PsdError> { Ok(u32::from_be_bytes(self.read_array()?)) }
    fn read_i32(&mut self) -> std::result::Result<i32, PsdError> { Ok(i32::from_be_bytes(self.read_array()?)) }
    fn read_u64(&mut self) -> std::result::Result<u64, PsdError> { Ok(u64::from_be_bytes(self.read_array()?)) }
    fn skip(&mut self, len: usize) -> std::result::Result<(), PsdError> { self.read_bytes(len).map(|_| ()) }
    fn read_length(&mut self, version: u16) -> std::result::Result<u64, PsdError> {
        if version == 1 { Ok(self.read_u32()? as u64) } else { self.read_u64() }
    }

    pub fn parse(&mut self) -> std::result::Result<ParsedPsd, PsdError> {
        let header = self.parse_header()?;
        let color_mode_data_len = self.read_u32()? as usize;
        self.skip(color_mode_data_len)?;
        let image_resources_len = self.read_u32()? as usize;
        self.skip(image_resources_len)?;
        let layers = self.parse_layers(&header)?;
        let composite = self.parse_composite(&header)?;
        Ok(ParsedPsd { header, layers, composite })
    }

    pub fn parse_header(&mut self) -> std::result::Result<PsdHeader, PsdError> {
        if &self.read_array::<4>()? != SIGNATURE { return Err(PsdError::InvalidSignature); }
        let version = self.read_u16()?;
        if version != 1 && version != 2 { return Err(PsdError::UnsupportedVersion); }
        self.skip(6)?;
        let channels = self.read_u16()?;
        let height = self.read_u32()?;
        let width = self.read_u32()?;
        let depth = self.read_u16()?;
        let color_mode = ColorMode::from_u16(self.read_u16()?).ok_or(PsdError::UnsupportedColorMode)?;
        if depth != 8 && depth != 16 { return Err(PsdError::UnsupportedDepth); }
        Ok(PsdHeader { version, channels, height, width, depth, color_mode })
    }

    fn parse_layers(&mut self, header: &PsdHeader) -> std::result::Result<Vec<ParsedLayer>, PsdError> {
        let section_len = self.read_length(header.version)? as usize;
        if section_len == 0 { return Ok(Vec::new()); }
        let section_end = self.cursor + section_len;
        let layer_info_len = self.read_length(header.version)?;
        if layer_info_len == 0 { self.cursor = section_end; return Ok(Vec::new()); }
        let layer_count = self.read_i16()?.unsigned_abs() as usize;

        let mut layers = Vec::with_capacity(layer_count);
        for _ in 0..layer_count {
            layers.push(self.parse_layer_record(header)?);
        }
        for layer in &mut layers {
            for &(id, len) in &layer.channel_info {
                let (width, height) = match (&layer.mask_info, id) {
                    (Some(m), CHANNEL_USER_MASK) => ((m.right - m.left).max(0) as u32, (m.bottom - m.top).max(0) as u32),
                    _ => (layer.width(), layer.height()),
                };
                let data = self.read_channel_data(width, height, len, header.depth)?;
                layer.channels.insert(id, data);
            }
        }
        if self.cursor > section_end { return Err(PsdError::InvalidLayerData); }
        self.cursor = section_end;
        Ok(layers)
    }

    fn parse_layer_record(&mut self, header: &PsdHeader) -> std::result::Result<ParsedLayer, PsdError> {
        let top = self.read_i32()?;
        let left = self.read_i32()?;
        let bottom = self.read_i32()?;
        let right = self.read_i32()?;
        let channel_count = self.read_u16()?;
        let mut channel_info = Vec::with_capacity(channel_count as usize);
        for _ in 0..channel_count {
            let id = self.read_i16()?;
            let len = self.read_length(header.version)?;
            channel_info.push((id, len));
        }
        if &self.read_array::<4>()? != RESOURCE_SIGNATURE { return Err(PsdError::InvalidLayerData); }
        let blend_key = self.read_array::<4>()?;
        let opacity = self.read_u8()?;
        let clipping = self.read_u8()? > 0;
        let flags = self.read_u8()?;
        self.skip(1)?;

        let extra_data_len = self.read_u32()? as usize;
        let extra_data_end = self.cursor + extra_data_len;
        let mut mask_info = None;
        let mask_data_len = self.read_u32()? as usize;
        if mask_data_len >= 18 {
            let m_top = self.read_i32()?; let m_left = self.read_i32()?; let m_bottom = self.read_i32()?; let m_right = self.read_i32()?;
            let default_color = self.read_u8()?; let m_flags = self.read_u8()?;
            mask_info = Some(PsdMaskInfo { top: m_top, left: m_left, bottom: m_bottom, right: m_right, default_color, flags: m_flags });
            self.skip(mask_data_len - 18)?;
        } else {
            self.skip(mask_data_len)?;
        }
        let blending_ranges_len = self.read_u32()? as usize;
        self.skip(blending_ranges_len)?;
        let name_len = self.read_u8()? as usize;
        let name = String::from_utf8_lossy(self.read_bytes(name_len)?).to_string();
        self.skip((4 - (name_len + 1) % 4) % 4)?;

        let mut solid_color = None;
        while self.cursor + 12 <= extra_data_end {
            let sig = self.read_array::<4>()?;
            if &sig != RESOURCE_SIGNATURE && &sig != b"8B64" { break; }
            let key = self.read_array::<4>()?;
            let len = self.read_u32()? as usize;
            let block = self.read_bytes(len)?;
            match &key {
                b"SoCo" => solid_color = parse_solid_color(block),
                other => debug!(key = %String::from_utf8_lossy(other), len, "skipping additional layer info"),
            }
        }
        if self.cursor > extra_data_end { return Err(PsdError::InvalidLayerData); }
        self.cursor = extra_data_end;

        Ok(ParsedLayer {
            name, top, left, bottom, right, channel_info, channels: HashMap::new(), blend_key, opacity, clipping,
            visible: flags & (1 << 1) == 0, mask_info, solid_color,
        })
    }

    fn read_channel_data(&mut self, width: u32, height: u32, len: u64, depth: u16) -> std::result::Result<Vec<u8>, PsdError> {
        let len = len as usize;
        let pixel_count = width as usize * height as usize;
        if len < 2 || pixel_count == 0 { self.skip(len)?; return Ok(vec![0u8; pixel_count]); }
        let compression = self.read_u16()?;
        let mut data = match compression {
            0 => self.read_bytes(len - 2)?.to_vec(),
            1 => {
                let mut lens = Vec::with_capacity(height as usize);
                for _ in 0..height { lens.push(self.read_u16()? as usize); }
                let mut out = Vec::with_capacity(pixel_count);
                for l in lens { out.extend_from_slice(&decode_rle(self.read_bytes(l)?, width as usize)); }
                out
            }
            2 | 3 => {
                let mut dec = ZlibDecoder::new(self.read_bytes(len - 2)?);
                let mut out = Vec::new();
                dec.read_to_end(&mut out).map_err(|_| PsdError::ZipError)?;
                if compression == 3 && depth == 8 {
                    for row in out.chunks_mut(width as usize) {
                        for x in 1..row.len() { row[x] = row[x].wrapping_add(row[x - 1]); }
                    }
                }
                out
            }
            _ => return Err(PsdError::DecompressionError),
        };
        if depth == 16 { data = data.chunks_exact(2).map(|pair| pair[0]).collect(); }
        data.resize(pixel_count, 0);
        Ok(data)
    }

    fn parse_composite(&mut self, header: &PsdHeader) -> std::result::Result<Vec<Vec<u8>>, PsdError> {
        let pixel_count = header.width as usize * header.height as usize;
        if self.cursor + 2 > self.data.len() {
            warn!("layered file has no composite image data");
            return Ok(Vec::new());
        }
        let bytes_per_sample = if header.depth == 16 { 2 } else { 1 };
        let compression = self.read_u16()?;
        let mut planes = Vec::with_capacity(header.channels as usize);
        match compression {
            0 => {
                for _ in 0..header.channels {
                    let plane = self.read_bytes(pixel_count * bytes_per_sample)?;
                    planes.push(if bytes_per_sample == 2 { plane.chunks_exact(2).map(|p| p[0]).collect() } else { plane.to_vec() });
                }
            }
            1 => {
                let rows = header.height as usize * header.channels as usize;
                let mut lens = Vec::with_capacity(rows);
                for _ in 0..rows { lens.push(self.read_u16()? as usize); }
                for rows in lens.chunks(header.height.max(1) as usize) {
                    let mut out = Vec::with_capacity(pixel_count);
                    for &l in rows { out.extend_from_slice(&decode_rle(self.read_bytes(l)?, header.width as usize)); }
                    planes.push(out);
                }
            }
            _ => return Err(PsdError::DecompressionError),
        }
        Ok(planes)
    }
}
