//! JavaScript entry points.
//!
//! Failures come back as `{"error": "..."}` JSON strings; successful calls
//! return a small JSON summary of the stack.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::blends::BlendMode;
use crate::error::Result;
use crate::layer::{Color, Layer};
use crate::stack::{LayerOptions, LayerStack, NodeId};

#[wasm_bindgen]
pub struct Document {
    stack: LayerStack,
}

fn error_json(message: impl std::fmt::Display) -> String {
    json!({ "error": message.to_string() }).to_string()
}

fn decode_payload(encoded: &str) -> Result<Layer> {
    let encoded = encoded.split_once("base64,").map_or(encoded, |(_, data)| data);
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Layer::from_bytes(&bytes)
}

fn parse_options(opacity: f64, mode: Option<String>) -> Result<LayerOptions> {
    let mut options = LayerOptions::default().with_opacity(opacity);
    if let Some(mode) = mode.filter(|m| !m.is_empty()) {
        options = options.with_mode(mode.parse::<BlendMode>()?);
    }
    Ok(options)
}

#[derive(Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
enum Command {
    AppendImage {
        name: String,
        /// Base64 png or jpeg, optionally as a data URL.
        image: String,
        mask: Option<String>,
        #[serde(flatten)]
        options: LayerOptions,
    },
    AppendColor {
        name: String,
        color: [u8; 4],
        mask: Option<String>,
        #[serde(flatten)]
        options: LayerOptions,
    },
}

#[wasm_bindgen]
impl Document {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Document {
        console_error_panic_hook::set_once();
        Document { stack: LayerStack::new(width, height) }
    }

    pub fn width(&self) -> u32 { self.stack.size().0 }
    pub fn height(&self) -> u32 { self.stack.size().1 }
    pub fn layer_count(&self) -> usize { self.stack.len() }

    pub fn append_image(&mut self, name: &str, data: &[u8], opacity: f64, mode: Option<String>) -> String {
        let appended = parse_options(opacity, mode)
            .and_then(|options| Ok((Layer::from_bytes(data)?, options)))
            .and_then(|(layer, options)| self.stack.append(name, layer, None, options));
        self.respond(appended)
    }

    pub fn append_color(&mut self, name: &str, r: u8, g: u8, b: u8, a: u8, opacity: f64, mode: Option<String>) -> String {
        let appended = parse_options(opacity, mode)
            .and_then(|options| self.stack.append(name, Color::with_alpha(r, g, b, a).into(), None, options));
        self.respond(appended)
    }

    /// Run a `{"action": ..., "params": {...}}` command.
    pub fn apply_command(&mut self, cmd_json: &str) -> String {
        let cmd: Command = match serde_json::from_str(cmd_json) {
            Ok(c) => c,
            Err(e) => return error_json(format!("Invalid command: {e}")),
        };
        let appended = match cmd {
            Command::AppendImage { name, image, mask, options } => decode_payload(&image).and_then(|layer| {
                let mask = mask.as_deref().map(decode_payload).transpose()?;
                self.stack.append(name, layer, mask, options)
            }),
            Command::AppendColor { name, color: [r, g, b, a], mask, options } => {
                mask.as_deref().map(decode_payload).transpose().and_then(|mask| {
                    self.stack.append(name, Color::with_alpha(r, g, b, a).into(), mask, options)
                })
            }
        };
        self.respond(appended)
    }

    /// Layered document bytes; empty on failure.
    pub fn export_psd(&self) -> Vec<u8> {
        self.stack.to_bytes().unwrap_or_default()
    }

    pub fn preview_png(&self) -> Vec<u8> {
        self.stack.flatten().to_png().unwrap_or_default()
    }

    pub fn preview_data_url(&self) -> String {
        match self.stack.flatten().to_png() {
            Ok(png) => format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png)),
            Err(e) => error_json(e),
        }
    }
}

impl Document {
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    fn respond(&self, appended: Result<NodeId>) -> String {
        match appended {
            Ok(id) => json!({ "id": id, "layers": self.stack.len() }).to_string(),
            Err(e) => error_json(e),
        }
    }
}
