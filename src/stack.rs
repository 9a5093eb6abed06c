//! Layer stacks that remember how they were built.
//!
//! Each append composites the new layer onto the current top and records the
//! inputs (name, source layer, mask, opacity, mode, clipping) so the stack
//! can later be written out as a layered document. Nodes live in an arena
//! and point at their parent by index; the root "Background" node has none.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blends::{self, BlendMode};
use crate::error::Result;
use crate::layer::{Layer, Rgba};
use crate::psd::{self, PsdDocument};

/// Handle of a node inside one [`LayerStack`].
pub type NodeId = usize;

pub const BACKGROUND_NAME: &str = "Background";

/// Opacity limited to `[0, 1]`; NaN counts as fully transparent.
fn unit_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

/// Per-append settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOptions {
    /// Layer opacity (0.0 = invisible, 1.0 = fully applied).
    pub opacity: f64,
    /// Blend mode; `None` pastes the layer's color as-is.
    pub mode: Option<BlendMode>,
    /// Clip the layer to the one below in the layered document.
    pub clipped: bool,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self { opacity: 1.0, mode: None, clipped: false }
    }
}

impl LayerOptions {
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = unit_opacity(opacity);
        self
    }

    pub fn with_mode(mut self, mode: BlendMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn clipped(mut self, clipped: bool) -> Self {
        self.clipped = clipped;
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    source: Layer,
    mask: Option<Layer>,
    opacity: u8,
    mode: Option<BlendMode>,
    clipped: bool,
    parent: Option<NodeId>,
    composite: Layer,
}

/// Borrowed view of one recorded append, oldest first when iterated.
#[derive(Debug, Clone, Copy)]
pub struct StackEntry<'a> {
    pub name: &'a str,
    pub layer: &'a Layer,
    pub mask: Option<&'a Layer>,
    pub opacity: u8,
    pub mode: Option<BlendMode>,
    pub clipped: bool,
}

#[derive(Debug, Clone)]
pub struct LayerStack {
    width: u32,
    height: u32,
    nodes: Vec<Node>,
    head: NodeId,
}

impl LayerStack {
    /// A stack holding only an opaque black background.
    pub fn new(width: u32, height: u32) -> Self {
        let black = Layer::Bitmap(Rgba::filled(width, height, [0.0, 0.0, 0.0, 1.0]));
        let root = Node {
            name: BACKGROUND_NAME.to_string(),
            source: black.clone(),
            mask: None,
            opacity: 0xFF,
            mode: None,
            clipped: false,
            parent: None,
            composite: black,
        };
        LayerStack { width, height, nodes: vec![root], head: 0 }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of recorded entries, background included.
    pub fn len(&self) -> usize {
        self.entry_ids().len()
    }

    /// Always false: the background entry cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Composite `other` onto the top of the stack and record it.
    ///
    /// On error the stack is left untouched.
    pub fn append(&mut self, name: impl Into<String>, other: Layer, mask: Option<Layer>, options: LayerOptions) -> Result<NodeId> {
        let name = name.into();
        let opacity = unit_opacity(options.opacity);
        let composite = blends::blend(self.flatten(), &other, mask.as_ref(), opacity, options.mode)?;

        let id = self.nodes.len();
        self.nodes.push(Node {
            name,
            source: other,
            mask,
            opacity: (opacity * 255.0) as u8,
            mode: options.mode,
            clipped: options.clipped,
            parent: Some(self.head),
            composite,
        });
        self.head = id;
        debug!(id, name = %self.nodes[id].name, opacity, mode = ?options.mode, "appended layer");
        Ok(id)
    }

    /// The fully composited top of the stack.
    pub fn flatten(&self) -> &Layer {
        &self.nodes[self.head].composite
    }

    /// Composited layer as of a given node.
    pub fn composite_at(&self, id: NodeId) -> Option<&Layer> {
        self.nodes.get(id).map(|node| &node.composite)
    }

    /// Node ids from the root to the head, following parent links.
    fn entry_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.nodes[id].parent;
        }
        ids.reverse();
        ids
    }

    /// Recorded appends, oldest (the background) first.
    pub fn entries(&self) -> impl Iterator<Item = StackEntry<'_>> + '_ {
        self.entry_ids().into_iter().map(move |id| {
            let node = &self.nodes[id];
            StackEntry {
                name: &node.name,
                layer: &node.source,
                mask: node.mask.as_ref(),
                opacity: node.opacity,
                mode: node.mode,
                clipped: node.clipped,
            }
        })
    }

    /// Build the layered document for this stack.
    pub fn to_document(&self) -> PsdDocument {
        psd::document_from_stack(self)
    }

    /// Write the layered document to `sink`.
    pub fn serialize<W: Write>(&self, mut sink: W) -> Result<()> {
        let bytes = self.to_bytes()?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_document().to_bytes()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.serialize(BufWriter::new(File::create(path)?))
    }
}
