//! Renderer collaborator interface
//!
//! Decorations never interpret textures themselves: every region asks the
//! renderer for something to paint with and hands pixmaps back when the
//! region is resized or destroyed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use x11rb::protocol::xproto::Pixmap;

/// Opaque texture descriptor from the style configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    /// Free-form description understood by the renderer ("flat solid", ...)
    pub kind: String,
    /// Base color (0xRRGGBB)
    pub color: u32,
    /// Secondary color for gradients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_to: Option<u32>,
}

impl Texture {
    pub fn solid(color: u32) -> Self {
        Self {
            kind: "flat solid".to_string(),
            color,
            color_to: None,
        }
    }
}

/// What a renderer produced for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    /// Use a pixel value as window background
    Color(u32),
    /// Use a server-side pixmap as window background
    Pixmap(Pixmap),
}

/// Theme / image service used by the decorations
pub trait Renderer {
    /// Produce a background for a region of `size` pixels.
    fn render(&mut self, size: (u32, u32), texture: &Texture) -> Result<Paint>;

    /// Release a pixmap previously returned by `render`.
    fn release(&mut self, pixmap: Pixmap);
}

/// Renderer that paints every texture with its base color.
///
/// Gradients, bevels and images belong to a full theme engine; this one
/// only needs a TrueColor visual.
#[derive(Debug, Default)]
pub struct SolidRenderer;

impl Renderer for SolidRenderer {
    fn render(&mut self, _size: (u32, u32), texture: &Texture) -> Result<Paint> {
        Ok(Paint::Color(texture.color))
    }

    fn release(&mut self, _pixmap: Pixmap) {}
}
