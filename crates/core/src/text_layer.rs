//! Invisible selectable text layer
//!
//! Every non-blank span of a page's [`TextLayout`] becomes one text node
//! positioned over the raster. The nodes are transparent; they exist so that
//! the browser-style selection and copy machinery of the host picks up the
//! page text in reading order.

use crate::model::{SpanKey, TextLayout};
use serde::Serialize;
use viewer_core::{Rect, ScaleTransform, Size};

/// Colour alpha applied to overlay text so it never shows over the scan.
pub const TEXT_ALPHA: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    pub key: SpanKey,
    pub text: String,
    pub rect: Rect,
    pub font_size: f32,
    pub line_height: f32,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub alpha: f32,
}

/// Projects `layout` onto a surface of `surface` pixels.
///
/// Returns nothing while `transform` is not positionable.
pub fn build_text_nodes(
    layout: &TextLayout,
    transform: &ScaleTransform,
    surface: Size,
    min_font_px: f32,
) -> Vec<TextNode> {
    if !transform.is_positionable() {
        return Vec::new();
    }

    let bounds = Rect::from_size(surface);
    let (source_width, source_height) = (layout.source_width, layout.source_height);
    let mut nodes = Vec::with_capacity(layout.spans.len());

    for span in &layout.spans {
        if span.text.trim().is_empty() {
            continue;
        }

        let Some(bbox) = span.bbox.clamp_to(source_width, source_height) else {
            log::trace!("span {:?} has no area inside the page, skipped", span.key);
            continue;
        };

        let rect = transform.project(&bbox);
        if !rect.intersects(&bounds) {
            continue;
        }

        let font_size = if span.font_size.is_finite() {
            span.font_size
        } else {
            0.0
        };
        nodes.push(TextNode {
            key: span.key,
            text: span.text.clone(),
            rect,
            font_size: (font_size * transform.scale_y).max(min_font_px),
            line_height: rect.height,
            font_family: span.font.clone(),
            bold: span.flags.is_bold(),
            italic: span.flags.is_italic(),
            alpha: TEXT_ALPHA,
        });
    }

    nodes
}

/// Current text nodes of one page surface.
#[derive(Debug, Clone, Default)]
pub struct TextLayer {
    layout: Option<TextLayout>,
    transform: ScaleTransform,
    surface: Size,
    min_font_px: f32,
    nodes: Vec<TextNode>,
}

impl TextLayer {
    pub fn new(min_font_px: f32) -> Self {
        Self {
            min_font_px,
            ..Self::default()
        }
    }

    pub fn layout(&self) -> Option<&TextLayout> {
        self.layout.as_ref()
    }

    pub fn nodes(&self) -> &[TextNode] {
        &self.nodes
    }

    pub fn set_layout(&mut self, layout: Option<TextLayout>) {
        self.layout = layout;
        self.rebuild();
    }

    pub fn set_transform(&mut self, transform: ScaleTransform, surface: Size) {
        if self.transform == transform && self.surface == surface {
            return;
        }

        self.transform = transform;
        self.surface = surface;
        self.rebuild();
    }

    pub fn clear(&mut self) {
        self.layout = None;
        self.transform = ScaleTransform::identity();
        self.surface = Size::default();
        self.nodes.clear();
    }

    /// Text of every node, in reading order, one line per node.
    pub fn plain_text(&self) -> String {
        self.nodes
            .iter()
            .map(|node| node.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rebuild(&mut self) {
        self.nodes = match &self.layout {
            Some(layout) => {
                build_text_nodes(layout, &self.transform, self.surface, self.min_font_px)
            }
            None => Vec::new(),
        };
    }
}
