//! Page data model and the wire formats it is decoded from
//!
//! Text layout and link annotations arrive as JSON produced by an extractor
//! running against the source document. Both are decoded leniently: missing
//! optional fields default, unusable entries are dropped, and geometry is
//! left as-is for the overlay layers to clamp or skip.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use viewer_core::{Size, SourceBox};

/// One-based physical page number
pub type PageNumber = u32;

/// Opaque handle to a decoded raster owned by a page surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
    Retrying,
}

/// Raw image bytes plus the natural resolution probed from them
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPayload {
    pub bytes: Arc<[u8]>,
    pub natural: Size,
}

impl RasterPayload {
    pub fn new(bytes: impl Into<Arc<[u8]>>, natural: Size) -> Self {
        Self {
            bytes: bytes.into(),
            natural,
        }
    }
}

/// A page image held by exactly one page surface
#[derive(Debug, Clone, PartialEq)]
pub struct PageRaster {
    pub page_number: PageNumber,
    pub resource: ResourceHandle,
    pub payload: RasterPayload,
    pub rendered: Size,
    pub load_state: LoadState,
}

impl PageRaster {
    pub fn natural(&self) -> Size {
        self.payload.natural
    }
}

/// Font style bits as emitted by the text extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFlags(pub u32);

impl StyleFlags {
    const ITALIC: u32 = 1 << 1;
    const BOLD: u32 = 1 << 4;

    pub fn is_bold(self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn is_italic(self) -> bool {
        self.0 & Self::ITALIC != 0
    }
}

/// Position of a span inside the extractor's block / line hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpanKey {
    pub block: u32,
    pub line: u32,
    pub span: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub key: SpanKey,
    pub text: String,
    pub bbox: SourceBox,
    pub font_size: f32,
    pub font: String,
    pub flags: StyleFlags,
}

/// Extracted text geometry for one page, in source layout units
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub page_number: PageNumber,
    pub source_width: f32,
    pub source_height: f32,
    /// Reading order
    pub spans: Vec<Span>,
}

impl TextLayout {
    pub fn source_size(&self) -> Size {
        Size::new(self.source_width, self.source_height)
    }

    pub fn from_json(page_number: PageNumber, json: &str) -> Result<Self, serde_json::Error> {
        let wire: TextLayoutWire = serde_json::from_str(json)?;
        Ok(Self::from_wire(page_number, wire))
    }

    pub fn from_wire(page_number: PageNumber, wire: TextLayoutWire) -> Self {
        let mut spans = Vec::new();

        for (block_index, block) in wire.blocks.into_iter().enumerate() {
            for (line_index, line) in block.lines.into_iter().enumerate() {
                for (span_index, span) in line.spans.into_iter().enumerate() {
                    spans.push(Span {
                        key: SpanKey {
                            block: block_index as u32,
                            line: line_index as u32,
                            span: span_index as u32,
                        },
                        text: span.text,
                        bbox: span.bbox,
                        font_size: span.size,
                        font: span.font,
                        flags: span.flags,
                    });
                }
            }
        }

        Self {
            page_number: wire.page.unwrap_or(page_number),
            source_width: wire.width,
            source_height: wire.height,
            spans,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextLayoutWire {
    #[serde(default)]
    pub page: Option<PageNumber>,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub blocks: Vec<BlockWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockWire {
    #[serde(default)]
    pub lines: Vec<LineWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineWire {
    #[serde(default)]
    pub spans: Vec<SpanWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpanWire {
    #[serde(default)]
    pub text: String,
    pub bbox: SourceBox,
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub flags: StyleFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum LinkTarget {
    External(String),
    InternalPage(PageNumber),
    /// Named destination; resolving it to a page is the host's job.
    InternalDest(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    pub rect: SourceBox,
    pub target: LinkTarget,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinksWire {
    #[serde(default)]
    pub links: Vec<LinkWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkWire {
    pub rect: SourceBox,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub page: Option<f64>,
    #[serde(default)]
    pub dest: Option<String>,
}

impl LinkWire {
    /// Web URIs win, then a positive page, then a named destination, then
    /// any other URI scheme. Entries with none of these are ignored.
    pub fn classify(&self) -> Option<LinkTarget> {
        let uri = self.uri.as_deref().map(str::trim);
        let uri = uri.filter(|uri| !uri.is_empty());

        if let Some(uri) = uri.filter(|uri| is_web_uri(uri)) {
            return Some(LinkTarget::External(uri.to_owned()));
        }

        if let Some(page) = self.page.filter(|page| page.is_finite() && *page >= 1.0) {
            return Some(LinkTarget::InternalPage(page as PageNumber));
        }

        if let Some(dest) = self.dest.as_deref().filter(|dest| !dest.is_empty()) {
            return Some(LinkTarget::InternalDest(dest.to_owned()));
        }

        uri.map(|uri| LinkTarget::External(uri.to_owned()))
    }
}

fn is_web_uri(uri: &str) -> bool {
    let lower = uri.get(..8).unwrap_or(uri).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn links_from_wire(wire: LinksWire) -> Vec<LinkAnnotation> {
    wire.links
        .into_iter()
        .filter_map(|link| {
            let target = link.classify()?;
            Some(LinkAnnotation {
                rect: link.rect,
                target,
            })
        })
        .collect()
}

pub fn links_from_json(json: &str) -> Result<Vec<LinkAnnotation>, serde_json::Error> {
    let wire: LinksWire = serde_json::from_str(json)?;
    Ok(links_from_wire(wire))
}

/// Page sizes offered for paging through search results
pub const SEARCH_PAGE_SIZES: [u32; 5] = [25, 50, 100, 200, 500];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    /// One-based results page
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            page_size: 50,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub page: PageNumber,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default, alias = "totalResults")]
    pub total_results: u64,
    #[serde(default = "one", alias = "totalPages")]
    pub total_pages: u32,
}

fn one() -> u32 {
    1
}

impl SearchResponse {
    pub fn has_previous(&self, current_page: u32) -> bool {
        current_page > 1
    }

    pub fn has_next(&self, current_page: u32) -> bool {
        current_page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub total_pages: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub page: PageNumber,
    #[serde(default)]
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    /// Depth-first `(depth, bookmark)` pairs, parents before children.
    pub fn flatten(bookmarks: &[Bookmark]) -> Vec<(usize, &Bookmark)> {
        fn walk<'a>(nodes: &'a [Bookmark], depth: usize, out: &mut Vec<(usize, &'a Bookmark)>) {
            for node in nodes {
                out.push((depth, node));
                walk(&node.children, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(bookmarks, 0, &mut out);
        out
    }

    pub fn find<'a>(bookmarks: &'a [Bookmark], title: &str) -> Option<&'a Bookmark> {
        Self::flatten(bookmarks)
            .into_iter()
            .map(|(_, bookmark)| bookmark)
            .find(|b| b.title == title)
    }
}
