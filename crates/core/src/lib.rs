//! Scanview Core Library
//!
//! Page surfaces and overlay layers for viewing scanned documents.
//!
//! A page is shown as a raster with three layers kept aligned over it:
//! selectable text, clickable links and search highlights. All of them are
//! projected through one [`viewer_core::ScaleTransform`] derived from the
//! page's source layout size and its measured rendered size.

pub mod clipboard;
pub mod config;
pub mod continuous;
pub mod error;
pub mod link_layer;
pub mod measure;
pub mod model;
pub mod page_view;
pub mod search;
pub mod selection;
pub mod source;
pub mod surface;
pub mod text_layer;

pub use clipboard::{ClipboardSink, MemoryClipboard, SystemClipboard};
pub use config::ViewerConfig;
pub use continuous::{ContinuousView, LoadProgress, LoadReport, RowView, WindowChange};
pub use error::{ClipboardError, ConfigError, FetchError, FetchResult};
pub use link_layer::{build_link_regions, LinkLayer, LinkRegion, NavigationHost};
pub use measure::{FixedProbe, LayoutProbe, NaturalFitProbe};
pub use model::{
    Bookmark, DocumentInfo, LinkAnnotation, LinkTarget, LoadState, PageNumber, PageRaster,
    RasterPayload, ResourceHandle, SearchHit, SearchRequest, SearchResponse, Span, SpanKey,
    StyleFlags, TextLayout, SEARCH_PAGE_SIZES,
};
pub use page_view::{Generation, MetadataRequest, PageView, ScrollContext, ViewEffect};
pub use search::{HighlightLayer, HighlightUpdate, RichLine, SearchPattern};
pub use selection::{
    Key, SelectionCapture, SelectionEnd, SelectionRouter, SelectionState, SurfaceId,
};
pub use source::{LinkSource, PageSource, RasterSource, SearchSource, TextLayoutSource};
pub use surface::{LayoutState, PageSurface, RasterRequest, SurfaceEffect, SurfaceState, Ticket};
pub use text_layer::{build_text_nodes, TextLayer, TextNode};
pub use viewer_core::{Point, Rect, ScaleTransform, Size, SourceBox};
