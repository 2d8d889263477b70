//! Search highlighting: query compilation, match rectangles over the text
//! layer, scroll-into-view, and term highlighting of result lines.

pub mod highlight;
pub mod query;
pub mod rich_text;
pub mod scroll;

pub use highlight::{
    compute_match_rects, HighlightElement, HighlightId, HighlightLayer, HighlightUpdate, MatchRect,
};
pub use query::{query_terms, QueryMode, SearchPattern};
pub use rich_text::{Inline, RichLine};
pub use scroll::{scroll_into_view, ScrollCommand, ScrollMetrics, ScrollTarget};
