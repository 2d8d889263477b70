pub mod geometry;
pub mod transform;
pub mod window;

pub use geometry::{Point, Rect, Size, SourceBox};
pub use transform::ScaleTransform;
pub use window::{
    compute_window, estimate_row_height, RowMetrics, VirtualList, VirtualRow, VisibleWindow,
};

/// One-based page number clamped into `1..=page_count`.
pub fn clamp_page(page: u32, page_count: u32) -> u32 {
    if page_count == 0 {
        return 1;
    }

    page.clamp(1, page_count)
}

pub fn next_page(current: u32, page_count: u32) -> u32 {
    clamp_page(current.saturating_add(1), page_count)
}

pub fn previous_page(current: u32, page_count: u32) -> u32 {
    clamp_page(current.saturating_sub(1), page_count)
}
