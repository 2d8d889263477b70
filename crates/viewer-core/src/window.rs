//! Windowed rendering for continuous scroll.
//!
//! [`compute_window`] is the pure calculator; [`VirtualList`] owns the per-row
//! height estimates and measurements and keeps a prefix-offset cache that is
//! invalidated from the first row whose height changed.

use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleWindow {
    /// Row indices to render, end exclusive.
    pub range: Range<usize>,
    /// Top offset of every row in `range`, in the same order.
    pub offsets: Vec<f32>,
    pub total_height: f32,
}

impl VisibleWindow {
    fn empty() -> Self {
        Self {
            range: 0..0,
            offsets: Vec::new(),
            total_height: 0.0,
        }
    }
}

/// Computes which rows intersect `[scroll_offset, scroll_offset + viewport_height]`,
/// widened by `overscan` rows on each side.
pub fn compute_window(
    scroll_offset: f32,
    viewport_height: f32,
    heights: &[f32],
    overscan: usize,
) -> VisibleWindow {
    let offsets = prefix_offsets(heights);
    window_from_offsets(scroll_offset, viewport_height, &offsets, overscan)
}

fn prefix_offsets(heights: &[f32]) -> Vec<f32> {
    let mut offsets = Vec::with_capacity(heights.len() + 1);
    let mut cursor = 0.0;
    offsets.push(cursor);

    for height in heights {
        cursor += height.max(0.0);
        offsets.push(cursor);
    }

    offsets
}

/// `offsets` holds `n + 1` cumulative entries for `n` rows.
fn window_from_offsets(
    scroll_offset: f32,
    viewport_height: f32,
    offsets: &[f32],
    overscan: usize,
) -> VisibleWindow {
    let row_count = offsets.len().saturating_sub(1);
    if row_count == 0 {
        return VisibleWindow::empty();
    }

    let total_height = offsets[row_count];
    let top = scroll_offset.clamp(0.0, total_height);
    let bottom = (scroll_offset + viewport_height.max(0.0)).clamp(0.0, total_height);

    let first = row_at(top, offsets);
    let last = if bottom > top {
        row_ending_at(bottom, offsets).max(first)
    } else {
        first
    };

    let start = first.saturating_sub(overscan);
    let end = (last + 1 + overscan).min(row_count);

    VisibleWindow {
        range: start..end,
        offsets: offsets[start..end].to_vec(),
        total_height,
    }
}

/// Index of the row containing `offset`; a row owns `[top, bottom)`.
fn row_at(offset: f32, offsets: &[f32]) -> usize {
    let row_count = offsets.len() - 1;
    let position = offsets[1..].partition_point(|bottom| *bottom <= offset);
    position.min(row_count - 1)
}

/// Index of the last row that starts above `offset`, so a viewport bottom on a
/// row boundary does not pull in the row below it.
fn row_ending_at(offset: f32, offsets: &[f32]) -> usize {
    let row_count = offsets.len() - 1;
    let position = offsets[1..].partition_point(|bottom| *bottom < offset);
    position.min(row_count - 1)
}

/// Height estimate for a row that has not been measured yet.
pub fn estimate_row_height(
    container_width: f32,
    max_width: f32,
    aspect_ratio: f32,
    padding: f32,
) -> f32 {
    (container_width.min(max_width).max(0.0) * aspect_ratio).round() + padding
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowMetrics {
    pub container_width: f32,
    pub max_width: f32,
    /// Height divided by width.
    pub aspect_ratio: f32,
    pub padding: f32,
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self {
            container_width: 960.0,
            max_width: 900.0,
            aspect_ratio: 1584.0 / 1224.0,
            padding: 80.0,
        }
    }
}

impl RowMetrics {
    pub fn estimate(&self) -> f32 {
        estimate_row_height(
            self.container_width,
            self.max_width,
            self.aspect_ratio,
            self.padding,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualRow {
    pub page_number: u32,
    pub estimated_height: f32,
    pub measured_height: Option<f32>,
}

impl VirtualRow {
    pub fn height(&self) -> f32 {
        self.measured_height.unwrap_or(self.estimated_height)
    }

    pub fn is_measured(&self) -> bool {
        self.measured_height.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct VirtualList {
    rows: Vec<VirtualRow>,
    index_by_page: HashMap<u32, usize>,
    metrics: RowMetrics,
    offsets: Vec<f32>,
    /// Number of leading entries of `offsets` that are still correct.
    valid_offsets: usize,
    invalidations: u64,
}

impl VirtualList {
    pub fn new(pages: impl IntoIterator<Item = u32>, metrics: RowMetrics) -> Self {
        let estimate = metrics.estimate();
        let rows: Vec<VirtualRow> = pages
            .into_iter()
            .map(|page_number| VirtualRow {
                page_number,
                estimated_height: estimate,
                measured_height: None,
            })
            .collect();
        let index_by_page = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.page_number, index))
            .collect();

        Self {
            rows,
            index_by_page,
            metrics,
            offsets: Vec::new(),
            valid_offsets: 0,
            invalidations: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[VirtualRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&VirtualRow> {
        self.rows.get(index)
    }

    pub fn index_of(&self, page_number: u32) -> Option<usize> {
        self.index_by_page.get(&page_number).copied()
    }

    pub fn metrics(&self) -> RowMetrics {
        self.metrics
    }

    /// Number of times the offset cache was invalidated by a height change.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }

    /// Records the real height of a page's row.
    ///
    /// Returns `true` when the cache was invalidated. Reporting the height a
    /// row already has is a no-op, which keeps measure → layout → measure
    /// cycles from looping.
    pub fn report_measured_height(&mut self, page_number: u32, height: f32) -> bool {
        if !height.is_finite() || height <= 0.0 {
            return false;
        }

        let Some(index) = self.index_of(page_number) else {
            return false;
        };

        let height = height.round();
        let row = &mut self.rows[index];
        if row.measured_height == Some(height) {
            return false;
        }

        row.measured_height = Some(height);
        self.invalidate_from(index);
        true
    }

    /// Re-estimates unmeasured rows for a new container width.
    ///
    /// Measured rows keep their measurement.
    pub fn set_container_width(&mut self, container_width: f32) -> bool {
        if self.metrics.container_width == container_width {
            return false;
        }

        self.metrics.container_width = container_width;
        let estimate = self.metrics.estimate();
        let mut first_changed = None;

        for (index, row) in self.rows.iter_mut().enumerate() {
            if row.estimated_height != estimate {
                row.estimated_height = estimate;
                if !row.is_measured() && first_changed.is_none() {
                    first_changed = Some(index);
                }
            }
        }

        match first_changed {
            Some(index) => {
                self.invalidate_from(index);
                true
            }
            None => false,
        }
    }

    fn invalidate_from(&mut self, index: usize) {
        // offsets[i] is the top of row i, so the top of `index` itself stays valid.
        self.valid_offsets = self.valid_offsets.min(index + 1);
        self.invalidations += 1;
    }

    fn ensure_offsets(&mut self) {
        let needed = self.rows.len() + 1;
        if self.valid_offsets == needed && self.offsets.len() == needed {
            return;
        }

        self.offsets.truncate(self.valid_offsets.max(1));
        if self.offsets.is_empty() {
            self.offsets.push(0.0);
        }

        while self.offsets.len() < needed {
            let index = self.offsets.len() - 1;
            let top = self.offsets[index];
            self.offsets.push(top + self.rows[index].height());
        }

        self.valid_offsets = needed;
    }

    pub fn total_height(&mut self) -> f32 {
        self.ensure_offsets();
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Top offset of the row holding `page_number`, for scroll-to-page.
    pub fn offset_of(&mut self, page_number: u32) -> Option<f32> {
        let index = self.index_of(page_number)?;
        self.ensure_offsets();
        self.offsets.get(index).copied()
    }

    /// Page whose row contains the viewport centre.
    pub fn current_page(&mut self, scroll_offset: f32, viewport_height: f32) -> Option<u32> {
        if self.rows.is_empty() {
            return None;
        }

        self.ensure_offsets();
        let centre = (scroll_offset + viewport_height / 2.0).max(0.0);
        let index = row_at(centre, &self.offsets);
        self.rows.get(index).map(|row| row.page_number)
    }

    pub fn window(
        &mut self,
        scroll_offset: f32,
        viewport_height: f32,
        overscan: usize,
    ) -> VisibleWindow {
        self.ensure_offsets();
        window_from_offsets(scroll_offset, viewport_height, &self.offsets, overscan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(pages: u32) -> VirtualList {
        VirtualList::new(1..=pages, RowMetrics::default())
    }

    #[test]
    fn window_tracks_scroll_position() {
        let heights = vec![1000.0, 1000.0, 1000.0, 1000.0];

        let window = compute_window(1100.0, 800.0, &heights, 0);
        assert_eq!(window.range, 1..2);
        assert_eq!(window.offsets, vec![1000.0]);
        assert_eq!(window.total_height, 4000.0);

        let shifted = compute_window(1500.0, 800.0, &heights, 0);
        assert_eq!(shifted.range, 1..3);
        assert_eq!(shifted.offsets, vec![1000.0, 2000.0]);
    }

    #[test]
    fn overscan_is_bounded_by_the_list() {
        let heights = vec![500.0; 5];
        let window = compute_window(0.0, 400.0, &heights, 2);
        assert_eq!(window.range, 0..3);

        let end = compute_window(10_000.0, 400.0, &heights, 2);
        assert_eq!(end.range, 2..5);
    }

    #[test]
    fn bottom_on_row_boundary_excludes_next_row() {
        let heights = vec![100.0; 4];

        let window = compute_window(0.0, 200.0, &heights, 0);
        assert_eq!(window.range, 0..2);
        assert_eq!(window.offsets, vec![0.0, 100.0]);

        let scrolled = compute_window(100.0, 200.0, &heights, 1);
        assert_eq!(scrolled.range, 0..4);

        let collapsed = compute_window(150.0, 0.0, &heights, 0);
        assert_eq!(collapsed.range, 1..2);
    }

    #[test]
    fn empty_list_has_empty_window() {
        let window = compute_window(0.0, 800.0, &[], 3);
        assert_eq!(window.range, 0..0);
        assert_eq!(window.total_height, 0.0);
    }

    #[test]
    fn estimate_uses_capped_width_and_padding() {
        assert_eq!(
            estimate_row_height(960.0, 900.0, 1584.0 / 1224.0, 80.0),
            1245.0
        );
        assert_eq!(
            estimate_row_height(600.0, 900.0, 1584.0 / 1224.0, 80.0),
            856.0
        );
    }

    #[test]
    fn measured_height_supersedes_estimate() {
        let mut list = list(3);
        let estimate = list.row(0).map(|row| row.height()).unwrap_or_default();

        assert!(list.report_measured_height(2, 700.0));
        assert_eq!(list.row(1).map(|row| row.height()), Some(700.0));
        assert_eq!(list.offset_of(3), Some(estimate + 700.0));
        assert_eq!(list.total_height(), estimate * 2.0 + 700.0);
    }

    #[test]
    fn repeated_report_does_not_invalidate_twice() {
        let mut list = list(4);

        assert!(list.report_measured_height(2, 1210.0));
        assert_eq!(list.invalidation_count(), 1);

        assert!(!list.report_measured_height(2, 1210.0));
        assert_eq!(list.invalidation_count(), 1);

        assert!(list.report_measured_height(2, 1190.0));
        assert_eq!(list.invalidation_count(), 2);
    }

    #[test]
    fn invalid_measurements_are_ignored() {
        let mut list = list(2);

        assert!(!list.report_measured_height(1, 0.0));
        assert!(!list.report_measured_height(1, f32::NAN));
        assert!(!list.report_measured_height(99, 500.0));
        assert_eq!(list.invalidation_count(), 0);
        assert!(!list.row(0).is_some_and(VirtualRow::is_measured));
    }

    #[test]
    fn width_change_never_reverts_measured_rows() {
        let mut list = list(3);
        list.report_measured_height(1, 640.0);

        assert!(list.set_container_width(500.0));
        assert_eq!(list.row(0).map(|row| row.height()), Some(640.0));
        assert_eq!(
            list.row(1).map(|row| row.height()),
            Some(estimate_row_height(500.0, 900.0, 1584.0 / 1224.0, 80.0))
        );
    }

    #[test]
    fn offsets_before_the_changed_row_are_preserved() {
        let mut list = list(5);
        let before = list.offset_of(3);

        list.report_measured_height(4, 300.0);
        assert_eq!(list.offset_of(3), before);
        assert_eq!(
            list.offset_of(4),
            before.map(|top| top + list.metrics().estimate())
        );
    }

    #[test]
    fn current_page_uses_viewport_centre() {
        let mut list = VirtualList::new(
            1..=3,
            RowMetrics {
                container_width: 1000.0,
                max_width: 1000.0,
                aspect_ratio: 1.0,
                padding: 0.0,
            },
        );

        assert_eq!(list.current_page(1200.0, 1000.0), Some(2));
        assert_eq!(list.current_page(0.0, 100.0), Some(1));
    }
}
