//! Continuous scroll: many pages in one virtualized list
//!
//! Rasters are preloaded in bounded batches. Rows start out with an
//! estimated height and switch to the measured height of their surface once
//! it settles. Only rows inside the window (plus overscan) are mounted.

use crate::config::ViewerConfig;
use crate::model::{PageNumber, RasterPayload};
use crate::source::RasterSource;
use scanview_scheduler::{load_in_batches, BatchConfig, CancellationToken};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use viewer_core::VirtualList;

/// Reported after every settled batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    pub loaded: usize,
    pub settled: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed_pages: Vec<PageNumber>,
    pub cancelled: bool,
}

/// A mounted row, positioned in list coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub page_number: PageNumber,
    pub header: String,
    pub top: f32,
    pub height: f32,
    pub measured: bool,
    pub has_raster: bool,
}

/// Rows that entered or left the window since the last update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowChange {
    pub entered: Vec<PageNumber>,
    pub left: Vec<PageNumber>,
}

pub struct ContinuousView {
    list: VirtualList,
    batch: BatchConfig,
    measured_padding: f32,
    overscan: usize,
    rasters: BTreeMap<PageNumber, RasterPayload>,
    failed: Vec<PageNumber>,
    mounted: BTreeSet<PageNumber>,
}

impl ContinuousView {
    pub fn new(page_count: u32, container_width: f32, config: &ViewerConfig) -> Self {
        Self {
            list: VirtualList::new(1..=page_count, config.row_metrics(container_width)),
            batch: config.batch_config(),
            measured_padding: config.measured_padding,
            overscan: config.overscan,
            rasters: BTreeMap::new(),
            failed: Vec::new(),
            mounted: BTreeSet::new(),
        }
    }

    pub fn list(&self) -> &VirtualList {
        &self.list
    }

    pub fn raster(&self, page: PageNumber) -> Option<&RasterPayload> {
        self.rasters.get(&page)
    }

    pub fn failed_pages(&self) -> &[PageNumber] {
        &self.failed
    }

    pub fn mounted(&self) -> impl Iterator<Item = PageNumber> + '_ {
        self.mounted.iter().copied()
    }

    /// Fetches every page raster in batches, reporting after each batch.
    ///
    /// Loaded rasters are kept even if the load is cancelled part way.
    pub fn preload<S, P>(
        &mut self,
        source: &S,
        token: &CancellationToken,
        mut on_progress: P,
    ) -> LoadReport
    where
        S: RasterSource + Sync,
        P: FnMut(LoadProgress),
    {
        let pages: Vec<PageNumber> = self.list.rows().iter().map(|row| row.page_number).collect();
        let timeout = self.batch.retry.timeout;
        let rasters = &mut self.rasters;
        let mut loaded = 0;

        let outcome = load_in_batches(
            &pages,
            &self.batch,
            token,
            |page| source.fetch_raster(page, timeout),
            |progress, batch| {
                for (page, payload) in batch {
                    rasters.insert(*page, payload.clone());
                }
                loaded += batch.len();
                on_progress(LoadProgress {
                    loaded,
                    settled: progress.completed,
                    total: progress.total,
                });
            },
        );

        self.failed = outcome.failed.clone();
        let loaded = outcome.loaded.len();
        if outcome.cancelled {
            log::debug!("continuous preload cancelled after {loaded} page(s)");
        } else {
            let failed = outcome.failed.len();
            log::info!("continuous preload done: {loaded} loaded, {failed} failed");
        }

        LoadReport {
            loaded,
            failed_pages: outcome.failed,
            cancelled: outcome.cancelled,
        }
    }

    /// Stores a raster fetched outside of [`ContinuousView::preload`], such
    /// as a manual refresh of a failed page.
    pub fn insert_raster(&mut self, page: PageNumber, payload: RasterPayload) {
        self.failed.retain(|failed| *failed != page);
        self.rasters.insert(page, payload);
    }

    /// Records the settled height of a page surface. Returns `true` if the
    /// list layout was invalidated.
    pub fn report_surface_height(&mut self, page: PageNumber, surface_height: f32) -> bool {
        let height = surface_height + self.measured_padding;
        self.list.report_measured_height(page, height)
    }

    pub fn set_container_width(&mut self, width: f32) -> bool {
        self.list.set_container_width(width)
    }

    pub fn total_height(&mut self) -> f32 {
        self.list.total_height()
    }

    pub fn current_page(&mut self, scroll_offset: f32, viewport_height: f32) -> Option<PageNumber> {
        self.list.current_page(scroll_offset, viewport_height)
    }

    pub fn scroll_offset_for(&mut self, page: PageNumber) -> Option<f32> {
        self.list.offset_of(page)
    }

    /// Rows to render for the given scroll position.
    pub fn visible_rows(&mut self, scroll_offset: f32, viewport_height: f32) -> Vec<RowView> {
        let overscan = self.overscan;
        let window = self.list.window(scroll_offset, viewport_height, overscan);

        window
            .range
            .clone()
            .zip(window.offsets.iter().copied())
            .filter_map(|(index, top)| {
                let row = self.list.row(index)?;
                Some(RowView {
                    page_number: row.page_number,
                    header: format!("Page {}", row.page_number),
                    top,
                    height: row.height(),
                    measured: row.is_measured(),
                    has_raster: self.rasters.contains_key(&row.page_number),
                })
            })
            .collect()
    }

    /// Recomputes the mounted set. Pages that left must have their surfaces
    /// torn down; pages that entered need one.
    pub fn update_window(&mut self, scroll_offset: f32, viewport_height: f32) -> WindowChange {
        let now_visible: BTreeSet<PageNumber> = self
            .visible_rows(scroll_offset, viewport_height)
            .into_iter()
            .map(|row| row.page_number)
            .collect();

        let mounted = &self.mounted;
        let change = WindowChange {
            entered: now_visible.difference(mounted).copied().collect(),
            left: mounted.difference(&now_visible).copied().collect(),
        };

        self.mounted = now_visible;
        change
    }
}
