//! Single-page view: one surface plus its overlay layers
//!
//! [`PageView`] ties a [`PageSurface`] to the text, link, highlight and
//! selection layers drawn over it. Like the surface it performs no I/O;
//! metadata requests come out as [`ViewEffect`]s tagged with a generation so
//! answers for a page that is no longer shown can be recognised and dropped.

use crate::clipboard::ClipboardSink;
use crate::config::ViewerConfig;
use crate::error::{ClipboardError, FetchError, FetchResult};
use crate::link_layer::{LinkLayer, NavigationHost};
use crate::measure::LayoutProbe;
use crate::model::{LinkAnnotation, PageNumber, RasterPayload, TextLayout};
use crate::search::{
    scroll_into_view, HighlightLayer, HighlightUpdate, ScrollCommand, ScrollMetrics,
};
use crate::selection::{Key, SelectionCapture, SelectionEnd, SelectionRouter, SurfaceId};
use crate::source::PageSource;
use crate::surface::{PageSurface, SurfaceEffect, Ticket};
use crate::text_layer::TextLayer;
use scanview_scheduler::CancellationToken;
use std::collections::VecDeque;
use std::time::Duration;
use viewer_core::{Point, ScaleTransform};

pub type Generation = u64;

/// A text layout or link fetch the host should perform
#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub page: PageNumber,
    pub generation: Generation,
    pub token: CancellationToken,
}

#[derive(Debug, Clone)]
pub enum ViewEffect {
    Surface(SurfaceEffect),
    FetchTextLayout(MetadataRequest),
    FetchLinks(MetadataRequest),
    Highlights(HighlightUpdate),
    Scroll(ScrollCommand),
}

/// Scroll containers around the surface, nearest first, plus the viewport.
#[derive(Debug, Clone, Default)]
pub struct ScrollContext {
    pub ancestors: Vec<ScrollMetrics>,
    pub viewport: Option<ScrollMetrics>,
}

pub struct PageView {
    id: SurfaceId,
    scroll_margin: f32,
    surface: PageSurface,
    generation: Generation,
    metadata_token: CancellationToken,
    transform: ScaleTransform,
    text: TextLayer,
    links: LinkLayer,
    highlights: HighlightLayer,
    selection: SelectionCapture,
}

impl PageView {
    /// Creates a view and registers it for selection events.
    pub fn mount(config: &ViewerConfig, router: &mut SelectionRouter) -> Self {
        let id = router.subscribe();
        Self {
            id,
            scroll_margin: config.scroll_margin,
            surface: PageSurface::new(config),
            generation: 0,
            metadata_token: CancellationToken::new(),
            transform: ScaleTransform::identity(),
            text: TextLayer::new(config.min_font_px),
            links: LinkLayer::new(),
            highlights: HighlightLayer::new(config.highlight_debounce()),
            selection: SelectionCapture::new(id, config.copied_ack()),
        }
    }

    /// Tears the view down and deregisters it.
    pub fn unmount(mut self, router: &mut SelectionRouter) -> Vec<ViewEffect> {
        let effects = self.teardown();
        router.unsubscribe(self.id);
        effects
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn page(&self) -> Option<PageNumber> {
        self.surface.page()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn surface(&self) -> &PageSurface {
        &self.surface
    }

    pub fn transform(&self) -> ScaleTransform {
        self.transform
    }

    pub fn text_layer(&self) -> &TextLayer {
        &self.text
    }

    pub fn link_layer(&self) -> &LinkLayer {
        &self.links
    }

    pub fn highlights(&self) -> &HighlightLayer {
        &self.highlights
    }

    pub fn selection(&self) -> &SelectionCapture {
        &self.selection
    }

    pub fn show_page(&mut self, page: PageNumber, now: Duration) -> Vec<ViewEffect> {
        let mut effects = self.teardown();
        let activated = self.surface.activate(page, now);
        effects.extend(activated.into_iter().map(ViewEffect::Surface));

        let request = MetadataRequest {
            page,
            generation: self.generation,
            token: self.metadata_token.clone(),
        };
        effects.push(ViewEffect::FetchTextLayout(request.clone()));
        effects.push(ViewEffect::FetchLinks(request));
        effects
    }

    pub fn refresh(&mut self, now: Duration) -> Vec<ViewEffect> {
        match self.surface.page() {
            Some(page) => self.show_page(page, now),
            None => Vec::new(),
        }
    }

    pub fn on_raster_loaded(
        &mut self,
        ticket: Ticket,
        payload: RasterPayload,
        now: Duration,
    ) -> Vec<ViewEffect> {
        let effects = self.surface.on_raster_loaded(ticket, payload, now);
        self.absorb(effects, now)
    }

    pub fn on_raster_failed(
        &mut self,
        ticket: Ticket,
        error: FetchError,
        now: Duration,
    ) -> Vec<ViewEffect> {
        let effects = self.surface.on_raster_failed(ticket, error, now);
        self.absorb(effects, now)
    }

    /// Text layout answer. Failures leave the page without selectable text.
    pub fn on_text_layout(
        &mut self,
        generation: Generation,
        result: FetchResult<TextLayout>,
        now: Duration,
    ) {
        if !self.is_current(generation) {
            return;
        }

        match result {
            Ok(layout) => {
                self.links.set_source_size(Some(layout.source_size()));
                self.text.set_layout(Some(layout));
                self.update_transform(now);
            }
            Err(error) if error.is_cancelled() => {}
            Err(error) => log::debug!("page {:?}: no text layer ({error})", self.page()),
        }
    }

    /// Link annotations answer. Failures leave the page without link regions.
    pub fn on_links(&mut self, generation: Generation, result: FetchResult<Vec<LinkAnnotation>>) {
        if !self.is_current(generation) {
            return;
        }

        match result {
            Ok(links) => self.links.set_links(links),
            Err(error) if error.is_cancelled() => {}
            Err(error) => log::debug!("page {:?}: no link layer ({error})", self.page()),
        }
    }

    pub fn on_resize(&mut self, now: Duration) {
        self.surface.on_resize(now);
    }

    pub fn set_query(&mut self, query: &str, now: Duration) {
        self.highlights.set_query(query, now);
    }

    pub fn on_selection_end(&mut self, event: &SelectionEnd, surface_origin: Point) {
        self.selection.on_selection_end(event, surface_origin);
    }

    pub fn on_key(&mut self, key: Key) {
        self.selection.on_key(key);
    }

    pub fn copy_selection(
        &mut self,
        now: Duration,
        clipboard: &mut dyn ClipboardSink,
    ) -> Result<bool, ClipboardError> {
        self.selection.copy(now, clipboard)
    }

    /// Routes a click to the link layer. `false` means click-through.
    pub fn click(&self, point: Point, host: &mut dyn NavigationHost) -> bool {
        self.links.activate(point, host)
    }

    /// Advance every timer due at `now`.
    pub fn poll(
        &mut self,
        now: Duration,
        probe: &dyn LayoutProbe,
        scroll: &ScrollContext,
    ) -> Vec<ViewEffect> {
        let surface_effects = self.surface.poll(now, probe);
        let mut effects = self.absorb(surface_effects, now);

        let update = self.highlights.poll(now, self.text.nodes());
        if let Some(update) = update.filter(|u| !u.retired.is_empty() || !u.added.is_empty()) {
            let first = update.first_match();
            effects.push(ViewEffect::Highlights(update));

            if let (Some(rect), Some(viewport)) = (first, scroll.viewport) {
                let margin = self.scroll_margin;
                let command = scroll_into_view(rect, &scroll.ancestors, viewport, margin);
                effects.push(ViewEffect::Scroll(command));
            }
        }

        self.selection.poll(now);
        effects
    }

    /// Earliest time at which [`PageView::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        let deadlines = [
            self.surface.next_deadline(),
            self.highlights.next_deadline(),
            self.selection.next_deadline(),
        ];
        deadlines.into_iter().flatten().min()
    }

    /// Carries out fetch effects against `source` on the calling thread and
    /// feeds the answers back. Effects that are not fetches are returned.
    pub fn execute<S: PageSource>(
        &mut self,
        effects: Vec<ViewEffect>,
        source: &S,
        now: Duration,
    ) -> Vec<ViewEffect> {
        let mut queue: VecDeque<ViewEffect> = effects.into();
        let mut remaining = Vec::new();

        while let Some(effect) = queue.pop_front() {
            match effect {
                ViewEffect::Surface(SurfaceEffect::FetchRaster(request)) => {
                    let result = source.fetch_raster(request.page, request.timeout);
                    let follow_up = match result {
                        Ok(payload) => self.on_raster_loaded(request.ticket, payload, now),
                        Err(error) => self.on_raster_failed(request.ticket, error, now),
                    };
                    queue.extend(follow_up);
                }
                ViewEffect::FetchTextLayout(request) => {
                    if !request.token.is_cancelled() {
                        let result = source.fetch_text_layout(request.page);
                        self.on_text_layout(request.generation, result, now);
                    }
                }
                ViewEffect::FetchLinks(request) => {
                    if !request.token.is_cancelled() {
                        let result = source.fetch_links(request.page);
                        self.on_links(request.generation, result);
                    }
                }
                other => remaining.push(other),
            }
        }

        remaining
    }

    fn is_current(&self, generation: Generation) -> bool {
        if generation == self.generation && !self.metadata_token.is_cancelled() {
            return true;
        }

        log::debug!("metadata for generation {generation} arrived after navigation, discarded");
        false
    }

    fn teardown(&mut self) -> Vec<ViewEffect> {
        self.metadata_token.cancel();
        self.metadata_token = CancellationToken::new();
        self.generation += 1;

        let released = self.surface.deactivate();
        let mut effects: Vec<ViewEffect> = released.into_iter().map(ViewEffect::Surface).collect();

        let retired = self.highlights.clear();
        if !retired.is_empty() {
            effects.push(ViewEffect::Highlights(HighlightUpdate {
                retired,
                added: Vec::new(),
            }));
        }

        self.transform = ScaleTransform::identity();
        self.text.clear();
        self.links.clear();
        self.selection.clear();
        effects
    }

    fn absorb(&mut self, effects: Vec<SurfaceEffect>, now: Duration) -> Vec<ViewEffect> {
        let published = effects
            .iter()
            .any(|effect| matches!(effect, SurfaceEffect::Publish(_)));
        if published {
            self.update_transform(now);
        }

        effects.into_iter().map(ViewEffect::Surface).collect()
    }

    fn update_transform(&mut self, now: Duration) {
        let source = self
            .text
            .layout()
            .map(TextLayout::source_size)
            .unwrap_or_default();
        let rendered = self.surface.rendered_size().unwrap_or_default();
        let transform = ScaleTransform::compute(source, rendered);

        self.transform = transform;
        self.text.set_transform(transform, rendered);
        self.links.set_transform(transform, rendered);
        self.highlights.invalidate(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::FixedProbe;
    use crate::model::{LinkTarget, Span, SpanKey, StyleFlags};
    use crate::search::ScrollTarget;
    use crate::source::{LinkSource, RasterSource, TextLayoutSource};
    use crate::surface::SurfaceState;
    use std::cell::Cell;
    use viewer_core::{Size, SourceBox};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    struct FakeSource {
        raster_failures: Cell<u32>,
        text_fails: bool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                raster_failures: Cell::new(0),
                text_fails: false,
            }
        }

        fn without_text() -> Self {
            Self {
                text_fails: true,
                ..Self::new()
            }
        }
    }

    impl RasterSource for FakeSource {
        fn fetch_raster(
            &self,
            _page: PageNumber,
            _timeout: Duration,
        ) -> FetchResult<RasterPayload> {
            if self.raster_failures.get() > 0 {
                self.raster_failures.set(self.raster_failures.get() - 1);
                return Err(FetchError::Status(503));
            }
            Ok(RasterPayload::new(vec![1u8, 2, 3], Size::new(1224.0, 1584.0)))
        }
    }

    impl TextLayoutSource for FakeSource {
        fn fetch_text_layout(&self, page: PageNumber) -> FetchResult<TextLayout> {
            if self.text_fails {
                return Err(FetchError::Transport("refused".into()));
            }
            Ok(TextLayout {
                page_number: page,
                source_width: 1224.0,
                source_height: 1584.0,
                spans: vec![Span {
                    key: SpanKey {
                        block: 0,
                        line: 0,
                        span: 0,
                    },
                    text: "a person of note".into(),
                    bbox: SourceBox::new(100.0, 200.0, 300.0, 220.0),
                    font_size: 12.0,
                    font: "Times".into(),
                    flags: StyleFlags::default(),
                }],
            })
        }
    }

    impl LinkSource for FakeSource {
        fn fetch_links(&self, _page: PageNumber) -> FetchResult<Vec<LinkAnnotation>> {
            Ok(vec![LinkAnnotation {
                rect: SourceBox::new(0.0, 0.0, 122.4, 158.4),
                target: LinkTarget::InternalPage(9),
            }])
        }
    }

    fn full_width() -> FixedProbe {
        FixedProbe {
            rendered: Some(Size::new(900.0, 900.0 * 1584.0 / 1224.0)),
            container_width: 900.0,
        }
    }

    fn scroll() -> ScrollContext {
        let viewport = ScrollMetrics {
            scroll_top: 0.0,
            client_height: 800.0,
            scroll_height: 2000.0,
            surface_offset: 300.0,
        };
        ScrollContext {
            ancestors: Vec::new(),
            viewport: Some(viewport),
        }
    }

    fn loaded_view(source: &FakeSource) -> (PageView, SelectionRouter) {
        let mut router = SelectionRouter::new();
        let mut view = PageView::mount(&ViewerConfig::default(), &mut router);
        let effects = view.show_page(3, ms(0));
        view.execute(effects, source, ms(0));
        (view, router)
    }

    #[test]
    fn overlays_appear_once_the_page_is_measured() {
        let source = FakeSource::new();
        let (mut view, _router) = loaded_view(&source);

        assert_eq!(view.surface().state(), SurfaceState::Ready);
        assert!(view.text_layer().nodes().is_empty());

        view.poll(ms(600), &full_width(), &scroll());

        assert!(view.transform().is_positionable());
        assert!((view.transform().scale_x - 0.7353).abs() < 1e-3);
        assert_eq!(view.text_layer().nodes().len(), 1);
        assert_eq!(view.link_layer().regions().len(), 1);
    }

    #[test]
    fn retries_are_driven_through_the_view() {
        let source = FakeSource::new();
        source.raster_failures.set(2);
        let (mut view, _router) = loaded_view(&source);
        assert_eq!(view.surface().state(), SurfaceState::Retrying);

        let effects = view.poll(ms(1000), &full_width(), &scroll());
        view.execute(effects, &source, ms(1000));
        let effects = view.poll(ms(2000), &full_width(), &scroll());
        view.execute(effects, &source, ms(2000));

        assert_eq!(view.surface().state(), SurfaceState::Ready);
        assert!(view.surface().last_error().is_none());
    }

    #[test]
    fn text_failure_degrades_silently() {
        let source = FakeSource::without_text();
        let (mut view, _router) = loaded_view(&source);

        view.poll(ms(600), &full_width(), &scroll());

        assert_eq!(view.surface().state(), SurfaceState::Ready);
        assert!(view.text_layer().nodes().is_empty());
        assert!(!view.transform().is_positionable());
    }

    #[test]
    fn links_are_hidden_without_a_text_layout() {
        let source = FakeSource::without_text();
        let (mut view, _router) = loaded_view(&source);

        view.poll(ms(600), &full_width(), &scroll());

        // The link annotations arrived, but their source size comes from the text layout.
        let rendered = view.surface().rendered_size();
        assert_eq!(rendered.map(|s| s.width), Some(900.0));
        assert!(view.link_layer().regions().is_empty());
    }

    #[test]
    fn resize_reprojects_text_and_links() {
        let source = FakeSource::new();
        let (mut view, _router) = loaded_view(&source);
        view.poll(ms(600), &full_width(), &scroll());
        let wide = &view.link_layer().regions()[0];
        assert!((wide.rect.width - 90.0).abs() < 0.01);

        view.on_resize(ms(1000));
        let narrow = FixedProbe {
            rendered: Some(Size::new(450.0, 450.0 * 1584.0 / 1224.0)),
            container_width: 450.0,
        };
        view.poll(ms(1080), &narrow, &scroll());

        let scale = 450.0 / 1224.0;
        assert!((view.transform().scale_x - scale).abs() < 1e-4);
        assert!((view.transform().scale_y - scale).abs() < 1e-4);

        let node = &view.text_layer().nodes()[0];
        assert!((node.rect.x - 100.0 * scale).abs() < 0.01);
        assert!((node.rect.y - 200.0 * scale).abs() < 0.01);
        assert!((node.rect.width - 200.0 * scale).abs() < 0.01);

        let region = &view.link_layer().regions()[0];
        assert!((region.rect.width - 45.0).abs() < 0.01);
        assert!((region.rect.height - 158.4 * scale).abs() < 0.01);
    }

    #[test]
    fn query_highlights_and_scrolls_to_first_match() {
        let source = FakeSource::new();
        let (mut view, _router) = loaded_view(&source);
        view.poll(ms(600), &full_width(), &scroll());

        view.set_query("person", ms(700));
        let effects = view.poll(ms(880), &full_width(), &scroll());

        let update = effects.iter().find_map(|e| match e {
            ViewEffect::Highlights(update) => Some(update.clone()),
            _ => None,
        });
        let update = update.expect("highlight update");
        assert_eq!(update.added.len(), 1);

        let command = effects.iter().find_map(|e| match e {
            ViewEffect::Scroll(command) => Some(*command),
            _ => None,
        });
        let command = command.expect("scroll command");
        assert_eq!(command.target, ScrollTarget::Viewport);
        // 300 + 147.06 - 0.18 * 800
        assert!((command.top - 303.06).abs() < 0.1);
    }

    #[test]
    fn late_metadata_for_previous_page_is_dropped() {
        let source = FakeSource::new();
        let mut router = SelectionRouter::new();
        let mut view = PageView::mount(&ViewerConfig::default(), &mut router);

        view.show_page(1, ms(0));
        let old_generation = view.generation();
        view.show_page(2, ms(10));

        view.on_text_layout(old_generation, source.fetch_text_layout(1), ms(20));

        assert!(view.text_layer().layout().is_none());
    }

    #[test]
    fn unmount_releases_and_unsubscribes() {
        let source = FakeSource::new();
        let (view, mut router) = loaded_view(&source);
        let id = view.id();

        let effects = view.unmount(&mut router);

        let released = effects
            .iter()
            .any(|e| matches!(e, ViewEffect::Surface(SurfaceEffect::ReleaseRaster(_))));
        assert!(released);
        assert!(!router.is_subscribed(id));
    }
}
