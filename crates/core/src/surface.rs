//! Page surface controller
//!
//! One [`PageSurface`] owns the raster of the page it is showing. It is a
//! sans-IO state machine: it never fetches or sleeps itself. Instead it
//! returns [`SurfaceEffect`]s for the host to carry out, accepts fetch results
//! tagged with the ticket of the request they answer, and advances its
//! timers when the host calls [`PageSurface::poll`].
//!
//! ```text
//! Idle -> Loading -> Ready <-> Resizing
//!            |
//!            +-> Retrying -> Ready
//!                   |
//!                   +-> Failed -- refresh --> Loading
//! ```
//!
//! Every request carries a fresh ticket and cancellation token. Responses
//! whose ticket is not the one in flight are stale and are dropped.

use crate::config::ViewerConfig;
use crate::error::FetchError;
use crate::measure::{self, LayoutProbe};
use crate::model::{LoadState, PageNumber, PageRaster, RasterPayload, ResourceHandle};
use scanview_scheduler::{CancellationToken, RetryPolicy, TimerQueue};
use serde::Serialize;
use std::time::Duration;
use viewer_core::Size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    Idle,
    Loading,
    Ready,
    Resizing,
    Retrying,
    Failed,
}

/// Identifies one raster request
pub type Ticket = u64;

/// A raster fetch the host should perform
#[derive(Debug, Clone)]
pub struct RasterRequest {
    pub page: PageNumber,
    pub ticket: Ticket,
    pub attempt: u32,
    pub timeout: Duration,
    pub token: CancellationToken,
}

#[derive(Debug, Clone)]
pub enum SurfaceEffect {
    FetchRaster(RasterRequest),
    /// The host may free whatever backs this handle.
    ReleaseRaster(ResourceHandle),
    /// The rendered size changed; overlays must re-project.
    Publish(Size),
    /// Retries are exhausted. The surface stays `Failed` until refreshed.
    Failed { page: PageNumber, error: FetchError },
}

/// Layout inputs a renderer needs, with no hidden patch state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutState {
    /// Natural size fitted to the width cap, used until a measurement exists
    pub estimated_size: Option<Size>,
    pub measured_size: Option<Size>,
    /// Measurement passes or a resize settle are still pending
    pub is_stabilizing: bool,
}

impl LayoutState {
    /// Size to reserve for the page: measured when known, estimated otherwise.
    pub fn display_size(&self) -> Option<Size> {
        self.measured_size.or(self.estimated_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceTimer {
    Retry,
    Measure { pass: usize },
    ResizeSettle,
    FetchTimeout { ticket: Ticket },
}

impl SurfaceTimer {
    fn is_measure(&self) -> bool {
        matches!(self, SurfaceTimer::Measure { .. })
    }
}

#[derive(Debug, Clone)]
struct SurfaceSettings {
    retry: RetryPolicy,
    measure_delays: Vec<Duration>,
    resize_settle: Duration,
    min_plausible_fraction: f32,
    max_page_width: f32,
}

impl From<&ViewerConfig> for SurfaceSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            measure_delays: config.measure_delays(),
            resize_settle: config.resize_settle(),
            min_plausible_fraction: config.min_plausible_fraction,
            max_page_width: config.max_page_width,
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: Ticket,
    token: CancellationToken,
}

pub struct PageSurface {
    settings: SurfaceSettings,
    state: SurfaceState,
    page: Option<PageNumber>,
    attempts: u32,
    next_ticket: Ticket,
    next_handle: u64,
    in_flight: Option<InFlight>,
    raster: Option<PageRaster>,
    samples: Vec<Size>,
    layout: LayoutState,
    last_error: Option<FetchError>,
    timers: TimerQueue<SurfaceTimer>,
}

impl PageSurface {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            settings: SurfaceSettings::from(config),
            state: SurfaceState::Idle,
            page: None,
            attempts: 0,
            next_ticket: 1,
            next_handle: 1,
            in_flight: None,
            raster: None,
            samples: Vec::new(),
            layout: LayoutState::default(),
            last_error: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn page(&self) -> Option<PageNumber> {
        self.page
    }

    pub fn raster(&self) -> Option<&PageRaster> {
        self.raster.as_ref()
    }

    pub fn layout(&self) -> LayoutState {
        self.layout
    }

    /// Rendered size overlays should project to. `None` until measured.
    pub fn rendered_size(&self) -> Option<Size> {
        self.layout.measured_size
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn load_state(&self) -> Option<LoadState> {
        match self.state {
            SurfaceState::Idle => None,
            SurfaceState::Loading => Some(LoadState::Loading),
            SurfaceState::Ready | SurfaceState::Resizing => Some(LoadState::Ready),
            SurfaceState::Retrying => Some(LoadState::Retrying),
            SurfaceState::Failed => Some(LoadState::Failed),
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// When the host should next call [`PageSurface::poll`]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Show `page`, tearing down whatever was shown before.
    pub fn activate(&mut self, page: PageNumber, now: Duration) -> Vec<SurfaceEffect> {
        let mut effects = self.deactivate();

        log::debug!("page {page}: loading");
        self.page = Some(page);
        self.attempts = 0;
        self.state = SurfaceState::Loading;
        effects.push(self.start_fetch(now));
        effects
    }

    /// Manual refresh, typically offered once the surface has failed.
    pub fn refresh(&mut self, now: Duration) -> Vec<SurfaceEffect> {
        match self.page {
            Some(page) => self.activate(page, now),
            None => Vec::new(),
        }
    }

    /// Cancel in-flight work, drop pending timers and release the raster.
    pub fn deactivate(&mut self) -> Vec<SurfaceEffect> {
        let mut effects = Vec::new();

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }

        let dropped = self.timers.clear();
        if dropped > 0 {
            log::trace!("dropped {dropped} pending surface timer(s)");
        }

        if let Some(raster) = self.raster.take() {
            effects.push(SurfaceEffect::ReleaseRaster(raster.resource));
        }

        self.page = None;
        self.state = SurfaceState::Idle;
        self.samples.clear();
        self.layout = LayoutState::default();
        self.last_error = None;
        effects
    }

    pub fn on_raster_loaded(
        &mut self,
        ticket: Ticket,
        payload: RasterPayload,
        now: Duration,
    ) -> Vec<SurfaceEffect> {
        let Some(in_flight) = self.take_in_flight(ticket) else {
            return Vec::new();
        };
        if in_flight.token.is_cancelled() {
            log::debug!("raster ticket {ticket}: response after cancellation, discarded");
            return Vec::new();
        }

        let Some(page) = self.page else {
            return Vec::new();
        };

        self.cancel_fetch_timeout(ticket);

        let handle = ResourceHandle(self.next_handle);
        self.next_handle += 1;

        let natural = payload.natural;
        let max_width = self.settings.max_page_width;
        let estimated = natural.is_known().then(|| natural.fit_width(max_width));
        self.raster = Some(PageRaster {
            page_number: page,
            resource: handle,
            payload,
            rendered: Size::default(),
            load_state: LoadState::Ready,
        });

        let attempts = self.attempts;
        log::debug!("page {page}: raster ready after {attempts} attempt(s)");
        self.state = SurfaceState::Ready;
        self.last_error = None;
        self.samples.clear();
        self.layout = LayoutState {
            estimated_size: estimated,
            measured_size: None,
            is_stabilizing: true,
        };
        self.schedule_measurements(now);
        Vec::new()
    }

    pub fn on_raster_failed(
        &mut self,
        ticket: Ticket,
        error: FetchError,
        now: Duration,
    ) -> Vec<SurfaceEffect> {
        let Some(in_flight) = self.take_in_flight(ticket) else {
            return Vec::new();
        };
        if error.is_cancelled() || in_flight.token.is_cancelled() {
            log::debug!("raster ticket {ticket}: cancelled");
            return Vec::new();
        }

        self.cancel_fetch_timeout(ticket);
        self.handle_failure(error, now)
    }

    /// Record a viewport resize. Re-measurement happens once resizing settles.
    ///
    /// Samples and passes left over from the load are dropped; they describe
    /// the old container width.
    pub fn on_resize(&mut self, now: Duration) {
        if !matches!(self.state, SurfaceState::Ready | SurfaceState::Resizing) {
            return;
        }

        self.samples.clear();
        self.timers.cancel_where(SurfaceTimer::is_measure);
        let settle = self.settings.resize_settle;
        self.reschedule(now, settle, SurfaceTimer::ResizeSettle);
        self.state = SurfaceState::Resizing;
        self.layout.is_stabilizing = true;
    }

    /// Fire every timer due at `now`.
    pub fn poll(&mut self, now: Duration, probe: &dyn LayoutProbe) -> Vec<SurfaceEffect> {
        let mut effects = Vec::new();

        for (_, timer) in self.timers.drain_due(now) {
            match timer {
                SurfaceTimer::Retry => {
                    if self.state == SurfaceState::Retrying {
                        effects.push(self.start_fetch(now));
                    }
                }
                SurfaceTimer::FetchTimeout { ticket } => {
                    if let Some(in_flight) = self.take_in_flight(ticket) {
                        in_flight.token.cancel();
                        let error = FetchError::Timeout(self.settings.retry.timeout);
                        effects.extend(self.handle_failure(error, now));
                    }
                }
                SurfaceTimer::Measure { pass } => {
                    effects.extend(self.measure_pass(pass, probe));
                }
                SurfaceTimer::ResizeSettle => {
                    effects.extend(self.settle_resize(probe));
                }
            }
        }

        effects
    }

    fn start_fetch(&mut self, now: Duration) -> SurfaceEffect {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.attempts += 1;

        let token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            token: token.clone(),
        });
        let timeout = self.settings.retry.timeout;
        let timer = SurfaceTimer::FetchTimeout { ticket };
        self.timers.schedule(now, timeout, timer);

        SurfaceEffect::FetchRaster(RasterRequest {
            page: self.page.unwrap_or_default(),
            ticket,
            attempt: self.attempts,
            timeout,
            token,
        })
    }

    fn take_in_flight(&mut self, ticket: Ticket) -> Option<InFlight> {
        match &self.in_flight {
            Some(in_flight) if in_flight.ticket == ticket => self.in_flight.take(),
            _ => {
                log::debug!("raster ticket {ticket}: stale response discarded");
                None
            }
        }
    }

    fn cancel_fetch_timeout(&mut self, ticket: Ticket) {
        let timeout = SurfaceTimer::FetchTimeout { ticket };
        self.timers.cancel_where(|timer| *timer == timeout);
    }

    /// Replaces any pending copy of `timer`.
    fn reschedule(&mut self, now: Duration, delay: Duration, timer: SurfaceTimer) {
        self.timers.cancel_where(|pending| *pending == timer);
        self.timers.schedule(now, delay, timer);
    }

    fn handle_failure(&mut self, error: FetchError, now: Duration) -> Vec<SurfaceEffect> {
        let page = self.page.unwrap_or_default();
        let attempts = self.attempts;

        if self.settings.retry.allows_retry(attempts) {
            log::info!("page {page}: attempt {attempts} failed ({error}), retrying");
            self.state = SurfaceState::Retrying;
            let backoff = self.settings.retry.backoff;
            self.reschedule(now, backoff, SurfaceTimer::Retry);
            return Vec::new();
        }

        log::warn!("page {page}: giving up after {attempts} attempt(s): {error}");
        self.state = SurfaceState::Failed;
        self.last_error = Some(error.clone());
        vec![SurfaceEffect::Failed { page, error }]
    }

    fn schedule_measurements(&mut self, now: Duration) {
        self.timers.cancel_where(SurfaceTimer::is_measure);
        for (pass, delay) in self.settings.measure_delays.iter().enumerate() {
            let timer = SurfaceTimer::Measure { pass };
            self.timers.schedule(now, *delay, timer);
        }

        if self.settings.measure_delays.is_empty() {
            let only = SurfaceTimer::Measure { pass: 0 };
            self.timers.schedule(now, Duration::ZERO, only);
        }
    }

    fn natural(&self) -> Size {
        self.raster
            .as_ref()
            .map(PageRaster::natural)
            .unwrap_or_default()
    }

    fn measure_pass(&mut self, pass: usize, probe: &dyn LayoutProbe) -> Vec<SurfaceEffect> {
        if self.raster.is_none() {
            return Vec::new();
        }

        let natural = self.natural();
        let container_width = probe.container_width();
        let fraction = self.settings.min_plausible_fraction;
        if let Some(sample) = probe.rendered_size() {
            self.samples.push(sample);
        }

        let last_pass = pass + 1 >= self.settings.measure_delays.len();
        let candidate = if last_pass {
            measure::settle(&self.samples, natural, container_width, fraction)
        } else {
            measure::largest_plausible(&self.samples, natural, container_width, fraction)
        };

        if last_pass {
            self.samples.clear();
            if self.state != SurfaceState::Resizing {
                self.layout.is_stabilizing = false;
            }
        }

        self.publish(candidate)
    }

    fn settle_resize(&mut self, probe: &dyn LayoutProbe) -> Vec<SurfaceEffect> {
        if self.state != SurfaceState::Resizing {
            return Vec::new();
        }

        let natural = self.natural();
        let container_width = probe.container_width();
        let fraction = self.settings.min_plausible_fraction;
        let samples: Vec<Size> = probe.rendered_size().into_iter().collect();
        let size = measure::settle(&samples, natural, container_width, fraction);

        self.state = SurfaceState::Ready;
        let measuring = self.timers.pending().any(SurfaceTimer::is_measure);
        self.layout.is_stabilizing = measuring;
        self.publish(size)
    }

    fn publish(&mut self, size: Option<Size>) -> Vec<SurfaceEffect> {
        let Some(size) = size else {
            return Vec::new();
        };
        if self.layout.measured_size == Some(size) {
            return Vec::new();
        }

        self.layout.measured_size = Some(size);
        if let Some(raster) = self.raster.as_mut() {
            raster.rendered = size;
        }

        log::trace!("rendered size now {}x{}", size.width, size.height);
        vec![SurfaceEffect::Publish(size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::FixedProbe;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn payload() -> RasterPayload {
        RasterPayload::new(vec![0u8; 4], Size::new(1224.0, 1584.0))
    }

    fn rendered_at(width: f32) -> FixedProbe {
        FixedProbe {
            rendered: Some(Size::new(width, width * 1584.0 / 1224.0)),
            container_width: 900.0,
        }
    }

    fn fetch_ticket(effects: &[SurfaceEffect]) -> Ticket {
        effects
            .iter()
            .find_map(|effect| match effect {
                SurfaceEffect::FetchRaster(request) => Some(request.ticket),
                _ => None,
            })
            .expect("a fetch request")
    }

    fn published(effects: &[SurfaceEffect]) -> Option<Size> {
        effects.iter().find_map(|effect| match effect {
            SurfaceEffect::Publish(size) => Some(*size),
            _ => None,
        })
    }

    #[test]
    fn test_two_failures_then_success_ends_ready() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(7, ms(0)));

        surface.on_raster_failed(ticket, FetchError::Status(502), ms(100));
        assert_eq!(surface.state(), SurfaceState::Retrying);
        assert_eq!(surface.pending_timers(), 1);

        let retry = surface.poll(ms(1100), &rendered_at(900.0));
        let ticket = fetch_ticket(&retry);
        surface.on_raster_failed(ticket, FetchError::Transport("reset".into()), ms(1200));
        assert_eq!(surface.state(), SurfaceState::Retrying);

        let retry = surface.poll(ms(2200), &rendered_at(900.0));
        let ticket = fetch_ticket(&retry);
        surface.on_raster_loaded(ticket, payload(), ms(2300));

        assert_eq!(surface.state(), SurfaceState::Ready);
        assert_eq!(surface.attempts(), 3);
        assert!(surface.last_error().is_none());
        // Only the measurement passes remain.
        assert_eq!(surface.pending_timers(), 3);
        assert!(surface.timers.pending().all(SurfaceTimer::is_measure));
    }

    #[test]
    fn test_exhausted_retries_fail_terminally() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let mut ticket = fetch_ticket(&surface.activate(2, ms(0)));
        let mut now = 0;

        for _ in 0..2 {
            surface.on_raster_failed(ticket, FetchError::Status(500), ms(now));
            now += 1000;
            ticket = fetch_ticket(&surface.poll(ms(now), &rendered_at(900.0)));
        }

        let effects = surface.on_raster_failed(ticket, FetchError::Status(500), ms(now));

        assert_eq!(surface.state(), SurfaceState::Failed);
        assert_eq!(surface.load_state(), Some(LoadState::Failed));
        assert_eq!(surface.last_error(), Some(&FetchError::Status(500)));
        assert!(matches!(effects.as_slice(), [SurfaceEffect::Failed { page: 2, .. }]));
        assert_eq!(surface.pending_timers(), 0);

        // Nothing fires on its own afterwards.
        let later = surface.poll(ms(now + 60_000), &rendered_at(900.0));
        assert!(later.is_empty());

        let refreshed = surface.refresh(ms(now + 60_000));
        fetch_ticket(&refreshed);
        assert_eq!(surface.state(), SurfaceState::Loading);
        assert_eq!(surface.attempts(), 1);
    }

    #[test]
    fn test_timeout_counts_as_failed_attempt() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));

        assert!(surface.poll(ms(9_999), &rendered_at(900.0)).is_empty());
        surface.poll(ms(10_000), &rendered_at(900.0));

        assert_eq!(surface.state(), SurfaceState::Retrying);

        // The late response belongs to the timed-out request.
        surface.on_raster_loaded(ticket, payload(), ms(10_500));
        assert_eq!(surface.state(), SurfaceState::Retrying);
    }

    #[test]
    fn test_replacing_page_discards_stale_response() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let first = surface.activate(1, ms(0));
        let old_ticket = fetch_ticket(&first);
        let old_token = match &first[0] {
            SurfaceEffect::FetchRaster(request) => request.token.clone(),
            _ => unreachable!(),
        };

        let second = surface.activate(2, ms(50));
        let new_ticket = fetch_ticket(&second);

        assert!(old_token.is_cancelled());
        let stale = surface.on_raster_loaded(old_ticket, payload(), ms(60));
        assert!(stale.is_empty());
        assert_eq!(surface.state(), SurfaceState::Loading);
        assert!(surface.raster().is_none());

        surface.on_raster_loaded(new_ticket, payload(), ms(70));
        assert_eq!(surface.raster().map(|r| r.page_number), Some(2));
    }

    #[test]
    fn test_pending_retry_is_cancelled_on_navigation() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_failed(ticket, FetchError::Status(503), ms(10));

        let effects = surface.activate(5, ms(20));

        // One fetch for page 5 and no retry for page 1 later on.
        let fetches = effects
            .iter()
            .filter(|e| matches!(e, SurfaceEffect::FetchRaster(_)))
            .count();
        assert_eq!(fetches, 1);
        assert!(surface.poll(ms(5_000), &rendered_at(900.0)).is_empty());
    }

    #[test]
    fn test_measurement_adopts_largest_plausible_sample() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_loaded(ticket, payload(), ms(0));
        assert!(surface.layout().is_stabilizing);
        let estimated = surface.layout().estimated_size;
        assert_eq!(estimated.map(|s| s.width), Some(900.0));

        // Decode not finished yet: tiny transient size.
        let first = surface.poll(ms(80), &rendered_at(30.0));
        assert!(published(&first).is_none());
        assert!(surface.rendered_size().is_none());

        let second = surface.poll(ms(240), &rendered_at(900.0));
        assert_eq!(published(&second).map(|s| s.width), Some(900.0));

        // A later, smaller reading does not replace the settled size.
        let third = surface.poll(ms(600), &rendered_at(700.0));
        assert!(published(&third).is_none());
        assert_eq!(surface.rendered_size().map(|s| s.width), Some(900.0));
        assert!(!surface.layout().is_stabilizing);
    }

    #[test]
    fn test_measurement_falls_back_to_natural_size() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_loaded(ticket, payload(), ms(0));
        let stuck = FixedProbe {
            rendered: Some(Size::new(12.0, 16.0)),
            container_width: 600.0,
        };

        surface.poll(ms(80), &stuck);
        surface.poll(ms(240), &stuck);
        let last = surface.poll(ms(600), &stuck);

        let size = published(&last).expect("fallback published");
        assert_eq!(size.width, 600.0);
        assert!((size.height - 776.47).abs() < 0.05);
    }

    #[test]
    fn test_resize_remeasures_once_settled() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_loaded(ticket, payload(), ms(0));
        surface.poll(ms(600), &rendered_at(900.0));

        surface.on_resize(ms(1000));
        surface.on_resize(ms(1040));
        assert_eq!(surface.state(), SurfaceState::Resizing);
        assert_eq!(surface.pending_timers(), 1);

        let narrow = FixedProbe {
            rendered: Some(Size::new(500.0, 647.0)),
            container_width: 500.0,
        };
        assert!(surface.poll(ms(1100), &narrow).is_empty());
        let effects = surface.poll(ms(1120), &narrow);

        assert_eq!(published(&effects), Some(Size::new(500.0, 647.0)));
        assert_eq!(surface.state(), SurfaceState::Ready);
        assert!(!surface.layout().is_stabilizing);
    }

    #[test]
    fn test_resize_during_measurement_keeps_new_size() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_loaded(ticket, payload(), ms(0));

        let first = surface.poll(ms(80), &rendered_at(900.0));
        assert_eq!(published(&first).map(|s| s.width), Some(900.0));

        surface.on_resize(ms(100));
        assert_eq!(surface.pending_timers(), 1);
        let settle = SurfaceTimer::ResizeSettle;
        assert!(surface.timers.pending().all(|timer| *timer == settle));

        let narrow = FixedProbe {
            rendered: Some(Size::new(500.0, 647.0)),
            container_width: 500.0,
        };
        let settled = surface.poll(ms(180), &narrow);
        assert_eq!(published(&settled), Some(Size::new(500.0, 647.0)));
        assert!(!surface.layout().is_stabilizing);

        assert!(surface.poll(ms(240), &narrow).is_empty());
        assert!(surface.poll(ms(600), &narrow).is_empty());
        assert_eq!(surface.rendered_size(), Some(Size::new(500.0, 647.0)));
        assert_eq!(surface.pending_timers(), 0);
    }

    #[test]
    fn test_deactivate_releases_raster() {
        let mut surface = PageSurface::new(&ViewerConfig::default());
        let ticket = fetch_ticket(&surface.activate(1, ms(0)));
        surface.on_raster_loaded(ticket, payload(), ms(0));
        let handle = surface.raster().map(|r| r.resource).unwrap();

        let effects = surface.deactivate();

        assert!(matches!(effects.as_slice(), [SurfaceEffect::ReleaseRaster(h)] if *h == handle));
        assert_eq!(surface.state(), SurfaceState::Idle);
        assert_eq!(surface.pending_timers(), 0);
    }
}
