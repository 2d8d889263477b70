//! Text selection capture and the copy affordance
//!
//! Selection and keyboard events are delivered by the host to a
//! [`SelectionRouter`]. Each mounted page surface subscribes on mount and
//! unsubscribes on teardown; there is no process-wide selection state.

use crate::clipboard::ClipboardSink;
use crate::error::ClipboardError;
use scanview_scheduler::TimerQueue;
use serde::Serialize;
use std::time::Duration;
use viewer_core::{Point, Rect};

pub type SurfaceId = u64;

/// Horizontal gap between the selection and the copy button
const AFFORDANCE_GAP: f32 = 8.0;

/// A finished user selection, in viewport coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionEnd {
    /// Surface containing the selection's common ancestor, if any
    pub container: Option<SurfaceId>,
    pub rects: Vec<Rect>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionState {
    /// Relative to the surface's top-left corner
    pub bounding_rect: Rect,
    pub text: String,
    pub copied: bool,
}

#[derive(Debug, Default)]
pub struct SelectionRouter {
    next_id: SurfaceId,
    subscribers: Vec<SurfaceId>,
}

impl SelectionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> SurfaceId {
        self.next_id += 1;
        self.subscribers.push(self.next_id);
        self.next_id
    }

    pub fn unsubscribe(&mut self, id: SurfaceId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| *subscriber != id);
        self.subscribers.len() != before
    }

    /// Surfaces that must see the next selection or key event
    pub fn recipients(&self) -> &[SurfaceId] {
        &self.subscribers
    }

    pub fn is_subscribed(&self, id: SurfaceId) -> bool {
        self.subscribers.contains(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AckExpired;

#[derive(Debug)]
pub struct SelectionCapture {
    surface: SurfaceId,
    copied_ack: Duration,
    state: Option<SelectionState>,
    timers: TimerQueue<AckExpired>,
}

impl SelectionCapture {
    pub fn new(surface: SurfaceId, copied_ack: Duration) -> Self {
        Self {
            surface,
            copied_ack,
            state: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn state(&self) -> Option<&SelectionState> {
        self.state.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// `surface_origin` is the surface's top-left corner in viewport coordinates.
    pub fn on_selection_end(&mut self, event: &SelectionEnd, surface_origin: Point) {
        if event.container != Some(self.surface) || event.text.trim().is_empty() {
            self.clear();
            return;
        }

        let mut rects = event.rects.iter().filter(|rect| !rect.is_empty());
        let Some(first) = rects.next() else {
            self.clear();
            return;
        };

        let bounding = rects.fold(*first, |acc, rect| acc.union(rect));
        self.timers.clear();
        self.state = Some(SelectionState {
            bounding_rect: bounding.translate(-surface_origin.x, -surface_origin.y),
            text: event.text.clone(),
            copied: false,
        });
    }

    pub fn on_key(&mut self, key: Key) {
        if key == Key::Escape {
            self.clear();
        }
    }

    /// Where to float the copy button, relative to the surface.
    pub fn copy_affordance(&self) -> Option<Point> {
        let bounds = self.state.as_ref()?.bounding_rect;
        Some(Point::new(bounds.right() + AFFORDANCE_GAP, bounds.y))
    }

    /// Writes the selected text to `clipboard`.
    ///
    /// Returns `Ok(false)` when there is nothing selected. On success the
    /// state shows as copied until the acknowledgement expires, then clears.
    pub fn copy(
        &mut self,
        now: Duration,
        clipboard: &mut dyn ClipboardSink,
    ) -> Result<bool, ClipboardError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(false);
        };

        clipboard.write_text(&state.text)?;
        state.copied = true;

        self.timers.clear();
        self.timers.schedule(now, self.copied_ack, AckExpired);
        Ok(true)
    }

    /// Returns `true` if the state changed.
    pub fn poll(&mut self, now: Duration) -> bool {
        if self.timers.drain_due(now).is_empty() {
            return false;
        }

        self.state = None;
        true
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn selection(container: Option<SurfaceId>, text: &str) -> SelectionEnd {
        SelectionEnd {
            container,
            rects: vec![
                Rect::new(120.0, 220.0, 200.0, 14.0),
                Rect::new(110.0, 236.0, 80.0, 14.0),
            ],
            text: text.to_string(),
        }
    }

    #[test]
    fn selection_inside_surface_is_captured() {
        let mut router = SelectionRouter::new();
        let id = router.subscribe();
        let mut capture = SelectionCapture::new(id, ms(1200));

        let origin = Point::new(100.0, 200.0);
        capture.on_selection_end(&selection(Some(id), "Tyger Tyger"), origin);

        let state = capture.state().unwrap();
        assert_eq!(state.bounding_rect, Rect::new(10.0, 20.0, 210.0, 30.0));
        assert_eq!(state.text, "Tyger Tyger");
        assert!(!state.copied);
        assert_eq!(capture.copy_affordance(), Some(Point::new(228.0, 20.0)));
    }

    #[test]
    fn empty_escape_or_elsewhere_clears() {
        let mut capture = SelectionCapture::new(1, ms(1200));
        let origin = Point::new(0.0, 0.0);

        capture.on_selection_end(&selection(Some(1), "burning"), origin);
        capture.on_selection_end(&selection(Some(1), "  "), origin);
        assert!(capture.state().is_none());

        capture.on_selection_end(&selection(Some(1), "burning"), origin);
        capture.on_key(Key::Other);
        assert!(capture.state().is_some());
        capture.on_key(Key::Escape);
        assert!(capture.state().is_none());

        capture.on_selection_end(&selection(Some(1), "burning"), origin);
        capture.on_selection_end(&selection(Some(2), "bright"), origin);
        assert!(capture.state().is_none());

        capture.on_selection_end(&selection(Some(1), "burning"), origin);
        capture.on_selection_end(&selection(None, "bright"), origin);
        assert!(capture.state().is_none());
    }

    #[test]
    fn copy_acknowledges_then_clears() {
        let mut capture = SelectionCapture::new(1, ms(1200));
        let mut clipboard = MemoryClipboard::default();
        let origin = Point::new(0.0, 0.0);
        capture.on_selection_end(&selection(Some(1), "fearful symmetry"), origin);

        assert!(capture.copy(ms(500), &mut clipboard).unwrap());
        assert_eq!(clipboard.last(), Some("fearful symmetry"));
        assert!(capture.state().unwrap().copied);

        assert!(!capture.poll(ms(1699)));
        assert!(capture.state().is_some());
        assert!(capture.poll(ms(1700)));
        assert!(capture.state().is_none());
    }

    #[test]
    fn copy_without_selection_does_nothing() {
        let mut capture = SelectionCapture::new(1, ms(1200));
        let mut clipboard = MemoryClipboard::default();

        assert!(!capture.copy(ms(0), &mut clipboard).unwrap());
        assert!(clipboard.writes.is_empty());
    }

    #[test]
    fn router_tracks_subscriptions() {
        let mut router = SelectionRouter::new();
        let a = router.subscribe();
        let b = router.subscribe();

        assert_ne!(a, b);
        assert_eq!(router.recipients(), &[a, b]);
        assert!(router.unsubscribe(a));
        assert!(!router.unsubscribe(a));
        assert!(!router.is_subscribed(a));
        assert_eq!(router.recipients(), &[b]);
    }
}
