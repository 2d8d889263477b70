//! Scroll-into-view for the first search match

use serde::Serialize;
use viewer_core::Rect;

/// Scroll geometry of one container, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub client_height: f32,
    pub scroll_height: f32,
    /// Top of the page surface inside this container's scrollable content
    pub surface_offset: f32,
}

impl ScrollMetrics {
    pub fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }

    fn max_scroll(&self) -> f32 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScrollTarget {
    /// Index into the ancestor list, nearest first
    Ancestor(usize),
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollCommand {
    pub target: ScrollTarget,
    pub top: f32,
    pub smooth: bool,
}

/// Scrolls the nearest overflowing ancestor, or the viewport when none
/// overflows, so that `rect` sits `margin` of the container height below
/// its top edge.
///
/// `ancestors` is ordered from the surface outwards.
pub fn scroll_into_view(
    rect: Rect,
    ancestors: &[ScrollMetrics],
    viewport: ScrollMetrics,
    margin: f32,
) -> ScrollCommand {
    let (target, metrics) = ancestors
        .iter()
        .enumerate()
        .find(|(_, metrics)| metrics.overflows())
        .map(|(index, metrics)| (ScrollTarget::Ancestor(index), *metrics))
        .unwrap_or((ScrollTarget::Viewport, viewport));

    let desired = metrics.surface_offset + rect.y - metrics.client_height * margin;
    ScrollCommand {
        target,
        top: desired.clamp(0.0, metrics.max_scroll()),
        smooth: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(client_height: f32, scroll_height: f32, surface_offset: f32) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 0.0,
            client_height,
            scroll_height,
            surface_offset,
        }
    }

    fn at(y: f32) -> Rect {
        Rect::new(0.0, y, 40.0, 12.0)
    }

    #[test]
    fn nearest_overflowing_ancestor_is_scrolled() {
        let ancestors = [metrics(800.0, 800.0, 0.0), metrics(600.0, 3000.0, 100.0)];
        let viewport = metrics(900.0, 4000.0, 0.0);
        let command = scroll_into_view(at(900.0), &ancestors, viewport, 0.18);

        assert_eq!(command.target, ScrollTarget::Ancestor(1));
        assert!((command.top - (100.0 + 900.0 - 108.0)).abs() < 0.01);
        assert!(command.smooth);
    }

    #[test]
    fn viewport_is_used_when_nothing_overflows() {
        let viewport = metrics(1000.0, 5000.0, 200.0);
        let command = scroll_into_view(at(500.0), &[], viewport, 0.18);

        assert_eq!(command.target, ScrollTarget::Viewport);
        assert!((command.top - 520.0).abs() < 0.01);
    }

    #[test]
    fn target_is_clamped_to_scroll_range() {
        let viewport = metrics(1000.0, 5000.0, 0.0);
        let top = scroll_into_view(at(20.0), &[], viewport, 0.18);
        let bottom = scroll_into_view(at(4990.0), &[], viewport, 0.18);

        assert_eq!(top.top, 0.0);
        assert_eq!(bottom.top, 4000.0);
    }
}
