//! Clickable link regions layered above the text layer.
//!
//! Regions capture only their own bounds: [`LinkLayer::activate`] returns
//! `false` for a point outside every region so the host can pass the click
//! through. Internal targets are never followed here; they go back to the
//! host through [`NavigationHost`].

use crate::model::{LinkAnnotation, LinkTarget, PageNumber};
use serde::Serialize;
use viewer_core::{Point, Rect, ScaleTransform, Size};

/// Receives link activations.
pub trait NavigationHost {
    /// Open `uri` in a new browsing context.
    fn open_external(&mut self, uri: &str);
    fn navigate_to_page(&mut self, page: PageNumber);
    /// Resolving `name` to a page is up to the host.
    fn navigate_to_destination(&mut self, name: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRegion {
    pub rect: Rect,
    pub target: LinkTarget,
    /// Tooltip
    pub title: String,
    pub href: String,
}

impl LinkRegion {
    fn new(rect: Rect, target: LinkTarget) -> Self {
        let (title, href) = match &target {
            LinkTarget::External(uri) => (uri.clone(), uri.clone()),
            LinkTarget::InternalPage(page) => {
                (format!("Go to page {page}"), format!("#page-{page}"))
            }
            LinkTarget::InternalDest(name) => {
                (format!("Go to anchor {name}"), format!("#dest-{name}"))
            }
        };

        Self {
            rect,
            target,
            title,
            href,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.target, LinkTarget::External(_))
    }
}

pub fn build_link_regions(
    links: &[LinkAnnotation],
    source: Size,
    transform: &ScaleTransform,
    surface: Size,
) -> Vec<LinkRegion> {
    if !transform.is_positionable() || !source.is_known() {
        return Vec::new();
    }

    let bounds = Rect::from_size(surface);
    links
        .iter()
        .filter_map(|link| {
            let rect = link.rect.clamp_to(source.width, source.height)?;
            let rect = transform.project(&rect);
            rect.intersects(&bounds)
                .then(|| LinkRegion::new(rect, link.target.clone()))
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct LinkLayer {
    links: Vec<LinkAnnotation>,
    source: Option<Size>,
    transform: ScaleTransform,
    surface: Size,
    regions: Vec<LinkRegion>,
}

impl LinkLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[LinkRegion] {
        &self.regions
    }

    pub fn set_links(&mut self, links: Vec<LinkAnnotation>) {
        self.links = links;
        self.rebuild();
    }

    /// Source layout size the link rectangles are expressed in.
    pub fn set_source_size(&mut self, source: Option<Size>) {
        self.source = source;
        self.rebuild();
    }

    pub fn set_transform(&mut self, transform: ScaleTransform, surface: Size) {
        if self.transform == transform && self.surface == surface {
            return;
        }

        self.transform = transform;
        self.surface = surface;
        self.rebuild();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Topmost region under `point`. Later regions are drawn above earlier ones.
    pub fn hit_test(&self, point: Point) -> Option<&LinkRegion> {
        self.regions
            .iter()
            .rev()
            .find(|region| region.rect.contains(point))
    }

    /// Activates the region under `point`. Returns `false` when the click
    /// should fall through to the layers below.
    pub fn activate(&self, point: Point, host: &mut dyn NavigationHost) -> bool {
        let Some(region) = self.hit_test(point) else {
            return false;
        };

        match &region.target {
            LinkTarget::External(uri) => host.open_external(uri),
            LinkTarget::InternalPage(page) => host.navigate_to_page(*page),
            LinkTarget::InternalDest(name) => host.navigate_to_destination(name),
        }

        true
    }

    fn rebuild(&mut self) {
        self.regions = match self.source {
            Some(source) => build_link_regions(&self.links, source, &self.transform, self.surface),
            None => Vec::new(),
        };
    }
}
