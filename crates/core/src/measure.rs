//! Rendered-size measurement.
//!
//! Image decoding and responsive layout can report a transient size that is
//! much smaller than where the page ends up. A surface therefore samples its
//! rendered size several times and keeps the largest plausible sample.

use viewer_core::Size;

/// What the host layout reports about a mounted page surface.
pub trait LayoutProbe {
    /// Current on-screen size of the page image, if it has been laid out.
    fn rendered_size(&self) -> Option<Size>;

    /// Width available to the page inside its container.
    fn container_width(&self) -> f32;
}

/// Probe that reports fixed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedProbe {
    pub rendered: Option<Size>,
    pub container_width: f32,
}

impl LayoutProbe for FixedProbe {
    fn rendered_size(&self) -> Option<Size> {
        self.rendered
    }

    fn container_width(&self) -> f32 {
        self.container_width
    }
}

/// Probe for hosts without a layout engine: the page is drawn at its
/// natural size scaled down to the container width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalFitProbe {
    pub natural: Size,
    pub container_width: f32,
}

impl LayoutProbe for NaturalFitProbe {
    fn rendered_size(&self) -> Option<Size> {
        self.natural
            .is_known()
            .then(|| self.natural.fit_width(self.container_width))
    }

    fn container_width(&self) -> f32 {
        self.container_width
    }
}

/// Width a correctly laid out page is expected to have.
pub fn expected_width(natural: Size, container_width: f32) -> f32 {
    if container_width > 0.0 && container_width.is_finite() {
        natural.width.min(container_width)
    } else {
        natural.width
    }
}

/// Whether `sample` is large enough to be a settled layout rather than a
/// transient one.
pub fn is_plausible(sample: Size, natural: Size, container_width: f32, min_fraction: f32) -> bool {
    if !sample.is_known() {
        return false;
    }

    if !natural.is_known() {
        return true;
    }

    sample.width >= expected_width(natural, container_width) * min_fraction
}

/// Largest plausible sample, if any.
pub fn largest_plausible(
    samples: &[Size],
    natural: Size,
    container_width: f32,
    min_fraction: f32,
) -> Option<Size> {
    samples
        .iter()
        .copied()
        .filter(|sample| is_plausible(*sample, natural, container_width, min_fraction))
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Size to fall back to when no sample is plausible.
pub fn fallback_size(natural: Size, container_width: f32) -> Option<Size> {
    if !natural.is_known() {
        return None;
    }

    if container_width > 0.0 && container_width.is_finite() {
        Some(natural.fit_width(container_width))
    } else {
        Some(natural)
    }
}

/// Settles a set of samples into the size to publish.
pub fn settle(
    samples: &[Size],
    natural: Size,
    container_width: f32,
    min_fraction: f32,
) -> Option<Size> {
    largest_plausible(samples, natural, container_width, min_fraction)
        .or_else(|| fallback_size(natural, container_width))
}
