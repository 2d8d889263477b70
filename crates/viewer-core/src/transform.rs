//! Projection between source layout space and rendered pixel space.
//!
//! The transform is always derived from the current source and rendered
//! dimensions; nothing here is cached between calls.

use crate::geometry::{Point, Rect, Size, SourceBox};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    positionable: bool,
}

impl ScaleTransform {
    /// The `(1, 1)` fallback used while the rendered size is unknown.
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            positionable: false,
        }
    }

    /// Derives the scale pair for `source` laid out at `rendered` pixels.
    ///
    /// If either size is zero, negative or not finite the result is the
    /// identity and [`ScaleTransform::is_positionable`] returns `false`;
    /// overlays must not be drawn with such a transform.
    pub fn compute(source: Size, rendered: Size) -> Self {
        if !source.is_known() || !rendered.is_known() {
            return Self::identity();
        }

        Self {
            scale_x: rendered.width / source.width,
            scale_y: rendered.height / source.height,
            positionable: true,
        }
    }

    pub fn is_positionable(&self) -> bool {
        self.positionable
    }

    pub fn project(&self, source: &SourceBox) -> Rect {
        let b = source.normalized();
        Rect::new(
            b.x0 * self.scale_x,
            b.y0 * self.scale_y,
            (b.x1 - b.x0) * self.scale_x,
            (b.y1 - b.y0) * self.scale_y,
        )
    }

    pub fn project_point(&self, point: Point) -> Point {
        Point::new(point.x * self.scale_x, point.y * self.scale_y)
    }

    pub fn project_size(&self, size: Size) -> Size {
        Size::new(size.width * self.scale_x, size.height * self.scale_y)
    }

    /// Maps a rendered-space point back into source layout space.
    pub fn to_source(&self, point: Point) -> Point {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return point;
        }

        Point::new(point.x / self.scale_x, point.y / self.scale_y)
    }
}

impl Default for ScaleTransform {
    fn default() -> Self {
        Self::identity()
    }
}
