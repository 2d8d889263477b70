use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A size is known once both dimensions are finite and strictly positive.
    pub fn is_known(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Scales this size down (never up) so that its width fits `max_width`.
    pub fn fit_width(self, max_width: f32) -> Self {
        if !self.is_known() || !(max_width > 0.0) || self.width <= max_width {
            return self;
        }

        let ratio = max_width / self.width;
        Self {
            width: max_width,
            height: self.height * ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in rendered pixel space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Edge contact counts as intersecting so that boxes flush with a boundary survive.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());

        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Box in source layout units, stored as `(x0, y0, x1, y1)`.
///
/// Serialized as a four element array, which is how the text and link
/// extractors emit bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct SourceBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl SourceBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Returns the same box with corners ordered so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Zero-area or non-finite boxes cannot be projected meaningfully.
    pub fn is_degenerate(&self) -> bool {
        let normalized = self.normalized();
        !self.is_finite() || normalized.width() <= 0.0 || normalized.height() <= 0.0
    }

    /// Clamps the box into `[0, width] x [0, height]`.
    ///
    /// Returns `None` when nothing of the box remains inside the page.
    pub fn clamp_to(&self, width: f32, height: f32) -> Option<SourceBox> {
        if self.is_degenerate() {
            return None;
        }

        let b = self.normalized();
        let clamped = SourceBox {
            x0: b.x0.clamp(0.0, width),
            y0: b.y0.clamp(0.0, height),
            x1: b.x1.clamp(0.0, width),
            y1: b.y1.clamp(0.0, height),
        };

        if clamped.width() <= 0.0 || clamped.height() <= 0.0 {
            return None;
        }

        Some(clamped)
    }
}

impl From<[f32; 4]> for SourceBox {
    fn from(value: [f32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<SourceBox> for [f32; 4] {
    fn from(value: SourceBox) -> Self {
        [value.x0, value.y0, value.x1, value.y1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_union_covers_both_inputs() {
        let a = Rect::new(10.0, 10.0, 20.0, 5.0);
        let b = Rect::new(5.0, 30.0, 10.0, 10.0);

        assert_eq!(a.union(&b), Rect::new(5.0, 10.0, 25.0, 30.0));
    }

    #[test]
    fn rect_intersection_requires_positive_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = Rect::new(5.0, 5.0, 10.0, 10.0);

        assert!(a.intersects(&touching));
        assert_eq!(a.intersection(&touching), None);
        assert_eq!(
            a.intersection(&overlapping),
            Some(Rect::new(5.0, 5.0, 5.0, 5.0))
        );
    }

    #[test]
    fn source_box_deserializes_from_array() {
        let parsed: SourceBox = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").expect("valid box");
        assert_eq!(parsed, SourceBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn inverted_boxes_are_normalized() {
        let inverted = SourceBox::new(30.0, 40.0, 10.0, 20.0);
        assert_eq!(
            inverted.normalized(),
            SourceBox::new(10.0, 20.0, 30.0, 40.0)
        );
        assert!(!inverted.is_degenerate());
    }

    #[test]
    fn clamp_drops_boxes_entirely_outside_the_page() {
        let outside = SourceBox::new(700.0, 10.0, 800.0, 20.0);
        assert_eq!(outside.clamp_to(612.0, 792.0), None);

        let partial = SourceBox::new(600.0, 10.0, 650.0, 20.0);
        assert_eq!(
            partial.clamp_to(612.0, 792.0),
            Some(SourceBox::new(600.0, 10.0, 612.0, 20.0))
        );
    }

    #[test]
    fn zero_area_and_nan_boxes_are_degenerate() {
        assert!(SourceBox::new(10.0, 10.0, 10.0, 20.0).is_degenerate());
        assert!(SourceBox::new(f32::NAN, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn fit_width_preserves_aspect_ratio() {
        let natural = Size::new(1224.0, 1584.0);
        let fitted = natural.fit_width(900.0);

        assert_eq!(fitted.width, 900.0);
        assert!((fitted.height - 1164.7).abs() < 0.1);
        assert_eq!(
            Size::new(600.0, 800.0).fit_width(900.0),
            Size::new(600.0, 800.0)
        );
    }
}
