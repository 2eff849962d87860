//! Stroke records: immutable thick line segments.

use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Identifier assigned to strokes by the history engine.
///
/// IDs increase monotonically while drawing. After an undo the freed range is
/// handed out again to new strokes.
pub type StrokeId = u64;

/// Opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Default pen color (a light zinc gray that reads well on black).
    pub const fn pen_default() -> Self {
        Self::new(212, 212, 216)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::pen_default()
    }
}

impl From<Color> for Rgb {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
        }
    }
}

impl From<Rgb> for Color {
    fn from(color: Rgb) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, 255)
    }
}

/// A single drawn segment from `a` to `b` with a round cap of `radius`.
///
/// A stroke without a color is an eraser stroke: it paints the canvas
/// background, whatever that happens to be when the stroke is rendered.
///
/// Strokes never change after construction. The bounding box is computed once
/// in [`Stroke::new`] and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StrokeRecord", into = "StrokeRecord")]
pub struct Stroke {
    id: StrokeId,
    a: Point,
    b: Point,
    radius: f32,
    color: Option<Rgb>,
    aabb: Rect,
}

impl Stroke {
    /// Build a stroke and compute its bounding box.
    pub fn new(id: StrokeId, a: Point, b: Point, radius: f32, color: Option<Rgb>) -> Self {
        let r = f64::from(radius);
        let aabb = Rect::new(
            a.x.min(b.x) - r,
            a.y.min(b.y) - r,
            a.x.max(b.x) + r,
            a.y.max(b.y) + r,
        );
        Self {
            id,
            a,
            b,
            radius,
            color,
            aabb,
        }
    }

    /// Build an eraser stroke.
    pub fn eraser(id: StrokeId, a: Point, b: Point, radius: f32) -> Self {
        Self::new(id, a, b, radius, None)
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn a(&self) -> Point {
        self.a
    }

    pub fn b(&self) -> Point {
        self.b
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The stroke color, or `None` for an eraser stroke.
    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    pub fn is_eraser(&self) -> bool {
        self.color.is_none()
    }

    /// Cached world-space bounding box, including the radius.
    pub fn aabb(&self) -> Rect {
        self.aabb
    }

    /// The color to paint this stroke with on the given background.
    pub fn paint_color(&self, background: Rgb) -> Rgb {
        self.color.unwrap_or(background)
    }

    /// Whether the geometry is usable: finite coordinates and a non-negative radius.
    pub fn is_well_formed(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.radius.is_finite() && self.radius >= 0.0
    }

    /// Same geometry and color, ignoring the id.
    pub fn same_geometry(&self, other: &Self) -> bool {
        self.a == other.a
            && self.b == other.b
            && self.radius == other.radius
            && self.color == other.color
    }
}

/// Wire form of a stroke. The bounding box is derived, so it is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StrokeRecord {
    id: StrokeId,
    a: Point,
    b: Point,
    radius: f32,
    /// Missing or `null` means eraser.
    #[serde(default)]
    color: Option<Rgb>,
}

impl From<StrokeRecord> for Stroke {
    fn from(record: StrokeRecord) -> Self {
        Stroke::new(record.id, record.a, record.b, record.radius, record.color)
    }
}

impl From<Stroke> for StrokeRecord {
    fn from(stroke: Stroke) -> Self {
        Self {
            id: stroke.id,
            a: stroke.a,
            b: stroke.b,
            radius: stroke.radius,
            color: stroke.color,
        }
    }
}
