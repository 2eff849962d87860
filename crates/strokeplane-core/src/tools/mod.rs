//! Pointer input policy: turning drags into strokes and groups.

use crate::camera::Camera;
use crate::canvas::Canvas;
use crate::history::Group;
use crate::stroke::{Rgb, StrokeId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest brush radius in screen pixels.
pub const MIN_RADIUS: f64 = 0.5;
/// Largest brush radius in screen pixels.
pub const MAX_RADIUS: f64 = 1000.0;
/// Default brush radius in screen pixels.
pub const DEFAULT_RADIUS: f64 = 10.0;

/// State of a pen interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PenState {
    /// Waiting for a pointer press.
    #[default]
    Idle,
    /// A drag is in progress.
    Drawing {
        /// End of the last emitted segment, where the next one starts.
        start: Point,
        /// Latest pointer position.
        current: Point,
    },
}

/// The segment a drag would produce if released now, for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenPreview {
    pub a: Point,
    pub b: Point,
    pub radius: f32,
    pub color: Option<Rgb>,
}

/// Brush settings that survive between drags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    /// Radius in screen pixels.
    pub radius: f64,
    pub color: Rgb,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            color: Rgb::pen_default(),
        }
    }
}

/// The freehand pen.
///
/// Every drag becomes one undo group. While the pointer moves, each change of
/// position emits a segment from the previous position, so a drag is a
/// polyline of capsules. In straight-line mode intermediate moves emit
/// nothing and the release draws a single segment from the press point.
#[derive(Debug, Clone, Default)]
pub struct PenTool {
    pub brush: Brush,
    /// Draw with the background color instead of the brush color.
    pub erasing: bool,
    /// Straight-line mode, usually bound to a held modifier.
    pub line_mode: bool,
    /// Stylus pressure in `0.0..=1.0`; mice report 1.0.
    pressure: Option<f64>,
    state: PenState,
}

impl PenTool {
    pub fn new(brush: Brush) -> Self {
        Self {
            brush,
            ..Self::default()
        }
    }

    pub fn state(&self) -> PenState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, PenState::Drawing { .. })
    }

    pub fn toggle_eraser(&mut self) {
        self.erasing = !self.erasing;
    }

    /// Record the latest stylus pressure. Out-of-range values are clamped.
    pub fn set_pressure(&mut self, pressure: f64) {
        self.pressure = Some(pressure.clamp(0.0, 1.0));
    }

    pub fn pressure(&self) -> f64 {
        self.pressure.unwrap_or(1.0)
    }

    /// Resize the brush from a horizontal drag of `dx_pixels` that started at `start_radius`.
    pub fn adjust_radius(&mut self, start_radius: f64, dx_pixels: f64) {
        self.brush.radius = (start_radius + dx_pixels / 2.0).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// World-space radius for a stroke drawn now.
    pub fn stroke_radius(&self, camera: &Camera) -> f32 {
        (self.brush.radius * camera.screen_to_world_scale() * self.pressure()) as f32
    }

    /// Color for a stroke drawn now; `None` paints the background.
    pub fn stroke_color(&self) -> Option<Rgb> {
        (!self.erasing).then_some(self.brush.color)
    }

    /// Start a drag at a world point.
    pub fn pointer_down(&mut self, world: Point) {
        self.state = PenState::Drawing {
            start: world,
            current: world,
        };
    }

    /// Follow the pointer. Returns the id of the segment drawn, if any.
    pub fn pointer_move(&mut self, canvas: &mut Canvas, camera: &Camera, world: Point) -> Option<StrokeId> {
        let PenState::Drawing { start, .. } = self.state else {
            return None;
        };
        self.state = PenState::Drawing { start, current: world };
        if self.line_mode || start == world {
            return None;
        }
        let id = self.draw_segment(canvas, camera, start, world)?;
        self.state = PenState::Drawing {
            start: world,
            current: world,
        };
        Some(id)
    }

    /// Finish the drag: draw the last segment and commit the group.
    ///
    /// A press released without moving still leaves a mark: the end point is
    /// nudged by one screen pixel diagonally so the stroke has length.
    pub fn pointer_up(&mut self, canvas: &mut Canvas, camera: &Camera, world: Point) -> Option<Group> {
        let PenState::Drawing { start, .. } = self.state else {
            return None;
        };
        self.state = PenState::Idle;

        let mut end = world;
        if start == end {
            let s = camera.screen_to_world_scale();
            end += Vec2::new(s, s);
        }
        self.draw_segment(canvas, camera, start, end);
        let group = canvas.commit_group();
        if let Some(group) = group {
            log::debug!("pen drag produced {} segments", group.len());
        }
        group
    }

    fn draw_segment(&self, canvas: &mut Canvas, camera: &Camera, a: Point, b: Point) -> Option<StrokeId> {
        match canvas.create_stroke(a, b, self.stroke_radius(camera), self.stroke_color()) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("pen segment dropped: {err}");
                None
            }
        }
    }

    /// Abandon the drag. Segments already drawn are kept as one group.
    pub fn cancel(&mut self, canvas: &mut Canvas) -> Option<Group> {
        if !self.is_drawing() {
            return None;
        }
        self.state = PenState::Idle;
        canvas.commit_group()
    }

    /// The segment that releasing the pointer now would add.
    pub fn preview(&self, camera: &Camera) -> Option<PenPreview> {
        let PenState::Drawing { start, current } = self.state else {
            return None;
        };
        Some(PenPreview {
            a: start,
            b: current,
            radius: self.stroke_radius(camera),
            color: self.stroke_color(),
        })
    }
}
