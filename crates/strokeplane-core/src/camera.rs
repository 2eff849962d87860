//! Camera module for pan/zoom/rotate transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zoom level that shows world units at one screen pixel each.
pub const BASE_ZOOM: f64 = 1.0;

/// Camera manages the view transform for the canvas.
///
/// World coordinates are mapped to the screen by scaling by `zoom`, rotating
/// by `rotation` (radians, clockwise on a y-down screen) and translating by
/// `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level.
    pub zoom: f64,
    /// Current rotation in radians.
    #[serde(default)]
    pub rotation: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: BASE_ZOOM,
            rotation: 0.0,
            min_zoom: (-4.0_f64).exp(),
            max_zoom: 4.0_f64.exp(),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the transform is usable: finite offset and rotation, and a
    /// positive finite zoom inside `min_zoom..=max_zoom`.
    pub fn is_valid(&self) -> bool {
        self.min_zoom > 0.0
            && self.min_zoom <= self.max_zoom
            && self.max_zoom.is_finite()
            && (self.min_zoom..=self.max_zoom).contains(&self.zoom)
            && self.offset.is_finite()
            && self.rotation.is_finite()
    }

    /// World to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::rotate(self.rotation) * Affine::scale(self.zoom)
    }

    /// Screen to world.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::rotate(-self.rotation) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// World units covered by one screen pixel.
    ///
    /// Brush sizes are chosen in pixels; multiplying by this keeps a stroke
    /// the same on-screen thickness at any zoom.
    pub fn screen_to_world_scale(&self) -> f64 {
        1.0 / self.zoom
    }

    /// The world-space region visible in a viewport of the given size.
    ///
    /// When the camera is rotated this is the axis-aligned bounds of the
    /// rotated view, so it over-covers near the corners. Culling against it
    /// may fetch a few strokes that end up off screen but never misses one.
    pub fn view_rect(&self, viewport: Size) -> Rect {
        let inverse = self.inverse_transform();
        let corners = [
            Point::ZERO,
            Point::new(viewport.width, 0.0),
            Point::new(0.0, viewport.height),
            Point::new(viewport.width, viewport.height),
        ];
        let first = inverse * corners[0];
        corners[1..]
            .iter()
            .map(|&c| inverse * c)
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(p))
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;
        self.keep_fixed(world_point, screen_point);
    }

    /// Rotate the camera by `delta` radians around a screen point.
    pub fn rotate_at(&mut self, screen_point: Point, delta: f64) {
        let world_point = self.screen_to_world(screen_point);
        self.rotation += delta;
        self.keep_fixed(world_point, screen_point);
    }

    /// Adjust the offset so `world_point` lands on `screen_point` again.
    fn keep_fixed(&mut self, world_point: Point, screen_point: Point) {
        let new_screen = self.world_to_screen(world_point);
        self.offset += screen_point - new_screen;
    }

    /// Center the view on a world point.
    pub fn center_on(&mut self, world_point: Point, viewport: Size) {
        let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.keep_fixed(world_point, center);
    }

    /// Reset camera to default position, zoom and rotation.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = BASE_ZOOM;
        self.rotation = 0.0;
    }

    /// Fit the camera to show the given bounding box, unrotated.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded_viewport = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded_viewport.width / bounds.width();
        let scale_y = padded_viewport.height / bounds.height();
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        self.rotation = 0.0;

        let bounds_center = bounds.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);

        self.offset = Vec2::new(
            viewport_center.x - bounds_center.x * self.zoom,
            viewport_center.y - bounds_center.y * self.zoom,
        );
    }
}

/// Slot that remembers where the camera was before the last bookmark jump.
pub const RETURN_SLOT: u8 = 0;

/// Camera bookmarks, persisted with the drawing.
///
/// Slots `1..=9` are user bookmarks. Jumping to one stores the camera it
/// replaced in [`RETURN_SLOT`], so loading slot 0 goes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedCameras {
    slots: BTreeMap<u8, Camera>,
}

impl SavedCameras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `camera` in `slot`.
    pub fn save(&mut self, slot: u8, camera: Camera) {
        self.slots.insert(slot, camera);
    }

    /// Jump to the camera stored in `slot`.
    ///
    /// Returns the camera to switch to, or `None` if the slot is empty. The
    /// current camera is kept in [`RETURN_SLOT`].
    pub fn load(&mut self, slot: u8, current: Camera) -> Option<Camera> {
        let target = *self.slots.get(&slot)?;
        self.slots.insert(RETURN_SLOT, current);
        Some(target)
    }

    pub fn get(&self, slot: u8) -> Option<&Camera> {
        self.slots.get(&slot)
    }

    /// Whether every bookmarked camera is valid.
    pub fn is_valid(&self) -> bool {
        self.slots.values().all(Camera::is_valid)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
