//! All editor state for one open drawing.

use crate::camera::{Camera, SavedCameras};
use crate::canvas::Canvas;
use crate::document::DrawingDocument;
use crate::history::Group;
use crate::settings::Settings;
use crate::snapshot::RestoreError;
use crate::stroke::{Rgb, Stroke, StrokeId};
use crate::tools::PenTool;
use kurbo::{Point, Size};
use uuid::Uuid;

/// An open drawing: canvas, view and pen.
///
/// Pointer methods take screen coordinates and convert them through the
/// camera before they reach the pen.
#[derive(Debug, Clone)]
pub struct Session {
    /// Document identifier, kept across save and load.
    pub id: String,
    pub name: String,
    pub canvas: Canvas,
    pub camera: Camera,
    pub pen: PenTool,
    /// Color eraser strokes paint with.
    pub background: Rgb,
    pub saved_cameras: SavedCameras,
    /// Viewport size in screen pixels.
    pub viewport_size: Size,
    /// Canvas revision at the last save or load.
    saved_revision: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Session {
    /// Start an empty drawing with the given preferences.
    pub fn new(settings: &Settings) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            canvas: Canvas::new(),
            camera: Camera::new(),
            pen: PenTool::new(settings.brush()),
            background: settings.background_color,
            saved_cameras: SavedCameras::new(),
            viewport_size: Size::new(f64::from(settings.width), f64::from(settings.height)),
            saved_revision: 0,
        }
    }

    /// Open a saved drawing.
    pub fn from_document(document: DrawingDocument, settings: &Settings) -> Result<Self, RestoreError> {
        let mut session = Self::new(settings);
        session.load_document(document)?;
        Ok(session)
    }

    /// Replace the drawing with a saved one. On error nothing changes.
    ///
    /// The camera and every bookmark must pass [`Camera::is_valid`]; a zero
    /// or non-finite zoom would turn every later pointer event into a
    /// non-finite stroke.
    pub fn load_document(&mut self, document: DrawingDocument) -> Result<(), RestoreError> {
        let DrawingDocument {
            id,
            name,
            canvas,
            background,
            camera,
            saved_cameras,
        } = document;

        if !camera.is_valid() || !saved_cameras.is_valid() {
            log::warn!("rejecting document {id}: unusable camera or bookmark");
            return Err(RestoreError::InvalidCamera);
        }
        self.canvas.restore(canvas)?;
        self.pen.cancel(&mut self.canvas);
        self.id = id;
        self.name = name;
        self.background = background;
        self.camera = camera;
        self.saved_cameras = saved_cameras;
        self.mark_saved();
        Ok(())
    }

    /// Whether the strokes or history changed since the last save or load.
    ///
    /// Moving the camera alone does not count.
    pub fn is_dirty(&self) -> bool {
        self.canvas.revision() != self.saved_revision
    }

    /// Record that the current state has been written out.
    pub fn mark_saved(&mut self) {
        self.saved_revision = self.canvas.revision();
    }

    /// Capture the drawing for saving.
    pub fn to_document(&self) -> DrawingDocument {
        DrawingDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            canvas: self.canvas.snapshot(),
            background: self.background,
            camera: self.camera,
            saved_cameras: self.saved_cameras.clone(),
        }
    }

    /// Strokes that may be on screen, in paint order.
    pub fn visible_strokes(&self) -> Vec<&Stroke> {
        self.canvas
            .query_region(self.camera.view_rect(self.viewport_size))
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    pub fn pointer_down(&mut self, screen: Point) {
        let world = self.camera.screen_to_world(screen);
        self.pen.pointer_down(world);
    }

    pub fn pointer_move(&mut self, screen: Point) -> Option<StrokeId> {
        let world = self.camera.screen_to_world(screen);
        self.pen.pointer_move(&mut self.canvas, &self.camera, world)
    }

    pub fn pointer_up(&mut self, screen: Point) -> Option<Group> {
        let world = self.camera.screen_to_world(screen);
        self.pen.pointer_up(&mut self.canvas, &self.camera, world)
    }

    /// Undo the last group. A drag in progress is ended first.
    pub fn undo(&mut self) -> bool {
        self.pen.cancel(&mut self.canvas);
        self.canvas.undo()
    }

    /// Redo the last undone group. A drag in progress is ended first.
    pub fn redo(&mut self) -> bool {
        self.pen.cancel(&mut self.canvas);
        self.canvas.redo()
    }

    /// Bookmark the current view in `slot`.
    pub fn save_camera(&mut self, slot: u8) {
        self.saved_cameras.save(slot, self.camera);
    }

    /// Jump to the view bookmarked in `slot`. Returns `false` if the slot is empty.
    pub fn load_camera(&mut self, slot: u8) -> bool {
        match self.saved_cameras.load(slot, self.camera) {
            Some(camera) => {
                self.camera = camera;
                true
            }
            None => false,
        }
    }
}
