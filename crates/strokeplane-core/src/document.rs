//! The on-disk drawing file.

use crate::camera::{Camera, SavedCameras};
use crate::snapshot::CanvasSnapshot;
use crate::stroke::Rgb;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_name() -> String {
    "Untitled".to_string()
}

/// A saved drawing: the canvas snapshot plus the view it was left in.
///
/// The snapshot fields sit at the top level of the JSON object next to the
/// view fields, so a file holds `next_id`, `strokes`, `undo_groups` and so on
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(flatten)]
    pub canvas: CanvasSnapshot,
    /// Color erasers paint with.
    #[serde(default = "Rgb::black")]
    pub background: Rgb,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub saved_cameras: SavedCameras,
}

impl Default for DrawingDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: default_name(),
            canvas: CanvasSnapshot::empty(),
            background: Rgb::black(),
            camera: Camera::new(),
            saved_cameras: SavedCameras::new(),
        }
    }

    /// Number of visible strokes in the document.
    pub fn stroke_count(&self) -> usize {
        self.canvas.strokes.len()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    ///
    /// Only syntax and field types are checked here; the canvas snapshot is
    /// validated when it is restored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
