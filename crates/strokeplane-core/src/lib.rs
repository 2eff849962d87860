//! Strokeplane Core Library
//!
//! Platform-agnostic core of the Strokeplane infinite-canvas sketchpad: an
//! append-mostly set of thick line segments, a dynamic AABB tree for viewport
//! queries, grouped undo/redo, and the pieces needed to save and reopen a
//! drawing.

pub mod active;
pub mod camera;
pub mod canvas;
pub mod document;
pub mod history;
pub mod index;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod stroke;
pub mod tools;

pub use active::ActiveStrokes;
pub use camera::{Camera, SavedCameras};
pub use canvas::Canvas;
pub use document::DrawingDocument;
pub use history::{CreateError, Group, History};
pub use index::{AabbTree, LeafHandle};
pub use session::Session;
pub use settings::{Settings, SettingsError};
pub use snapshot::{CanvasSnapshot, RestoreError};
pub use storage::{AutoSaveManager, FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use store::{StoreError, StrokeStore};
pub use stroke::{Rgb, Stroke, StrokeId};
pub use tools::{Brush, PenTool};
