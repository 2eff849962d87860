//! Periodic saving of the open drawing.
//!
//! The manager holds no dirty flag of its own: a session is dirty when its
//! canvas revision moved past the one recorded at the last save or load.

use crate::session::Session;
use crate::settings::Settings;
use crate::storage::{Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a change may stay unsaved by default.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Storage key that always holds a copy of the most recently saved drawing.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Writes sessions to a storage backend at most once per interval.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: DEFAULT_AUTOSAVE_INTERVAL,
            last_save: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether `session` has unsaved changes and the interval has passed.
    pub fn is_due(&self, session: &Session) -> bool {
        session.is_dirty() && self.last_save.is_none_or(|at| at.elapsed() >= self.interval)
    }

    /// Save `session` if [`is_due`](Self::is_due). Returns whether it was written.
    pub fn maybe_save(&mut self, session: &mut Session) -> StorageResult<bool> {
        if !self.is_due(session) {
            return Ok(false);
        }
        self.save(session)?;
        Ok(true)
    }

    /// Write `session` under its id and under [`LAST_DOCUMENT_KEY`], then mark it clean.
    pub fn save(&mut self, session: &mut Session) -> StorageResult<()> {
        let document = session.to_document();
        self.storage.save(&document.id, &document)?;
        self.storage.save(LAST_DOCUMENT_KEY, &document)?;
        session.mark_saved();
        self.last_save = Some(Instant::now());
        log::info!(
            "saved drawing {} ({} strokes)",
            document.id,
            document.stroke_count()
        );
        Ok(())
    }

    /// Open a stored drawing.
    ///
    /// Fails with [`StorageError::Invalid`](super::StorageError::Invalid) if
    /// the file parses but its history or camera is unusable.
    pub fn open_session(&mut self, id: &str, settings: &Settings) -> StorageResult<Session> {
        let document = self.storage.load(id)?;
        let session = Session::from_document(document, settings)?;
        self.last_save = Some(Instant::now());
        Ok(session)
    }

    /// Reopen the last saved drawing, or start an empty one.
    ///
    /// A last document that is missing or fails validation is skipped and
    /// left in storage untouched.
    pub fn resume_session(&mut self, settings: &Settings) -> Session {
        match self.open_session(LAST_DOCUMENT_KEY, settings) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("starting a new drawing, last document not restored: {e}");
                Session::new(settings)
            }
        }
    }

    /// Ids of saved drawings, without the last-document copy.
    pub fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list()?;
        ids.retain(|id| id != LAST_DOCUMENT_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DrawingDocument;
    use crate::snapshot::RestoreError;
    use crate::storage::{MemoryStorage, StorageError};
    use crate::stroke::Stroke;
    use kurbo::Point;

    fn stroke_once(session: &mut Session, y: f64) {
        session.pointer_down(Point::new(0.0, y));
        session.pointer_up(Point::new(4.0, y));
    }

    #[test]
    fn test_clean_session_is_not_saved() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let mut session = Session::default();

        assert!(!manager.is_due(&session));
        assert!(!manager.maybe_save(&mut session).unwrap());
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_maybe_save_follows_session_changes() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage).with_interval(Duration::from_secs(3600));
        let mut session = Session::default();

        stroke_once(&mut session, 0.0);
        assert!(manager.is_due(&session));
        assert!(manager.maybe_save(&mut session).unwrap());
        assert!(!session.is_dirty());

        // Within the interval further changes wait.
        stroke_once(&mut session, 10.0);
        assert!(!manager.maybe_save(&mut session).unwrap());
        assert!(session.is_dirty());
    }

    #[test]
    fn test_zero_interval_saves_every_change() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone()).with_interval(Duration::ZERO);
        let mut session = Session::default();

        stroke_once(&mut session, 0.0);
        assert!(manager.maybe_save(&mut session).unwrap());
        assert!(session.undo());
        assert!(manager.maybe_save(&mut session).unwrap());

        let saved = storage.load(&session.id).unwrap();
        assert_eq!(saved.stroke_count(), 0);
        assert_eq!(saved.canvas.redo_groups.len(), 1);
    }

    #[test]
    fn test_list_excludes_last_document_copy() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        let mut session = Session::default();
        manager.save(&mut session).unwrap();

        assert_eq!(manager.list_documents().unwrap(), vec![session.id.clone()]);
        assert!(manager.storage().exists(LAST_DOCUMENT_KEY).unwrap());
    }

    #[test]
    fn test_open_session_rejects_bad_history() {
        let storage = Arc::new(MemoryStorage::new());
        let mut doc = DrawingDocument::new();
        doc.canvas.next_id = 1;
        doc.canvas
            .strokes
            .push(Stroke::new(0, Point::ZERO, Point::new(1.0, 1.0), 1.0, None));
        doc.canvas
            .strokes
            .push(Stroke::new(0, Point::ZERO, Point::new(2.0, 2.0), 1.0, None));
        storage.save("bad", &doc).unwrap();

        let mut manager = AutoSaveManager::new(storage);
        let result = manager.open_session("bad", &Settings::default());
        assert!(matches!(
            result,
            Err(StorageError::Invalid(RestoreError::DuplicateStroke(0)))
        ));
    }

    #[test]
    fn test_resume_session() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let settings = Settings::default();

        let empty = manager.resume_session(&settings);
        assert!(empty.canvas.is_empty());

        let mut session = Session::new(&settings);
        stroke_once(&mut session, 0.0);
        manager.save(&mut session).unwrap();

        let resumed = AutoSaveManager::new(storage).resume_session(&settings);
        assert_eq!(resumed.id, session.id);
        assert_eq!(resumed.canvas.len(), 1);
        assert!(!resumed.is_dirty());
    }

    #[test]
    fn test_resume_skips_broken_camera() {
        let storage = Arc::new(MemoryStorage::new());
        let mut doc = DrawingDocument::new();
        doc.camera.zoom = 0.0;
        storage.save(LAST_DOCUMENT_KEY, &doc).unwrap();

        let mut manager = AutoSaveManager::new(storage.clone());
        let session = manager.resume_session(&Settings::default());
        assert_ne!(session.id, doc.id);
        assert!(storage.exists(LAST_DOCUMENT_KEY).unwrap());
    }
}
