//! The stroke canvas: active strokes plus grouped history.

use crate::active::ActiveStrokes;
use crate::history::{CreateError, Group, History};
use crate::snapshot::{CanvasSnapshot, RestoreError};
use crate::stroke::{Rgb, Stroke, StrokeId};
use kurbo::{Point, Rect};

/// Strokes on the infinite plane, with grouped undo/redo.
///
/// All mutation goes through [`create_stroke`](Self::create_stroke),
/// [`commit_group`](Self::commit_group), [`undo`](Self::undo),
/// [`redo`](Self::redo) and [`restore`](Self::restore), which keep the spatial
/// index, the stroke store and the history consistent with each other.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    active: ActiveStrokes,
    history: History,
    /// Bumped by every change to the strokes or the history.
    revision: u64,
}

impl Canvas {
    /// Create an empty canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a canvas from a snapshot.
    pub fn from_snapshot(snapshot: CanvasSnapshot) -> Result<Self, RestoreError> {
        let mut canvas = Self::new();
        canvas.restore(snapshot)?;
        Ok(canvas)
    }

    /// Draw a segment. The stroke joins the open group until the next commit.
    ///
    /// Malformed geometry is refused and leaves the canvas unchanged.
    pub fn create_stroke(
        &mut self,
        a: Point,
        b: Point,
        radius: f32,
        color: Option<Rgb>,
    ) -> Result<StrokeId, CreateError> {
        let id = self
            .history
            .create_stroke(&mut self.active, a, b, radius, color)?;
        self.touch();
        Ok(id)
    }

    /// Turn everything drawn since the last commit into one undo step.
    ///
    /// Returns the committed group, or `None` if nothing was drawn.
    pub fn commit_group(&mut self) -> Option<Group> {
        let group = self.history.commit()?;
        self.touch();
        Some(group)
    }

    /// Undo the most recent group. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo(&mut self.active);
        if changed {
            self.touch();
        }
        changed
    }

    /// Redo the most recently undone group. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo(&mut self.active);
        if changed {
            self.touch();
        }
        changed
    }

    /// Counter that changes whenever the canvas does.
    ///
    /// Compare against a value read earlier to tell whether anything changed
    /// since, e.g. since the last save.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Active strokes whose bounds overlap `rect`, in paint (ascending id) order.
    pub fn query_region(&self, rect: Rect) -> Vec<&Stroke> {
        self.active.query(rect)
    }

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.active.get(id)
    }

    /// Number of active strokes.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn next_id(&self) -> StrokeId {
        self.history.next_id()
    }

    /// Bounds of all active strokes.
    pub fn bounds(&self) -> Option<Rect> {
        self.active.bounds()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active(&self) -> &ActiveStrokes {
        &self.active
    }

    /// Capture the canvas for persistence.
    ///
    /// Active strokes are enumerated through the spatial index, so the dump is
    /// exactly the indexed set. An open group is written as if it had been
    /// committed, which also means pending redo history is dropped, matching
    /// what the next commit would do.
    pub fn snapshot(&self) -> CanvasSnapshot {
        let mut strokes: Vec<Stroke> = self.active.indexed().cloned().collect();
        strokes.sort_unstable_by_key(Stroke::id);

        let mut undo_groups = self.history.undo_groups().to_vec();
        let (redo_groups, redo_strokes) = match self.history.open_group() {
            Some(open) => {
                undo_groups.push(open);
                (Vec::new(), Vec::new())
            }
            None => (
                self.history.redo_groups().to_vec(),
                self.history.suspended().to_vec(),
            ),
        };

        CanvasSnapshot {
            next_id: self.history.next_id(),
            strokes,
            undo_groups,
            redo_groups,
            redo_strokes,
        }
    }

    /// Replace the whole canvas with a snapshot.
    ///
    /// The snapshot is validated first; on error the canvas is left untouched.
    /// The spatial index is rebuilt from scratch.
    pub fn restore(&mut self, snapshot: CanvasSnapshot) -> Result<(), RestoreError> {
        if let Err(err) = snapshot.validate() {
            log::warn!("rejecting canvas snapshot: {err}");
            return Err(err);
        }

        let CanvasSnapshot {
            next_id,
            strokes,
            undo_groups,
            redo_groups,
            redo_strokes,
        } = snapshot;

        let mut active = ActiveStrokes::new();
        for stroke in strokes {
            let id = stroke.id();
            active
                .activate(stroke)
                .map_err(|_| RestoreError::DuplicateStroke(id))?;
        }

        log::info!(
            "restored {} strokes, {} undo groups, {} redo groups",
            active.len(),
            undo_groups.len(),
            redo_groups.len()
        );
        self.active = active;
        self.history = History::from_parts(next_id, undo_groups, redo_groups, redo_strokes);
        self.touch();
        Ok(())
    }

    /// Reset to an empty canvas with fresh history.
    pub fn clear(&mut self) {
        self.active.clear();
        self.history = History::new();
        self.touch();
    }

    /// Check that the index, the store and the history agree.
    pub fn validate(&self) -> Result<(), String> {
        self.active.validate()?;
        self.snapshot().validate().map_err(|err| err.to_string())
    }
}
