//! Serializable snapshot of the stroke core and its validation.

use crate::history::Group;
use crate::stroke::{Stroke, StrokeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Everything needed to rebuild a [`Canvas`](crate::Canvas).
///
/// Stacks are stored bottom first: the last element of `undo_groups` is the
/// next group to undo and the last element of `redo_groups` the next to redo.
/// `redo_strokes` lists suspended strokes in push order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    pub next_id: StrokeId,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
    #[serde(default)]
    pub undo_groups: Vec<Group>,
    #[serde(default)]
    pub redo_groups: Vec<Group>,
    #[serde(default)]
    pub redo_strokes: Vec<Stroke>,
}

/// Reasons a snapshot cannot be restored.
///
/// A rejected snapshot is never partially applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("stroke {0} has non-finite geometry or a negative radius")]
    MalformedStroke(StrokeId),
    #[error("stroke {0} appears more than once")]
    DuplicateStroke(StrokeId),
    #[error("active stroke {id} is not below the id counter {next_id}")]
    IdBeyondCounter { id: StrokeId, next_id: StrokeId },
    #[error("group [{first}, {last}] is inverted")]
    MalformedGroup { first: StrokeId, last: StrokeId },
    #[error("group [{first}, {last}] reaches the reserved id {}", StrokeId::MAX)]
    IdOutOfRange { first: StrokeId, last: StrokeId },
    #[error("active stroke {0} belongs to no undo group")]
    UngroupedStroke(StrokeId),
    #[error("undo group [{first}, {last}] does not directly follow the group below it")]
    UndoGap { first: StrokeId, last: StrokeId },
    #[error("undo group [{first}, {last}] does not end just below the id counter {next_id}")]
    CounterMismatch {
        first: StrokeId,
        last: StrokeId,
        next_id: StrokeId,
    },
    #[error("undo group [{first}, {last}] refers to missing stroke {id}")]
    MissingStroke {
        first: StrokeId,
        last: StrokeId,
        id: StrokeId,
    },
    #[error("redo group [{first}, {last}] does not line up with the id counter or the group above it")]
    RedoGap { first: StrokeId, last: StrokeId },
    #[error("suspended strokes do not match the redo groups")]
    SuspendedMismatch,
    #[error("camera transform is not finite or its zoom is out of range")]
    InvalidCamera,
}

impl CanvasSnapshot {
    /// An empty canvas.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check that restoring this snapshot yields a consistent canvas.
    pub fn validate(&self) -> Result<(), RestoreError> {
        let mut seen = HashSet::with_capacity(self.strokes.len() + self.redo_strokes.len());
        for stroke in self.strokes.iter().chain(&self.redo_strokes) {
            if !stroke.is_well_formed() {
                return Err(RestoreError::MalformedStroke(stroke.id()));
            }
            if !seen.insert(stroke.id()) {
                return Err(RestoreError::DuplicateStroke(stroke.id()));
            }
        }

        let active: HashSet<StrokeId> = self.strokes.iter().map(Stroke::id).collect();
        if let Some(&id) = active.iter().find(|&&id| id >= self.next_id) {
            return Err(RestoreError::IdBeyondCounter {
                id,
                next_id: self.next_id,
            });
        }

        for group in self.undo_groups.iter().chain(&self.redo_groups) {
            if !group.is_well_formed() {
                return Err(RestoreError::MalformedGroup {
                    first: group.first,
                    last: group.last,
                });
            }
            // `last + 1` must stay representable for redo to reopen after it.
            if group.last == StrokeId::MAX {
                return Err(RestoreError::IdOutOfRange {
                    first: group.first,
                    last: group.last,
                });
            }
        }

        self.validate_undo(&active)?;
        self.validate_redo()
    }

    /// Undo groups ascend without gaps, the top one ends just below the
    /// counter, and together they cover exactly the active strokes.
    fn validate_undo(&self, active: &HashSet<StrokeId>) -> Result<(), RestoreError> {
        let mut previous: Option<Group> = None;
        for group in &self.undo_groups {
            if let Some(prev) = previous
                && prev.last.checked_add(1) != Some(group.first)
            {
                return Err(RestoreError::UndoGap {
                    first: group.first,
                    last: group.last,
                });
            }
            if let Some(id) = group.ids().find(|id| !active.contains(id)) {
                return Err(RestoreError::MissingStroke {
                    first: group.first,
                    last: group.last,
                    id,
                });
            }
            previous = Some(*group);
        }

        let Some(top) = previous else {
            return match active.iter().min() {
                Some(&id) => Err(RestoreError::UngroupedStroke(id)),
                None => Ok(()),
            };
        };
        if top.last.checked_add(1) != Some(self.next_id) {
            return Err(RestoreError::CounterMismatch {
                first: top.first,
                last: top.last,
                next_id: self.next_id,
            });
        }

        // The groups cover `bottom..next_id` without gaps.
        let bottom = self.undo_groups.first().map_or(top.first, |g| g.first);
        match active.iter().copied().filter(|&id| id < bottom).min() {
            Some(id) => Err(RestoreError::UngroupedStroke(id)),
            None => Ok(()),
        }
    }

    /// Redo groups descend from the bottom of the stack to the top, the top
    /// group starts at the counter, and the suspended strokes are exactly the
    /// redo groups' ids in push order.
    fn validate_redo(&self) -> Result<(), RestoreError> {
        let mut below: Option<Group> = None;
        for group in &self.redo_groups {
            if let Some(prev) = below
                && group.last.checked_add(1) != Some(prev.first)
            {
                return Err(RestoreError::RedoGap {
                    first: group.first,
                    last: group.last,
                });
            }
            below = Some(*group);
        }
        if let Some(top) = self.redo_groups.last()
            && top.first != self.next_id
        {
            return Err(RestoreError::RedoGap {
                first: top.first,
                last: top.last,
            });
        }

        let expected = self.redo_groups.iter().flat_map(Group::ids);
        let actual = self.redo_strokes.iter().map(Stroke::id);
        if !expected.eq(actual) {
            return Err(RestoreError::SuspendedMismatch);
        }
        Ok(())
    }
}
