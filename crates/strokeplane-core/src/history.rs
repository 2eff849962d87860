//! Grouped linear undo/redo over contiguous stroke id ranges.
//!
//! Every committed edit is a [`Group`]: the closed id interval of the strokes
//! drawn between two commit points. Undo moves a group's strokes out of the
//! active set onto a stack of suspended strokes; redo moves them back. Because
//! ids are handed out in ascending order and a group is always undone in full,
//! the suspended stack is ordered so that popping it yields strokes from the
//! highest id down to the group's first id.

use crate::active::ActiveStrokes;
use crate::stroke::{Rgb, Stroke, StrokeId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Reasons a stroke cannot be created. Nothing changes when one is returned.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CreateError {
    #[error("stroke geometry is not finite or the radius is negative")]
    Malformed,
    #[error("stroke ids are exhausted")]
    IdsExhausted,
}

/// One undo step: the strokes with ids `first..=last`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub first: StrokeId,
    pub last: StrokeId,
}

impl Group {
    pub fn new(first: StrokeId, last: StrokeId) -> Self {
        debug_assert!(first <= last, "group [{first}, {last}] is inverted");
        Self { first, last }
    }

    /// A group holding a single id.
    pub fn single(id: StrokeId) -> Self {
        Self { first: id, last: id }
    }

    pub fn ids(&self) -> RangeInclusive<StrokeId> {
        self.first..=self.last
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.ids().contains(&id)
    }

    /// Number of strokes in the group.
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    pub fn is_well_formed(&self) -> bool {
        self.first <= self.last
    }
}

/// Undo/redo bookkeeping and the stroke id allocator.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<Group>,
    redo: Vec<Group>,
    /// Strokes of undone groups. The top is the highest id of the most recently undone group.
    suspended: Vec<Stroke>,
    next_id: StrokeId,
    /// Strokes created since the last commit. Only meaningful while `pending` is set.
    open: Group,
    pending: bool,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild history from persisted stacks (bottom of each stack first).
    ///
    /// The caller is responsible for validating the parts against the active set.
    pub(crate) fn from_parts(
        next_id: StrokeId,
        undo: Vec<Group>,
        redo: Vec<Group>,
        suspended: Vec<Stroke>,
    ) -> Self {
        Self {
            undo,
            redo,
            suspended,
            next_id,
            open: Group::single(next_id),
            pending: false,
        }
    }

    /// The id the next created stroke will get.
    pub fn next_id(&self) -> StrokeId {
        self.next_id
    }

    /// The group being accumulated, if anything was drawn since the last commit.
    pub fn open_group(&self) -> Option<Group> {
        self.pending.then_some(self.open)
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() || self.pending
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty() && !self.pending
    }

    /// Undo stack, oldest group first.
    pub fn undo_groups(&self) -> &[Group] {
        &self.undo
    }

    /// Redo stack, bottom first. The last element is the next group to redo.
    pub fn redo_groups(&self) -> &[Group] {
        &self.redo
    }

    /// Suspended strokes, bottom of the stack first.
    pub fn suspended(&self) -> &[Stroke] {
        &self.suspended
    }

    /// Allocate an id, build the stroke, make it active and add it to the open group.
    ///
    /// `StrokeId::MAX` is never handed out, so `last + 1` of any group is
    /// always a valid counter.
    pub fn create_stroke(
        &mut self,
        active: &mut ActiveStrokes,
        a: Point,
        b: Point,
        radius: f32,
        color: Option<Rgb>,
    ) -> Result<StrokeId, CreateError> {
        let id = self.next_id;
        if id == StrokeId::MAX {
            return Err(CreateError::IdsExhausted);
        }
        let stroke = Stroke::new(id, a, b, radius, color);
        if !stroke.is_well_formed() {
            return Err(CreateError::Malformed);
        }
        if let Err(err) = active.activate(stroke) {
            // Ids at or above `next_id` are never active.
            unreachable!("id allocator handed out a live id: {err}");
        }
        self.next_id = id + 1;
        if !self.pending {
            self.open = Group::single(id);
        }
        self.open.last = id;
        self.pending = true;
        Ok(id)
    }

    /// Close the open group and push it onto the undo stack.
    ///
    /// Returns the committed group, or `None` if nothing was drawn since the
    /// last commit. Committing new work discards all redo history.
    pub fn commit(&mut self) -> Option<Group> {
        if !self.pending {
            return None;
        }
        let group = self.open;
        self.undo.push(group);
        self.redo.clear();
        self.suspended.clear();
        self.open = Group::single(self.next_id);
        self.pending = false;
        log::debug!("committed group [{}, {}]", group.first, group.last);
        Some(group)
    }

    /// Undo the most recent group. Any uncommitted strokes are committed first.
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, active: &mut ActiveStrokes) -> bool {
        self.commit();
        let Some(group) = self.undo.pop() else {
            return false;
        };
        for id in group.ids() {
            match active.suspend(id) {
                Ok(stroke) => self.suspended.push(stroke),
                Err(err) => unreachable!("undo group [{}, {}]: {err}", group.first, group.last),
            }
        }
        self.redo.push(group);
        self.next_id = group.first;
        self.open = Group::single(group.first);
        log::debug!(
            "undid group [{}, {}], {} active strokes remain",
            group.first,
            group.last,
            active.len()
        );
        true
    }

    /// Redo the most recently undone group.
    ///
    /// Returns `false` when there is nothing to redo. Drawing since the last
    /// undo counts as new work and therefore also leaves nothing to redo.
    pub fn redo(&mut self, active: &mut ActiveStrokes) -> bool {
        self.commit();
        let Some(group) = self.redo.pop() else {
            return false;
        };
        loop {
            let Some(stroke) = self.suspended.pop() else {
                unreachable!("suspended stack ran dry redoing [{}, {}]", group.first, group.last);
            };
            let id = stroke.id();
            if let Err(err) = active.activate(stroke) {
                unreachable!("redo group [{}, {}]: {err}", group.first, group.last);
            }
            if id == group.first {
                break;
            }
        }
        self.undo.push(group);
        // Groups never reach `StrokeId::MAX`.
        self.next_id = group.last + 1;
        self.open = Group::single(self.next_id);
        log::debug!(
            "redid group [{}, {}], {} active strokes",
            group.first,
            group.last,
            active.len()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(history: &mut History, active: &mut ActiveStrokes, x: f64) -> StrokeId {
        history.create_stroke(
            active,
            Point::new(x, 0.0),
            Point::new(x + 1.0, 0.0),
            2.0,
            Some(Rgb::white()),
        )
        .unwrap()
    }

    #[test]
    fn test_ids_ascend() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        assert_eq!(draw(&mut history, &mut active, 0.0), 0);
        assert_eq!(draw(&mut history, &mut active, 1.0), 1);
        assert_eq!(history.open_group(), Some(Group::new(0, 1)));
        assert_eq!(history.next_id(), 2);
    }

    #[test]
    fn test_commit_without_strokes_is_noop() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        assert_eq!(history.commit(), None);

        draw(&mut history, &mut active, 0.0);
        assert_eq!(history.commit(), Some(Group::single(0)));
        assert_eq!(history.commit(), None);
        assert_eq!(history.undo_groups().len(), 1);
    }

    #[test]
    fn test_undo_reuses_ids() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        for x in 0..3 {
            draw(&mut history, &mut active, f64::from(x));
        }
        history.commit();
        assert_eq!(active.len(), 3);

        assert!(history.undo(&mut active));
        assert_eq!(active.len(), 0);
        assert_eq!(history.next_id(), 0);
        assert_eq!(history.suspended().len(), 3);
        assert_eq!(history.suspended().last().map(Stroke::id), Some(2));

        assert_eq!(draw(&mut history, &mut active, 9.0), 0);
    }

    #[test]
    fn test_redo_restores_group() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        draw(&mut history, &mut active, 0.0);
        draw(&mut history, &mut active, 1.0);
        history.commit();
        draw(&mut history, &mut active, 2.0);
        history.commit();

        assert!(history.undo(&mut active));
        assert_eq!(history.redo_groups(), &[Group::single(2)]);
        assert!(active.contains(0) && active.contains(1) && !active.contains(2));

        assert!(history.redo(&mut active));
        assert!(active.contains(2));
        assert_eq!(history.next_id(), 3);
        assert!(history.suspended().is_empty());
        assert!(history.redo_groups().is_empty());
        assert!(active.validate().is_ok());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        assert!(!history.undo(&mut active));
        assert!(!history.redo(&mut active));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_commit_after_undo_drops_redo() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        draw(&mut history, &mut active, 0.0);
        history.commit();
        history.undo(&mut active);
        assert!(history.can_redo());

        draw(&mut history, &mut active, 5.0);
        history.commit();
        assert!(!history.can_redo());
        assert!(history.suspended().is_empty());
        assert!(!history.redo(&mut active));
    }

    #[test]
    fn test_undo_commits_pending_strokes_first() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        draw(&mut history, &mut active, 0.0);
        history.commit();
        draw(&mut history, &mut active, 1.0);

        // The uncommitted stroke forms its own group and is the one undone.
        assert!(history.undo(&mut active));
        assert!(active.contains(0));
        assert!(!active.contains(1));
        assert_eq!(history.redo_groups(), &[Group::single(1)]);
    }

    #[test]
    fn test_multiple_undo_redo_order() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        for group_size in [2, 1, 3] {
            for _ in 0..group_size {
                draw(&mut history, &mut active, 0.0);
            }
            history.commit();
        }
        assert_eq!(
            history.undo_groups(),
            &[Group::new(0, 1), Group::single(2), Group::new(3, 5)]
        );

        assert!(history.undo(&mut active));
        assert!(history.undo(&mut active));
        assert_eq!(active.len(), 2);
        assert_eq!(history.next_id(), 2);

        assert!(history.redo(&mut active));
        assert_eq!(active.len(), 3);
        assert_eq!(history.next_id(), 3);
        assert!(history.redo(&mut active));
        assert_eq!(active.len(), 6);
        assert_eq!(history.next_id(), 6);
        assert!(active.validate().is_ok());
    }

    #[test]
    fn test_create_refuses_malformed_stroke() {
        let mut history = History::new();
        let mut active = ActiveStrokes::new();
        let nan = Point::new(f64::NAN, 0.0);
        assert_eq!(
            history.create_stroke(&mut active, nan, Point::ZERO, 1.0, None),
            Err(CreateError::Malformed)
        );
        assert_eq!(
            history.create_stroke(&mut active, Point::ZERO, Point::ZERO, -1.0, None),
            Err(CreateError::Malformed)
        );
        assert!(active.is_empty());
        assert_eq!(history.next_id(), 0);
        assert!(!history.has_pending());
    }

    #[test]
    fn test_create_stops_before_max_id() {
        let mut active = ActiveStrokes::new();
        let mut history = History::from_parts(StrokeId::MAX - 1, Vec::new(), Vec::new(), Vec::new());
        assert_eq!(draw(&mut history, &mut active, 0.0), StrokeId::MAX - 1);
        assert_eq!(
            history.create_stroke(&mut active, Point::ZERO, Point::new(1.0, 0.0), 1.0, None),
            Err(CreateError::IdsExhausted)
        );
        assert_eq!(history.commit(), Some(Group::single(StrokeId::MAX - 1)));

        assert!(history.undo(&mut active));
        assert!(history.redo(&mut active));
        assert_eq!(history.next_id(), StrokeId::MAX);
    }

    #[test]
    fn test_group_helpers() {
        let g = Group::new(3, 5);
        assert_eq!(g.len(), 3);
        assert!(g.contains(4));
        assert!(!g.contains(6));
        assert_eq!(g.ids().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(Group::single(7).len(), 1);
    }
}
