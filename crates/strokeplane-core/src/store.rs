//! Stroke ownership: records keyed by id, each paired with its index handle.

use crate::index::LeafHandle;
use crate::stroke::{Stroke, StrokeId};
use std::collections::HashMap;
use thiserror::Error;

/// Stroke store errors.
///
/// These indicate a broken call contract in the history engine rather than
/// anything a user can trigger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("stroke {0} is not active")]
    NotFound(StrokeId),
    #[error("stroke {0} is already active")]
    Duplicate(StrokeId),
}

/// An active stroke together with the handle of its spatial-index leaf.
///
/// Only the crate pairs strokes with handles, so the two cannot be separated
/// or mismatched from outside.
#[derive(Debug, Clone)]
pub struct StoredStroke {
    pub(crate) stroke: Stroke,
    pub(crate) handle: LeafHandle,
}

impl StoredStroke {
    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    pub fn handle(&self) -> LeafHandle {
        self.handle
    }

    pub fn into_stroke(self) -> Stroke {
        self.stroke
    }
}

/// Active strokes keyed by id.
///
/// The store does not touch the spatial index itself; the canvas inserts the
/// stroke into the index first and hands the resulting handle in here, so that
/// removing by id can evict the matching leaf.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    strokes: HashMap<StrokeId, StoredStroke>,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stroke that has already been inserted into the index under `handle`.
    pub fn add(&mut self, stroke: Stroke, handle: LeafHandle) -> Result<(), StoreError> {
        let id = stroke.id();
        if self.strokes.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        self.strokes.insert(id, StoredStroke { stroke, handle });
        Ok(())
    }

    /// Remove a stroke, returning it with the index handle that must be evicted.
    pub fn remove(&mut self, id: StrokeId) -> Result<StoredStroke, StoreError> {
        self.strokes.remove(&id).ok_or(StoreError::NotFound(id))
    }

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.get(&id).map(|s| &s.stroke)
    }

    pub fn handle(&self, id: StrokeId) -> Option<LeafHandle> {
        self.strokes.get(&id).map(|s| s.handle)
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.strokes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Iterate active strokes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.values().map(|s| &s.stroke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::AabbTree;
    use kurbo::Point;

    fn stroke(id: StrokeId) -> Stroke {
        Stroke::new(id, Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0, None)
    }

    #[test]
    fn test_add_get_remove() {
        let mut tree = AabbTree::new();
        let mut store = StrokeStore::new();
        let s = stroke(5);
        let handle = tree.insert(s.aabb(), s.id());
        store.add(s.clone(), handle).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(5), Some(&s));
        assert_eq!(store.handle(5), Some(handle));

        let removed = store.remove(5).unwrap();
        assert_eq!(removed.stroke(), &s);
        assert_eq!(removed.handle(), handle);
        assert_eq!(removed.into_stroke(), s);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_missing() {
        let mut store = StrokeStore::new();
        assert_eq!(store.remove(42).unwrap_err(), StoreError::NotFound(42));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut tree = AabbTree::new();
        let mut store = StrokeStore::new();
        let s = stroke(1);
        let h1 = tree.insert(s.aabb(), 1);
        let h2 = tree.insert(s.aabb(), 1);
        store.add(s.clone(), h1).unwrap();
        assert_eq!(store.add(s, h2).unwrap_err(), StoreError::Duplicate(1));
        assert_eq!(store.handle(1), Some(h1));
    }
}
