//! The active stroke set: the spatial index and the stroke store kept in lockstep.

use crate::index::AabbTree;
use crate::store::{StoreError, StrokeStore};
use crate::stroke::{Stroke, StrokeId};
use kurbo::Rect;

/// Strokes that are currently visible.
///
/// A stroke is either in both the index and the store or in neither. The only
/// ways in and out are [`ActiveStrokes::activate`] and
/// [`ActiveStrokes::suspend`], which touch both containers together.
#[derive(Debug, Clone, Default)]
pub struct ActiveStrokes {
    index: AabbTree<StrokeId>,
    store: StrokeStore,
}

impl ActiveStrokes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index and store a stroke.
    pub fn activate(&mut self, stroke: Stroke) -> Result<(), StoreError> {
        if self.store.contains(stroke.id()) {
            return Err(StoreError::Duplicate(stroke.id()));
        }
        let handle = self.index.insert(stroke.aabb(), stroke.id());
        self.store.add(stroke, handle)
    }

    /// Take a stroke out of both the store and the index.
    pub fn suspend(&mut self, id: StrokeId) -> Result<Stroke, StoreError> {
        let stored = self.store.remove(id)?;
        let evicted = self.index.remove(stored.handle);
        debug_assert_eq!(evicted, Some(id), "index leaf did not belong to stroke {id}");
        Ok(stored.stroke)
    }

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.store.get(id)
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.store.clear();
    }

    /// Strokes whose bounding box overlaps `rect`, in ascending id order.
    ///
    /// Ascending id is creation order, which is the order strokes must be
    /// painted in for erasers to cover what came before them.
    pub fn query(&self, rect: Rect) -> Vec<&Stroke> {
        let mut hits: Vec<&Stroke> = self
            .index
            .query(rect)
            .filter_map(|(_, id)| self.store.get(id))
            .collect();
        hits.sort_unstable_by_key(|s| s.id());
        hits
    }

    /// Every indexed stroke, enumerated through the index rather than the store.
    pub fn indexed(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.index.iter().filter_map(|(_, _, id)| self.store.get(id))
    }

    /// Iterate the store in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.store.iter()
    }

    pub fn index(&self) -> &AabbTree<StrokeId> {
        &self.index
    }

    /// Bounds of every active stroke.
    pub fn bounds(&self) -> Option<Rect> {
        self.index.bounds()
    }

    /// Confirm that the index and the store agree leaf for leaf.
    pub fn validate(&self) -> Result<(), String> {
        self.index.validate()?;
        if self.index.len() != self.store.len() {
            return Err(format!(
                "index has {} leaves but store has {} strokes",
                self.index.len(),
                self.store.len()
            ));
        }
        for (handle, bbox, id) in self.index.iter() {
            let Some(stroke) = self.store.get(id) else {
                return Err(format!("indexed stroke {id} is missing from the store"));
            };
            if self.store.handle(id) != Some(handle) {
                return Err(format!("stroke {id} caches a stale index handle"));
            }
            if stroke.aabb() != bbox {
                return Err(format!("stroke {id} box differs from its leaf"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn segment(id: StrokeId, x: f64) -> Stroke {
        Stroke::new(id, Point::new(x, 0.0), Point::new(x + 5.0, 0.0), 1.0, None)
    }

    #[test]
    fn test_activate_suspend_keeps_containers_in_sync() {
        let mut active = ActiveStrokes::new();
        for id in 0..20 {
            active.activate(segment(id, id as f64 * 10.0)).unwrap();
        }
        assert!(active.validate().is_ok());

        let s = active.suspend(7).unwrap();
        assert_eq!(s.id(), 7);
        assert!(!active.contains(7));
        assert_eq!(active.len(), 19);
        assert_eq!(active.index().len(), 19);
        assert!(active.validate().is_ok());
    }

    #[test]
    fn test_query_sorted_by_id() {
        let mut active = ActiveStrokes::new();
        for id in [5, 1, 9, 3] {
            active.activate(segment(id, 0.0)).unwrap();
        }
        let ids: Vec<_> = active
            .query(Rect::new(-10.0, -10.0, 10.0, 10.0))
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(ids, vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_duplicate_does_not_touch_index() {
        let mut active = ActiveStrokes::new();
        active.activate(segment(1, 0.0)).unwrap();
        assert_eq!(
            active.activate(segment(1, 50.0)).unwrap_err(),
            StoreError::Duplicate(1)
        );
        assert_eq!(active.index().len(), 1);
        assert!(active.validate().is_ok());
    }

    #[test]
    fn test_suspend_missing() {
        let mut active = ActiveStrokes::new();
        assert_eq!(active.suspend(3).unwrap_err(), StoreError::NotFound(3));
    }
}
