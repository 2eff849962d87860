//! Property-based tests for the dynamic AABB tree.
//!
//! 1. Queries return exactly the live boxes that overlap the query rectangle.
//! 2. Removed boxes never come back from a query.
//! 3. The tree stays structurally valid and balanced after every operation.

use kurbo::Rect;
use proptest::prelude::*;
use strokeplane_core::{AabbTree, LeafHandle};

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn box_strategy() -> impl Strategy<Value = Rect> {
    (-500.0f64..500.0, -500.0f64..500.0, 0.0f64..80.0, 0.0f64..80.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h))
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Rect),
    /// Remove the live entry at this position (modulo the live count).
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => box_strategy().prop_map(Op::Insert),
        1 => any::<usize>().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn query_matches_brute_force(
        ops in prop::collection::vec(op_strategy(), 1..200),
        queries in prop::collection::vec(box_strategy(), 1..8),
    ) {
        let mut tree = AabbTree::new();
        let mut live: Vec<(LeafHandle, Rect, u32)> = Vec::new();
        let mut removed: Vec<u32> = Vec::new();
        let mut next = 0u32;

        for op in ops {
            match op {
                Op::Insert(bbox) => {
                    let handle = tree.insert(bbox, next);
                    live.push((handle, bbox, next));
                    next += 1;
                }
                Op::Remove(i) if !live.is_empty() => {
                    let (handle, _, payload) = live.swap_remove(i % live.len());
                    prop_assert_eq!(tree.remove(handle), Some(payload));
                    prop_assert_eq!(tree.remove(handle), None);
                    removed.push(payload);
                }
                Op::Remove(_) => {}
            }
            prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());
        }
        prop_assert_eq!(tree.len(), live.len());

        for query in queries {
            let mut got: Vec<u32> = tree.query(query).map(|(_, p)| p).collect();
            got.sort_unstable();
            let mut want: Vec<u32> = live
                .iter()
                .filter(|(_, bbox, _)| overlaps(bbox, &query))
                .map(|&(_, _, p)| p)
                .collect();
            want.sort_unstable();
            prop_assert_eq!(&got, &want);
            prop_assert!(got.iter().all(|p| !removed.contains(p)));
        }
    }
}

proptest! {
    #[test]
    fn full_plane_query_sees_everything(boxes in prop::collection::vec(box_strategy(), 0..150)) {
        let mut tree = AabbTree::new();
        for (i, bbox) in boxes.iter().enumerate() {
            tree.insert(*bbox, i);
        }
        let everything = Rect::new(-1e9, -1e9, 1e9, 1e9);
        prop_assert_eq!(tree.query(everything).count(), boxes.len());
        if let Some(bounds) = tree.bounds() {
            for bbox in &boxes {
                prop_assert!(bounds.x0 <= bbox.x0 && bounds.y0 <= bbox.y0);
                prop_assert!(bbox.x1 <= bounds.x1 && bbox.y1 <= bounds.y1);
            }
        }
    }
}
