//! Dynamic bounding volume hierarchy used to cull strokes against the view.
//!
//! Every leaf holds exactly one box and a payload (a stroke id in practice).
//! Internal nodes have exactly two children and a box equal to the union of
//! their children's boxes. Insertion walks down by a surface-area heuristic
//! and the path back to the root is rebalanced with tree rotations, so sibling
//! heights never differ by more than one. That keeps the height logarithmic
//! even for long runs of spatially coherent inserts, which is exactly what a
//! freehand drag produces.
//!
//! Cost metrics use the box perimeter rather than the area so that
//! degenerate (zero-width or zero-height) boxes still steer insertion.

use kurbo::Rect;
use std::fmt::Debug;

/// Handle to a leaf of an [`AabbTree`].
///
/// Stays valid until the leaf is removed. Handles are generational: a handle to
/// a removed leaf never aliases a leaf inserted later into the same slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeafHandle {
    index: u32,
    generation: u32,
}

impl LeafHandle {
    fn idx(self) -> NodeIdx {
        NodeIdx(self.index)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(u32);

impl NodeIdx {
    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
enum Kind<P> {
    Leaf(P),
    Internal { left: NodeIdx, right: NodeIdx },
    Free { next: Option<NodeIdx> },
}

#[derive(Clone, Debug)]
struct Node<P> {
    bbox: Rect,
    parent: Option<NodeIdx>,
    /// Leaves are height 0.
    height: u32,
    generation: u32,
    kind: Kind<P>,
}

/// Dynamic AABB tree mapping boxes to copyable payloads.
#[derive(Clone)]
pub struct AabbTree<P: Copy> {
    nodes: Vec<Node<P>>,
    root: Option<NodeIdx>,
    free: Option<NodeIdx>,
    leaves: usize,
}

impl<P: Copy> Default for AabbTree<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive overlap test. Touching boxes count as overlapping.
fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn contains(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

fn perimeter(r: &Rect) -> f64 {
    2.0 * ((r.x1 - r.x0) + (r.y1 - r.y0))
}

impl<P: Copy> AabbTree<P> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            free: None,
            leaves: 0,
        }
    }

    /// Number of live leaves.
    pub fn len(&self) -> usize {
        self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Height of the tree: 0 for a single leaf, 0 for an empty tree.
    pub fn height(&self) -> u32 {
        self.root.map(|r| self.node(r).height).unwrap_or(0)
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Option<Rect> {
        self.root.map(|r| self.node(r).bbox)
    }

    /// Drop every leaf. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for i in 0..self.nodes.len() {
            if !matches!(self.nodes[i].kind, Kind::Free { .. }) {
                self.release(NodeIdx(i as u32));
            }
        }
        self.root = None;
        self.leaves = 0;
    }

    /// Insert a box with its payload and return a handle to the new leaf.
    pub fn insert(&mut self, bbox: Rect, payload: P) -> LeafHandle {
        debug_assert!(
            bbox.x0 <= bbox.x1 && bbox.y0 <= bbox.y1,
            "leaf boxes must be normalized: {bbox:?}"
        );
        let leaf = self.allocate(bbox, Kind::Leaf(payload));
        self.insert_leaf(leaf);
        self.leaves += 1;
        LeafHandle {
            index: leaf.0,
            generation: self.node(leaf).generation,
        }
    }

    /// Remove a leaf, returning its payload. Stale handles return `None`.
    pub fn remove(&mut self, handle: LeafHandle) -> Option<P> {
        let payload = self.get(handle).map(|(_, p)| p)?;
        let leaf = handle.idx();
        self.remove_leaf(leaf);
        self.release(leaf);
        self.leaves -= 1;
        Some(payload)
    }

    /// Look up a live leaf.
    pub fn get(&self, handle: LeafHandle) -> Option<(Rect, P)> {
        let node = self.nodes.get(handle.idx().get())?;
        match node.kind {
            Kind::Leaf(payload) if node.generation == handle.generation => {
                Some((node.bbox, payload))
            }
            _ => None,
        }
    }

    /// All leaves whose box overlaps `rect` (edges inclusive).
    ///
    /// Order is unspecified. Never misses an overlapping leaf.
    pub fn query(&self, rect: Rect) -> Query<'_, P> {
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        Query {
            tree: self,
            rect,
            stack,
        }
    }

    /// Every live leaf, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (LeafHandle, Rect, P)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, node)| match node.kind {
            Kind::Leaf(payload) => Some((
                LeafHandle {
                    index: i as u32,
                    generation: node.generation,
                },
                node.bbox,
                payload,
            )),
            _ => None,
        })
    }

    /// Check the structural invariants, returning a description of the first violation.
    ///
    /// Intended for tests and debug assertions; walks the whole tree.
    pub fn validate(&self) -> Result<(), String> {
        let Some(root) = self.root else {
            return if self.leaves == 0 {
                Ok(())
            } else {
                Err(format!("empty root but {} leaves counted", self.leaves))
            };
        };
        if self.node(root).parent.is_some() {
            return Err("root has a parent".to_string());
        }
        let mut seen_leaves = 0;
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = self.node(i);
            match node.kind {
                Kind::Leaf(_) => {
                    if node.height != 0 {
                        return Err(format!("leaf {} has height {}", i.0, node.height));
                    }
                    seen_leaves += 1;
                }
                Kind::Internal { left, right } => {
                    for child in [left, right] {
                        let c = self.node(child);
                        if c.parent != Some(i) {
                            return Err(format!("node {} has wrong parent link", child.0));
                        }
                        if !contains(&node.bbox, &c.bbox) {
                            return Err(format!("node {} box does not contain child {}", i.0, child.0));
                        }
                    }
                    let (hl, hr) = (self.node(left).height, self.node(right).height);
                    if node.height != 1 + hl.max(hr) {
                        return Err(format!("node {} has stale height", i.0));
                    }
                    if hl.abs_diff(hr) > 1 {
                        return Err(format!("node {} is unbalanced ({hl} vs {hr})", i.0));
                    }
                    stack.push(left);
                    stack.push(right);
                }
                Kind::Free { .. } => return Err(format!("free node {} is reachable", i.0)),
            }
        }
        if seen_leaves != self.leaves {
            return Err(format!(
                "reached {seen_leaves} leaves but {} are counted",
                self.leaves
            ));
        }
        Ok(())
    }

    fn node(&self, i: NodeIdx) -> &Node<P> {
        &self.nodes[i.get()]
    }

    fn node_mut(&mut self, i: NodeIdx) -> &mut Node<P> {
        &mut self.nodes[i.get()]
    }

    fn children(&self, i: NodeIdx) -> (NodeIdx, NodeIdx) {
        match self.node(i).kind {
            Kind::Internal { left, right } => (left, right),
            _ => unreachable!("node {} is not internal", i.0),
        }
    }

    fn allocate(&mut self, bbox: Rect, kind: Kind<P>) -> NodeIdx {
        match self.free {
            Some(i) => {
                let Kind::Free { next } = self.node(i).kind else {
                    unreachable!("free list points at a live node");
                };
                self.free = next;
                let node = self.node_mut(i);
                node.bbox = bbox;
                node.parent = None;
                node.height = 0;
                node.kind = kind;
                i
            }
            None => {
                let i = NodeIdx(u32::try_from(self.nodes.len()).expect("tree exceeds u32 nodes"));
                self.nodes.push(Node {
                    bbox,
                    parent: None,
                    height: 0,
                    generation: 0,
                    kind,
                });
                i
            }
        }
    }

    fn release(&mut self, i: NodeIdx) {
        let next = self.free;
        let node = self.node_mut(i);
        node.generation = node.generation.wrapping_add(1);
        node.parent = None;
        node.kind = Kind::Free { next };
        self.free = Some(i);
    }

    fn insert_leaf(&mut self, leaf: NodeIdx) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };
        let leaf_box = self.node(leaf).bbox;

        // Descend to the leaf whose subtree grows the least. Always pairing with
        // a leaf keeps height changes to one level, which the rotations in
        // `balance` can absorb.
        let mut index = root;
        while let Kind::Internal { left, right } = self.node(index).kind {
            let cost_l = self.descend_cost(left, leaf_box);
            let cost_r = self.descend_cost(right, leaf_box);
            index = if cost_l <= cost_r { left } else { right };
        }

        let sibling = index;
        let old_parent = self.node(sibling).parent;
        let sibling_box = self.node(sibling).bbox;
        let sibling_height = self.node(sibling).height;
        let new_parent = self.allocate(
            sibling_box.union(leaf_box),
            Kind::Internal {
                left: sibling,
                right: leaf,
            },
        );
        self.node_mut(new_parent).parent = old_parent;
        self.node_mut(new_parent).height = sibling_height + 1;
        self.replace_child(old_parent, sibling, new_parent);
        self.node_mut(sibling).parent = Some(new_parent);
        self.node_mut(leaf).parent = Some(new_parent);

        self.refit_from(Some(new_parent));
    }

    fn descend_cost(&self, child: NodeIdx, leaf_box: Rect) -> f64 {
        let node = self.node(child);
        let grown = perimeter(&node.bbox.union(leaf_box));
        match node.kind {
            Kind::Leaf(_) => grown,
            _ => grown - perimeter(&node.bbox),
        }
    }

    fn remove_leaf(&mut self, leaf: NodeIdx) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let parent = self
            .node(leaf)
            .parent
            .expect("non-root leaf always has a parent");
        let grand = self.node(parent).parent;
        let (left, right) = self.children(parent);
        let sibling = if left == leaf { right } else { left };

        self.node_mut(sibling).parent = grand;
        self.replace_child(grand, parent, sibling);
        self.release(parent);
        self.refit_from(grand);
    }

    /// Point `parent`'s link to `old` at `new`, or make `new` the root.
    fn replace_child(&mut self, parent: Option<NodeIdx>, old: NodeIdx, new: NodeIdx) {
        match parent {
            Some(p) => {
                let (left, right) = self.children(p);
                self.node_mut(p).kind = if left == old {
                    Kind::Internal { left: new, right }
                } else {
                    Kind::Internal { left, right: new }
                };
            }
            None => self.root = Some(new),
        }
    }

    /// Walk to the root, rebalancing and refreshing boxes and heights.
    fn refit_from(&mut self, start: Option<NodeIdx>) {
        let mut current = start;
        while let Some(i) = current {
            let i = self.balance(i);
            self.refit_node(i);
            current = self.node(i).parent;
        }
    }

    fn refit_node(&mut self, i: NodeIdx) {
        let (left, right) = self.children(i);
        let (l, r) = (self.node(left), self.node(right));
        let bbox = l.bbox.union(r.bbox);
        let height = 1 + l.height.max(r.height);
        let node = self.node_mut(i);
        node.bbox = bbox;
        node.height = height;
    }

    /// Rotate `a` if its subtrees differ in height by more than one.
    /// Returns the node now occupying `a`'s position.
    fn balance(&mut self, a: NodeIdx) -> NodeIdx {
        let (b, c) = self.children(a);
        let hb = self.node(b).height;
        let hc = self.node(c).height;
        if hc > hb + 1 {
            self.rotate_up(a, b, c, true)
        } else if hb > hc + 1 {
            self.rotate_up(a, c, b, false)
        } else {
            a
        }
    }

    /// Promote `up` (a child of `a`) into `a`'s place.
    ///
    /// `a` keeps `stay` and adopts the shorter child of `up`; `up` takes `a`
    /// and its taller child.
    fn rotate_up(&mut self, a: NodeIdx, stay: NodeIdx, up: NodeIdx, up_was_right: bool) -> NodeIdx {
        let (f, g) = self.children(up);
        let (taller, shorter) = if self.node(f).height > self.node(g).height {
            (f, g)
        } else {
            (g, f)
        };

        let grand = self.node(a).parent;
        self.node_mut(up).parent = grand;
        self.replace_child(grand, a, up);

        self.node_mut(a).kind = if up_was_right {
            Kind::Internal {
                left: stay,
                right: shorter,
            }
        } else {
            Kind::Internal {
                left: shorter,
                right: stay,
            }
        };
        self.node_mut(a).parent = Some(up);
        self.node_mut(shorter).parent = Some(a);

        self.node_mut(up).kind = Kind::Internal {
            left: a,
            right: taller,
        };
        self.refit_node(a);
        self.refit_node(up);
        up
    }
}

impl<P: Copy> Debug for AabbTree<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AabbTree")
            .field("leaves", &self.leaves)
            .field("arena_nodes", &self.nodes.len())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`AabbTree::query`].
#[derive(Debug)]
pub struct Query<'a, P: Copy> {
    tree: &'a AabbTree<P>,
    rect: Rect,
    stack: Vec<NodeIdx>,
}

impl<P: Copy> Iterator for Query<'_, P> {
    type Item = (LeafHandle, P);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(i) = self.stack.pop() {
            let node = self.tree.node(i);
            if !overlaps(&node.bbox, &self.rect) {
                continue;
            }
            match node.kind {
                Kind::Leaf(payload) => {
                    return Some((
                        LeafHandle {
                            index: i.0,
                            generation: node.generation,
                        },
                        payload,
                    ));
                }
                Kind::Internal { left, right } => {
                    self.stack.push(left);
                    self.stack.push(right);
                }
                Kind::Free { .. } => unreachable!("free node {} reachable from root", i.0),
            }
        }
        None
    }
}
