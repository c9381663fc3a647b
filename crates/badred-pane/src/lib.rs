//! Pane tree: a binary tree of leaves (bound to a buffer) and splits
//! (percent/fixed), with active-pane tracking and recursive frame
//! computation.
//!
//! Nodes live in an arena keyed by [`PaneId`]; parent/child links are ids,
//! never owning references, so the tree can be mutated (split, close) with
//! only `HashMap` operations instead of juggling borrows of a recursive
//! structure.

use std::collections::HashMap;

use badred_ids::{BufferId, IdGen, PaneId};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaneError {
    #[error("pane {0} does not exist")]
    InvalidPane(PaneId),
    #[error("pane {0} is a leaf; split-only operation")]
    NotASplit(PaneId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitType {
    /// Fraction of the split's dimension given to the first child, in
    /// `[0.0, 1.0]`.
    Percent(f32),
    FirstFixed(u16),
    SecondFixed(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneTypeTag {
    Leaf,
    HSplit,
    VSplit,
}

#[derive(Debug, Clone)]
enum PaneNode {
    Leaf {
        buffer_id: BufferId,
        top_line: u16,
        wrap: bool,
    },
    Split {
        orientation: Orientation,
        first: PaneId,
        second: PaneId,
        split_type: SplitType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub x: u16,
    pub y: u16,
    pub rows: u16,
    pub cols: u16,
}

impl Frame {
    pub fn new(x: u16, y: u16, rows: u16, cols: u16) -> Self {
        Self { x, y, rows, cols }
    }
}

#[derive(Debug)]
pub struct PaneTree {
    nodes: HashMap<PaneId, PaneNode>,
    parent: HashMap<PaneId, PaneId>,
    root: PaneId,
    active: PaneId,
    root_frame: Frame,
    ids: IdGen,
}

impl PaneTree {
    /// Seed a tree with a single leaf pane bound to `buffer_id`, which
    /// becomes both root and active.
    pub fn new(buffer_id: BufferId) -> Self {
        let mut ids = IdGen::new();
        let root = PaneId::new(ids.next_raw());
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            PaneNode::Leaf {
                buffer_id,
                top_line: 0,
                wrap: false,
            },
        );
        Self {
            nodes,
            parent: HashMap::new(),
            root,
            active: root,
            root_frame: Frame::default(),
            ids,
        }
    }

    fn get(&self, id: PaneId) -> Result<&PaneNode, PaneError> {
        self.nodes.get(&id).ok_or(PaneError::InvalidPane(id))
    }

    fn get_mut(&mut self, id: PaneId) -> Result<&mut PaneNode, PaneError> {
        self.nodes.get_mut(&id).ok_or(PaneError::InvalidPane(id))
    }

    pub fn contains(&self, id: PaneId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn root(&self) -> PaneId {
        self.root
    }

    pub fn current(&self) -> PaneId {
        self.active
    }

    pub fn set_active(&mut self, id: PaneId) -> Result<(), PaneError> {
        if !self.contains(id) {
            return Err(PaneError::InvalidPane(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn set_root_frame(&mut self, frame: Frame) {
        self.root_frame = frame;
    }

    /// Whether `id` is its parent's first child. `None` at the root, which
    /// has no parent.
    pub fn pane_is_first(&self, id: PaneId) -> Result<Option<bool>, PaneError> {
        if !self.contains(id) {
            return Err(PaneError::InvalidPane(id));
        }
        let Some(&parent_id) = self.parent.get(&id) else {
            return Ok(None);
        };
        match self.get(parent_id)? {
            PaneNode::Split { first, .. } => Ok(Some(*first == id)),
            PaneNode::Leaf { .. } => unreachable!("a parent entry always points at a split"),
        }
    }

    /// The parent pane id, or `None` at the root.
    pub fn pane_index_up_from(&self, id: PaneId) -> Result<Option<PaneId>, PaneError> {
        if !self.contains(id) {
            return Err(PaneError::InvalidPane(id));
        }
        Ok(self.parent.get(&id).copied())
    }

    /// Descend one level into `id`: the named child if `id` is a split, or
    /// `id` itself (a no-op) if it is a leaf.
    pub fn pane_index_down_from(&self, id: PaneId, to_first: bool) -> Result<PaneId, PaneError> {
        match self.get(id)? {
            PaneNode::Leaf { .. } => Ok(id),
            PaneNode::Split { first, second, .. } => {
                Ok(if to_first { *first } else { *second })
            }
        }
    }

    pub fn pane_type(&self, id: PaneId) -> Result<PaneTypeTag, PaneError> {
        match self.get(id)? {
            PaneNode::Leaf { .. } => Ok(PaneTypeTag::Leaf),
            PaneNode::Split {
                orientation: Orientation::Horizontal,
                ..
            } => Ok(PaneTypeTag::HSplit),
            PaneNode::Split {
                orientation: Orientation::Vertical,
                ..
            } => Ok(PaneTypeTag::VSplit),
        }
    }

    pub fn split_type(&self, id: PaneId) -> Result<SplitType, PaneError> {
        match self.get(id)? {
            PaneNode::Split { split_type, .. } => Ok(*split_type),
            PaneNode::Leaf { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    /// Buffer bound to a leaf, or the nearest first-leaf descendant's buffer
    /// when `id` is itself a split. The source only implements this
    /// correctly for leaves; we preserve that ambiguity rather than
    /// inventing a different resolution rule for splits (see DESIGN.md).
    fn nearest_first_leaf_buffer(&self, id: PaneId) -> Result<BufferId, PaneError> {
        let mut cur = id;
        loop {
            match self.get(cur)? {
                PaneNode::Leaf { buffer_id, .. } => return Ok(*buffer_id),
                PaneNode::Split { first, .. } => cur = *first,
            }
        }
    }

    pub fn buffer_index(&self, id: PaneId) -> Result<BufferId, PaneError> {
        match self.get(id)? {
            PaneNode::Leaf { buffer_id, .. } => Ok(*buffer_id),
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    pub fn set_buffer(&mut self, id: PaneId, buffer_id: BufferId) -> Result<(), PaneError> {
        match self.get_mut(id)? {
            PaneNode::Leaf { buffer_id: b, .. } => {
                *b = buffer_id;
                Ok(())
            }
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    pub fn top_line(&self, id: PaneId) -> Result<u16, PaneError> {
        match self.get(id)? {
            PaneNode::Leaf { top_line, .. } => Ok(*top_line),
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    pub fn set_top_line(&mut self, id: PaneId, line: u16) -> Result<(), PaneError> {
        match self.get_mut(id)? {
            PaneNode::Leaf { top_line, .. } => {
                *top_line = line;
                Ok(())
            }
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    pub fn wrap(&self, id: PaneId) -> Result<bool, PaneError> {
        match self.get(id)? {
            PaneNode::Leaf { wrap, .. } => Ok(*wrap),
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    pub fn set_wrap(&mut self, id: PaneId, value: bool) -> Result<(), PaneError> {
        match self.get_mut(id)? {
            PaneNode::Leaf { wrap, .. } => {
                *wrap = value;
                Ok(())
            }
            PaneNode::Split { .. } => Err(PaneError::NotASplit(id)),
        }
    }

    /// Operations on a leaf are a no-op, matching the source's preference
    /// for silently ignoring split-mutation calls against the wrong node
    /// kind rather than erroring.
    pub fn set_split_percent(
        &mut self,
        id: PaneId,
        percent: f32,
        on_first_child: bool,
    ) -> Result<(), PaneError> {
        if let PaneNode::Split {
            split_type,
            first,
            second,
            ..
        } = self.get_mut(id)?
        {
            let _ = (first, second);
            let clamped = percent.clamp(0.0, 1.0);
            *split_type = SplitType::Percent(if on_first_child {
                clamped
            } else {
                1.0 - clamped
            });
        }
        Ok(())
    }

    /// Stores the new fixed size unconditionally; clamping against the
    /// available dimension happens at frame-computation time, not here
    /// (resize behavior for fixed splits is left undefined by the source).
    pub fn set_split_fixed(
        &mut self,
        id: PaneId,
        size: u16,
        on_first_child: bool,
    ) -> Result<(), PaneError> {
        if let PaneNode::Split { split_type, .. } = self.get_mut(id)? {
            *split_type = if on_first_child {
                SplitType::FirstFixed(size)
            } else {
                SplitType::SecondFixed(size)
            };
        }
        Ok(())
    }

    fn split(&mut self, id: PaneId, orientation: Orientation) -> Result<PaneId, PaneError> {
        if !self.contains(id) {
            return Err(PaneError::InvalidPane(id));
        }
        let sibling_buffer = self.nearest_first_leaf_buffer(id)?;
        let new_leaf = PaneId::new(self.ids.next_raw());
        self.nodes.insert(
            new_leaf,
            PaneNode::Leaf {
                buffer_id: sibling_buffer,
                top_line: 0,
                wrap: false,
            },
        );

        let split_id = PaneId::new(self.ids.next_raw());
        let old_parent = self.parent.get(&id).copied();

        self.nodes.insert(
            split_id,
            PaneNode::Split {
                orientation,
                first: id,
                second: new_leaf,
                split_type: SplitType::Percent(0.5),
            },
        );
        self.parent.insert(id, split_id);
        self.parent.insert(new_leaf, split_id);

        match old_parent {
            Some(parent_id) => {
                self.parent.insert(split_id, parent_id);
                if let Some(PaneNode::Split { first, second, .. }) =
                    self.nodes.get_mut(&parent_id)
                {
                    if *first == id {
                        *first = split_id;
                    } else if *second == id {
                        *second = split_id;
                    }
                }
            }
            None => {
                self.root = split_id;
            }
        }

        debug!(target: "badred_pane", pane = %id, split = %split_id, "split pane");
        Ok(split_id)
    }

    pub fn v_split(&mut self, id: PaneId) -> Result<PaneId, PaneError> {
        self.split(id, Orientation::Vertical)
    }

    pub fn h_split(&mut self, id: PaneId) -> Result<PaneId, PaneError> {
        self.split(id, Orientation::Horizontal)
    }

    /// Collect every pane id in the subtree rooted at `id`, post-order
    /// (children before the node itself).
    fn subtree_ids(&self, id: PaneId, out: &mut Vec<PaneId>) {
        if let Ok(PaneNode::Split { first, second, .. }) = self.get(id) {
            let (first, second) = (*first, *second);
            self.subtree_ids(first, out);
            self.subtree_ids(second, out);
        }
        out.push(id);
    }

    /// Remove the split `id`'s `first_child` (if true) or second child
    /// (if false), along with the split node itself; the surviving child
    /// takes the split's position in the tree. Returns every pane id that
    /// became invalid, in the order a caller should fire `pane_closed`
    /// hooks (deepest descendants first, the direct child last, the split
    /// id itself last of all).
    pub fn close_child(
        &mut self,
        id: PaneId,
        first_child: bool,
    ) -> Result<Vec<PaneId>, PaneError> {
        let (removed, surviving) = match self.get(id)? {
            PaneNode::Split { first, second, .. } => {
                if first_child {
                    (*first, *second)
                } else {
                    (*second, *first)
                }
            }
            PaneNode::Leaf { .. } => return Err(PaneError::NotASplit(id)),
        };

        let mut invalidated = Vec::new();
        self.subtree_ids(removed, &mut invalidated);
        invalidated.push(id);

        let old_parent = self.parent.get(&id).copied();
        self.parent.remove(&surviving);
        match old_parent {
            Some(parent_id) => {
                self.parent.insert(surviving, parent_id);
                if let Some(PaneNode::Split { first, second, .. }) =
                    self.nodes.get_mut(&parent_id)
                {
                    if *first == id {
                        *first = surviving;
                    } else if *second == id {
                        *second = surviving;
                    }
                }
            }
            None => {
                self.root = surviving;
            }
        }

        for dead in &invalidated {
            self.nodes.remove(dead);
            self.parent.remove(dead);
        }

        if invalidated.contains(&self.active) {
            self.active = surviving;
        }

        debug!(target: "badred_pane", pane = %id, invalidated = invalidated.len(), "closed split");
        Ok(invalidated)
    }

    /// Recursively compute `id`'s on-screen frame from the root frame.
    pub fn frame(&self, id: PaneId) -> Result<Frame, PaneError> {
        self.frame_within(self.root, self.root_frame, id)
    }

    fn frame_within(
        &self,
        current: PaneId,
        current_frame: Frame,
        target: PaneId,
    ) -> Result<Frame, PaneError> {
        if current == target {
            return Ok(current_frame);
        }
        match self.get(current)? {
            PaneNode::Leaf { .. } => Err(PaneError::InvalidPane(target)),
            PaneNode::Split {
                orientation,
                first,
                second,
                split_type,
            } => {
                let (first_frame, second_frame) =
                    split_frame(current_frame, *orientation, *split_type);
                if self.subtree_contains(*first, target) {
                    self.frame_within(*first, first_frame, target)
                } else {
                    self.frame_within(*second, second_frame, target)
                }
            }
        }
    }

    fn subtree_contains(&self, root: PaneId, target: PaneId) -> bool {
        if root == target {
            return true;
        }
        match self.nodes.get(&root) {
            Some(PaneNode::Split { first, second, .. }) => {
                self.subtree_contains(*first, target) || self.subtree_contains(*second, target)
            }
            _ => false,
        }
    }
}

fn split_frame(frame: Frame, orientation: Orientation, split_type: SplitType) -> (Frame, Frame) {
    match orientation {
        Orientation::Vertical => {
            let (first_cols, second_cols) = split_dimension(frame.cols, split_type);
            (
                Frame::new(frame.x, frame.y, frame.rows, first_cols),
                Frame::new(frame.x + first_cols, frame.y, frame.rows, second_cols),
            )
        }
        Orientation::Horizontal => {
            let (first_rows, second_rows) = split_dimension(frame.rows, split_type);
            (
                Frame::new(frame.x, frame.y, first_rows, frame.cols),
                Frame::new(frame.x, frame.y + first_rows, second_rows, frame.cols),
            )
        }
    }
}

fn split_dimension(dim: u16, split_type: SplitType) -> (u16, u16) {
    match split_type {
        SplitType::Percent(p) => {
            let first = ((dim as f32) * p).round() as u16;
            let first = first.min(dim);
            (first, dim - first)
        }
        SplitType::FirstFixed(n) => {
            let first = n.min(dim);
            (first, dim - first)
        }
        SplitType::SecondFixed(n) => {
            let second = n.min(dim);
            (dim - second, second)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(n: u32) -> BufferId {
        BufferId::new(n)
    }

    #[test]
    fn single_leaf_is_root_and_active() {
        let tree = PaneTree::new(buf(0));
        assert_eq!(tree.root(), tree.current());
        assert_eq!(tree.pane_is_first(tree.root()).unwrap(), None);
    }

    #[test]
    fn v_split_matches_literal_scenario() {
        let mut tree = PaneTree::new(buf(0));
        let p0 = tree.root();
        let p1 = tree.v_split(p0).unwrap();
        assert_eq!(tree.root(), p1);
        assert_eq!(tree.pane_type(p1).unwrap(), PaneTypeTag::VSplit);
        let p2 = tree.pane_index_down_from(p1, false).unwrap();
        assert_eq!(tree.pane_index_down_from(p1, true).unwrap(), p0);
        assert_eq!(tree.buffer_index(p2).unwrap(), buf(0));
        assert_eq!(tree.pane_is_first(p0).unwrap(), Some(true));
        assert_eq!(tree.pane_is_first(p2).unwrap(), Some(false));
    }

    #[test]
    fn close_child_restores_sibling_and_active() {
        let mut tree = PaneTree::new(buf(0));
        let p0 = tree.root();
        let p1 = tree.v_split(p0).unwrap();
        tree.set_active(p0).unwrap();
        let invalidated = tree.close_child(p1, false).unwrap();
        assert_eq!(tree.root(), p0);
        assert_eq!(tree.current(), p0);
        assert!(!tree.contains(p1));
        assert!(invalidated.len() >= 2); // the removed leaf + the split itself
    }

    #[test]
    fn close_child_moves_active_out_of_removed_subtree() {
        let mut tree = PaneTree::new(buf(0));
        let p0 = tree.root();
        let p1 = tree.v_split(p0).unwrap();
        let p2 = tree.pane_index_down_from(p1, false).unwrap();
        tree.set_active(p2).unwrap();
        tree.close_child(p1, false).unwrap();
        assert_eq!(tree.current(), p0);
    }

    #[test]
    fn invalid_pane_after_close() {
        let mut tree = PaneTree::new(buf(0));
        let p0 = tree.root();
        let p1 = tree.v_split(p0).unwrap();
        let p2 = tree.pane_index_down_from(p1, false).unwrap();
        tree.close_child(p1, false).unwrap();
        assert!(matches!(
            tree.buffer_index(p2),
            Err(PaneError::InvalidPane(_))
        ));
    }

    #[test]
    fn frame_tiling_sums_to_parent_on_split_axis() {
        let mut tree = PaneTree::new(buf(0));
        tree.set_root_frame(Frame::new(0, 0, 24, 80));
        let p0 = tree.root();
        let p1 = tree.v_split(p0).unwrap();
        let p2 = tree.pane_index_down_from(p1, false).unwrap();
        let f0 = tree.frame(p0).unwrap();
        let f2 = tree.frame(p2).unwrap();
        assert_eq!(f0.cols + f2.cols, 80);
        assert_eq!(f0.rows, 24);
        assert_eq!(f2.rows, 24);
        assert_eq!(f0.x, 0);
        assert_eq!(f2.x, f0.cols);
    }

    #[test]
    fn fixed_split_clamps_to_available_dimension() {
        let mut tree = PaneTree::new(buf(0));
        tree.set_root_frame(Frame::new(0, 0, 10, 10));
        let p0 = tree.root();
        let p1 = tree.h_split(p0).unwrap();
        tree.set_split_fixed(p1, 999, true).unwrap();
        let f0 = tree.frame(p0).unwrap();
        assert_eq!(f0.rows, 10);
    }

    #[test]
    fn set_split_percent_on_leaf_is_a_noop() {
        let mut tree = PaneTree::new(buf(0));
        let p0 = tree.root();
        assert!(tree.set_split_percent(p0, 0.3, true).is_ok());
    }
}
