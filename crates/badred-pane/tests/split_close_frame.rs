use badred_ids::BufferId;
use badred_pane::{Frame, PaneTree};

/// A full lifecycle: a root leaf gets split twice, the root frame is set
/// once the terminal size is known, a nested child is closed, and the
/// remaining tree still tiles the whole frame with no gaps or overlaps.
#[test]
fn split_close_frame_lifecycle() {
    let mut tree = PaneTree::new(BufferId::new(1));
    tree.set_root_frame(Frame::new(0, 0, 40, 120));

    let root = tree.root();
    let vsplit = tree.v_split(root).unwrap();
    assert_eq!(tree.root(), vsplit);

    let left = tree.pane_index_down_from(vsplit, true).unwrap();
    let right = tree.pane_index_down_from(vsplit, false).unwrap();

    let left_split = tree.h_split(left).unwrap();
    let top = tree.pane_index_down_from(left_split, true).unwrap();
    let bottom = tree.pane_index_down_from(left_split, false).unwrap();

    let left_frame = tree.frame(left_split).unwrap();
    let top_frame = tree.frame(top).unwrap();
    let bottom_frame = tree.frame(bottom).unwrap();
    assert_eq!(top_frame.rows + bottom_frame.rows, left_frame.rows);
    assert_eq!(top_frame.cols, left_frame.cols);
    assert_eq!(bottom_frame.cols, left_frame.cols);

    let right_frame = tree.frame(right).unwrap();
    assert_eq!(left_frame.cols + right_frame.cols, 120);

    tree.set_active(bottom).unwrap();
    let invalidated = tree.close_child(left_split, false).unwrap();
    assert!(invalidated.contains(&bottom));
    assert!(invalidated.contains(&left_split));
    assert!(!tree.contains(bottom));
    assert!(!tree.contains(left_split));

    // Active pane was inside the removed subtree, so it moves to the
    // surviving sibling that took the split's place.
    assert_eq!(tree.current(), top);

    let new_left_frame = tree.frame(top).unwrap();
    assert_eq!(new_left_frame, left_frame);
    let whole = tree.frame(tree.root()).unwrap();
    assert_eq!(whole, Frame::new(0, 0, 40, 120));
}
