use badred_text::{BackendKind, Buffer};

/// Drive a naive-backed and a gap-backed buffer through the same sequence
/// of inserts, deletes and cursor moves and check they agree at every
/// step. The storage backend is an implementation detail; nothing
/// observable through `Buffer` should depend on which one is active.
#[test]
fn naive_and_gap_backends_agree_on_a_mixed_op_sequence() {
    let mut naive = Buffer::new();
    let mut gap = Buffer::new();
    gap.set_backend(BackendKind::Gap);

    let ops: &[(&str, i64)] = &[
        ("hello, world\n", 0),
        ("another line\nand one more\n", 0),
        ("", -5),
        ("!", 0),
    ];

    for (text, cursor_delta) in ops {
        naive.insert(text);
        gap.insert(text);
        assert_eq!(naive.content(), gap.content());
        assert_eq!(naive.length(), gap.length());
        assert_eq!(naive.line_count(), gap.line_count());

        if *cursor_delta != 0 {
            let naive_moved = naive.cursor_byte_moved(naive.cursor_byte(), *cursor_delta, false);
            let gap_moved = gap.cursor_byte_moved(gap.cursor_byte(), *cursor_delta, false);
            assert_eq!(naive_moved, gap_moved);
            naive.set_cursor(naive_moved, false).unwrap();
            gap.set_cursor(gap_moved, false).unwrap();
        }
    }

    for line in 0..naive.line_count() {
        assert_eq!(naive.line_content(line), gap.line_content(line));
        assert_eq!(naive.line_length(line), gap.line_length(line));
        assert_eq!(naive.line_start(line), gap.line_start(line));
        assert_eq!(naive.line_end(line), gap.line_end(line));
    }

    let naive_deleted = naive.delete(10);
    let gap_deleted = gap.delete(10);
    assert_eq!(naive_deleted, gap_deleted);
    assert_eq!(naive.content(), gap.content());
}
