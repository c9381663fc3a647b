//! Buffer engine: wraps a pluggable [`badred_storage::TextStorage`] with the
//! UTF-8 boundary discipline, sticky-column cursor, line index, and file
//! linkage state described by the buffer contract.
//!
//! This crate does no disk I/O. `link_file`/`write_to_file` accept or return
//! the bytes an external file-I/O collaborator already read or is about to
//! write; the crate only tracks which [`FileId`] a buffer is linked to.

mod style;
mod utf8;

pub use badred_ids::{BufferId, FileId};
pub use style::StyleRule;

use badred_storage::{GapStorage, NaiveStorage, TextStorage};
use thiserror::Error;

/// Error conditions a [`Buffer`] method can fail with. Distinct from the
/// bridge-wide `RedError`; the bridge layer wraps these into its own
/// taxonomy when forwarding a `RedCall` failure to a script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer already linked to a file")]
    AlreadyLinked,
    #[error("buffer is not linked to a file")]
    NotLinked,
    #[error("index {0} is out of bounds")]
    OutOfBounds(u32),
    #[error("byte index {0} does not lie on a UTF-8 codepoint boundary")]
    BoundaryViolation(u32),
}

/// Which storage backend a buffer currently uses. Mirrors the script-facing
/// `EditorBufferType` tagged enum (`naive` | `gap`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Naive,
    Gap,
}

fn new_backend(kind: BackendKind) -> Box<dyn TextStorage> {
    match kind {
        BackendKind::Naive => Box::new(NaiveStorage::new()),
        BackendKind::Gap => Box::new(GapStorage::new()),
    }
}

fn backend_from_bytes(kind: BackendKind, bytes: Vec<u8>) -> Box<dyn TextStorage> {
    match kind {
        BackendKind::Naive => Box::new(NaiveStorage::from_bytes(bytes)),
        BackendKind::Gap => Box::new(GapStorage::from_bytes(bytes)),
    }
}

#[derive(Debug)]
pub struct Buffer {
    storage: Box<dyn TextStorage>,
    backend_kind: BackendKind,
    cursor_byte: u32,
    column_byte: Option<u32>,
    file_id: Option<FileId>,
    styles: Vec<StyleRule>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            storage: new_backend(BackendKind::Naive),
            backend_kind: BackendKind::Naive,
            cursor_byte: 0,
            column_byte: None,
            file_id: None,
            styles: Vec::new(),
        }
    }

    pub fn from_str(content: &str) -> Self {
        Self {
            storage: backend_from_bytes(BackendKind::Naive, content.as_bytes().to_vec()),
            backend_kind: BackendKind::Naive,
            cursor_byte: 0,
            column_byte: None,
            file_id: None,
            styles: Vec::new(),
        }
    }

    // ---- content -----------------------------------------------------

    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.storage.to_bytes()).into_owned()
    }

    pub fn content_at(&self, byte_index: u32, char_count: u32) -> String {
        let end = utf8::move_by_chars(self.storage.as_ref(), byte_index, char_count as i64);
        let bytes = self.storage.slice(byte_index, end.saturating_sub(byte_index));
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn length(&self) -> u32 {
        self.storage.len()
    }

    pub fn clear(&mut self) {
        let len = self.storage.len();
        self.storage.delete(0, len);
        self.cursor_byte = 0;
        self.column_byte = None;
    }

    // ---- editing -------------------------------------------------------

    /// Insert `content` at the cursor; advances the cursor by its byte
    /// length and clears the sticky column.
    pub fn insert(&mut self, content: &str) {
        self.storage.insert(self.cursor_byte, content.as_bytes());
        self.cursor_byte += content.len() as u32;
        self.column_byte = None;
    }

    /// Delete the next `char_count` codepoints starting at the cursor,
    /// stopping at the buffer's length, and return what was removed.
    pub fn delete(&mut self, char_count: u32) -> String {
        let end = utf8::move_by_chars(self.storage.as_ref(), self.cursor_byte, char_count as i64);
        let removed = self.storage.delete(self.cursor_byte, end.saturating_sub(self.cursor_byte));
        self.column_byte = None;
        String::from_utf8_lossy(&removed).into_owned()
    }

    // ---- cursor ----------------------------------------------------------

    pub fn cursor_byte(&self) -> u32 {
        self.cursor_byte
    }

    /// Advance/retreat `|char_delta|` codepoints from `from`, clamped at
    /// `[0, length]`. The only sanctioned way to step across a multibyte
    /// character. When `skip_newlines` is set, the result is passed through
    /// [`Buffer::apply_skip_newline_policy`] before returning.
    pub fn cursor_byte_moved(&self, from: u32, char_delta: i64, skip_newlines: bool) -> u32 {
        let moved = utf8::move_by_chars(self.storage.as_ref(), from, char_delta);
        if skip_newlines {
            self.apply_skip_newline_policy(moved, char_delta)
        } else {
            moved
        }
    }

    /// Same computation as [`Buffer::cursor_byte_moved`] but from an
    /// arbitrary index rather than necessarily the current cursor.
    pub fn index_moved(&self, index: u32, char_delta: i64, skip_newlines: bool) -> u32 {
        let moved = utf8::move_by_chars(self.storage.as_ref(), index, char_delta);
        if skip_newlines {
            self.apply_skip_newline_policy(moved, char_delta)
        } else {
            moved
        }
    }

    /// Place the cursor at `byte_index`. `byte_index` must lie on a
    /// codepoint boundary or equal `length()`. When `keep_col` is false the
    /// sticky column is cleared; otherwise it is preserved.
    pub fn set_cursor(&mut self, byte_index: u32, keep_col: bool) -> Result<(), BufferError> {
        if byte_index > self.length() {
            return Err(BufferError::OutOfBounds(byte_index));
        }
        if !utf8::is_boundary(self.storage.as_ref(), byte_index) {
            return Err(BufferError::BoundaryViolation(byte_index));
        }
        self.cursor_byte = byte_index;
        if !keep_col {
            self.column_byte = None;
        }
        Ok(())
    }

    /// Place the cursor on `line`, at the byte offset closest to the sticky
    /// column (falling back to the current column when none is set yet),
    /// without updating the sticky column itself.
    pub fn set_cursor_line(&mut self, line: u32) {
        let line = line.min(self.line_count().saturating_sub(1));
        let start = self.storage.line_start(line);
        let line_len = self.line_length(line);
        let current_column = self.cursor_byte.saturating_sub(self.storage.line_start(
            self.storage.line_containing(self.cursor_byte),
        ));
        let target_column = self.column_byte.unwrap_or(current_column);
        if self.column_byte.is_none() {
            self.column_byte = Some(target_column);
        }
        let raw = start + target_column.min(line_len);
        self.cursor_byte = utf8::prev_boundary_at_or_before(self.storage.as_ref(), raw);
    }

    pub fn cursor_up(&mut self, lines: u32) {
        let cur = self.cursor_line();
        self.set_cursor_line(cur.saturating_sub(lines));
    }

    pub fn cursor_down(&mut self, lines: u32) {
        let cur = self.cursor_line();
        self.set_cursor_line(cur.saturating_add(lines));
    }

    pub fn cursor_line(&self) -> u32 {
        self.storage.line_containing(self.cursor_byte)
    }

    pub fn cursor_line_content(&self) -> String {
        self.line_content(self.cursor_line())
    }

    pub fn cursor_content(&self) -> String {
        self.content_at(self.cursor_byte, 1)
    }

    // ---- lines -----------------------------------------------------------

    pub fn line_count(&self) -> u32 {
        self.storage.line_count()
    }

    pub fn line_for_index(&self, byte: u32) -> u32 {
        self.storage.line_containing(byte.min(self.length()))
    }

    pub fn line_length(&self, line: u32) -> u32 {
        self.storage.line_end(line) - self.storage.line_start(line)
    }

    pub fn line_start(&self, line: u32) -> u32 {
        self.storage.line_start(line)
    }

    pub fn line_end(&self, line: u32) -> u32 {
        self.storage.line_end(line)
    }

    pub fn line_content(&self, line: u32) -> String {
        let start = self.storage.line_start(line);
        let end = self.storage.line_end(line);
        String::from_utf8_lossy(&self.storage.slice(start, end - start)).into_owned()
    }

    /// Resolve a motion endpoint subject to the skip-newline policy: if the
    /// resulting cursor lands on a `\n` that is not the sole character on
    /// its line, step one codepoint further in the direction of travel.
    /// Purely empty lines are left untouched.
    pub fn apply_skip_newline_policy(&self, byte_index: u32, direction: i64) -> u32 {
        if direction == 0 || byte_index >= self.length() {
            return byte_index;
        }
        let on_newline = self
            .storage
            .slice(byte_index, 1)
            .first()
            .is_some_and(|&b| b == b'\n');
        if !on_newline {
            return byte_index;
        }
        let line = self.storage.line_containing(byte_index);
        if self.line_length(line) == 0 {
            return byte_index;
        }
        utf8::move_by_chars(self.storage.as_ref(), byte_index, direction.signum())
    }

    // ---- backend ------------------------------------------------------

    pub fn backend(&self) -> BackendKind {
        self.backend_kind
    }

    /// Change the storage backend, preserving content, cursor, and file
    /// linkage byte-for-byte. A no-op when already on `kind`.
    pub fn set_backend(&mut self, kind: BackendKind) {
        if kind == self.backend_kind {
            return;
        }
        let bytes = self.storage.to_bytes();
        self.storage = backend_from_bytes(kind, bytes);
        self.backend_kind = kind;
    }

    // ---- file linkage ---------------------------------------------------

    pub fn file_id(&self) -> Option<FileId> {
        self.file_id
    }

    /// Link this buffer to `file_id`. `loaded_content` is `Some(bytes)` when
    /// the caller wants the buffer's content replaced with bytes it already
    /// read from disk (the `overwrite` case); `None` leaves content as-is.
    /// Fails if the buffer is already linked.
    pub fn link_file(
        &mut self,
        file_id: FileId,
        loaded_content: Option<Vec<u8>>,
    ) -> Result<(), BufferError> {
        if self.file_id.is_some() {
            return Err(BufferError::AlreadyLinked);
        }
        self.file_id = Some(file_id);
        if let Some(bytes) = loaded_content {
            self.storage = backend_from_bytes(self.backend_kind, bytes);
            self.cursor_byte = self.cursor_byte.min(self.length());
            self.column_byte = None;
        }
        Ok(())
    }

    pub fn unlink_file(&mut self) -> Result<FileId, BufferError> {
        self.file_id.take().ok_or(BufferError::NotLinked)
    }

    /// Returns the linked file id and the bytes to persist. Fails if the
    /// buffer is not linked; the caller performs the actual disk write.
    pub fn write_to_file(&self) -> Result<(FileId, Vec<u8>), BufferError> {
        let file_id = self.file_id.ok_or(BufferError::NotLinked)?;
        Ok((file_id, self.storage.to_bytes()))
    }

    // ---- styles (opaque forwarding) --------------------------------------

    pub fn clear_styles(&mut self) {
        self.styles.clear();
    }

    pub fn push_style(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.styles.push(StyleRule::new(name, pattern));
    }

    pub fn styles(&self) -> &[StyleRule] {
        &self.styles
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete_scenario() {
        let mut b = Buffer::new();
        b.insert("héllo");
        b.set_cursor(0, false).unwrap();
        let removed = b.delete(2);
        assert_eq!(removed, "h\u{e9}");
        assert_eq!(b.content(), "llo");
        assert_eq!(b.cursor_byte(), 0);
        assert_eq!(b.length(), 3);
    }

    #[test]
    fn vertical_motion_with_sticky_column() {
        let mut b = Buffer::from_str("abc\n12\nxyz");
        b.set_cursor(2, false).unwrap();
        b.cursor_down(1);
        assert_eq!(b.cursor_byte(), 6);
        b.cursor_down(1);
        assert_eq!(b.cursor_byte(), 9);
    }

    #[test]
    fn empty_buffer_has_one_line_of_length_zero() {
        let b = Buffer::new();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line_length(0), 0);
    }

    #[test]
    fn set_cursor_rejects_non_boundary() {
        let mut b = Buffer::from_str("é");
        assert_eq!(
            b.set_cursor(1, false),
            Err(BufferError::BoundaryViolation(1))
        );
    }

    #[test]
    fn link_file_rejects_double_link() {
        let mut b = Buffer::new();
        b.link_file(FileId::new(0), None).unwrap();
        assert_eq!(
            b.link_file(FileId::new(1), None),
            Err(BufferError::AlreadyLinked)
        );
    }

    #[test]
    fn write_to_file_requires_link() {
        let b = Buffer::new();
        assert_eq!(b.write_to_file(), Err(BufferError::NotLinked));
    }

    #[test]
    fn set_backend_preserves_content_and_cursor() {
        let mut b = Buffer::from_str("hello world");
        b.set_cursor(5, false).unwrap();
        b.set_backend(BackendKind::Gap);
        assert_eq!(b.content(), "hello world");
        assert_eq!(b.cursor_byte(), 5);
        // idempotent
        b.set_backend(BackendKind::Gap);
        assert_eq!(b.content(), "hello world");
        assert_eq!(b.cursor_byte(), 5);
    }

    #[test]
    fn backend_equivalence_for_a_sequence_of_ops() {
        let mut naive = Buffer::new();
        naive.insert("abc");
        naive.insert("d");
        naive.set_cursor(1, false).unwrap();
        naive.delete(2);

        let mut gap = Buffer::new();
        gap.set_backend(BackendKind::Gap);
        gap.insert("abc");
        gap.insert("d");
        gap.set_cursor(1, false).unwrap();
        gap.delete(2);

        assert_eq!(naive.content(), "ad");
        assert_eq!(gap.content(), "ad");
        assert_eq!(naive.content(), gap.content());
    }

    #[test]
    fn line_round_trip_for_every_line() {
        let b = Buffer::from_str("one\ntwo\nthree\n");
        for line in 0..b.line_count() {
            let start = b.line_start(line);
            assert_eq!(b.line_for_index(start), line);
        }
    }

    #[test]
    fn skip_newlines_steps_past_a_non_empty_lines_break() {
        let b = Buffer::from_str("ab\ncd");
        assert_eq!(b.cursor_byte_moved(1, 1, false), 2);
        assert_eq!(b.cursor_byte_moved(1, 1, true), 3);
    }

    #[test]
    fn skip_newlines_leaves_purely_empty_lines_untouched() {
        let b = Buffer::from_str("ab\n\ncd");
        assert_eq!(b.cursor_byte_moved(2, 1, false), 3);
        assert_eq!(b.cursor_byte_moved(2, 1, true), 3);
    }
}
