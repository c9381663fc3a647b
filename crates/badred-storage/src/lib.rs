//! Pluggable byte-level storage backends for a text buffer.
//!
//! A [`TextStorage`] is a mutable byte container addressed by raw byte
//! offsets. It does not know about UTF-8 codepoint boundaries; that
//! discipline is enforced one layer up, in `badred-text`. Both backends here
//! additionally expose a line index (`\n`-delimited) because the line
//! bookkeeping strategy differs enough between them to be worth keeping
//! backend-local: the naive backend recomputes it from content, the gap
//! backend maintains it incrementally alongside the gap.

mod gap;
mod line_index;
mod naive;

pub use gap::GapStorage;
pub use line_index::LineIndex;
pub use naive::NaiveStorage;

/// Common contract implemented by every storage backend.
///
/// All positional arguments are raw byte offsets. Implementors do not
/// validate UTF-8 codepoint boundaries; callers that need boundary safety
/// enforce it themselves before calling in.
pub trait TextStorage: std::fmt::Debug {
    /// Insert `bytes` at `byte_index`, shifting subsequent content right.
    fn insert(&mut self, byte_index: u32, bytes: &[u8]);

    /// Remove `byte_count` bytes starting at `byte_index`, returning them.
    /// Clamped so that `byte_index + byte_count` never exceeds `len()`.
    fn delete(&mut self, byte_index: u32, byte_count: u32) -> Vec<u8>;

    /// Return a copy of `byte_count` bytes starting at `byte_index`, clamped
    /// to the content length.
    fn slice(&self, byte_index: u32, byte_count: u32) -> Vec<u8>;

    /// Total length in bytes.
    fn len(&self) -> u32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lines (`\n` count + 1`); always at least 1.
    fn line_count(&self) -> u32;

    /// Byte offset of the first byte of `line`. Clamped to `len()` if `line`
    /// is past the last line.
    fn line_start(&self, line: u32) -> u32;

    /// Byte offset one past the last content byte of `line`, i.e. the
    /// position of its terminating `\n` or `len()` for the final line.
    fn line_end(&self, line: u32) -> u32;

    /// The line index containing `byte_index`. Clamped to the last line for
    /// an out-of-range offset.
    fn line_containing(&self, byte_index: u32) -> u32;

    /// Materialize the full content. Used when switching backend variants
    /// so the new backend can be seeded byte-for-byte.
    fn to_bytes(&self) -> Vec<u8>;
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    fn exercise(mut storage: Box<dyn TextStorage>) {
        assert_eq!(storage.len(), 0);
        assert_eq!(storage.line_count(), 1);

        storage.insert(0, b"hello\nworld");
        assert_eq!(storage.len(), 11);
        assert_eq!(storage.line_count(), 2);
        assert_eq!(storage.line_start(0), 0);
        assert_eq!(storage.line_end(0), 5);
        assert_eq!(storage.line_start(1), 6);
        assert_eq!(storage.line_end(1), 11);
        assert_eq!(storage.line_containing(0), 0);
        assert_eq!(storage.line_containing(5), 0);
        assert_eq!(storage.line_containing(6), 1);
        assert_eq!(storage.line_containing(11), 1);

        let removed = storage.delete(5, 1);
        assert_eq!(removed, b"\n");
        assert_eq!(storage.line_count(), 1);
        assert_eq!(storage.to_bytes(), b"helloworld");

        let slice = storage.slice(0, 5);
        assert_eq!(slice, b"hello");
    }

    #[test]
    fn naive_satisfies_contract() {
        exercise(Box::new(NaiveStorage::new()));
    }

    #[test]
    fn gap_satisfies_contract() {
        exercise(Box::new(GapStorage::new()));
    }
}
