//! Shared `\n`-boundary bookkeeping used by both storage backends.
//!
//! Correctness trumps caching: every method here can be rebuilt from raw
//! content via [`LineIndex::rebuild`], which both backends fall back to
//! whenever an incremental update would be more trouble than it's worth.

#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    /// Byte offset of each `\n` in the content, in ascending order.
    newlines: Vec<u32>,
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from scratch by scanning `content`.
    pub fn rebuild(content: &[u8]) -> Self {
        let newlines = content
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| i as u32)
            .collect();
        Self { newlines }
    }

    pub fn line_count(&self) -> u32 {
        self.newlines.len() as u32 + 1
    }

    pub fn line_start(&self, line: u32, total_len: u32) -> u32 {
        if line == 0 {
            return 0;
        }
        match self.newlines.get(line as usize - 1) {
            Some(&pos) => pos + 1,
            None => total_len,
        }
    }

    pub fn line_end(&self, line: u32, total_len: u32) -> u32 {
        match self.newlines.get(line as usize) {
            Some(&pos) => pos,
            None => total_len,
        }
    }

    pub fn line_containing(&self, byte_index: u32) -> u32 {
        // First newline at or after byte_index tells us which line we're on:
        // partition_point finds the count of newlines strictly before byte_index.
        self.newlines.partition_point(|&pos| pos < byte_index) as u32
    }

    /// Shift every newline position at or after `at` by `delta` (signed, but
    /// callers never produce an underflow since deletions remove exactly the
    /// newlines they shift past first).
    pub fn shift_from(&mut self, at: u32, delta: i64) {
        for pos in self.newlines.iter_mut() {
            if *pos >= at {
                *pos = (*pos as i64 + delta) as u32;
            }
        }
    }

    /// Insert newline positions found in `bytes` (inserted at absolute offset
    /// `at`), keeping the vector sorted.
    pub fn insert_newlines(&mut self, at: u32, bytes: &[u8]) {
        self.shift_from(at, bytes.len() as i64);
        let mut inserted: Vec<u32> = bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| at + i as u32)
            .collect();
        if inserted.is_empty() {
            return;
        }
        self.newlines.append(&mut inserted);
        self.newlines.sort_unstable();
    }

    /// Remove any newline positions within `[start, end)` and shift the rest
    /// left by the removed span's length.
    pub fn remove_range(&mut self, start: u32, end: u32) {
        self.newlines.retain(|&pos| pos < start || pos >= end);
        self.shift_from(end, -((end - start) as i64));
    }
}
