//! Owning, move-only byte buffer — the segment unit produced by every
//! incremental parser (SPEC_FULL.md §4.B).
//!
//! The C++ original (`src/unique_array.h`) hand-rolls move-only semantics
//! because the language has no tracked ownership by default. Rust's `Vec<u8>`
//! already gives move-only-by-default semantics for free; `UniqueArray`
//! simply declines to derive `Clone` so the same discipline holds here, and
//! wraps the operations the parsers actually need (`append`, `shrink_to_fit`,
//! positional `read`, `reset`).

/// An owning, non-copyable byte buffer.
#[derive(Debug, Default)]
pub struct UniqueArray {
    data: Vec<u8>,
}

impl UniqueArray {
    /// An empty buffer with no reserved capacity.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// An empty buffer pre-reserved to hold at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Appends `bytes` to the end of the buffer, growing capacity
    /// geometrically as needed (the default behaviour of `Vec::extend`).
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Total number of bytes currently held.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Shrinks backing storage to exactly fit the current contents.
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Releases all storage, leaving an empty buffer.
    pub fn reset(&mut self) {
        self.data = Vec::new();
    }

    /// Copies up to `out.len()` bytes starting at `offset` into `out`,
    /// returning the number of bytes actually copied. Reading at or past
    /// the end of the buffer returns `0`.
    pub fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        if offset >= self.data.len() {
            return 0;
        }
        let available = self.data.len() - offset;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.data[offset..offset + n]);
        n
    }

    /// Borrows the full contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consumes `self`, handing the backing `Vec<u8>` to the caller. This is
    /// the "move out, don't copy" exit point parsers use once a segment is
    /// complete (SPEC_FULL.md §3.4).
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for UniqueArray {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_round_trip() {
        let mut arr = UniqueArray::new();
        arr.append(&[1, 2, 3, 4, 5]);
        assert_eq!(arr.size(), 5);
        let mut out = [0u8; 3];
        assert_eq!(arr.read(1, &mut out), 3);
        assert_eq!(out, [2, 3, 4]);
    }

    #[test]
    fn read_past_end_returns_zero() {
        let mut arr = UniqueArray::new();
        arr.append(&[1, 2, 3]);
        let mut out = [0u8; 4];
        assert_eq!(arr.read(10, &mut out), 0);
        assert_eq!(arr.read(3, &mut out), 0);
    }

    #[test]
    fn reset_releases_storage() {
        let mut arr = UniqueArray::new();
        arr.append(&[1, 2, 3]);
        arr.reset();
        assert_eq!(arr.size(), 0);
    }
}
