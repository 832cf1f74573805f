//! Fixed-length incremental parser (SPEC_FULL.md §4.C.1).

use super::IncrementalParser;
use crate::unique_array::UniqueArray;

/// Accumulates exactly `N` bytes.
#[derive(Debug)]
pub struct FixedLenParser {
    buf: UniqueArray,
    n: usize,
    overflowed: bool,
}

impl FixedLenParser {
    pub fn new(n: usize) -> Self {
        Self {
            buf: UniqueArray::with_capacity(n),
            n,
            overflowed: false,
        }
    }
}

impl IncrementalParser for FixedLenParser {
    fn feed(&mut self, input: &[u8]) -> (usize, usize) {
        let remaining = self.n - self.buf.size();
        if remaining == 0 {
            if input.is_empty() {
                return (0, 0);
            }
            self.overflowed = true;
            return (0, 0);
        }
        let take = remaining.min(input.len());
        self.buf.append(&input[..take]);
        let remaining_after = self.n - self.buf.size();
        (take, remaining_after)
    }

    fn size(&self) -> usize {
        self.buf.size()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        self.buf.read(offset, out)
    }

    fn clear(&mut self) {
        self.buf.reset();
        self.overflowed = false;
    }
}

impl FixedLenParser {
    pub fn is_complete(&self) -> bool {
        self.buf.size() == self.n
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

impl Default for FixedLenParser {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_exactly_n_bytes() {
        let mut p = FixedLenParser::new(4);
        let (c, needed) = p.feed(&[1, 2]);
        assert_eq!((c, needed), (2, 2));
        let (c, needed) = p.feed(&[3, 4, 5]);
        assert_eq!((c, needed), (2, 0));
        assert!(p.is_complete());
        assert_eq!(p.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn feeding_past_complete_overflows() {
        let mut p = FixedLenParser::new(2);
        p.feed(&[1, 2]);
        assert_eq!(p.feed(&[3]), (0, 0));
        assert!(p.overflowed());
    }

    #[test]
    fn byte_by_byte_matches_single_call() {
        let data = [10u8, 20, 30, 40, 50];
        let mut whole = FixedLenParser::new(5);
        whole.feed(&data);

        let mut incremental = FixedLenParser::new(5);
        for b in &data {
            incremental.feed(&[*b]);
        }
        assert_eq!(whole.as_slice(), incremental.as_slice());
        assert_eq!(whole.size(), incremental.size());
    }
}
