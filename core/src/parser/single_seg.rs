//! Single-segment parser (SPEC_FULL.md §4.C.2): the default parser for
//! unknown or short P2P messages. Appends all input to one ever-growing
//! segment and never reports needing more — the message-buffer layer
//! (§4.D) is responsible for knowing when the payload is complete, via the
//! header's declared length.

use super::IncrementalParser;
use crate::unique_array::UniqueArray;

#[derive(Debug, Default)]
pub struct SingleSegParser {
    buf: UniqueArray,
}

impl SingleSegParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncrementalParser for SingleSegParser {
    fn feed(&mut self, input: &[u8]) -> (usize, usize) {
        self.buf.append(input);
        (input.len(), 0)
    }

    fn size(&self) -> usize {
        self.buf.size()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        self.buf.read(offset, out)
    }

    fn clear(&mut self) {
        self.buf.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorbs_everything_fed() {
        let mut p = SingleSegParser::new();
        assert_eq!(p.feed(&[1, 2, 3]), (3, 0));
        assert_eq!(p.feed(&[4, 5]), (2, 0));
        assert_eq!(p.snapshot(), vec![1, 2, 3, 4, 5]);
    }
}
