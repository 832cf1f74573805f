//! Resumable input buffering (SPEC_FULL.md §4.C.8).
//!
//! Network reads arrive in arbitrary-sized chunks that don't line up with a
//! parser's internal boundaries. `ParserBuffer` wraps any [`IncrementalParser`]
//! and guarantees it only ever sees input in chunks of at least
//! `buffer_size_required` bytes (the parser's own hint of how much more it
//! needs), by holding back a short tail between calls:
//!
//! 1. Top up `pending` from the start of `input` until it reaches the
//!    inner parser's required size (or `input` runs out).
//! 2. If `pending` is non-empty, feed it to the inner parser and clear
//!    whatever was consumed out of it.
//! 3. Feed the inner parser directly with whatever of `input` remains,
//!    then stash any leftover unconsumed tail back into `pending`.

use super::IncrementalParser;

#[derive(Debug)]
pub struct ParserBuffer<P: IncrementalParser> {
    inner: P,
    pending: Vec<u8>,
}

impl<P: IncrementalParser> ParserBuffer<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: IncrementalParser> IncrementalParser for ParserBuffer<P> {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let total_in = input.len();

        // Step 1: top up `pending` toward whatever the inner parser needs,
        // without ever feeding it something we know is too short.
        if !self.pending.is_empty() {
            let needed = self.inner.feed(&[]).1.max(1);
            while self.pending.len() < needed && !input.is_empty() {
                self.pending.push(input[0]);
                input = &input[1..];
            }
        }

        // Step 2: drain `pending` through the inner parser.
        if !self.pending.is_empty() {
            let (c, needed) = self.inner.feed(&self.pending);
            self.pending.drain(..c);
            if needed == 0 && self.pending.is_empty() {
                // inner consumed everything pending; fall through to step 3.
            } else if !self.pending.is_empty() {
                // inner still wants more than we have buffered; keep
                // accumulating from fresh input next call.
                self.pending.extend_from_slice(input);
                return (total_in, needed.max(1));
            }
        }

        // Step 3: feed the inner parser directly from the remaining input.
        let (c, needed) = self.inner.feed(input);
        let leftover = &input[c..];
        if needed == 0 {
            self.pending.clear();
            return (total_in, 0);
        }
        self.pending.extend_from_slice(leftover);
        (total_in, needed)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        self.inner.read(offset, out)
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FixedLenParser;

    #[test]
    fn passes_through_whole_chunks() {
        let mut b = ParserBuffer::new(FixedLenParser::new(4));
        let (consumed, needed) = b.feed(&[1, 2, 3, 4]);
        assert_eq!(consumed, 4);
        assert_eq!(needed, 0);
        assert_eq!(b.inner().as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn buffers_trickled_bytes_until_parser_is_satisfied() {
        let mut b = ParserBuffer::new(FixedLenParser::new(4));
        for byte in [1u8, 2, 3] {
            let (consumed, needed) = b.feed(&[byte]);
            assert_eq!(consumed, 1);
            assert!(needed > 0);
        }
        let (consumed, needed) = b.feed(&[4]);
        assert_eq!(consumed, 1);
        assert_eq!(needed, 0);
        assert_eq!(b.inner().as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn splits_a_chunk_spanning_two_fixed_len_fills() {
        // First FixedLenParser(4) fed manually via two feed calls from one
        // chunk that overruns the 4-byte boundary isn't directly expressible
        // through ParserBuffer (it wraps a single parser instance), so this
        // exercises accumulation across multiple small chunks instead.
        let mut b = ParserBuffer::new(FixedLenParser::new(3));
        let (c1, n1) = b.feed(&[9, 9]);
        assert_eq!(c1, 2);
        assert_eq!(n1, 1);
        let (c2, n2) = b.feed(&[9]);
        assert_eq!(c2, 1);
        assert_eq!(n2, 0);
        assert_eq!(b.inner().as_slice(), &[9, 9, 9]);
    }
}
