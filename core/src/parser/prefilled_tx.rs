//! Prefilled-transaction parser (SPEC_FULL.md §4.C.4): a compact-size
//! `index` followed by one full transaction, used by `cmpctblock`'s list of
//! transactions the sender chose to include in full rather than as a
//! short-ID.

use super::compact_size_reader::CompactSizeReader;
use super::tx::TxParser;
use super::IncrementalParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Index,
    Tx,
    Done,
}

#[derive(Debug)]
pub struct PrefilledTxParser {
    phase: Phase,
    index: CompactSizeReader,
    tx: TxParser,
    total_size: usize,
}

impl PrefilledTxParser {
    pub fn new() -> Self {
        Self {
            phase: Phase::Index,
            index: CompactSizeReader::new(),
            tx: TxParser::new(),
            total_size: 0,
        }
    }

    pub fn index(&self) -> Option<u64> {
        self.index
            .is_resolved()
            .then(|| crate::primitives::parse_compact_size(self.index.raw()).1)
    }
}

impl Default for PrefilledTxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser for PrefilledTxParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        loop {
            match self.phase {
                Phase::Index => {
                    if input.is_empty() {
                        self.total_size += consumed;
                        return (consumed, self.index.needed());
                    }
                    let (c, done) = self.index.feed(input);
                    input = &input[c..];
                    consumed += c;
                    if done.is_none() {
                        self.total_size += consumed;
                        return (consumed, self.index.needed());
                    }
                    self.phase = Phase::Tx;
                }
                Phase::Tx => {
                    let (c, needed) = self.tx.feed(input);
                    input = &input[c..];
                    consumed += c;
                    if needed > 0 {
                        self.total_size += consumed;
                        return (consumed, needed);
                    }
                    self.phase = Phase::Done;
                    self.total_size += consumed;
                    return (consumed, 0);
                }
                Phase::Done => return (0, 0),
            }
        }
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let mut offset = offset;
        let mut written = super::copy_from_piece(self.index.raw(), &mut offset, out);
        if written < out.len() {
            written += super::copy_from_piece(&self.tx.snapshot(), &mut offset, &mut out[written..]);
        }
        written
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::encode_compact_size;

    fn minimal_tx_bytes() -> Vec<u8> {
        let mut out = vec![1, 0, 0, 0];
        out.extend(encode_compact_size(0)); // no inputs
        out.extend(encode_compact_size(0)); // no outputs
        out.extend(0u32.to_le_bytes());
        out
    }

    #[test]
    fn parses_index_then_tx() {
        let mut wire = encode_compact_size(3);
        wire.extend(minimal_tx_bytes());
        let mut p = PrefilledTxParser::new();
        let (consumed, needed) = p.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert_eq!(p.index(), Some(3));
        assert_eq!(p.snapshot(), wire);
    }
}
