//! Fixed-length multi parser (SPEC_FULL.md §4.C.6): `compact-size(n) ‖ F ‖
//! F ‖ …`, each `F` a fixed number of bytes, used for the short-ID list of
//! a compact block. Items are grouped into segments of up to `k` items each
//! so a single message can be spread across many separately-allocated
//! segments rather than one giant allocation.

use super::compact_size_reader::CompactSizeReader;
use super::IncrementalParser;

#[derive(Debug)]
pub struct FixedLenMultiParser {
    item_len: usize,
    items_per_segment: usize,
    count: CompactSizeReader,
    count_resolved: bool,
    n: u64,
    done: u64,
    cur_item: Vec<u8>,
    current_segment: Vec<u8>,
    items_in_segment: usize,
    segments: Vec<Vec<u8>>,
    total_size: usize,
    complete: bool,
}

impl FixedLenMultiParser {
    pub fn new(item_len: usize, items_per_segment: usize) -> Self {
        Self {
            item_len,
            items_per_segment: items_per_segment.max(1),
            count: CompactSizeReader::new(),
            count_resolved: false,
            n: 0,
            done: 0,
            cur_item: Vec::with_capacity(item_len),
            current_segment: Vec::new(),
            items_in_segment: 0,
            segments: Vec::new(),
            total_size: 0,
            complete: false,
        }
    }

    fn flush_segment(&mut self) {
        if !self.current_segment.is_empty() {
            self.segments.push(std::mem::take(&mut self.current_segment));
            self.items_in_segment = 0;
        }
    }

    /// The completed segments, each up to `items_per_segment * item_len`
    /// bytes.
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Default for FixedLenMultiParser {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl IncrementalParser for FixedLenMultiParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        loop {
            if !self.count_resolved {
                if input.is_empty() {
                    self.total_size += consumed;
                    return (consumed, self.count.needed());
                }
                let (c, done) = self.count.feed(input);
                input = &input[c..];
                consumed += c;
                match done {
                    None => {
                        self.total_size += consumed;
                        return (consumed, self.count.needed());
                    }
                    Some(v) => {
                        self.n = v;
                        self.count_resolved = true;
                        if self.n == 0 {
                            self.complete = true;
                            self.total_size += consumed;
                            return (consumed, 0);
                        }
                    }
                }
                continue;
            }

            if self.complete {
                return (0, 0);
            }

            let remaining_for_item = self.item_len - self.cur_item.len();
            if remaining_for_item == 0 {
                self.current_segment.extend_from_slice(&self.cur_item);
                self.cur_item.clear();
                self.items_in_segment += 1;
                self.done += 1;
                if self.items_in_segment == self.items_per_segment {
                    self.flush_segment();
                }
                if self.done == self.n {
                    self.flush_segment();
                    self.complete = true;
                    self.total_size += consumed;
                    return (consumed, 0);
                }
                continue;
            }

            if input.is_empty() {
                self.total_size += consumed;
                return (consumed, remaining_for_item);
            }
            let take = remaining_for_item.min(input.len());
            self.cur_item.extend_from_slice(&input[..take]);
            input = &input[take..];
            consumed += take;
        }
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let mut offset = offset;
        let mut written = super::copy_from_piece(self.count.raw(), &mut offset, out);
        for seg in &self.segments {
            if written == out.len() {
                break;
            }
            written += super::copy_from_piece(seg, &mut offset, &mut out[written..]);
        }
        if written < out.len() && !self.current_segment.is_empty() {
            written += super::copy_from_piece(&self.current_segment, &mut offset, &mut out[written..]);
        }
        written
    }

    fn clear(&mut self) {
        let item_len = self.item_len;
        let items_per_segment = self.items_per_segment;
        *self = Self::new(item_len, items_per_segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::encode_compact_size;

    #[test]
    fn groups_items_into_segments() {
        let mut wire = encode_compact_size(5);
        for i in 0u8..5 {
            wire.extend([i, i, i]); // item_len = 3
        }
        let mut p = FixedLenMultiParser::new(3, 2);
        let (consumed, needed) = p.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert!(p.is_complete());
        // 5 items at 2 per segment -> segments of 2, 2, 1 items
        assert_eq!(p.segments().len(), 3);
        assert_eq!(p.segments()[0].len(), 6);
        assert_eq!(p.segments()[2].len(), 3);
        assert_eq!(p.snapshot(), wire);
    }

    #[test]
    fn cmpctblock_short_id_sizing() {
        // short-IDs are 6 bytes, default segment size 1000 per SPEC_FULL §3.3.
        let mut p = FixedLenMultiParser::new(6, 1000);
        let wire_count = encode_compact_size(2);
        let (c, _) = p.feed(&wire_count);
        assert_eq!(c, wire_count.len());
        p.feed(&[0u8; 6]);
        p.feed(&[1u8; 6]);
        assert!(p.is_complete());
        assert_eq!(p.segments().len(), 1);
        assert_eq!(p.segments()[0].len(), 12);
    }
}
