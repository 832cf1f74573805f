//! Transaction parser: the 7-state machine of SPEC_FULL.md §4.C.3.
//!
//! `VERSION → IP_COUNT → INPUTS → OP_COUNT → OUTPUTS → LOCKTIME → COMPLETE`.
//! Each input/output is itself a small sub-state-machine (`TxItemParser`)
//! since both share the same shape: a fixed-size prefix, a compact-size
//! length, a variable-length script, and (for inputs only) a fixed-size
//! suffix. Every consumed byte is appended to scratch storage in wire
//! order, so the eventual coalesced buffer is a byte-exact reproduction of
//! the transaction as it arrived on the wire — no reinterpretation beyond
//! length framing.

use super::compact_size_reader::CompactSizeReader;
use super::IncrementalParser;
use crate::unique_array::UniqueArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemPhase {
    Prefix,
    ScriptLen,
    Script,
    Suffix,
    Done,
}

/// Parses `prefix(prefix_len) ‖ compact-size(script_len) ‖ script ‖
/// suffix(suffix_len)`. Used for both transaction inputs (`prefix_len =
/// 36`, `suffix_len = 4`) and outputs (`prefix_len = 8`, `suffix_len = 0`).
#[derive(Debug)]
struct TxItemParser {
    prefix_len: usize,
    suffix_len: usize,
    phase: ItemPhase,
    prefix_remaining: usize,
    script_len_reader: CompactSizeReader,
    script_remaining: usize,
    suffix_remaining: usize,
    buf: UniqueArray,
}

impl TxItemParser {
    fn new(prefix_len: usize, suffix_len: usize) -> Self {
        Self {
            prefix_len,
            suffix_len,
            phase: ItemPhase::Prefix,
            prefix_remaining: prefix_len,
            script_len_reader: CompactSizeReader::new(),
            script_remaining: 0,
            suffix_remaining: 0,
            buf: UniqueArray::new(),
        }
    }

    fn after_script(&mut self) {
        if self.suffix_len == 0 {
            self.phase = ItemPhase::Done;
        } else {
            self.suffix_remaining = self.suffix_len;
            self.phase = ItemPhase::Suffix;
        }
    }

    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        loop {
            match self.phase {
                ItemPhase::Prefix => {
                    if self.prefix_remaining == 0 {
                        self.phase = ItemPhase::ScriptLen;
                        continue;
                    }
                    if input.is_empty() {
                        return (consumed, self.prefix_remaining);
                    }
                    let take = self.prefix_remaining.min(input.len());
                    self.buf.append(&input[..take]);
                    input = &input[take..];
                    consumed += take;
                    self.prefix_remaining -= take;
                    if self.prefix_remaining > 0 {
                        return (consumed, self.prefix_remaining);
                    }
                    self.phase = ItemPhase::ScriptLen;
                }
                ItemPhase::ScriptLen => {
                    if self.script_len_reader.is_resolved() {
                        let (_, value) = {
                            let raw = self.script_len_reader.raw();
                            crate::primitives::parse_compact_size(raw)
                        };
                        self.script_remaining = value as usize;
                        self.phase = ItemPhase::Script;
                        continue;
                    }
                    if input.is_empty() {
                        return (consumed, self.script_len_reader.needed());
                    }
                    let (c, done) = self.script_len_reader.feed(input);
                    self.buf.append(&input[..c]);
                    input = &input[c..];
                    consumed += c;
                    if done.is_none() {
                        return (consumed, self.script_len_reader.needed());
                    }
                }
                ItemPhase::Script => {
                    if self.script_remaining == 0 {
                        self.after_script();
                        continue;
                    }
                    if input.is_empty() {
                        return (consumed, self.script_remaining);
                    }
                    let take = self.script_remaining.min(input.len());
                    self.buf.append(&input[..take]);
                    input = &input[take..];
                    consumed += take;
                    self.script_remaining -= take;
                    if self.script_remaining > 0 {
                        return (consumed, self.script_remaining);
                    }
                    self.after_script();
                }
                ItemPhase::Suffix => {
                    if self.suffix_remaining == 0 {
                        self.phase = ItemPhase::Done;
                        continue;
                    }
                    if input.is_empty() {
                        return (consumed, self.suffix_remaining);
                    }
                    let take = self.suffix_remaining.min(input.len());
                    self.buf.append(&input[..take]);
                    input = &input[take..];
                    consumed += take;
                    self.suffix_remaining -= take;
                    if self.suffix_remaining > 0 {
                        return (consumed, self.suffix_remaining);
                    }
                    self.phase = ItemPhase::Done;
                }
                ItemPhase::Done => {
                    return (consumed, 0);
                }
            }
        }
    }

    fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxPhase {
    Version,
    IpCount,
    Inputs,
    OpCount,
    Outputs,
    Locktime,
    Complete,
}

/// The transaction parser (component C.3). Preserves the exact wire bytes
/// of the transaction once complete.
#[derive(Debug)]
pub struct TxParser {
    phase: TxPhase,
    version: UniqueArray,
    version_remaining: usize,
    ip_count: CompactSizeReader,
    n_ips: u64,
    inputs_done: u64,
    cur_input: TxItemParser,
    inputs_scratch: UniqueArray,
    op_count: CompactSizeReader,
    n_ops: u64,
    outputs_done: u64,
    cur_output: TxItemParser,
    outputs_scratch: UniqueArray,
    locktime: UniqueArray,
    locktime_remaining: usize,
    total_size: usize,
    final_buf: Option<UniqueArray>,
}

impl TxParser {
    pub fn new() -> Self {
        Self {
            phase: TxPhase::Version,
            version: UniqueArray::with_capacity(4),
            version_remaining: 4,
            ip_count: CompactSizeReader::new(),
            n_ips: 0,
            inputs_done: 0,
            cur_input: TxItemParser::new(36, 4),
            inputs_scratch: UniqueArray::new(),
            op_count: CompactSizeReader::new(),
            n_ops: 0,
            outputs_done: 0,
            cur_output: TxItemParser::new(8, 0),
            outputs_scratch: UniqueArray::new(),
            locktime: UniqueArray::with_capacity(4),
            locktime_remaining: 4,
            total_size: 0,
            final_buf: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, TxPhase::Complete)
    }

    fn coalesce(&mut self) {
        let mut out = UniqueArray::new();
        out.append(self.version.as_slice());
        out.append(self.ip_count.raw());
        out.append(self.inputs_scratch.as_slice());
        out.append(self.op_count.raw());
        out.append(self.outputs_scratch.as_slice());
        out.append(self.locktime.as_slice());
        self.final_buf = Some(out);
    }
}

impl Default for TxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser for TxParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        loop {
            match self.phase {
                TxPhase::Version => {
                    if self.version_remaining == 0 {
                        self.phase = TxPhase::IpCount;
                        continue;
                    }
                    if input.is_empty() {
                        self.total_size += consumed;
                        return (consumed, self.version_remaining);
                    }
                    let take = self.version_remaining.min(input.len());
                    self.version.append(&input[..take]);
                    input = &input[take..];
                    consumed += take;
                    self.version_remaining -= take;
                    if self.version_remaining > 0 {
                        self.total_size += consumed;
                        return (consumed, self.version_remaining);
                    }
                    self.phase = TxPhase::IpCount;
                }
                TxPhase::IpCount => {
                    if input.is_empty() {
                        self.total_size += consumed;
                        return (consumed, self.ip_count.needed());
                    }
                    let (c, done) = self.ip_count.feed(input);
                    input = &input[c..];
                    consumed += c;
                    match done {
                        None => {
                            self.total_size += consumed;
                            return (consumed, self.ip_count.needed());
                        }
                        Some(v) => {
                            self.n_ips = v;
                            self.phase = TxPhase::Inputs;
                        }
                    }
                }
                TxPhase::Inputs => {
                    if self.inputs_done == self.n_ips {
                        self.phase = TxPhase::OpCount;
                        continue;
                    }
                    let (c, needed) = self.cur_input.feed(input);
                    input = &input[c..];
                    consumed += c;
                    if needed > 0 {
                        self.total_size += consumed;
                        return (consumed, needed);
                    }
                    self.inputs_scratch.append(self.cur_input.as_slice());
                    self.inputs_done += 1;
                    self.cur_input = TxItemParser::new(36, 4);
                    if self.inputs_done == self.n_ips {
                        self.phase = TxPhase::OpCount;
                    }
                }
                TxPhase::OpCount => {
                    if input.is_empty() {
                        self.total_size += consumed;
                        return (consumed, self.op_count.needed());
                    }
                    let (c, done) = self.op_count.feed(input);
                    input = &input[c..];
                    consumed += c;
                    match done {
                        None => {
                            self.total_size += consumed;
                            return (consumed, self.op_count.needed());
                        }
                        Some(v) => {
                            self.n_ops = v;
                            self.phase = TxPhase::Outputs;
                        }
                    }
                }
                TxPhase::Outputs => {
                    if self.outputs_done == self.n_ops {
                        self.phase = TxPhase::Locktime;
                        continue;
                    }
                    let (c, needed) = self.cur_output.feed(input);
                    input = &input[c..];
                    consumed += c;
                    if needed > 0 {
                        self.total_size += consumed;
                        return (consumed, needed);
                    }
                    self.outputs_scratch.append(self.cur_output.as_slice());
                    self.outputs_done += 1;
                    self.cur_output = TxItemParser::new(8, 0);
                    if self.outputs_done == self.n_ops {
                        self.phase = TxPhase::Locktime;
                    }
                }
                TxPhase::Locktime => {
                    if self.locktime_remaining == 0 {
                        self.coalesce();
                        self.phase = TxPhase::Complete;
                        self.total_size += consumed;
                        return (consumed, 0);
                    }
                    if input.is_empty() {
                        self.total_size += consumed;
                        return (consumed, self.locktime_remaining);
                    }
                    let take = self.locktime_remaining.min(input.len());
                    self.locktime.append(&input[..take]);
                    input = &input[take..];
                    consumed += take;
                    self.locktime_remaining -= take;
                    if self.locktime_remaining > 0 {
                        self.total_size += consumed;
                        return (consumed, self.locktime_remaining);
                    }
                    self.coalesce();
                    self.phase = TxPhase::Complete;
                    self.total_size += consumed;
                    return (consumed, 0);
                }
                TxPhase::Complete => {
                    return (0, 0);
                }
            }
        }
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        match &self.final_buf {
            Some(buf) => buf.read(offset, out),
            None => 0,
        }
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
        // version(4) + 1 input (op_return scriptSig) + 1 output (op_return) + locktime(4)
        let mut out = vec![1, 0, 0, 0]; // version = 1
        out.extend(encode_compact_size(1)); // 1 input
        out.extend([0xAAu8; 32]); // prev txid
        out.extend(0xFFFFFFFFu32.to_le_bytes()); // prev index
        let script_sig = [0x6a]; // OP_RETURN
        out.extend(encode_compact_size(script_sig.len() as u64));
        out.extend(script_sig);
        out.extend(0xFFFFFFFFu32.to_le_bytes()); // sequence
        out.extend(encode_compact_size(1)); // 1 output
        out.extend(0u64.to_le_bytes()); // value
        let script_pk = [0x6a];
        out.extend(encode_compact_size(script_pk.len() as u64));
        out.extend(script_pk);
        out.extend(0u32.to_le_bytes()); // locktime
        out
    }

    #[test]
    fn parses_minimal_transaction_whole() {
        let bytes = minimal_tx_bytes();
        let mut p = TxParser::new();
        let (consumed, needed) = p.feed(&bytes);
        assert_eq!(consumed, bytes.len());
        assert_eq!(needed, 0);
        assert!(p.is_complete());
        assert_eq!(p.size(), bytes.len());
        assert_eq!(p.snapshot(), bytes);
    }

    #[test]
    fn byte_by_byte_matches_whole_feed() {
        let bytes = minimal_tx_bytes();
        let mut whole = TxParser::new();
        whole.feed(&bytes);

        let mut incremental = TxParser::new();
        for b in &bytes {
            incremental.feed(&[*b]);
        }
        assert_eq!(whole.snapshot(), incremental.snapshot());
        assert_eq!(whole.size(), incremental.size());
        assert!(incremental.is_complete());
    }

    #[test]
    fn complete_parser_rejects_further_feed() {
        let bytes = minimal_tx_bytes();
        let mut p = TxParser::new();
        p.feed(&bytes);
        assert_eq!(p.feed(&[1]), (0, 0));
    }
}
