//! Compound parsers (SPEC_FULL.md §4.C.7): sequential compositions of the
//! primitive incremental parsers, one per P2P payload command that needs
//! structured (rather than single-segment) handling.
//!
//! ```text
//! block_parser      = fixed_len(80)  ‖ array<tx_parser>
//! blocktxn_parser    = fixed_len(32)  ‖ array<tx_parser>
//! cmpctblock_parser = fixed_len(88)  ‖ fixed_len_multi(6, 1000) ‖ array<prefilled_tx_parser>
//! ```
//!
//! Dispatch between these (and the fallback [`SingleSegParser`]) is done via
//! a closed [`Parser`] enum rather than `dyn IncrementalParser` — the set of
//! payload shapes is fixed and known at compile time, so a tagged variant
//! avoids both the vtable indirection and the `Box` allocation a trait
//! object would need (SPEC_FULL.md §9).

use super::array::ArrayParser;
use super::fixed_len::FixedLenParser;
use super::fixed_len_multi::FixedLenMultiParser;
use super::prefilled_tx::PrefilledTxParser;
use super::single_seg::SingleSegParser;
use super::tx::TxParser;
use super::IncrementalParser;

/// Short-ID segment size for `cmpctblock`'s compact-ID list.
const SHORT_ID_LEN: usize = 6;
const SHORT_ID_SEGMENT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TwoStage {
    Head,
    Body,
    Done,
}

/// `fixed_len(80) ‖ array<tx_parser>`: a full block, header then
/// transactions.
#[derive(Debug)]
pub struct BlockParser {
    stage: TwoStage,
    head: FixedLenParser,
    body: ArrayParser<TxParser>,
    total_size: usize,
}

impl BlockParser {
    pub fn new() -> Self {
        Self {
            stage: TwoStage::Head,
            head: FixedLenParser::new(80),
            body: ArrayParser::new(),
            total_size: 0,
        }
    }

    pub fn header(&self) -> &[u8] {
        self.head.as_slice()
    }

    pub fn transactions(&self) -> &[TxParser] {
        self.body.items()
    }
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser for BlockParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        if self.stage == TwoStage::Head {
            let (c, needed) = self.head.feed(input);
            input = &input[c..];
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = TwoStage::Body;
        }
        if self.stage == TwoStage::Body {
            let (c, needed) = self.body.feed(input);
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = TwoStage::Done;
        }
        self.total_size += consumed;
        (consumed, 0)
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let mut offset = offset;
        let mut written = super::copy_from_piece(self.head.as_slice(), &mut offset, out);
        if written < out.len() {
            written += super::copy_from_piece(&self.body.snapshot(), &mut offset, &mut out[written..]);
        }
        written
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

/// `fixed_len(32) ‖ array<tx_parser>`: a `blocktxn` response, block hash
/// then the requested transactions.
#[derive(Debug)]
pub struct BlocktxnParser {
    stage: TwoStage,
    head: FixedLenParser,
    body: ArrayParser<TxParser>,
    total_size: usize,
}

impl BlocktxnParser {
    pub fn new() -> Self {
        Self {
            stage: TwoStage::Head,
            head: FixedLenParser::new(32),
            body: ArrayParser::new(),
            total_size: 0,
        }
    }

    pub fn block_hash(&self) -> &[u8] {
        self.head.as_slice()
    }

    pub fn transactions(&self) -> &[TxParser] {
        self.body.items()
    }
}

impl Default for BlocktxnParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser for BlocktxnParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        if self.stage == TwoStage::Head {
            let (c, needed) = self.head.feed(input);
            input = &input[c..];
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = TwoStage::Body;
        }
        if self.stage == TwoStage::Body {
            let (c, needed) = self.body.feed(input);
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = TwoStage::Done;
        }
        self.total_size += consumed;
        (consumed, 0)
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let mut offset = offset;
        let mut written = super::copy_from_piece(self.head.as_slice(), &mut offset, out);
        if written < out.len() {
            written += super::copy_from_piece(&self.body.snapshot(), &mut offset, &mut out[written..]);
        }
        written
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreeStage {
    Head,
    ShortIds,
    Prefilled,
    Done,
}

/// `fixed_len(88) ‖ fixed_len_multi(6, 1000) ‖ array<prefilled_tx_parser>`:
/// a compact block — header+nonce, the short-ID list, then the sender's
/// chosen prefilled transactions.
#[derive(Debug)]
pub struct CmpctblockParser {
    stage: ThreeStage,
    head: FixedLenParser,
    short_ids: FixedLenMultiParser,
    prefilled: ArrayParser<PrefilledTxParser>,
    total_size: usize,
}

impl CmpctblockParser {
    pub fn new() -> Self {
        Self {
            stage: ThreeStage::Head,
            head: FixedLenParser::new(88),
            short_ids: FixedLenMultiParser::new(SHORT_ID_LEN, SHORT_ID_SEGMENT),
            prefilled: ArrayParser::new(),
            total_size: 0,
        }
    }

    pub fn header_and_nonce(&self) -> &[u8] {
        self.head.as_slice()
    }

    pub fn short_id_segments(&self) -> &[Vec<u8>] {
        self.short_ids.segments()
    }

    pub fn prefilled_transactions(&self) -> &[PrefilledTxParser] {
        self.prefilled.items()
    }
}

impl Default for CmpctblockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser for CmpctblockParser {
    fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        if self.stage == ThreeStage::Head {
            let (c, needed) = self.head.feed(input);
            input = &input[c..];
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = ThreeStage::ShortIds;
        }
        if self.stage == ThreeStage::ShortIds {
            let (c, needed) = self.short_ids.feed(input);
            input = &input[c..];
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = ThreeStage::Prefilled;
        }
        if self.stage == ThreeStage::Prefilled {
            let (c, needed) = self.prefilled.feed(input);
            consumed += c;
            if needed > 0 {
                self.total_size += consumed;
                return (consumed, needed);
            }
            self.stage = ThreeStage::Done;
        }
        self.total_size += consumed;
        (consumed, 0)
    }

    fn size(&self) -> usize {
        self.total_size
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let mut offset = offset;
        let mut written = super::copy_from_piece(self.head.as_slice(), &mut offset, out);
        if written < out.len() {
            written += super::copy_from_piece(&self.short_ids.snapshot(), &mut offset, &mut out[written..]);
        }
        if written < out.len() {
            written += super::copy_from_piece(&self.prefilled.snapshot(), &mut offset, &mut out[written..]);
        }
        written
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Tagged dispatch over the payload parser a message's command string
/// selects (SPEC_FULL.md §4.D, §9): `block`/`blocktxn`/`cmpctblock` get
/// their structured parser, everything else falls back to
/// [`SingleSegParser`].
#[derive(Debug)]
pub enum Parser {
    Block(BlockParser),
    Blocktxn(BlocktxnParser),
    Cmpctblock(CmpctblockParser),
    Generic(SingleSegParser),
}

impl Parser {
    /// Selects a parser variant for a command string taken from a P2P
    /// message header (already trimmed of trailing NUL padding).
    pub fn for_command(command: &str) -> Self {
        match command {
            "block" => Parser::Block(BlockParser::new()),
            "blocktxn" => Parser::Blocktxn(BlocktxnParser::new()),
            "cmpctblock" => Parser::Cmpctblock(CmpctblockParser::new()),
            _ => Parser::Generic(SingleSegParser::new()),
        }
    }
}

impl IncrementalParser for Parser {
    fn feed(&mut self, input: &[u8]) -> (usize, usize) {
        match self {
            Parser::Block(p) => p.feed(input),
            Parser::Blocktxn(p) => p.feed(input),
            Parser::Cmpctblock(p) => p.feed(input),
            Parser::Generic(p) => p.feed(input),
        }
    }

    fn size(&self) -> usize {
        match self {
            Parser::Block(p) => p.size(),
            Parser::Blocktxn(p) => p.size(),
            Parser::Cmpctblock(p) => p.size(),
            Parser::Generic(p) => p.size(),
        }
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        match self {
            Parser::Block(p) => p.read(offset, out),
            Parser::Blocktxn(p) => p.read(offset, out),
            Parser::Cmpctblock(p) => p.read(offset, out),
            Parser::Generic(p) => p.read(offset, out),
        }
    }

    fn clear(&mut self) {
        match self {
            Parser::Block(p) => p.clear(),
            Parser::Blocktxn(p) => p.clear(),
            Parser::Cmpctblock(p) => p.clear(),
            Parser::Generic(p) => p.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::encode_compact_size;

    fn minimal_tx_bytes() -> Vec<u8> {
        let mut out = vec![1, 0, 0, 0];
        out.extend(encode_compact_size(0));
        out.extend(encode_compact_size(0));
        out.extend(0u32.to_le_bytes());
        out
    }

    #[test]
    fn block_parser_header_then_transactions() {
        let tx = minimal_tx_bytes();
        let mut wire = vec![0u8; 80];
        wire.extend(encode_compact_size(2));
        wire.extend(&tx);
        wire.extend(&tx);

        let mut p = BlockParser::new();
        let (consumed, needed) = p.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert_eq!(p.header().len(), 80);
        assert_eq!(p.transactions().len(), 2);
        assert_eq!(p.snapshot(), wire);
    }

    #[test]
    fn block_parser_byte_by_byte_matches_whole_feed() {
        let tx = minimal_tx_bytes();
        let mut wire = vec![7u8; 80];
        wire.extend(encode_compact_size(1));
        wire.extend(&tx);

        let mut whole = BlockParser::new();
        whole.feed(&wire);

        let mut incremental = BlockParser::new();
        for b in &wire {
            incremental.feed(&[*b]);
        }
        assert_eq!(whole.snapshot(), incremental.snapshot());
    }

    #[test]
    fn blocktxn_parser_hash_then_transactions() {
        let tx = minimal_tx_bytes();
        let mut wire = vec![9u8; 32];
        wire.extend(encode_compact_size(1));
        wire.extend(&tx);

        let mut p = BlocktxnParser::new();
        let (consumed, needed) = p.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert_eq!(p.block_hash(), &[9u8; 32][..]);
        assert_eq!(p.transactions().len(), 1);
    }

    #[test]
    fn cmpctblock_parser_three_stages() {
        let mut wire = vec![3u8; 88];
        wire.extend(encode_compact_size(2));
        wire.extend([1u8; 6]);
        wire.extend([2u8; 6]);
        wire.extend(encode_compact_size(1));
        let mut prefilled_entry = encode_compact_size(0); // prefilled index
        prefilled_entry.extend(minimal_tx_bytes());
        wire.extend(&prefilled_entry);

        let mut p = CmpctblockParser::new();
        let (consumed, needed) = p.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert_eq!(p.header_and_nonce().len(), 88);
        assert_eq!(p.short_id_segments().len(), 1);
        assert_eq!(p.prefilled_transactions().len(), 1);
        assert_eq!(p.snapshot(), wire);
    }

    #[test]
    fn dispatch_picks_structured_parser_by_command() {
        assert!(matches!(Parser::for_command("block"), Parser::Block(_)));
        assert!(matches!(Parser::for_command("blocktxn"), Parser::Blocktxn(_)));
        assert!(matches!(Parser::for_command("cmpctblock"), Parser::Cmpctblock(_)));
        assert!(matches!(Parser::for_command("inv"), Parser::Generic(_)));
    }
}
