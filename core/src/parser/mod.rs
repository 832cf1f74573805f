//! Incremental, resumable parsers for Bitcoin P2P messages
//! (SPEC_FULL.md §4.C).
//!
//! Every parser in this module implements [`IncrementalParser`]: bytes are
//! fed as they arrive, the parser reports how much it consumed and a lower
//! bound on how much more it needs, and a finished parser can be read back
//! positionally without ever requiring the whole message to sit in memory
//! at once.

mod array;
mod buffer;
pub(crate) mod compact_size_reader;
mod compound;
mod fixed_len;
mod fixed_len_multi;
mod prefilled_tx;
mod single_seg;
mod tx;

pub use array::ArrayParser;
pub use buffer::ParserBuffer;
pub use compound::{BlockParser, BlocktxnParser, CmpctblockParser, Parser};
pub use fixed_len::FixedLenParser;
pub use fixed_len_multi::FixedLenMultiParser;
pub use prefilled_tx::PrefilledTxParser;
pub use single_seg::SingleSegParser;
pub use tx::TxParser;

use thiserror::Error;

/// Errors a parser can surface. Per SPEC_FULL.md §7, `feed` returning
/// `(0, 0)` (protocol overflow) is not itself an `Err` — it's a sentinel the
/// caller checks for and reacts to by banning the peer. This enum instead
/// covers parsers built in a way their inputs could never produce (e.g.
/// reading before completion) for callers that want a `Result`-based API on
/// top of the raw `(usize, usize)` contract.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ParseError {
    #[error("parser has not finished; no readable value yet")]
    Incomplete,
    #[error("parser reported protocol overflow")]
    Overflow,
}

/// The uniform contract every incremental parser in this module satisfies.
pub trait IncrementalParser {
    /// Feeds as much of `input` as the parser can currently absorb.
    /// Returns `(bytes_consumed, bytes_still_needed)`; `(0, 0)` signals
    /// overflow (the parser has already absorbed more than it can
    /// structurally consume — SPEC_FULL.md §4.C).
    fn feed(&mut self, input: &[u8]) -> (usize, usize);

    /// Total bytes parsed so far.
    fn size(&self) -> usize;

    /// Positional readback: copies up to `out.len()` bytes starting at
    /// `offset` into `out`, returning the number of bytes copied.
    fn read(&self, offset: usize, out: &mut [u8]) -> usize;

    /// Resets the parser to its initial, empty state.
    fn clear(&mut self);

    /// Convenience: materializes the parser's full contents into an owned
    /// buffer via repeated `read` calls.
    fn snapshot(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size()];
        self.read(0, &mut out);
        out
    }
}

/// Copies from `piece`, honoring an `offset` that may span multiple pieces
/// concatenated together (used by the array/compound/message-buffer
/// parsers to implement positional `read` over several logical segments
/// without materializing them all first).
///
/// `*offset` is decremented as pieces are skipped; once it reaches zero,
/// bytes are copied into `dst`. Returns the number of bytes written.
pub(crate) fn copy_from_piece(piece: &[u8], offset: &mut usize, dst: &mut [u8]) -> usize {
    if dst.is_empty() {
        return 0;
    }
    if *offset >= piece.len() {
        *offset -= piece.len();
        return 0;
    }
    let avail = piece.len() - *offset;
    let n = avail.min(dst.len());
    dst[..n].copy_from_slice(&piece[*offset..*offset + n]);
    *offset = 0;
    n
}
