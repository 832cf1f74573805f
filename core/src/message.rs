//! P2P message framing (SPEC_FULL.md §4.D): the 24-byte header (and its
//! 44-byte extended variant), command-string dispatch to a payload parser,
//! and the resumable feed loop a peer connection drives as bytes arrive off
//! the wire.

use crate::parser::{IncrementalParser, Parser, ParserBuffer};
use thiserror::Error;

const HEADER_LEN: usize = 24;
const EXTENDED_HEADER_LEN: usize = 44;
const COMMAND_LEN: usize = 12;
const EXTENDED_LENGTH_SENTINEL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum MessageError {
    #[error("peer sent more data than the declared payload length")]
    Overflow,
    #[error("command string is not valid ASCII/NUL-padded")]
    MalformedCommand,
}

/// The fixed 24-byte P2P message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2pHeader {
    pub magic: [u8; 4],
    pub command: [u8; COMMAND_LEN],
    pub payload_length: u32,
    pub checksum: [u8; 4],
}

impl P2pHeader {
    fn parse(buf: &[u8; HEADER_LEN]) -> Self {
        let mut command = [0u8; COMMAND_LEN];
        command.copy_from_slice(&buf[4..16]);
        Self {
            magic: [buf[0], buf[1], buf[2], buf[3]],
            command,
            payload_length: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            checksum: [buf[20], buf[21], buf[22], buf[23]],
        }
    }

    /// The command string with trailing NUL padding stripped. Non-UTF8
    /// bytes are lossily replaced rather than rejected outright; callers
    /// that need strictness can check [`P2pHeader::command_is_ascii`].
    pub fn command_str(&self) -> String {
        let end = self
            .command
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(COMMAND_LEN);
        String::from_utf8_lossy(&self.command[..end]).into_owned()
    }

    pub fn command_is_ascii(&self) -> bool {
        let end = self
            .command
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(COMMAND_LEN);
        self.command[..end].iter().all(u8::is_ascii) && self.command[end..].iter().all(|&b| b == 0)
    }

    /// `true` when the payload length sentinel indicates an
    /// [`ExtendedHeader`] follows before the payload itself.
    pub fn has_extended_header(&self) -> bool {
        self.payload_length == EXTENDED_LENGTH_SENTINEL
    }
}

/// The extended header used when a payload's true length doesn't fit in a
/// 32-bit field: a replacement command and a 64-bit length, immediately
/// following the base [`P2pHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeader {
    pub ext_command: [u8; COMMAND_LEN],
    pub ext_payload_length: u64,
}

impl ExtendedHeader {
    fn parse(buf: &[u8; EXTENDED_HEADER_LEN - HEADER_LEN]) -> Self {
        let mut ext_command = [0u8; COMMAND_LEN];
        ext_command.copy_from_slice(&buf[0..12]);
        let ext_payload_length = u64::from_le_bytes([
            buf[12], buf[13], buf[14], buf[15], buf[16], buf[17], buf[18], buf[19],
        ]);
        Self {
            ext_command,
            ext_payload_length,
        }
    }

    pub fn command_str(&self) -> String {
        let end = self
            .ext_command
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(COMMAND_LEN);
        String::from_utf8_lossy(&self.ext_command[..end]).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    ExtendedHeader,
    Payload,
    Done,
}

/// Drives a single P2P message through header parsing, optional extended
/// header, and into the command-dispatched payload parser.
///
/// Feed bytes as they arrive off the wire with [`MessageReader::feed`]. Once
/// [`MessageReader::is_complete`] is `true`, the decoded [`P2pHeader`] and
/// payload parser are available for inspection.
#[derive(Debug)]
pub struct MessageReader {
    stage: Stage,
    header_buf: Vec<u8>,
    header: Option<P2pHeader>,
    ext_header_buf: Vec<u8>,
    ext_header: Option<ExtendedHeader>,
    declared_payload_len: u64,
    payload: Option<ParserBuffer<Parser>>,
}

impl MessageReader {
    pub fn new() -> Self {
        Self {
            stage: Stage::Header,
            header_buf: Vec::with_capacity(HEADER_LEN),
            header: None,
            ext_header_buf: Vec::with_capacity(EXTENDED_HEADER_LEN - HEADER_LEN),
            ext_header: None,
            declared_payload_len: 0,
            payload: None,
        }
    }

    pub fn header(&self) -> Option<&P2pHeader> {
        self.header.as_ref()
    }

    pub fn extended_header(&self) -> Option<&ExtendedHeader> {
        self.ext_header.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Done
    }

    /// The effective command string for dispatch: the extended header's
    /// command when present, otherwise the base header's.
    fn effective_command(&self) -> String {
        match &self.ext_header {
            Some(ext) => ext.command_str(),
            None => self.header.as_ref().expect("header parsed before dispatch").command_str(),
        }
    }

    /// Feeds `input` to the reader. Returns `(bytes_consumed,
    /// bytes_still_needed)`, matching the [`IncrementalParser`] contract —
    /// `(0, 0)` is the protocol-overflow sentinel that should be treated as
    /// a ban signal for the peer.
    pub fn feed(&mut self, mut input: &[u8]) -> (usize, usize) {
        let mut consumed = 0usize;
        loop {
            match self.stage {
                Stage::Header => {
                    let need = HEADER_LEN - self.header_buf.len();
                    if need == 0 {
                        // header already fully buffered but not yet parsed
                    } else if input.is_empty() {
                        return (consumed, need);
                    } else {
                        let take = need.min(input.len());
                        self.header_buf.extend_from_slice(&input[..take]);
                        input = &input[take..];
                        consumed += take;
                        if self.header_buf.len() < HEADER_LEN {
                            return (consumed, HEADER_LEN - self.header_buf.len());
                        }
                    }
                    let mut arr = [0u8; HEADER_LEN];
                    arr.copy_from_slice(&self.header_buf);
                    let header = P2pHeader::parse(&arr);
                    let extended = header.has_extended_header();
                    self.header = Some(header);
                    self.stage = if extended {
                        Stage::ExtendedHeader
                    } else {
                        self.declared_payload_len = header.payload_length as u64;
                        Stage::Payload
                    };
                }
                Stage::ExtendedHeader => {
                    const EXT_LEN: usize = EXTENDED_HEADER_LEN - HEADER_LEN;
                    let need = EXT_LEN - self.ext_header_buf.len();
                    if need > 0 {
                        if input.is_empty() {
                            return (consumed, need);
                        }
                        let take = need.min(input.len());
                        self.ext_header_buf.extend_from_slice(&input[..take]);
                        input = &input[take..];
                        consumed += take;
                        if self.ext_header_buf.len() < EXT_LEN {
                            return (consumed, EXT_LEN - self.ext_header_buf.len());
                        }
                    }
                    let mut arr = [0u8; EXT_LEN];
                    arr.copy_from_slice(&self.ext_header_buf);
                    let ext = ExtendedHeader::parse(&arr);
                    self.declared_payload_len = ext.ext_payload_length;
                    self.ext_header = Some(ext);
                    self.stage = Stage::Payload;
                }
                Stage::Payload => {
                    if self.payload.is_none() {
                        let command = self.effective_command();
                        self.payload = Some(ParserBuffer::new(Parser::for_command(&command)));
                    }
                    let parser = self.payload.as_mut().unwrap();
                    let remaining = self.declared_payload_len - parser.size() as u64;
                    if remaining == 0 {
                        self.stage = Stage::Done;
                        return (consumed, 0);
                    }
                    if input.is_empty() {
                        return (consumed, remaining as usize);
                    }
                    let cap = (remaining as usize).min(input.len());
                    let (c, _needed) = parser.feed(&input[..cap]);
                    if c == 0 && !input[..cap].is_empty() {
                        // inner parser refuses input it was structurally
                        // given room for: protocol overflow.
                        return (0, 0);
                    }
                    input = &input[c..];
                    consumed += c;
                    if c < cap {
                        // inner parser under-consumed within its own
                        // allowance; surface whatever it still wants.
                        return (consumed, 1);
                    }
                    if parser.size() as u64 >= self.declared_payload_len {
                        self.stage = Stage::Done;
                        return (consumed, 0);
                    }
                }
                Stage::Done => return (0, 0),
            }
        }
    }

    pub fn payload(&self) -> Option<&Parser> {
        self.payload.as_ref().map(|p| p.inner())
    }

    /// [`MessageReader::feed`], but surfaced as a `Result` for callers that
    /// want to match on *why* a peer should be banned rather than inspect
    /// the raw `(0, 0)` sentinel themselves: a non-ASCII/non-NUL-padded
    /// command string is rejected as soon as the header is decoded, and any
    /// other protocol overflow is reported as [`MessageError::Overflow`].
    pub fn try_feed(&mut self, input: &[u8]) -> Result<(usize, usize), MessageError> {
        let result = self.feed(input);
        if let Some(header) = &self.header {
            if !header.command_is_ascii() {
                return Err(MessageError::MalformedCommand);
            }
        }
        let (consumed, needed) = result;
        if consumed == 0 && needed == 0 {
            return Err(MessageError::Overflow);
        }
        Ok((consumed, needed))
    }
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn header_bytes(command: &str, payload_len: u32) -> Vec<u8> {
        let mut out = vec![0xf9, 0xbe, 0xb4, 0xd9]; // arbitrary magic
        let mut cmd = [0u8; COMMAND_LEN];
        cmd[..command.len()].copy_from_slice(command.as_bytes());
        out.extend(cmd);
        out.extend(payload_len.to_le_bytes());
        out.extend([0u8; 4]); // checksum, unused by the reader itself
        out
    }

    #[test]
    fn parses_header_and_short_generic_payload() {
        let mut wire = header_bytes("inv", 3);
        wire.extend([1, 2, 3]);
        let mut r = MessageReader::new();
        let (consumed, needed) = r.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert!(r.is_complete());
        assert_eq!(r.header().unwrap().command_str(), "inv");
        assert!(matches!(r.payload().unwrap(), Parser::Generic(_)));
    }

    #[test]
    fn dispatches_block_command_to_structured_parser() {
        let mut wire = header_bytes("block", 80);
        wire.extend([0u8; 80]);
        let mut r = MessageReader::new();
        let (consumed, needed) = r.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert!(matches!(r.payload().unwrap(), Parser::Block(_)));
    }

    #[test]
    fn splits_across_header_and_payload_feeds() {
        let mut wire = header_bytes("inv", 4);
        wire.extend([9, 9, 9, 9]);
        let mut r = MessageReader::new();
        let mut total_consumed = 0;
        for chunk in wire.chunks(5) {
            let (c, _) = r.feed(chunk);
            total_consumed += c;
        }
        assert_eq!(total_consumed, wire.len());
        assert!(r.is_complete());
    }

    #[test]
    fn extended_header_drives_payload_length() {
        let mut wire = header_bytes("xblk", EXTENDED_LENGTH_SENTINEL);
        let mut ext_cmd = [0u8; COMMAND_LEN];
        ext_cmd[..5].copy_from_slice(b"block");
        wire.extend(ext_cmd);
        wire.extend(2u64.to_le_bytes());
        wire.extend([7u8, 7]);
        let mut r = MessageReader::new();
        let (consumed, needed) = r.feed(&wire);
        assert_eq!(consumed, wire.len());
        assert_eq!(needed, 0);
        assert!(r.is_complete());
        assert_eq!(r.extended_header().unwrap().command_str(), "block");
    }

    #[test]
    fn try_feed_rejects_non_ascii_command() {
        let mut wire = vec![0xf9, 0xbe, 0xb4, 0xd9];
        wire.extend([0xffu8; COMMAND_LEN]);
        wire.extend(3u32.to_le_bytes());
        wire.extend([0u8; 4]);
        wire.extend([1, 2, 3]);
        let mut r = MessageReader::new();
        assert_eq!(r.try_feed(&wire), Err(MessageError::MalformedCommand));
    }

    #[test]
    fn try_feed_reports_overflow_after_completion() {
        let mut wire = header_bytes("inv", 3);
        wire.extend([1, 2, 3]);
        let mut r = MessageReader::new();
        r.try_feed(&wire).unwrap();
        assert!(r.is_complete());
        assert_eq!(r.try_feed(&[9]), Err(MessageError::Overflow));
    }
}
