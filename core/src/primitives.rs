//! Primitive codecs shared by every parser and by the miner-ID document
//! validator: compact-size varints, key/signature shape predicates, the
//! script push-instruction iterator, and a SHA-256 wrapper.

use sha2::{Digest, Sha256};

/// A 32-byte opaque value: block hash, txid, Merkle root, or SHA-256 output.
pub type Hash256 = [u8; 32];

/// A 33-byte compressed secp256k1 public key, first byte 0x02 or 0x03.
pub type CompressedPubKey = [u8; 33];

/// `serde(with = "...")` helper for `Option<CompressedPubKey>` fields: serde's
/// built-in array support tops out at 32 elements, so 33-byte keys need
/// `serde_big_array::BigArray`, which itself only covers bare `[T; N]` and
/// not `Option<[T; N]>`.
pub mod opt_compressed_pubkey {
    use super::CompressedPubKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_big_array::BigArray;

    #[derive(Serialize, Deserialize)]
    struct Wrapper(#[serde(with = "BigArray")] CompressedPubKey);

    pub fn serialize<S>(value: &Option<CompressedPubKey>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Wrapper).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<CompressedPubKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(key)| key))
    }
}

/// Chain height. Always non-negative in practice; kept signed to match the
/// wire representation used by the collaborator that supplies blocks.
pub type Height = i32;

/// A reference to a transaction output: `(txid, output index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Outpoint {
    pub txid: Hash256,
    pub index: u32,
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// `true` iff `bytes` is shaped like a compressed secp256k1 public key: 33
/// bytes, first byte 0x02 or 0x03. Does not check the point is actually on
/// the curve; that's left to the crypto collaborator at verify time.
pub fn is_compressed_key(bytes: &[u8]) -> bool {
    bytes.len() == 33 && matches!(bytes[0], 0x02 | 0x03)
}

/// `true` iff `bytes` is shaped like a DER-encoded ECDSA signature: length
/// 69-72 inclusive, first byte 0x30. Internal ASN.1 structure is validated
/// by the crypto collaborator on actual verify.
pub fn is_der_signature(bytes: &[u8]) -> bool {
    (69..=72).contains(&bytes.len()) && bytes[0] == 0x30
}

/// Decodes a Bitcoin compact-size (a.k.a. `CompactSize`/`VarInt`) varint
/// from the start of `buf`.
///
/// Returns `(bytes_read, value)` on success. If `buf` is too short to
/// determine or hold the encoded value, returns `(0, bytes_required)` so the
/// caller knows exactly how many more bytes to wait for.
pub fn parse_compact_size(buf: &[u8]) -> (usize, u64) {
    let Some(&first) = buf.first() else {
        return (0, 1);
    };
    let total_len = match first {
        0..=0xfc => 1,
        0xfd => 3,
        0xfe => 5,
        0xff => 9,
    };
    if buf.len() < total_len {
        return (0, total_len as u64);
    }
    let value = match total_len {
        1 => first as u64,
        3 => u16::from_le_bytes([buf[1], buf[2]]) as u64,
        5 => u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as u64,
        9 => u64::from_le_bytes([
            buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8],
        ]),
        _ => unreachable!(),
    };
    (total_len, value)
}

/// Encodes `value` as a compact-size varint. Used by tests and by callers
/// constructing wire messages (e.g. the `revokemid` encoder).
pub fn encode_compact_size(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out
        }
        0x10000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(value as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&value.to_le_bytes());
            out
        }
    }
}

/// A single decoded script instruction: the opcode byte, the offset of its
/// operand (if it pushes data) within the script, and the operand bytes
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    pub operand_offset: usize,
    pub operand: &'a [u8],
}

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;

/// Walks a Bitcoin script yielding push and bare-opcode instructions.
///
/// Iteration stops as soon as a malformed push is encountered (truncated
/// length prefix or truncated operand); [`ScriptIter::valid`] reports
/// whether the walk completed cleanly.
pub struct ScriptIter<'a> {
    script: &'a [u8],
    pos: usize,
    valid: bool,
    done: bool,
}

impl<'a> ScriptIter<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self {
            script,
            pos: 0,
            valid: true,
            done: false,
        }
    }

    /// `true` so long as no malformed instruction has been encountered yet.
    /// Only meaningful once iteration has been exhausted.
    pub fn valid(&self) -> bool {
        self.valid
    }
}

impl<'a> Iterator for ScriptIter<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.script.len() {
            return None;
        }
        let opcode = self.script[self.pos];
        let header_len = self.pos;

        let (push_len, len_bytes): (usize, usize) = match opcode {
            0x01..=0x4b => (opcode as usize, 1),
            OP_PUSHDATA1 => {
                if self.pos + 2 > self.script.len() {
                    self.valid = false;
                    self.done = true;
                    return None;
                }
                (self.script[self.pos + 1] as usize, 2)
            }
            OP_PUSHDATA2 => {
                if self.pos + 3 > self.script.len() {
                    self.valid = false;
                    self.done = true;
                    return None;
                }
                let n = u16::from_le_bytes([self.script[self.pos + 1], self.script[self.pos + 2]]);
                (n as usize, 3)
            }
            OP_PUSHDATA4 => {
                if self.pos + 5 > self.script.len() {
                    self.valid = false;
                    self.done = true;
                    return None;
                }
                let n = u32::from_le_bytes([
                    self.script[self.pos + 1],
                    self.script[self.pos + 2],
                    self.script[self.pos + 3],
                    self.script[self.pos + 4],
                ]);
                (n as usize, 5)
            }
            _ => {
                // bare opcode, no operand
                self.pos += 1;
                return Some(Instruction {
                    opcode,
                    operand_offset: header_len,
                    operand: &[],
                });
            }
        };

        let operand_start = self.pos + len_bytes;
        let operand_end = operand_start + push_len;
        if operand_end > self.script.len() {
            self.valid = false;
            self.done = true;
            return None;
        }
        let operand = &self.script[operand_start..operand_end];
        self.pos = operand_end;
        Some(Instruction {
            opcode,
            operand_offset: operand_start,
            operand,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_size_empty_needs_one_byte() {
        assert_eq!(parse_compact_size(&[]), (0, 1));
    }

    #[test]
    fn compact_size_prefix_alone_needs_more() {
        assert_eq!(parse_compact_size(&[0xfd]), (0, 3));
    }

    #[test]
    fn compact_size_max_u64() {
        let buf = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(parse_compact_size(&buf), (9, 0xffffffffffffffff));
    }

    #[test]
    fn compact_size_round_trip() {
        for v in [
            0u64,
            1,
            0xfc,
            0xfd,
            0xffff,
            0x10000,
            0xffffffff,
            0x100000000,
            0xffffffffffffffff,
        ] {
            let encoded = encode_compact_size(v);
            assert_eq!(parse_compact_size(&encoded), (encoded.len(), v));
        }
    }

    #[test]
    fn compressed_key_shape() {
        let mut key = [0u8; 33];
        key[0] = 0x02;
        assert!(is_compressed_key(&key));
        key[0] = 0x04;
        assert!(!is_compressed_key(&key));
        assert!(!is_compressed_key(&key[..32]));
    }

    #[test]
    fn der_signature_shape() {
        let mut sig = vec![0x30u8];
        sig.extend(std::iter::repeat(0u8).take(69));
        assert!(is_der_signature(&sig));
        assert!(!is_der_signature(&sig[..50]));
        sig[0] = 0x31;
        assert!(!is_der_signature(&sig));
    }

    #[test]
    fn script_iter_walks_pushes_and_opcodes() {
        // OP_RETURN (0x6a) followed by a 4-byte push and OP_PUSHDATA1 of 2 bytes.
        let script = [0x6a, 0x04, 1, 2, 3, 4, OP_PUSHDATA1, 0x02, 0xaa, 0xbb];
        let mut it = ScriptIter::new(&script);
        let first = it.next().unwrap();
        assert_eq!(first.opcode, 0x6a);
        assert!(first.operand.is_empty());
        let second = it.next().unwrap();
        assert_eq!(second.operand, &[1, 2, 3, 4]);
        let third = it.next().unwrap();
        assert_eq!(third.operand, &[0xaa, 0xbb]);
        assert!(it.next().is_none());
        assert!(it.valid());
    }

    #[test]
    fn script_iter_flags_truncated_push() {
        let script = [0x05, 1, 2];
        let mut it = ScriptIter::new(&script);
        assert!(it.next().is_none());
        assert!(!it.valid());
    }
}
