//! `revokemid` P2P message (SPEC_FULL.md §4.I, §6.3).
//!
//! Grounded on the original source's `RevokeMid` class
//! (`miner_id/revokemid.h`): little-endian framing of a version tag, three
//! fixed 33-byte keys, and a variable two-signature trailer.

use super::error::MinerInfoError;
use crate::primitives::{is_compressed_key, is_der_signature, CompressedPubKey};

type R<T> = Result<T, MinerInfoError>;

const KEY_LENGTH: usize = 33;
const MSG_VERSION: u32 = 0;

/// A decoded `revokemid` wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeMid {
    pub revocation_key: CompressedPubKey,
    pub miner_id: CompressedPubKey,
    pub revocation_message: CompressedPubKey,
    pub sig1: Vec<u8>,
    pub sig2: Vec<u8>,
}

impl RevokeMid {
    /// Serializes to the wire format: `version(4) ‖ revocationKey(33) ‖
    /// minerId(33) ‖ revocationMessage(33) ‖ sig1_len(1) ‖ sig1 ‖
    /// sig2_len(1) ‖ sig2`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + KEY_LENGTH * 3 + 2 + self.sig1.len() + self.sig2.len());
        out.extend_from_slice(&MSG_VERSION.to_le_bytes());
        out.extend_from_slice(&self.revocation_key);
        out.extend_from_slice(&self.miner_id);
        out.extend_from_slice(&self.revocation_message);
        out.push(self.sig1.len() as u8);
        out.extend_from_slice(&self.sig1);
        out.push(self.sig2.len() as u8);
        out.extend_from_slice(&self.sig2);
        out
    }

    /// Decodes and structurally validates `buf` per SPEC_FULL.md §6.3:
    /// version must be 0, each fixed key must be shaped like a compressed
    /// pubkey, the trailing sig field's declared lengths must exactly
    /// account for the remaining bytes, and each embedded signature must be
    /// DER-shaped.
    pub fn decode(buf: &[u8]) -> R<Self> {
        let header_len = 4 + KEY_LENGTH * 3;
        if buf.len() < header_len + 2 {
            return Err(MinerInfoError::InvalidSigLen);
        }
        let version = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if version != MSG_VERSION {
            return Err(MinerInfoError::ScriptVersionUnsupported);
        }

        let revocation_key = read_key(buf, 4)?;
        let miner_id = read_key(buf, 4 + KEY_LENGTH)?;
        let revocation_message = read_key(buf, 4 + KEY_LENGTH * 2)?;

        let sig1_len = buf[header_len] as usize;
        let sig1_start = header_len + 1;
        if buf.len() < sig1_start + sig1_len + 1 {
            return Err(MinerInfoError::InvalidSigLen);
        }
        let sig1 = buf[sig1_start..sig1_start + sig1_len].to_vec();

        let sig2_len_offset = sig1_start + sig1_len;
        let sig2_len = buf[sig2_len_offset] as usize;
        let sig2_start = sig2_len_offset + 1;
        if buf.len() != sig2_start + sig2_len {
            return Err(MinerInfoError::InvalidSigLen);
        }
        let sig2 = buf[sig2_start..].to_vec();

        if !is_der_signature(&sig1) || !is_der_signature(&sig2) {
            return Err(MinerInfoError::InvalidSigLen);
        }

        Ok(Self {
            revocation_key,
            miner_id,
            revocation_message,
            sig1,
            sig2,
        })
    }
}

fn read_key(buf: &[u8], offset: usize) -> R<CompressedPubKey> {
    let slice = &buf[offset..offset + KEY_LENGTH];
    if !is_compressed_key(slice) {
        return Err(MinerInfoError::InvalidSigLen);
    }
    let mut out = [0u8; KEY_LENGTH];
    out.copy_from_slice(slice);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(tag: u8) -> CompressedPubKey {
        let mut k = [tag; 33];
        k[0] = 0x02;
        k
    }

    fn sample_sig(tag: u8) -> Vec<u8> {
        let mut s = vec![0x30u8];
        s.extend(std::iter::repeat(tag).take(68));
        s
    }

    #[test]
    fn encode_decode_round_trip() {
        let msg = RevokeMid {
            revocation_key: sample_key(1),
            miner_id: sample_key(2),
            revocation_message: sample_key(3),
            sig1: sample_sig(0xaa),
            sig2: sample_sig(0xbb),
        };
        let wire = msg.encode();
        let decoded = RevokeMid::decode(&wire).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rejects_non_zero_version() {
        let msg = RevokeMid {
            revocation_key: sample_key(1),
            miner_id: sample_key(2),
            revocation_message: sample_key(3),
            sig1: sample_sig(0xaa),
            sig2: sample_sig(0xbb),
        };
        let mut wire = msg.encode();
        wire[0] = 1;
        assert_eq!(
            RevokeMid::decode(&wire).unwrap_err(),
            MinerInfoError::ScriptVersionUnsupported
        );
    }

    #[test]
    fn rejects_truncated_sig_trailer() {
        let msg = RevokeMid {
            revocation_key: sample_key(1),
            miner_id: sample_key(2),
            revocation_message: sample_key(3),
            sig1: sample_sig(0xaa),
            sig2: sample_sig(0xbb),
        };
        let mut wire = msg.encode();
        wire.truncate(wire.len() - 1);
        assert!(RevokeMid::decode(&wire).is_err());
    }
}
