//! Miner-info reference parsing & block-bind verification
//! (SPEC_FULL.md §4.G).
//!
//! A v0.3 coinbase carries a reference to a separate miner-info transaction
//! rather than the document itself:
//! `OP_FALSE OP_RETURN 0x601DFACE 0x00 <txid> <mmr_pbh_hash> <sig>`.

use super::crypto;
use super::error::MinerInfoError;
use crate::primitives::{sha256, CompressedPubKey, Hash256, Instruction, ScriptIter};

type R<T> = Result<T, MinerInfoError>;

const MINER_INFO_REF_PREFIX: [u8; 4] = [0x60, 0x1D, 0xFA, 0xCE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBind {
    pub mmr_pbh_hash: Hash256,
    pub sig: [u8; 72],
    pub sig_len: usize,
}

impl BlockBind {
    pub fn sig(&self) -> &[u8] {
        &self.sig[..self.sig_len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinerInfoRef {
    pub txid: Hash256,
    pub block_bind: BlockBind,
}

/// Parses a coinbase output script for a miner-info reference. Expects the
/// script to start with `OP_FALSE OP_RETURN` (two bare opcodes yielded by
/// [`ScriptIter`] with empty operands), followed by pushes
/// `0x601DFACE`, `0x00`, `<32-byte txid>`, `<32-byte mmr_pbh_hash>`,
/// `<69..72-byte sig>`.
pub fn parse_miner_info_ref(script: &[u8]) -> R<MinerInfoRef> {
    let mut it = ScriptIter::new(script);
    let op_false = it.next().ok_or(MinerInfoError::MinerInfoRefNotFound)?;
    let op_return = it.next().ok_or(MinerInfoError::MinerInfoRefNotFound)?;
    if !op_false.operand.is_empty() || !op_return.operand.is_empty() {
        return Err(MinerInfoError::MinerInfoRefNotFound);
    }

    let prefix: Instruction = it.next().ok_or(MinerInfoError::MinerInfoRefNotFound)?;
    if prefix.operand != MINER_INFO_REF_PREFIX {
        return Err(MinerInfoError::MinerInfoRefNotFound);
    }
    let version: Instruction = it.next().ok_or(MinerInfoError::ScriptVersionUnsupported)?;
    if version.operand != [0x00] {
        return Err(MinerInfoError::ScriptVersionUnsupported);
    }

    let txid_push = it.next().ok_or(MinerInfoError::InvalidTxidLen)?;
    if txid_push.operand.len() != 32 {
        return Err(MinerInfoError::InvalidTxidLen);
    }
    let mmr_push = it.next().ok_or(MinerInfoError::InvalidMmrPbhHashLen)?;
    if mmr_push.operand.len() != 32 {
        return Err(MinerInfoError::InvalidMmrPbhHashLen);
    }
    let sig_push = it.next().ok_or(MinerInfoError::InvalidSigLen)?;
    if !(69..=72).contains(&sig_push.operand.len()) || sig_push.operand.first() != Some(&0x30) {
        return Err(MinerInfoError::InvalidSigLen);
    }

    let mut txid = [0u8; 32];
    txid.copy_from_slice(txid_push.operand);
    let mut mmr_pbh_hash = [0u8; 32];
    mmr_pbh_hash.copy_from_slice(mmr_push.operand);
    let mut sig = [0u8; 72];
    sig[..sig_push.operand.len()].copy_from_slice(sig_push.operand);

    Ok(MinerInfoRef {
        txid,
        block_bind: BlockBind {
            mmr_pbh_hash,
            sig,
            sig_len: sig_push.operand.len(),
        },
    })
}

/// The inputs [`verify_block_bind`] needs from the block/chain collaborator:
/// the coinbase transaction's txid-equivalent fields needed to rebuild the
/// modified coinbase, the full list of transaction ids in the block (in
/// order, coinbase first), and the previous block's hash.
pub struct BlockBindContext<'a> {
    /// Raw coinbase transaction bytes, wire-encoded.
    pub coinbase_tx: &'a [u8],
    /// Txids of every other transaction in the block, in block order
    /// (excluding the coinbase).
    pub other_txids: &'a [Hash256],
    pub prev_block_hash: Hash256,
}

/// Rewrites a wire-encoded coinbase transaction's input to the modified
/// form block-bind verification requires: `nVersion = 1`, 8-zero-byte
/// `scriptSig`, prevout `(0…0, 0xFFFFFFFF)`. This is a byte-level rewrite
/// over the already-framed transaction produced by `tx_parser`, not a
/// re-encode from a decoded struct, so it preserves everything else about
/// the original bytes untouched (SPEC_FULL.md §4.G step 1).
pub fn modified_coinbase(coinbase_tx: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(coinbase_tx.len());
    out.extend_from_slice(&1u32.to_le_bytes()); // nVersion = 1
    // input count (compact-size) is copied verbatim from byte 4 onward;
    // for a coinbase this is always exactly one input.
    let (count_len, _) = crate::primitives::parse_compact_size(&coinbase_tx[4..]);
    out.extend_from_slice(&coinbase_tx[4..4 + count_len]);
    out.extend_from_slice(&[0u8; 32]); // prevout txid = 0
    out.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // prevout index
    out.push(8); // scriptSig length
    out.extend_from_slice(&[0u8; 8]); // scriptSig = 8 zero bytes
    // sequence(4) and everything after the original scriptSig is located by
    // re-scanning the original bytes: outpoint(36) ‖ compact-size script_len ‖ script ‖ seq(4).
    let after_count = 4 + count_len;
    let orig_script_len_offset = after_count + 36;
    let (orig_len_bytes, orig_script_len) = crate::primitives::parse_compact_size(&coinbase_tx[orig_script_len_offset..]);
    let orig_script_end = orig_script_len_offset + orig_len_bytes + orig_script_len as usize;
    out.extend_from_slice(&coinbase_tx[orig_script_end..]);
    out
}

/// Computes the Merkle root of `txids` using the standard Bitcoin pairwise
/// SHA-256d-of-concatenation algorithm, duplicating the last element of an
/// odd-sized level.
fn merkle_root(txids: &[Hash256]) -> Hash256 {
    if txids.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<Hash256> = txids.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let mut buf = Vec::with_capacity(64);
            buf.extend_from_slice(&pair[0]);
            buf.extend_from_slice(&pair[1]);
            next.push(sha256(&sha256(&buf)));
        }
        level = next;
    }
    level[0]
}

/// Verifies a parsed [`BlockBind`] against the block it claims to be bound
/// to, per SPEC_FULL.md §4.G's 5-step algorithm.
pub fn verify_block_bind(
    block_bind: &BlockBind,
    miner_id_key: &CompressedPubKey,
    ctx: &BlockBindContext,
) -> R<()> {
    let modified = modified_coinbase(ctx.coinbase_tx);
    let coinbase_txid = sha256(&sha256(&modified));

    let mut txids = Vec::with_capacity(ctx.other_txids.len() + 1);
    txids.push(coinbase_txid);
    txids.extend_from_slice(ctx.other_txids);
    let mm_root = merkle_root(&txids);

    let mut payload = Vec::with_capacity(64);
    payload.extend_from_slice(&mm_root);
    payload.extend_from_slice(&ctx.prev_block_hash);
    let h = sha256(&payload);

    if h != block_bind.mmr_pbh_hash {
        return Err(MinerInfoError::BlockBindHashMismatch);
    }
    if !crypto::verify_hash(miner_id_key, h, block_bind.sig()) {
        return Err(MinerInfoError::BlockBindSigVerificationFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::encode_compact_size;

    fn minimal_coinbase(script_sig: &[u8]) -> Vec<u8> {
        let mut out = 2u32.to_le_bytes().to_vec(); // nVersion = 2 (will be rewritten)
        out.extend(encode_compact_size(1)); // 1 input
        out.extend([0xaau8; 32]); // prevout txid (coinbase convention is zero, but use distinguishable bytes to prove rewrite)
        out.extend(0u32.to_le_bytes()); // prevout index
        out.extend(encode_compact_size(script_sig.len() as u64));
        out.extend(script_sig);
        out.extend(0xffff_ffffu32.to_le_bytes()); // sequence
        out.extend(encode_compact_size(0)); // 0 outputs for this test
        out.extend(0u32.to_le_bytes()); // locktime
        out
    }

    #[test]
    fn modified_coinbase_rewrites_version_and_input() {
        let cb = minimal_coinbase(b"arbitrary coinbase script data");
        let modified = modified_coinbase(&cb);
        assert_eq!(&modified[0..4], &1u32.to_le_bytes());
        assert_eq!(&modified[5..37], &[0u8; 32]);
        assert_eq!(&modified[37..41], &0xFFFF_FFFFu32.to_le_bytes());
        assert_eq!(modified[41], 8);
        assert_eq!(&modified[42..50], &[0u8; 8]);
        // sequence + outputs + locktime tail preserved from the original.
        assert_eq!(&modified[50..], &cb[cb.len() - 9..]);
    }

    #[test]
    fn parse_miner_info_ref_round_trip() {
        let mut script = vec![0x00, 0x6a]; // OP_FALSE OP_RETURN
        script.push(4);
        script.extend(MINER_INFO_REF_PREFIX);
        script.push(1);
        script.push(0x00);
        script.push(32);
        script.extend([0x11u8; 32]);
        script.push(32);
        script.extend([0x22u8; 32]);
        let sig = {
            let mut s = vec![0x30u8];
            s.extend([0u8; 68]);
            s
        };
        script.push(sig.len() as u8);
        script.extend(&sig);

        let parsed = parse_miner_info_ref(&script).unwrap();
        assert_eq!(parsed.txid, [0x11u8; 32]);
        assert_eq!(parsed.block_bind.mmr_pbh_hash, [0x22u8; 32]);
        assert_eq!(parsed.block_bind.sig(), &sig[..]);
    }

    #[test]
    fn merkle_root_single_tx_is_itself() {
        let txid = [7u8; 32];
        assert_eq!(merkle_root(&[txid]), txid);
    }
}
