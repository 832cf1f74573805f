//! Coinbase document parsing & validation (SPEC_FULL.md §4.F).
//!
//! A `CoinbaseDocument` is the validated contents of a signed miner
//! identity document, whether carried directly in a coinbase output
//! (v0.1/v0.2) or in a separate miner-info transaction (v0.3). Parsing and
//! cryptographic validation happen together: a document is never handed to
//! a caller half-checked.

use super::crypto;
use super::error::MinerInfoError;
use crate::primitives::{is_compressed_key, is_der_signature, sha256, CompressedPubKey, Hash256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

type R<T> = Result<T, MinerInfoError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocVersion {
    #[serde(rename = "0.1")]
    V0_1,
    #[serde(rename = "0.2")]
    V0_2,
    #[serde(rename = "0.3")]
    V0_3,
}

impl DocVersion {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "0.1" => Some(Self::V0_1),
            "0.2" => Some(Self::V0_2),
            "0.3" => Some(Self::V0_3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationMessage {
    #[serde(with = "serde_big_array::BigArray")]
    pub compromised_miner_id: CompressedPubKey,
    pub sig1: Vec<u8>,
    pub sig2: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRefEntry {
    pub brfc_ids: Vec<String>,
    pub txid: Hash256,
    pub vout: u32,
    pub compress: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VCtx {
    pub txid: Hash256,
    pub vout: u32,
}

/// The validated parsed contents of a signed miner document
/// (SPEC_FULL.md §3.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseDocument {
    pub version: DocVersion,
    pub height: i32,
    #[serde(with = "serde_big_array::BigArray")]
    pub miner_id: CompressedPubKey,
    #[serde(with = "serde_big_array::BigArray")]
    pub prev_miner_id: CompressedPubKey,
    pub prev_miner_id_sig: Vec<u8>,
    #[serde(with = "crate::primitives::opt_compressed_pubkey")]
    pub revocation_key: Option<CompressedPubKey>,
    #[serde(with = "crate::primitives::opt_compressed_pubkey")]
    pub prev_revocation_key: Option<CompressedPubKey>,
    pub prev_revocation_key_sig: Option<Vec<u8>>,
    pub revocation_message: Option<RevocationMessage>,
    pub data_refs: Vec<DataRefEntry>,
    pub vctx: Option<VCtx>,
}

fn obj_field<'a>(doc: &'a Value, field: &str) -> R<&'a Value> {
    doc.get(field).ok_or(MinerInfoError::DocParseErrorMissingFields)
}

fn field_str<'a>(doc: &'a Value, field: &str) -> R<&'a str> {
    obj_field(doc, field)?
        .as_str()
        .ok_or(MinerInfoError::DocParseErrorInvalidStringType)
}

fn field_i64(doc: &Value, field: &str) -> R<i64> {
    obj_field(doc, field)?
        .as_i64()
        .ok_or(MinerInfoError::DocParseErrorInvalidNumberType)
}

fn decode_key(hex_str: &str, err: MinerInfoError) -> R<CompressedPubKey> {
    let bytes = hex::decode(hex_str).map_err(|_| err)?;
    if !is_compressed_key(&bytes) {
        return Err(err);
    }
    let mut out = [0u8; 33];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn decode_sig(hex_str: &str, err: MinerInfoError) -> R<Vec<u8>> {
    let bytes = hex::decode(hex_str).map_err(|_| err)?;
    if !is_der_signature(&bytes) {
        return Err(err);
    }
    Ok(bytes)
}

fn decode_txid(hex_str: &str, err: MinerInfoError) -> R<Hash256> {
    let bytes = hex::decode(hex_str).map_err(|_| err)?;
    if bytes.len() != 32 {
        return Err(err);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parses and fully validates a static coinbase document, per SPEC_FULL.md
/// §4.F's 9-step algorithm. `canonical_json` must be the exact bytes the
/// outer signature was computed over (the source push, not a re-serialized
/// copy — JSON re-serialization is not guaranteed byte-stable).
pub fn parse_and_validate(
    canonical_json: &[u8],
    outer_sig: &[u8],
    carrying_block_height: i32,
    is_miner_info_form: bool,
) -> R<CoinbaseDocument> {
    // Step 1
    let doc: Value = serde_json::from_slice(canonical_json)
        .map_err(|_| MinerInfoError::DocParseErrorIllFormedJson)?;
    if !doc.is_object() {
        return Err(MinerInfoError::DocParseErrorIllFormedJson);
    }

    // Step 2/3: version.
    let version_str = field_str(&doc, "version")?;
    let version = DocVersion::parse(version_str).ok_or(MinerInfoError::DocParseErrorUnsupportedVersion)?;
    let expects_v03 = matches!(version, DocVersion::V0_3);
    if expects_v03 != is_miner_info_form {
        return Err(MinerInfoError::DocParseErrorUnsupportedVersion);
    }

    // Step 4: height.
    let height = field_i64(&doc, "height")?;
    if height <= 0 {
        return Err(MinerInfoError::DocParseErrorInvalidHeight);
    }
    if height as i32 != carrying_block_height {
        return Err(MinerInfoError::DocParseErrorInvalidHeight);
    }

    // Step 5: key/sig shape.
    let miner_id = decode_key(field_str(&doc, "minerId")?, MinerInfoError::DocParseErrorInvalidMinerId)?;
    let prev_miner_id = decode_key(
        field_str(&doc, "prevMinerId")?,
        MinerInfoError::DocParseErrorInvalidPrevMinerId,
    )?;
    let prev_miner_id_sig = decode_sig(
        field_str(&doc, "prevMinerIdSig")?,
        MinerInfoError::DocParseErrorInvalidPrevMinerIdSig,
    )?;

    let (revocation_key, prev_revocation_key, prev_revocation_key_sig) = if matches!(version, DocVersion::V0_3) {
        let rk = decode_key(
            field_str(&doc, "revocationKey")?,
            MinerInfoError::DocParseErrorInvalidRevocationKey,
        )?;
        let prk = decode_key(
            field_str(&doc, "prevRevocationKey")?,
            MinerInfoError::DocParseErrorInvalidPrevRevocationKey,
        )?;
        let prks = decode_sig(
            field_str(&doc, "prevRevocationKeySig")?,
            MinerInfoError::DocParseErrorInvalidPrevRevocationKeySig,
        )?;
        (Some(rk), Some(prk), Some(prks))
    } else {
        (None, None, None)
    };

    // Step 6: prevMinerIdSig verification payload.
    let vctx = parse_vctx(&doc, &version)?;
    if miner_id != prev_miner_id {
        let payload = build_prev_miner_id_sig_payload(&version, &prev_miner_id, &miner_id, vctx.as_ref());
        if !crypto::verify(&prev_miner_id, &payload, &prev_miner_id_sig) {
            return Err(MinerInfoError::DocParseErrorPrevMinerIdSigVerificationFail);
        }
    }

    // Step 7: v0.3 prevRevocationKeySig.
    if matches!(version, DocVersion::V0_3) {
        let rk = revocation_key.expect("checked above");
        let prk = prev_revocation_key.expect("checked above");
        let prks = prev_revocation_key_sig.as_ref().expect("checked above");
        if rk != prk {
            let mut payload = Vec::with_capacity(66);
            payload.extend_from_slice(&prk);
            payload.extend_from_slice(&rk);
            if !crypto::verify(&prk, &payload, prks) {
                return Err(MinerInfoError::DocParseErrorPrevRevKeySigVerificationFail);
            }
        }
    }

    // Step 8: revocation message.
    let revocation_message = parse_revocation_message(&doc, &miner_id, revocation_key.as_ref())?;

    // Step 9: outer document signature, SHA-256 over canonical JSON.
    if !crypto::verify(&miner_id, canonical_json, outer_sig) {
        return Err(MinerInfoError::DocParseErrorPrevMinerIdSigVerificationFail);
    }

    let data_refs = parse_data_refs(&doc)?;

    Ok(CoinbaseDocument {
        version,
        height: height as i32,
        miner_id,
        prev_miner_id,
        prev_miner_id_sig,
        revocation_key,
        prev_revocation_key,
        prev_revocation_key_sig,
        revocation_message,
        data_refs,
        vctx,
    })
}

fn parse_vctx(doc: &Value, version: &DocVersion) -> R<Option<VCtx>> {
    if matches!(version, DocVersion::V0_3) {
        return Ok(None);
    }
    let Some(v) = doc.get("vctx") else {
        return Ok(None);
    };
    if !v.is_object() {
        return Err(MinerInfoError::DocParseErrorInvalidStringType);
    }
    let txid = decode_txid(field_str(v, "txId")?, MinerInfoError::InvalidTxidLen)?;
    let vout = field_i64(v, "vout")? as u32;
    Ok(Some(VCtx { txid, vout }))
}

/// Builds the byte payload `prevMinerIdSig` is verified over. v0.1 is the
/// UTF-8 concatenation of hex strings; v0.2/v0.3 concatenate raw decoded
/// bytes (SPEC_FULL.md §4.F step 6, and the resolved open question in
/// DESIGN.md for the v0.2 dynamic-document analogue).
fn build_prev_miner_id_sig_payload(
    version: &DocVersion,
    prev_miner_id: &CompressedPubKey,
    miner_id: &CompressedPubKey,
    vctx: Option<&VCtx>,
) -> Vec<u8> {
    match version {
        DocVersion::V0_1 => {
            let mut s = String::new();
            s.push_str(&hex::encode(prev_miner_id));
            s.push_str(&hex::encode(miner_id));
            if let Some(v) = vctx {
                s.push_str(&hex::encode(v.txid));
            }
            s.into_bytes()
        }
        DocVersion::V0_2 | DocVersion::V0_3 => {
            let mut out = Vec::with_capacity(66 + 32);
            out.extend_from_slice(prev_miner_id);
            out.extend_from_slice(miner_id);
            if let Some(v) = vctx {
                out.extend_from_slice(&v.txid);
            }
            out
        }
    }
}

fn parse_revocation_message(
    doc: &Value,
    current_miner_id: &CompressedPubKey,
    revocation_key: Option<&CompressedPubKey>,
) -> R<Option<RevocationMessage>> {
    let has_msg = doc.get("revocationMessage").is_some();
    let has_sig = doc.get("revocationMessageSig").is_some();
    if !has_msg && !has_sig {
        return Ok(None);
    }
    if has_msg != has_sig {
        return Err(MinerInfoError::DocParseErrorRevMsgFields);
    }
    let msg = &doc["revocationMessage"];
    let compromised_hex = msg
        .get("compromisedMinerId")
        .and_then(Value::as_str)
        .ok_or(MinerInfoError::DocParseErrorRevMsgField)?;
    let compromised_miner_id = decode_key(compromised_hex, MinerInfoError::DocParseErrorRevMsgKey)?;

    let sig_obj = &doc["revocationMessageSig"];
    let sig1 = decode_sig(
        sig_obj
            .get("sig1")
            .and_then(Value::as_str)
            .ok_or(MinerInfoError::DocParseErrorRevMsgSig1)?,
        MinerInfoError::DocParseErrorRevMsgSig1,
    )?;
    let sig2 = decode_sig(
        sig_obj
            .get("sig2")
            .and_then(Value::as_str)
            .ok_or(MinerInfoError::DocParseErrorRevMsgSig2)?,
        MinerInfoError::DocParseErrorRevMsgSig2,
    )?;

    let rev_key = revocation_key.ok_or(MinerInfoError::DocParseErrorRevMsgSig1Key)?;
    let hash = sha256(&compromised_miner_id);
    if !crypto::verify_hash(rev_key, hash, &sig1) {
        return Err(MinerInfoError::DocParseErrorSig1VerificationFailed);
    }
    if !crypto::verify_hash(current_miner_id, hash, &sig2) {
        return Err(MinerInfoError::DocParseErrorSig2VerificationFailed);
    }

    Ok(Some(RevocationMessage {
        compromised_miner_id,
        sig1,
        sig2,
    }))
}

fn parse_data_refs(doc: &Value) -> R<Vec<DataRefEntry>> {
    let Some(data_refs) = doc.get("dataRefs") else {
        return Ok(Vec::new());
    };
    let refs = data_refs
        .get("refs")
        .ok_or(MinerInfoError::DocParseErrorDatarefsInvalidDatarefsType)?
        .as_array()
        .ok_or(MinerInfoError::DocParseErrorDatarefsInvalidRefsType)?;

    let mut out = Vec::with_capacity(refs.len());
    for entry in refs {
        if !entry.is_object() {
            return Err(MinerInfoError::DocParseErrorDatarefsInvalidDatarefType);
        }
        let brfc_values = entry
            .get("brfcIds")
            .ok_or(MinerInfoError::DocParseErrorDatarefsDatarefMissingFields)?
            .as_array()
            .ok_or(MinerInfoError::DocParseErrorDatarefsRefsBrfcidType)?;
        let mut brfc_ids = Vec::with_capacity(brfc_values.len());
        for v in brfc_values {
            let s = v
                .as_str()
                .ok_or(MinerInfoError::DocParseErrorDatarefsRefsBrfcidFieldType)?;
            if s.len() != 12 {
                return Err(MinerInfoError::BrfcidInvalidLength);
            }
            brfc_ids.push(s.to_string());
        }
        let txid_hex = entry
            .get("txid")
            .and_then(Value::as_str)
            .ok_or(MinerInfoError::DocParseErrorDatarefsRefsTxidType)?;
        let txid = decode_txid(txid_hex, MinerInfoError::DocParseErrorDatarefsRefsTxidType)?;
        let vout = entry
            .get("vout")
            .and_then(Value::as_u64)
            .ok_or(MinerInfoError::DocParseErrorDatarefsRefsVoutType)? as u32;
        let compress = match entry.get("compress") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or(MinerInfoError::DocParseErrorDatarefsRefsCompressType)?
                    .to_string(),
            ),
        };
        out.push(DataRefEntry {
            brfc_ids,
            txid,
            vout,
            compress,
        });
    }
    Ok(out)
}

/// Validates a dynamic v0.2 document, whose only required field is
/// `dynamicMinerId`. Its signature verifies under `dynamicMinerId` over
/// `static_doc_json ‖ static_doc_sig_bytes ‖ dynamic_doc_json` (the
/// resolved form of SPEC_FULL.md §9's open question: UTF-8 byte
/// concatenation, matching `SetDynamicCoinbaseDocument` in the original
/// source).
pub fn parse_and_validate_dynamic(
    static_doc_json: &[u8],
    static_doc_sig: &[u8],
    dynamic_doc_json: &[u8],
    dynamic_sig: &[u8],
) -> R<CompressedPubKey> {
    let dyn_doc: Value =
        serde_json::from_slice(dynamic_doc_json).map_err(|_| MinerInfoError::DocParseErrorIllFormedJson)?;
    let dynamic_miner_id = decode_key(
        field_str(&dyn_doc, "dynamicMinerId")?,
        MinerInfoError::DocParseErrorInvalidMinerId,
    )?;

    let mut payload = Vec::with_capacity(static_doc_json.len() + static_doc_sig.len() + dynamic_doc_json.len());
    payload.extend_from_slice(static_doc_json);
    payload.extend_from_slice(static_doc_sig);
    payload.extend_from_slice(dynamic_doc_json);

    if !crypto::verify(&dynamic_miner_id, &payload, dynamic_sig) {
        return Err(MinerInfoError::DocParseErrorPrevMinerIdSigVerificationFail);
    }
    Ok(dynamic_miner_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    struct Signer {
        secp: Secp256k1<secp256k1::All>,
        sk: SecretKey,
        pk: PublicKey,
    }

    impl Signer {
        fn new() -> Self {
            let secp = Secp256k1::new();
            let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
            let pk = PublicKey::from_secret_key(&secp, &sk);
            Self { secp, sk, pk }
        }

        fn sign(&self, msg: &[u8]) -> Vec<u8> {
            let hash = sha256(msg);
            let m = secp256k1::Message::from_digest_slice(&hash).unwrap();
            self.secp.sign_ecdsa(&m, &self.sk).serialize_der().to_vec()
        }

        fn key_hex(&self) -> String {
            hex::encode(self.pk.serialize())
        }
    }

    #[test]
    fn rejects_ill_formed_json() {
        let err = parse_and_validate(b"not json", b"", 10, false).unwrap_err();
        assert_eq!(err, MinerInfoError::DocParseErrorIllFormedJson);
    }

    #[test]
    fn validates_continuation_document_no_rotation() {
        let miner = Signer::new();

        let doc_json = serde_json::json!({
            "version": "0.2",
            "height": 100,
            "minerId": miner.key_hex(),
            "prevMinerId": miner.key_hex(),
            "prevMinerIdSig": hex::encode(vec![0x30; 70]),
        });
        let canonical = serde_json::to_vec(&doc_json).unwrap();
        let outer_sig = miner.sign(&canonical);

        let parsed = parse_and_validate(&canonical, &outer_sig, 100, false).unwrap();
        assert_eq!(parsed.miner_id, miner.pk.serialize());
        assert_eq!(parsed.prev_miner_id, parsed.miner_id);
    }

    #[test]
    fn rejects_wrong_height() {
        let miner = Signer::new();
        let doc_json = serde_json::json!({
            "version": "0.2",
            "height": 100,
            "minerId": miner.key_hex(),
            "prevMinerId": miner.key_hex(),
            "prevMinerIdSig": hex::encode(vec![0x30; 70]),
        });
        let canonical = serde_json::to_vec(&doc_json).unwrap();
        let outer_sig = miner.sign(&canonical);
        let err = parse_and_validate(&canonical, &outer_sig, 101, false).unwrap_err();
        assert_eq!(err, MinerInfoError::DocParseErrorInvalidHeight);
    }

    #[test]
    fn validates_rotation_payload_and_signature() {
        let prev = Signer::new();
        let next = Signer::new();

        let payload = {
            let mut p = Vec::new();
            p.extend_from_slice(&prev.pk.serialize());
            p.extend_from_slice(&next.pk.serialize());
            p
        };
        let prev_sig = prev.sign(&payload);

        let doc_json = serde_json::json!({
            "version": "0.2",
            "height": 50,
            "minerId": next.key_hex(),
            "prevMinerId": prev.key_hex(),
            "prevMinerIdSig": hex::encode(&prev_sig),
        });
        let canonical = serde_json::to_vec(&doc_json).unwrap();
        let outer_sig = next.sign(&canonical);

        let parsed = parse_and_validate(&canonical, &outer_sig, 50, false).unwrap();
        assert_eq!(parsed.miner_id, next.pk.serialize());
        assert_eq!(parsed.prev_miner_id, prev.pk.serialize());
    }
}
