//! Miner-info validation error enumeration (SPEC_FULL.md §7).
//!
//! Every variant carries a fixed, human-readable message and nothing else —
//! callers log `<txid, vout, error-name>` and otherwise treat the result as
//! "valid or not" (SPEC_FULL.md §7's propagation policy: these never abort
//! the node, the offending coinbase is just treated as carrying no
//! miner-id).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum MinerInfoError {
    #[error("miner-info reference not found in coinbase")]
    MinerInfoRefNotFound,
    #[error("invalid script instruction")]
    InvalidInstruction,
    #[error("unsupported miner-info script version")]
    ScriptVersionUnsupported,
    #[error("invalid txid length")]
    InvalidTxidLen,
    #[error("invalid mmr_pbh_hash length")]
    InvalidMmrPbhHashLen,
    #[error("invalid signature length")]
    InvalidSigLen,
    #[error("referenced txid not found")]
    TxidNotFound,
    #[error("miner-info document output not found")]
    DocOutputNotFound,

    #[error("document is not well-formed JSON")]
    DocParseErrorIllFormedJson,
    #[error("document is missing required fields")]
    DocParseErrorMissingFields,
    #[error("a document field has an invalid string type")]
    DocParseErrorInvalidStringType,
    #[error("a document field has an invalid number type")]
    DocParseErrorInvalidNumberType,
    #[error("unsupported document version")]
    DocParseErrorUnsupportedVersion,
    #[error("invalid height field")]
    DocParseErrorInvalidHeight,
    #[error("invalid minerId")]
    DocParseErrorInvalidMinerId,
    #[error("invalid prevMinerId")]
    DocParseErrorInvalidPrevMinerId,
    #[error("invalid prevMinerIdSig shape")]
    DocParseErrorInvalidPrevMinerIdSig,
    #[error("prevMinerIdSig verification failed")]
    DocParseErrorPrevMinerIdSigVerificationFail,
    #[error("invalid revocationKey")]
    DocParseErrorInvalidRevocationKey,
    #[error("invalid prevRevocationKey")]
    DocParseErrorInvalidPrevRevocationKey,
    #[error("invalid prevRevocationKeySig shape")]
    DocParseErrorInvalidPrevRevocationKeySig,
    #[error("prevRevocationKeySig verification failed")]
    DocParseErrorPrevRevKeySigVerificationFail,
    #[error("revocationMessage is missing required fields")]
    DocParseErrorRevMsgFields,
    #[error("a revocationMessage field is malformed")]
    DocParseErrorRevMsgField,
    #[error("revocationMessage key is malformed")]
    DocParseErrorRevMsgKey,
    #[error("revocationMessage sig1 is malformed")]
    DocParseErrorRevMsgSig1,
    #[error("revocationMessage sig1 key is malformed")]
    DocParseErrorRevMsgSig1Key,
    #[error("revocationMessage sig1 verification failed")]
    DocParseErrorSig1VerificationFailed,
    #[error("revocationMessage sig2 is malformed")]
    DocParseErrorRevMsgSig2,
    #[error("revocationMessage sig2 key is malformed")]
    DocParseErrorRevMsgSig2Key,
    #[error("revocationMessage sig2 verification failed")]
    DocParseErrorSig2VerificationFailed,

    #[error("dataRefs is not an array")]
    DocParseErrorDatarefsInvalidDatarefsType,
    #[error("dataRefs.refs is not an array")]
    DocParseErrorDatarefsInvalidRefsType,
    #[error("a dataRefs entry is not an object")]
    DocParseErrorDatarefsInvalidDatarefType,
    #[error("a dataRefs entry is missing required fields")]
    DocParseErrorDatarefsDatarefMissingFields,
    #[error("a dataRefs ref field has an invalid type")]
    DocParseErrorDatarefsInvalidRefFieldType,
    #[error("dataRefs.refs.brfcIds is not an array")]
    DocParseErrorDatarefsRefsBrfcidType,
    #[error("a dataRefs.refs.brfcIds entry has an invalid type")]
    DocParseErrorDatarefsRefsBrfcidFieldType,
    #[error("dataRefs.refs.txid has an invalid type")]
    DocParseErrorDatarefsRefsTxidType,
    #[error("dataRefs.refs.vout has an invalid type")]
    DocParseErrorDatarefsRefsVoutType,
    #[error("dataRefs.refs.compress has an invalid type")]
    DocParseErrorDatarefsRefsCompressType,

    #[error("block-bind hash mismatch")]
    BlockBindHashMismatch,
    #[error("block-bind signature verification failed")]
    BlockBindSigVerificationFailed,

    #[error("brfcId has invalid length")]
    BrfcidInvalidLength,
    #[error("brfcId has invalid content")]
    BrfcidInvalidContent,
    #[error("brfcId has an invalid value type")]
    BrfcidInvalidValueType,

    #[error("unexpected internal parser size mismatch")]
    Size,
}
