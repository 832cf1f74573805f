//! Top-level error type for the **midcore** core crate.
//!
//! All high-level operations return [`crate::Result`], an alias for
//! `core::result::Result<T, Error>`.
//!
//! Lower-level, domain-specific error enums ([`crate::parser::ParseError`],
//! [`crate::miner_id::error::MinerInfoError`]) are mapped into one of these
//! variants before bubbling up to callers that don't care about parse-time
//! detail — see SPEC_FULL.md §7 for the propagation policy.

use thiserror::Error;

/// Core crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A miner-info document or script failed validation; see the wrapped
    /// [`crate::miner_id::error::MinerInfoError`] for the specific cause.
    #[error("miner-info document invalid: {0}")]
    MinerInfo(#[from] crate::miner_id::error::MinerInfoError),

    /// An incremental parser could not make progress (see
    /// [`crate::parser::ParseError`]).
    #[error("parse error: {0}")]
    Parse(#[from] crate::parser::ParseError),

    /// A `revokemid` message failed structural or signature validation.
    #[error("revokemid rejected: {0}")]
    RevokeMidRejected(&'static str),

    /// The miner-ID database encountered a state it cannot apply the
    /// requested transition to (e.g. rotating an already-revoked id).
    #[error("miner-id db rejected transition: {0}")]
    InvalidTransition(&'static str),

    /// A read against a key known to exist returned nothing or malformed
    /// bytes. Per SPEC_FULL.md §7 this is treated as fatal: the caller is
    /// expected to translate it into a process exit or an operator-triggered
    /// rebuild-from-chain.
    #[error("database corruption reading key {0}")]
    DbCorruption(String),

    /// Placeholder for errors surfaced by a collaborator crate.
    #[error("{0}")]
    Other(&'static str),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
