//! midcore core library.
//!
//! Incremental P2P wire parsers and the miner-identity subsystem for a
//! Bitcoin-family full node: streaming message framing, coinbase/miner-info
//! document validation, block-bind verification, and the key
//! rotation/revocation/reputation database. See `SPEC_FULL.md` for the full
//! module-by-module specification.

pub mod config;
pub mod context;
pub mod dataref;
pub mod error;
pub mod kvstore;
pub mod message;
pub mod miner_id;
pub mod parser;
pub mod primitives;
pub mod unique_array;

pub use error::{Error, Result};
pub use primitives::Hash256;
