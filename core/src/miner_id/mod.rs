//! Miner identity: document parsing, block-bind references, the key
//! rotation/revocation/reputation database, and the `revokemid` wire
//! message (SPEC_FULL.md §3, §4.F–§4.I).

pub mod crypto;
pub mod db;
pub mod doc;
pub mod error;
pub mod reference;
pub mod revoke;

pub use db::{BlockSource, MinerIdDb, MinerIdEntry, MinerIdState, MinerUUIdEntry, RecentBlock, Reputation};
pub use doc::{parse_and_validate, parse_and_validate_dynamic, CoinbaseDocument, DataRefEntry, DocVersion, VCtx};
pub use error::MinerInfoError;
pub use reference::{parse_miner_info_ref, verify_block_bind, BlockBind, BlockBindContext, MinerInfoRef};
pub use revoke::RevokeMid;
