//! Service-locator contexts replacing the source's mutable statics
//! (SPEC_FULL.md §9: "Mutable statics with lazy init... become fields on an
//! explicit context; all RPC entry points take that context").

use crate::config::MinerIdConfig;
use crate::dataref::DataRefDb;
use crate::miner_id::MinerIdDb;
use crate::primitives::{Hash256, Outpoint};
use std::sync::{Arc, RwLock};

/// Everything `midcore-rpc`'s miner-info endpoints need: the database plus
/// the current-miner-info-tx and funding-outpoint caches the original
/// source kept as process-global mutable statics.
pub struct MinerIdContext {
    pub db: Arc<MinerIdDb>,
    pub config: MinerIdConfig,
    current_miner_info_tx: RwLock<Option<Hash256>>,
    funding_outpoint: RwLock<Option<Outpoint>>,
}

impl MinerIdContext {
    pub fn new(db: Arc<MinerIdDb>, config: MinerIdConfig) -> Self {
        Self {
            db,
            config,
            current_miner_info_tx: RwLock::new(None),
            funding_outpoint: RwLock::new(None),
        }
    }

    pub fn current_miner_info_tx(&self) -> Option<Hash256> {
        *self.current_miner_info_tx.read().unwrap()
    }

    pub fn set_current_miner_info_tx(&self, txid: Option<Hash256>) {
        *self.current_miner_info_tx.write().unwrap() = txid;
    }

    pub fn funding_outpoint(&self) -> Option<Outpoint> {
        *self.funding_outpoint.read().unwrap()
    }

    pub fn set_funding_outpoint(&self, outpoint: Outpoint) {
        *self.funding_outpoint.write().unwrap() = Some(outpoint);
    }
}

/// The DataRef DB's equivalent context: just the database, since the
/// source's DataRef singleton (`g_dataRefIndex`) carried no auxiliary
/// caches beyond the DB itself.
pub struct DataRefContext {
    pub db: Arc<DataRefDb>,
}

impl DataRefContext {
    pub fn new(db: Arc<DataRefDb>) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvstore::MemoryKvStore;

    #[test]
    fn caches_start_empty_and_round_trip() {
        let db = Arc::new(MinerIdDb::new(Arc::new(MemoryKvStore::new()), MinerIdConfig::default()));
        let ctx = MinerIdContext::new(db, MinerIdConfig::default());
        assert_eq!(ctx.current_miner_info_tx(), None);
        ctx.set_current_miner_info_tx(Some([9u8; 32]));
        assert_eq!(ctx.current_miner_info_tx(), Some([9u8; 32]));

        assert_eq!(ctx.funding_outpoint(), None);
        ctx.set_funding_outpoint(Outpoint {
            txid: [1u8; 32],
            index: 2,
        });
        assert_eq!(
            ctx.funding_outpoint(),
            Some(Outpoint {
                txid: [1u8; 32],
                index: 2
            })
        );
    }
}
