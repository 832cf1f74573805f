//! The DataRef database (SPEC_FULL.md §4.H, §6.4): a persistent store of
//! referenced-data transactions — the miner-info transaction itself and
//! every transaction its document's `dataRefs` point at — each anchored to
//! a block by a Merkle proof.
//!
//! Grounded on [`crate::miner_id::db::MinerIdDb`]'s own
//! `KvStore`-plus-single-lock shape, but using one mutex obtained through an
//! [`Access`] guard (SPEC_FULL.md §4.H: "the mutex is held for the lifetime
//! of the guard") rather than a reader-writer lock, since every DataRef DB
//! operation mutates the shared disk-usage counter.

use crate::kvstore::{KvBatch, KvStore};
use crate::primitives::Hash256;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

const MINER_INFO_TAG: u8 = b'I';
const DATAREF_TAG: u8 = b'T';
const DISK_USAGE_KEY: u8 = b'D';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    MinerInfo,
    DataRef,
}

impl Family {
    fn tag(self) -> u8 {
        match self {
            Family::MinerInfo => MINER_INFO_TAG,
            Family::DataRef => DATAREF_TAG,
        }
    }
}

/// A Merkle proof: sibling hashes from leaf to root, plus the leaf's index
/// in the tree (needed to know which side each sibling joins on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u32,
    pub siblings: Vec<Hash256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDbEntry {
    pub tx: Vec<u8>,
    pub block_id: Hash256,
    pub proof: MerkleProof,
}

fn entry_key(family: Family, txid: &Hash256) -> Vec<u8> {
    let mut k = vec![family.tag()];
    k.extend_from_slice(txid);
    k
}

/// RAII guard granting exclusive access to the DataRef DB's mutable state.
/// Held for as long as a caller needs a consistent view across multiple
/// operations (SPEC_FULL.md §4.H); dropping it releases the mutex.
pub struct Access<'a> {
    guard: MutexGuard<'a, DiskUsage>,
    store: &'a dyn KvStore,
}

struct DiskUsage {
    bytes: u64,
}

impl Deref for Access<'_> {
    type Target = u64;
    fn deref(&self) -> &u64 {
        &self.guard.bytes
    }
}

impl DerefMut for Access<'_> {
    fn deref_mut(&mut self) -> &mut u64 {
        &mut self.guard.bytes
    }
}

impl Access<'_> {
    pub fn add_entry(&mut self, family: Family, txid: Hash256, entry: &DataDbEntry) {
        let bytes = bincode::serialize(entry).expect("DataDbEntry always serializes");
        self.guard.bytes += bytes.len() as u64;
        let mut batch = KvBatch::new();
        batch.put(entry_key(family, &txid), bytes);
        batch.put(vec![DISK_USAGE_KEY], self.guard.bytes.to_le_bytes().to_vec());
        self.store.write_batch(batch);
    }

    pub fn lookup_entry(&self, family: Family, txid: &Hash256) -> Option<DataDbEntry> {
        let bytes = self.store.get(&entry_key(family, txid))?;
        bincode::deserialize(&bytes).ok()
    }

    pub fn entry_exists(&self, family: Family, txid: &Hash256) -> bool {
        self.store.get(&entry_key(family, txid)).is_some()
    }

    pub fn delete_entry(&mut self, family: Family, txid: &Hash256) {
        let Some(existing) = self.lookup_entry(family, txid) else {
            return;
        };
        let freed = bincode::serialize(&existing).expect("re-serializes").len() as u64;
        self.guard.bytes = self.guard.bytes.saturating_sub(freed);
        let mut batch = KvBatch::new();
        batch.delete(entry_key(family, txid));
        batch.put(vec![DISK_USAGE_KEY], self.guard.bytes.to_le_bytes().to_vec());
        self.store.write_batch(batch);
    }

    pub fn all_entries(&self, family: Family) -> Vec<(Hash256, DataDbEntry)> {
        self.store
            .scan_prefix(&[family.tag()])
            .into_iter()
            .filter_map(|(k, v)| {
                let mut txid = [0u8; 32];
                txid.copy_from_slice(&k[1..]);
                let entry: DataDbEntry = bincode::deserialize(&v).ok()?;
                Some((txid, entry))
            })
            .collect()
    }

    pub fn dump_json(&self, family: Family) -> serde_json::Value {
        let entries = self.all_entries(family);
        serde_json::json!(entries
            .into_iter()
            .map(|(txid, entry)| {
                serde_json::json!({
                    "txid": hex::encode(txid),
                    "blockId": hex::encode(entry.block_id),
                    "tx": hex::encode(entry.tx),
                    "proof": {
                        "leafIndex": entry.proof.leaf_index,
                        "siblings": entry.proof.siblings.iter().map(hex::encode).collect::<Vec<_>>(),
                    },
                })
            })
            .collect::<Vec<_>>())
    }

    pub fn disk_usage_bytes(&self) -> u64 {
        self.guard.bytes
    }
}

/// Persistent store of referenced-data transactions, keyed by the family
/// tags SPEC_FULL.md §6.4 fixes.
pub struct DataRefDb {
    store: Arc<dyn KvStore>,
    disk_usage: Mutex<DiskUsage>,
}

impl DataRefDb {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let bytes = store
            .get(&[DISK_USAGE_KEY])
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
            .unwrap_or(0);
        Self {
            store,
            disk_usage: Mutex::new(DiskUsage { bytes }),
        }
    }

    /// Acquires the single mutex guarding this DB's mutable state. Every
    /// read and write goes through the returned guard.
    pub fn access(&self) -> Access<'_> {
        Access {
            guard: self.disk_usage.lock().unwrap(),
            store: self.store.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvstore::MemoryKvStore;

    fn sample_entry(tag: u8) -> DataDbEntry {
        DataDbEntry {
            tx: vec![tag; 10],
            block_id: [tag; 32],
            proof: MerkleProof {
                leaf_index: 0,
                siblings: vec![[tag; 32]],
            },
        }
    }

    #[test]
    fn add_then_lookup_round_trips() {
        let db = DataRefDb::new(Arc::new(MemoryKvStore::new()));
        let txid = [1u8; 32];
        let entry = sample_entry(1);
        let mut access = db.access();
        access.add_entry(Family::DataRef, txid, &entry);
        assert_eq!(access.lookup_entry(Family::DataRef, &txid), Some(entry));
        assert!(access.entry_exists(Family::DataRef, &txid));
        assert!(!access.entry_exists(Family::MinerInfo, &txid));
    }

    #[test]
    fn delete_entry_updates_disk_usage() {
        let db = DataRefDb::new(Arc::new(MemoryKvStore::new()));
        let txid = [2u8; 32];
        let entry = sample_entry(2);
        let mut access = db.access();
        access.add_entry(Family::MinerInfo, txid, &entry);
        let used_before = access.disk_usage_bytes();
        assert!(used_before > 0);
        access.delete_entry(Family::MinerInfo, &txid);
        assert_eq!(access.disk_usage_bytes(), 0);
        assert!(!access.entry_exists(Family::MinerInfo, &txid));
        assert!(used_before > 0);
    }

    #[test]
    fn all_entries_filters_by_family() {
        let db = DataRefDb::new(Arc::new(MemoryKvStore::new()));
        {
            let mut access = db.access();
            access.add_entry(Family::DataRef, [3u8; 32], &sample_entry(3));
            access.add_entry(Family::DataRef, [4u8; 32], &sample_entry(4));
            access.add_entry(Family::MinerInfo, [5u8; 32], &sample_entry(5));
        }
        let access = db.access();
        assert_eq!(access.all_entries(Family::DataRef).len(), 2);
        assert_eq!(access.all_entries(Family::MinerInfo).len(), 1);
    }

    #[test]
    fn disk_usage_persists_across_reopen() {
        let store = Arc::new(MemoryKvStore::new());
        {
            let db = DataRefDb::new(store.clone());
            db.access().add_entry(Family::DataRef, [6u8; 32], &sample_entry(6));
        }
        let reopened = DataRefDb::new(store);
        assert!(reopened.access().disk_usage_bytes() > 0);
    }
}
