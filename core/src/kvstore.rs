//! Narrow key-value persistence interface (SPEC_FULL.md §10.7).
//!
//! The miner-ID and DataRef databases are specified against a byte-keyed
//! ordered store with batch writes; the actual storage engine is an
//! external collaborator (SPEC_FULL.md §1's "Deliberately excluded"). This
//! module defines the trait the rest of the crate programs against plus an
//! in-memory `BTreeMap` implementation used by tests and the CLI's offline
//! inspection mode.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// A single put or delete queued in a [`KvBatch`].
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A batch of writes applied atomically by [`KvStore::write_batch`].
#[derive(Default)]
pub struct KvBatch {
    ops: Vec<Op>,
}

impl KvBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(Op::Put(key.into(), value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(Op::Delete(key.into()));
    }
}

/// Byte-keyed ordered store with batch writes, matching the collaborator
/// interface SPEC_FULL.md's database sections are specified against.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn write_batch(&self, batch: KvBatch);
    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// In-memory `BTreeMap`-backed store. Not durable across process restarts —
/// used for tests and the CLI's offline-inspection demo mode.
#[derive(Default)]
pub struct MemoryKvStore {
    inner: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    fn write_batch(&self, batch: KvBatch) {
        let mut guard = self.inner.lock().unwrap();
        for op in batch.ops {
            match op {
                Op::Put(k, v) => {
                    guard.insert(k, v);
                }
                Op::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner
            .lock()
            .unwrap()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_put_then_get() {
        let store = MemoryKvStore::new();
        let mut batch = KvBatch::new();
        batch.put(b"I\x01".to_vec(), b"value".to_vec());
        store.write_batch(batch);
        assert_eq!(store.get(b"I\x01"), Some(b"value".to_vec()));
    }

    #[test]
    fn batch_delete_removes_key() {
        let store = MemoryKvStore::new();
        let mut batch = KvBatch::new();
        batch.put(b"k".to_vec(), b"v".to_vec());
        store.write_batch(batch);
        let mut del = KvBatch::new();
        del.delete(b"k".to_vec());
        store.write_batch(del);
        assert_eq!(store.get(b"k"), None);
    }

    #[test]
    fn scan_prefix_respects_ordering_and_boundary() {
        let store = MemoryKvStore::new();
        let mut batch = KvBatch::new();
        batch.put(b"I\x01".to_vec(), b"a".to_vec());
        batch.put(b"I\x02".to_vec(), b"b".to_vec());
        batch.put(b"T\x01".to_vec(), b"c".to_vec());
        store.write_batch(batch);
        let scanned = store.scan_prefix(b"I");
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, b"I\x01");
        assert_eq!(scanned[1].0, b"I\x02");
    }
}
