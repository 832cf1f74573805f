//! The miner-ID database (SPEC_FULL.md §4.I): key rotation, revocation, and
//! reputation over a rolling window of recent blocks.
//!
//! Two persistent column families (`'I' ‖ H(pubkey)` → [`MinerIdEntry`],
//! `'M' ‖ uuid` → [`MinerUUIdEntry`]) live behind the injected
//! [`crate::kvstore::KvStore`] collaborator; the in-memory `RecentBlocks`
//! index and the single reader-writer lock live here (SPEC_FULL.md §5).

use super::doc::CoinbaseDocument;
use super::error::MinerInfoError;
use super::revoke::RevokeMid;
use crate::config::MinerIdConfig;
use crate::kvstore::{KvBatch, KvStore};
use crate::primitives::{sha256, CompressedPubKey, Hash256, Height};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type MinerUUId = Uuid;
pub type MinerIdHash = Hash256;

const ID_PREFIX: u8 = b'I';
const UUID_PREFIX: u8 = b'M';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinerIdState {
    Current,
    Rotated,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerIdEntry {
    pub uuid: MinerUUId,
    #[serde(with = "serde_big_array::BigArray")]
    pub pub_key: CompressedPubKey,
    pub state: MinerIdState,
    #[serde(with = "serde_big_array::BigArray")]
    pub prev_miner_id: CompressedPubKey,
    #[serde(with = "crate::primitives::opt_compressed_pubkey")]
    pub next_miner_id: Option<CompressedPubKey>,
    pub creation_block: Hash256,
    pub rotation_block: Hash256,
    pub coinbase_doc: CoinbaseDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub void: bool,
    #[serde(with = "crate::primitives::opt_compressed_pubkey")]
    pub voiding_id: Option<CompressedPubKey>,
    pub m: u32,
    pub m_increased_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerUUIdEntry {
    pub first_block: Hash256,
    pub last_block: Hash256,
    pub latest_miner_id: MinerIdHash,
    pub reputation: Reputation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentBlock {
    pub hash: Hash256,
    pub height: Height,
    pub miner_uuid: Option<MinerUUId>,
}

fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

fn id_hash(pub_key: &CompressedPubKey) -> MinerIdHash {
    sha256(pub_key)
}

fn id_key(pub_key: &CompressedPubKey) -> Vec<u8> {
    let mut k = vec![ID_PREFIX];
    k.extend_from_slice(&id_hash(pub_key));
    k
}

fn uuid_key(uuid: &MinerUUId) -> Vec<u8> {
    let mut k = vec![UUID_PREFIX];
    k.extend_from_slice(uuid.as_bytes());
    k
}

/// Read-only view into another block for [`MinerIdDb::update_to_tip`];
/// supplied by the chain-index collaborator SPEC_FULL.md §1 excludes from
/// this crate.
pub trait BlockSource {
    fn tip_height(&self) -> Height;
    /// Returns `(block_hash, parsed_coinbase_document)` for the block at
    /// `height`, or `None` if the collaborator has no block there.
    fn block_at(&self, height: Height) -> Option<(Hash256, Option<CoinbaseDocument>)>;
}

struct RecentBlocks {
    window: VecDeque<RecentBlock>,
}

impl RecentBlocks {
    fn new() -> Self {
        Self {
            window: VecDeque::new(),
        }
    }

    fn push(&mut self, block: RecentBlock, max_len: usize) {
        self.window.push_back(block);
        while self.window.len() > max_len {
            self.window.pop_front();
        }
    }

    fn remove_hash(&mut self, hash: &Hash256) {
        self.window.retain(|b| &b.hash != hash);
    }

    fn remove_uuid(&mut self, uuid: &MinerUUId) {
        self.window.retain(|b| b.miner_uuid.as_ref() != Some(uuid));
    }

    fn count_for_uuid(&self, uuid: &MinerUUId) -> usize {
        self.window.iter().filter(|b| b.miner_uuid.as_ref() == Some(uuid)).count()
    }
}

/// The miner-ID database: durable id/uuid records plus the in-memory
/// recent-blocks window, guarded by a single reader-writer lock
/// (SPEC_FULL.md §5 — `block_*`/`prune`/`process_revokemid` take the write
/// side, `check_reputation`/reads take the read side).
pub struct MinerIdDb {
    store: Arc<dyn KvStore>,
    config: MinerIdConfig,
    recent: RwLock<RecentBlocks>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DbError {
    NoMinerIdFound,
    RevocationChainMismatch,
    RevocationSigVerificationFailed,
    CompromisedIdNotInChain,
    RotationPreconditionFailed,
    InvalidRevokeMid(MinerInfoError),
}

type R<T> = Result<T, DbError>;

impl MinerIdDb {
    pub fn new(store: Arc<dyn KvStore>, config: MinerIdConfig) -> Self {
        Self {
            store,
            config,
            recent: RwLock::new(RecentBlocks::new()),
        }
    }

    fn get_entry(&self, pub_key: &CompressedPubKey) -> Option<MinerIdEntry> {
        let bytes = self.store.get(&id_key(pub_key))?;
        bincode::deserialize(&bytes).ok()
    }

    fn put_entry(&self, batch: &mut KvBatch, entry: &MinerIdEntry) {
        let bytes = bincode::serialize(entry).expect("MinerIdEntry always serializes");
        batch.put(id_key(&entry.pub_key), bytes);
    }

    fn get_uuid_entry(&self, uuid: &MinerUUId) -> Option<MinerUUIdEntry> {
        let bytes = self.store.get(&uuid_key(uuid))?;
        bincode::deserialize(&bytes).ok()
    }

    fn put_uuid_entry(&self, batch: &mut KvBatch, uuid: &MinerUUId, entry: &MinerUUIdEntry) {
        let bytes = bincode::serialize(entry).expect("MinerUUIdEntry always serializes");
        batch.put(uuid_key(uuid), bytes);
    }

    /// Entries from `start_pubkey` back to the earliest ancestor still on
    /// file, `start_pubkey`'s entry first. An entry whose `prev_miner_id`
    /// equals its own `pub_key` is the miner's root (first-ever) identity.
    fn ancestor_chain(&self, start_pubkey: &CompressedPubKey) -> Vec<MinerIdEntry> {
        let mut chain = Vec::new();
        let mut cur = *start_pubkey;
        loop {
            let Some(entry) = self.get_entry(&cur) else { break };
            let prev = entry.prev_miner_id;
            let is_root = prev == entry.pub_key;
            chain.push(entry);
            if is_root {
                break;
            }
            cur = prev;
        }
        chain
    }

    /// Applies a partial or full revocation rooted at `compromised_pubkey`
    /// within the chain ending at `current_pubkey`, per SPEC_FULL.md §4.I
    /// rule 2 (shared by `block_connected`'s in-document path and
    /// `process_revokemid`).
    ///
    /// Marks every entry from `compromised_pubkey` up to and including
    /// `current_pubkey` (inclusive, in chain order) `REVOKED`. A **full**
    /// revocation (the compromised id was the miner's root identity) voids
    /// the whole uuid's reputation and drops it from the recent-blocks
    /// window. A **partial** revocation instead restores the surviving
    /// ancestor — the entry immediately preceding `compromised_pubkey` in
    /// the chain, i.e. the id it had rotated away from — back to `CURRENT`
    /// with `next_miner_id` cleared, so the miner always has exactly one
    /// current id (SPEC_FULL.md §4.I).
    fn apply_revocation(&self, current_pubkey: &CompressedPubKey, compromised_pubkey: &CompressedPubKey) -> R<()> {
        let chain = self.ancestor_chain(current_pubkey);
        if chain.is_empty() {
            return Err(DbError::NoMinerIdFound);
        }
        let uuid = chain[0].uuid;
        let idx = chain
            .iter()
            .position(|e| &e.pub_key == compromised_pubkey)
            .ok_or(DbError::CompromisedIdNotInChain)?;
        // `prune()` can have already discarded the true root if it was
        // ROTATED beyond `num_ids_to_keep`, in which case the walk in
        // `ancestor_chain` stops one step short of a `prev_miner_id ==
        // pub_key` entry. Treat that truncation like a full revocation —
        // there is no surviving ancestor left on file to restore.
        let is_full = chain[idx].prev_miner_id == chain[idx].pub_key || idx + 1 >= chain.len();

        let mut batch = KvBatch::new();
        for entry in &chain[..=idx] {
            let mut revoked = entry.clone();
            revoked.state = MinerIdState::Revoked;
            self.put_entry(&mut batch, &revoked);
        }

        if is_full {
            if let Some(mut uuid_entry) = self.get_uuid_entry(&uuid) {
                uuid_entry.reputation.void = true;
                self.put_uuid_entry(&mut batch, &uuid, &uuid_entry);
            }
            self.store.write_batch(batch);
            let mut recent = self.recent.write().unwrap();
            recent.remove_uuid(&uuid);
        } else {
            let mut survivor = chain[idx + 1].clone();
            survivor.state = MinerIdState::Current;
            survivor.next_miner_id = None;
            self.put_entry(&mut batch, &survivor);
            self.store.write_batch(batch);
        }
        Ok(())
    }

    /// `block_connected(block, height)` (SPEC_FULL.md §4.I). `doc` is the
    /// already-extracted, already-cryptographically-validated coinbase
    /// document for this block, if one was found (rule 1 applies when
    /// `None`).
    pub fn block_connected(&self, block_hash: Hash256, height: Height, doc: Option<&CoinbaseDocument>) {
        let max_len = self.config.recent_blocks_window as usize;
        let mut recent = self.recent.write().unwrap();

        let Some(doc) = doc else {
            // Rule 1: no miner-id found.
            recent.push(
                RecentBlock {
                    hash: block_hash,
                    height,
                    miner_uuid: None,
                },
                max_len,
            );
            return;
        };

        // Rule 2: revocation message present.
        if let Some(rev_msg) = &doc.revocation_message {
            let Some(current_entry) = self.get_entry(&doc.miner_id) else {
                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: None,
                    },
                    max_len,
                );
                return;
            };
            if self
                .apply_revocation(&doc.miner_id, &rev_msg.compromised_miner_id)
                .is_err()
            {
                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: None,
                    },
                    max_len,
                );
                return;
            }
            recent.push(
                RecentBlock {
                    hash: block_hash,
                    height,
                    miner_uuid: Some(current_entry.uuid),
                },
                max_len,
            );
            return;
        }

        let rotating = doc.miner_id != doc.prev_miner_id;
        if rotating {
            // Rule 3: key rotation.
            let Some(mut prev_entry) = self.get_entry(&doc.prev_miner_id) else {
                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: None,
                    },
                    max_len,
                );
                return;
            };
            if prev_entry.state != MinerIdState::Current {
                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: None,
                    },
                    max_len,
                );
                return;
            }
            prev_entry.state = MinerIdState::Rotated;
            prev_entry.rotation_block = block_hash;
            prev_entry.next_miner_id = Some(doc.miner_id);
            let uuid = prev_entry.uuid;

            let new_entry = MinerIdEntry {
                uuid,
                pub_key: doc.miner_id,
                state: MinerIdState::Current,
                prev_miner_id: doc.prev_miner_id,
                next_miner_id: None,
                creation_block: block_hash,
                rotation_block: [0u8; 32],
                coinbase_doc: doc.clone(),
            };

            let mut batch = KvBatch::new();
            self.put_entry(&mut batch, &prev_entry);
            self.put_entry(&mut batch, &new_entry);
            if let Some(mut uuid_entry) = self.get_uuid_entry(&uuid) {
                uuid_entry.latest_miner_id = id_hash(&doc.miner_id);
                uuid_entry.last_block = block_hash;
                // Reputation recovery after void (SPEC_FULL.md §4.I): a
                // voided miner rotating to a fresh, unrevoked id gets its
                // reputation restored rather than staying permanently void.
                if uuid_entry.reputation.void {
                    apply_void_recovery(&mut uuid_entry.reputation, &self.config);
                }
                self.put_uuid_entry(&mut batch, &uuid, &uuid_entry);
            }
            self.store.write_batch(batch);

            recent.push(
                RecentBlock {
                    hash: block_hash,
                    height,
                    miner_uuid: Some(uuid),
                },
                max_len,
            );
            return;
        }

        // Rule 4: continuation.
        match self.get_entry(&doc.miner_id) {
            None => {
                let uuid = Uuid::new_v4();
                let entry = MinerIdEntry {
                    uuid,
                    pub_key: doc.miner_id,
                    state: MinerIdState::Current,
                    prev_miner_id: doc.miner_id,
                    next_miner_id: None,
                    creation_block: block_hash,
                    rotation_block: [0u8; 32],
                    coinbase_doc: doc.clone(),
                };
                let uuid_entry = MinerUUIdEntry {
                    first_block: block_hash,
                    last_block: block_hash,
                    latest_miner_id: id_hash(&doc.miner_id),
                    reputation: Reputation {
                        void: false,
                        voiding_id: None,
                        m: self.config.reputation_m,
                        m_increased_at: now_ts(),
                    },
                };
                let mut batch = KvBatch::new();
                self.put_entry(&mut batch, &entry);
                self.put_uuid_entry(&mut batch, &uuid, &uuid_entry);
                self.store.write_batch(batch);

                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: Some(uuid),
                    },
                    max_len,
                );
            }
            Some(mut entry) => {
                let credit = entry.state == MinerIdState::Current;
                entry.coinbase_doc = doc.clone();
                let uuid = entry.uuid;
                let mut batch = KvBatch::new();
                self.put_entry(&mut batch, &entry);
                if let Some(mut uuid_entry) = self.get_uuid_entry(&uuid) {
                    uuid_entry.last_block = block_hash;
                    self.put_uuid_entry(&mut batch, &uuid, &uuid_entry);
                }
                self.store.write_batch(batch);

                // Rule 5: don't credit rotated/revoked entries.
                recent.push(
                    RecentBlock {
                        hash: block_hash,
                        height,
                        miner_uuid: if credit { Some(uuid) } else { None },
                    },
                    max_len,
                );
            }
        }
    }

    /// `block_disconnected(block)`: removes the block from `RecentBlocks`
    /// only; DB entries are left intact for the reorg path to re-derive.
    pub fn block_disconnected(&self, block_hash: Hash256) {
        self.recent.write().unwrap().remove_hash(&block_hash);
    }

    /// `invalid_block(block, height)`: voids the reputation of whichever
    /// miner produced `block`, if known and not already void.
    pub fn invalid_block(&self, doc: Option<&CoinbaseDocument>) {
        let Some(doc) = doc else { return };
        let Some(entry) = self.get_entry(&doc.miner_id) else { return };
        let Some(mut uuid_entry) = self.get_uuid_entry(&entry.uuid) else {
            return;
        };
        if uuid_entry.reputation.void {
            return;
        }
        uuid_entry.reputation.void = true;
        uuid_entry.reputation.voiding_id = Some(doc.miner_id);
        let mut batch = KvBatch::new();
        self.put_uuid_entry(&mut batch, &entry.uuid, &uuid_entry);
        self.store.write_batch(batch);
    }

    /// `check_reputation(pubkey) -> bool`.
    pub fn check_reputation(&self, pub_key: &CompressedPubKey) -> bool {
        let Some(entry) = self.get_entry(pub_key) else {
            return false;
        };
        if entry.state == MinerIdState::Revoked {
            return false;
        }
        let Some(uuid_entry) = self.get_uuid_entry(&entry.uuid) else {
            return false;
        };
        if uuid_entry.reputation.void {
            return false;
        }
        let recent = self.recent.read().unwrap();
        recent.count_for_uuid(&entry.uuid) as u32 >= uuid_entry.reputation.m
    }

    /// `process_revokemid(msg)` (SPEC_FULL.md §4.I). Rejects on any
    /// mismatch or signature-verification failure, per the spec's stricter
    /// resolution of the corresponding open question (see DESIGN.md).
    pub fn process_revokemid(&self, msg: &RevokeMid) -> R<()> {
        let entry = self.get_entry(&msg.miner_id).ok_or(DbError::NoMinerIdFound)?;
        let Some(stored_rev_key) = entry.coinbase_doc.revocation_key else {
            return Err(DbError::RevocationChainMismatch);
        };
        if stored_rev_key != msg.revocation_key {
            return Err(DbError::RevocationChainMismatch);
        }

        let hash = sha256(&msg.revocation_message);
        if !super::crypto::verify_hash(&msg.revocation_key, hash, &msg.sig1) {
            return Err(DbError::RevocationSigVerificationFailed);
        }
        if !super::crypto::verify_hash(&msg.miner_id, hash, &msg.sig2) {
            return Err(DbError::RevocationSigVerificationFailed);
        }

        self.apply_revocation(&msg.miner_id, &msg.revocation_message)
    }

    /// `update_to_tip(rebuild)`: replays blocks from `max(0, tip - N)` to
    /// tip via the injected [`BlockSource`] collaborator.
    pub fn update_to_tip(&self, source: &dyn BlockSource, rebuild: bool) {
        let tip = source.tip_height();
        let window = self.config.recent_blocks_window as Height;
        let start = (tip - window).max(0);
        for height in start..=tip {
            let Some((hash, doc)) = source.block_at(height) else {
                continue;
            };
            if rebuild {
                self.block_connected(hash, height, doc.as_ref());
            } else {
                let uuid = doc
                    .as_ref()
                    .and_then(|d| self.get_entry(&d.miner_id))
                    .map(|e| e.uuid);
                self.recent.write().unwrap().push(
                    RecentBlock {
                        hash,
                        height,
                        miner_uuid: uuid,
                    },
                    self.config.recent_blocks_window as usize,
                );
            }
        }
    }

    /// `prune()`: discards `ROTATED` ids beyond `num_ids_to_keep` per
    /// miner (never touching `CURRENT`), and decays reputation `m` once
    /// per `m_decay_interval` while it exceeds the configured baseline.
    pub fn prune(&self) {
        let entries: Vec<MinerIdEntry> = self
            .store
            .scan_prefix(&[ID_PREFIX])
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect();

        let mut by_uuid: std::collections::HashMap<MinerUUId, Vec<MinerIdEntry>> = std::collections::HashMap::new();
        for entry in entries {
            by_uuid.entry(entry.uuid).or_default().push(entry);
        }

        let mut batch = KvBatch::new();
        for (_, mut miner_entries) in by_uuid {
            miner_entries.sort_by_key(|e| e.state != MinerIdState::Rotated);
            let rotated: Vec<&MinerIdEntry> = miner_entries
                .iter()
                .filter(|e| e.state == MinerIdState::Rotated)
                .collect();
            if rotated.len() > self.config.num_ids_to_keep as usize {
                for stale in &rotated[self.config.num_ids_to_keep as usize..] {
                    batch.delete(id_key(&stale.pub_key));
                }
            }
        }
        self.store.write_batch(batch);

        let uuid_entries: Vec<(MinerUUId, MinerUUIdEntry)> = self
            .store
            .scan_prefix(&[UUID_PREFIX])
            .into_iter()
            .filter_map(|(k, v)| {
                let uuid = Uuid::from_slice(&k[1..]).ok()?;
                let entry: MinerUUIdEntry = bincode::deserialize(&v).ok()?;
                Some((uuid, entry))
            })
            .collect();

        let decay_secs = self.config.m_decay_interval.as_secs();
        let now = now_ts();
        let mut batch = KvBatch::new();
        for (uuid, mut entry) in uuid_entries {
            if entry.reputation.m > self.config.reputation_m
                && now.saturating_sub(entry.reputation.m_increased_at) >= decay_secs
            {
                entry.reputation.m -= 1;
                entry.reputation.m_increased_at = now;
                self.put_uuid_entry(&mut batch, &uuid, &entry);
            }
        }
        self.store.write_batch(batch);
    }
}

/// Credits a reputation recovery after a voided miner rotates to a fresh,
/// unrevoked id (SPEC_FULL.md §4.I "Reputation recovery after void"). Called
/// from [`MinerIdDb::block_connected`]'s rotation branch whenever the uuid
/// being rotated was void.
pub fn apply_void_recovery(reputation: &mut Reputation, config: &MinerIdConfig) {
    reputation.void = false;
    reputation.voiding_id = None;
    reputation.m = config.recovered_m();
    reputation.m_increased_at = now_ts();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvstore::MemoryKvStore;
    use crate::miner_id::doc::DocVersion;

    fn doc_for(miner_id: CompressedPubKey, prev_miner_id: CompressedPubKey, height: i32) -> CoinbaseDocument {
        CoinbaseDocument {
            version: DocVersion::V0_2,
            height,
            miner_id,
            prev_miner_id,
            prev_miner_id_sig: vec![],
            revocation_key: None,
            prev_revocation_key: None,
            prev_revocation_key_sig: None,
            revocation_message: None,
            data_refs: vec![],
            vctx: None,
        }
    }

    fn key(tag: u8) -> CompressedPubKey {
        let mut k = [tag; 33];
        k[0] = 0x02;
        k
    }

    fn db() -> MinerIdDb {
        MinerIdDb::new(Arc::new(MemoryKvStore::new()), MinerIdConfig::default())
    }

    #[test]
    fn continuation_creates_uuid_and_credits_block() {
        let db = db();
        let k1 = key(1);
        let doc = doc_for(k1, k1, 100);
        db.block_connected([1u8; 32], 100, Some(&doc));
        assert!(db.get_entry(&k1).is_some());
        assert_eq!(db.get_entry(&k1).unwrap().state, MinerIdState::Current);
    }

    #[test]
    fn rotation_marks_previous_rotated_and_new_current() {
        let db = db();
        let k1 = key(1);
        let k2 = key(2);
        db.block_connected([1u8; 32], 104, Some(&doc_for(k1, k1, 104)));
        db.block_connected([2u8; 32], 106, Some(&doc_for(k1, k1, 106)));
        db.block_connected([3u8; 32], 108, Some(&doc_for(k2, k1, 108)));

        let e1 = db.get_entry(&k1).unwrap();
        let e2 = db.get_entry(&k2).unwrap();
        assert_eq!(e1.state, MinerIdState::Rotated);
        assert_eq!(e1.next_miner_id, Some(k2));
        assert_eq!(e1.rotation_block, [3u8; 32]);
        assert_eq!(e2.state, MinerIdState::Current);
        assert_eq!(e2.prev_miner_id, k1);
        assert_eq!(e1.uuid, e2.uuid);
    }

    #[test]
    fn revokemid_marks_ancestor_chain_revoked() {
        let db = db();
        let k1 = key(1);
        let k2 = key(2);
        let k3 = key(3);

        let mut doc1 = doc_for(k1, k1, 10);
        doc1.revocation_key = Some(key(0xaa));
        db.block_connected([1u8; 32], 10, Some(&doc1));

        let mut doc2 = doc_for(k2, k1, 20);
        doc2.revocation_key = Some(key(0xaa));
        db.block_connected([2u8; 32], 20, Some(&doc2));

        let mut doc3 = doc_for(k3, k2, 30);
        doc3.revocation_key = Some(key(0xaa));
        db.block_connected([3u8; 32], 30, Some(&doc3));

        assert_eq!(db.get_entry(&k2).unwrap().state, MinerIdState::Rotated);
        assert_eq!(db.get_entry(&k3).unwrap().state, MinerIdState::Current);

        // Revoke from k2 onward: reuse apply_revocation directly since
        // constructing a cryptographically valid RevokeMid needs real keys
        // (covered in miner_id::revoke's own round-trip test).
        db.apply_revocation(&k3, &k2).unwrap();
        assert_eq!(db.get_entry(&k2).unwrap().state, MinerIdState::Revoked);
        assert_eq!(db.get_entry(&k3).unwrap().state, MinerIdState::Revoked);
        let surviving = db.get_entry(&k1).unwrap();
        assert_eq!(surviving.state, MinerIdState::Current);
        assert_eq!(surviving.next_miner_id, None);
    }

    #[test]
    fn full_revocation_of_root_voids_reputation_and_drops_window_credit() {
        let db = db();
        let k1 = key(1);
        let k2 = key(2);
        db.block_connected([1u8; 32], 10, Some(&doc_for(k1, k1, 10)));
        db.block_connected([2u8; 32], 20, Some(&doc_for(k2, k1, 20)));

        db.apply_revocation(&k2, &k1).unwrap();
        assert_eq!(db.get_entry(&k1).unwrap().state, MinerIdState::Revoked);
        assert_eq!(db.get_entry(&k2).unwrap().state, MinerIdState::Revoked);
        let uuid = db.get_entry(&k2).unwrap().uuid;
        assert!(db.get_uuid_entry(&uuid).unwrap().reputation.void);
        assert!(!db.check_reputation(&k2));
    }

    #[test]
    fn rotation_after_void_recovers_reputation() {
        let db = db();
        let k1 = key(1);
        let k2 = key(2);
        db.block_connected([1u8; 32], 1, Some(&doc_for(k1, k1, 1)));
        db.invalid_block(Some(&doc_for(k1, k1, 1)));
        let uuid = db.get_entry(&k1).unwrap().uuid;
        assert!(db.get_uuid_entry(&uuid).unwrap().reputation.void);

        db.block_connected([2u8; 32], 2, Some(&doc_for(k2, k1, 2)));
        let uuid_entry = db.get_uuid_entry(&uuid).unwrap();
        assert!(!uuid_entry.reputation.void);
        assert_eq!(uuid_entry.reputation.voiding_id, None);
        assert_eq!(uuid_entry.reputation.m, MinerIdConfig::default().recovered_m());
    }

    #[test]
    fn invalid_block_voids_reputation() {
        let db = db();
        let k1 = key(1);
        db.block_connected([1u8; 32], 1, Some(&doc_for(k1, k1, 1)));
        db.invalid_block(Some(&doc_for(k1, k1, 1)));
        let entry = db.get_entry(&k1).unwrap();
        let uuid_entry = db.get_uuid_entry(&entry.uuid).unwrap();
        assert!(uuid_entry.reputation.void);
        assert_eq!(uuid_entry.reputation.voiding_id, Some(k1));
    }
}
