//! `jsonrpsee` server exposing the administration surface SPEC_FULL.md §6.6
//! names: creating/inspecting the node's own miner-info and dataref
//! transactions, and the funding-outpoint cache the original source kept as
//! a mutable static (now [`midcore_core::context::MinerIdContext`]).
//!
//! Actual transaction construction, signing, and broadcast are delegated to
//! a wallet/chain collaborator this crate does not include (SPEC_FULL.md's
//! wallet-key-custody Non-goal) — the methods below compute a deterministic
//! placeholder txid from the request so the administration surface and its
//! caches behave correctly in tests and demos, and log what a real
//! collaborator would be asked to do.

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use midcore_core::context::{DataRefContext, MinerIdContext};
use midcore_core::primitives::{sha256, Hash256, Outpoint};
use std::net::SocketAddr;
use std::sync::Arc;

fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32602, msg.into(), None::<()>)
}

fn placeholder_txid(seed: &[u8]) -> Hash256 {
    sha256(seed)
}

#[rpc(server, namespace = "")]
pub trait MinerIdAdmin {
    #[method(name = "createminerinfotx")]
    async fn create_miner_info_tx(&self, script_pub_key: String) -> RpcResult<String>;

    #[method(name = "replaceminerinfotx")]
    async fn replace_miner_info_tx(&self, script_pub_key: String) -> RpcResult<String>;

    #[method(name = "createdatareftx")]
    async fn create_dataref_tx(&self, script_pub_keys: Vec<String>) -> RpcResult<String>;

    #[method(name = "getminerinfotxid")]
    async fn get_miner_info_txid(&self) -> RpcResult<Option<String>>;

    #[method(name = "getdatareftxid")]
    async fn get_dataref_txid(&self) -> RpcResult<Option<String>>;

    #[method(name = "makeminerinfotxsigningkey")]
    async fn make_miner_info_tx_signing_key(&self) -> RpcResult<String>;

    #[method(name = "getminerinfotxfundingaddress")]
    async fn get_miner_info_tx_funding_address(&self) -> RpcResult<String>;

    #[method(name = "setminerinfotxfundingoutpoint")]
    async fn set_miner_info_tx_funding_outpoint(&self, txid: String, vout: u32) -> RpcResult<()>;
}

pub struct MinerIdAdminImpl {
    miner_id: Arc<MinerIdContext>,
    dataref: Arc<DataRefContext>,
    dataref_txid: std::sync::RwLock<Option<Hash256>>,
    funding_key_hex: std::sync::RwLock<Option<String>>,
}

impl MinerIdAdminImpl {
    pub fn new(miner_id: Arc<MinerIdContext>, dataref: Arc<DataRefContext>) -> Self {
        Self {
            miner_id,
            dataref,
            dataref_txid: std::sync::RwLock::new(None),
            funding_key_hex: std::sync::RwLock::new(None),
        }
    }
}

fn decode_hex32(s: &str, what: &str) -> Result<Hash256, ErrorObjectOwned> {
    let bytes = hex::decode(s).map_err(|_| invalid_params(format!("{what} is not valid hex")))?;
    if bytes.len() != 32 {
        return Err(invalid_params(format!("{what} must be 32 bytes")));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[jsonrpsee::core::async_trait]
impl MinerIdAdminServer for MinerIdAdminImpl {
    async fn create_miner_info_tx(&self, script_pub_key: String) -> RpcResult<String> {
        if hex::decode(&script_pub_key).is_err() {
            return Err(invalid_params("scriptPubKey is not valid hex").into());
        }
        let txid = placeholder_txid(script_pub_key.as_bytes());
        self.miner_id.set_current_miner_info_tx(Some(txid));
        log::info!("createminerinfotx: cached txid {}", hex::encode(txid));
        Ok(hex::encode(txid))
    }

    async fn replace_miner_info_tx(&self, script_pub_key: String) -> RpcResult<String> {
        if hex::decode(&script_pub_key).is_err() {
            return Err(invalid_params("scriptPubKey is not valid hex").into());
        }
        // Idempotent against the current chain height in the source; here
        // that just means overwriting whatever txid was cached before.
        let mut seed = b"replace:".to_vec();
        seed.extend_from_slice(script_pub_key.as_bytes());
        let txid = placeholder_txid(&seed);
        self.miner_id.set_current_miner_info_tx(Some(txid));
        log::info!("replaceminerinfotx: cached txid {}", hex::encode(txid));
        Ok(hex::encode(txid))
    }

    async fn create_dataref_tx(&self, script_pub_keys: Vec<String>) -> RpcResult<String> {
        if script_pub_keys.is_empty() {
            return Err(invalid_params("script_pub_keys must not be empty").into());
        }
        for s in &script_pub_keys {
            if hex::decode(s).is_err() {
                return Err(invalid_params("scriptPubKey is not valid hex").into());
            }
        }
        let seed = script_pub_keys.join("");
        let txid = placeholder_txid(seed.as_bytes());
        *self.dataref_txid.write().unwrap() = Some(txid);
        let _ = self.dataref.db.access(); // exercises the shared guard the real collaborator would ingest entries through
        log::info!("createdatareftx: cached txid {}", hex::encode(txid));
        Ok(hex::encode(txid))
    }

    async fn get_miner_info_txid(&self) -> RpcResult<Option<String>> {
        Ok(self.miner_id.current_miner_info_tx().map(hex::encode))
    }

    async fn get_dataref_txid(&self) -> RpcResult<Option<String>> {
        Ok(self.dataref_txid.read().unwrap().map(hex::encode))
    }

    async fn make_miner_info_tx_signing_key(&self) -> RpcResult<String> {
        let secp = secp256k1::Secp256k1::new();
        let sk = secp256k1::SecretKey::new(&mut secp256k1::rand::thread_rng());
        let pk = secp256k1::PublicKey::from_secret_key(&secp, &sk);
        let pub_hex = hex::encode(pk.serialize());
        *self.funding_key_hex.write().unwrap() = Some(pub_hex.clone());
        log::info!("makeminerinfotxsigningkey: generated funding key {pub_hex}");
        Ok(pub_hex)
    }

    async fn get_miner_info_tx_funding_address(&self) -> RpcResult<String> {
        self.funding_key_hex
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| invalid_params("no signing key generated yet; call makeminerinfotxsigningkey first").into())
    }

    async fn set_miner_info_tx_funding_outpoint(&self, txid: String, vout: u32) -> RpcResult<()> {
        let txid = decode_hex32(&txid, "txid")?;
        self.miner_id.set_funding_outpoint(Outpoint { txid, index: vout });
        log::info!("setminerinfotxfundingoutpoint: {}:{}", hex::encode(txid), vout);
        Ok(())
    }
}

/// Starts the administration RPC server bound to `addr`, returning a handle
/// the caller can `.stop()` to shut it down.
pub async fn run_server(
    addr: SocketAddr,
    miner_id: Arc<MinerIdContext>,
    dataref: Arc<DataRefContext>,
) -> std::io::Result<ServerHandle> {
    let server = Server::builder().build(addr).await?;
    let rpc = MinerIdAdminImpl::new(miner_id, dataref);
    let handle = server.start(rpc.into_rpc());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use midcore_core::config::MinerIdConfig;
    use midcore_core::dataref::DataRefDb;
    use midcore_core::kvstore::MemoryKvStore;
    use midcore_core::miner_id::MinerIdDb;

    fn contexts() -> (Arc<MinerIdContext>, Arc<DataRefContext>) {
        let miner_store = Arc::new(MemoryKvStore::new());
        let miner_db = Arc::new(MinerIdDb::new(miner_store, MinerIdConfig::default()));
        let miner_id = Arc::new(MinerIdContext::new(miner_db, MinerIdConfig::default()));
        let dataref_db = Arc::new(DataRefDb::new(Arc::new(MemoryKvStore::new())));
        let dataref = Arc::new(DataRefContext::new(dataref_db));
        (miner_id, dataref)
    }

    #[tokio::test]
    async fn create_then_get_miner_info_txid_round_trips() {
        let (miner_id, dataref) = contexts();
        let admin = MinerIdAdminImpl::new(miner_id, dataref);
        assert_eq!(admin.get_miner_info_txid().await.unwrap(), None);
        let txid = admin.create_miner_info_tx(hex::encode([0xabu8; 10])).await.unwrap();
        assert_eq!(admin.get_miner_info_txid().await.unwrap(), Some(txid));
    }

    #[tokio::test]
    async fn rejects_non_hex_script() {
        let (miner_id, dataref) = contexts();
        let admin = MinerIdAdminImpl::new(miner_id, dataref);
        assert!(admin.create_miner_info_tx("not hex!!".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn funding_outpoint_round_trips_through_context() {
        let (miner_id, dataref) = contexts();
        let admin = MinerIdAdminImpl::new(miner_id.clone(), dataref);
        admin
            .set_miner_info_tx_funding_outpoint(hex::encode([7u8; 32]), 3)
            .await
            .unwrap();
        assert_eq!(
            miner_id.funding_outpoint(),
            Some(Outpoint {
                txid: [7u8; 32],
                index: 3
            })
        );
    }

    #[tokio::test]
    async fn funding_address_requires_signing_key_first() {
        let (miner_id, dataref) = contexts();
        let admin = MinerIdAdminImpl::new(miner_id, dataref);
        assert!(admin.get_miner_info_tx_funding_address().await.is_err());
        admin.make_miner_info_tx_signing_key().await.unwrap();
        assert!(admin.get_miner_info_tx_funding_address().await.is_ok());
    }
}
