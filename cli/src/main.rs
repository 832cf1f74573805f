use clap::{Parser, Subcommand};
use midcore_core::config::MinerIdConfig;
use midcore_core::context::{DataRefContext, MinerIdContext};
use midcore_core::dataref::DataRefDb;
use midcore_core::kvstore::MemoryKvStore;
use midcore_core::message::{MessageError, MessageReader};
use midcore_core::miner_id::{self, MinerIdDb};
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "midcore")]
#[command(about = "Miner identity and P2P message parsing core", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the administration RPC server.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8533")]
        addr: SocketAddr,
    },
    /// Parse and validate a coinbase document, offline.
    InspectDoc {
        /// Path to the raw canonical JSON bytes the outer signature covers.
        #[arg(long)]
        doc: String,
        /// Hex-encoded DER signature over the document bytes.
        #[arg(long)]
        sig: String,
        /// Block height the document claims to be carried at.
        #[arg(long)]
        height: i32,
        /// Treat the document as a v0.3 miner-info-transaction form.
        #[arg(long, default_value_t = false)]
        miner_info_form: bool,
    },
    /// Feed a raw P2P message file through the incremental framer and
    /// report what it dispatched to.
    ParseMessage {
        #[arg(long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::InspectDoc {
            doc,
            sig,
            height,
            miner_info_form,
        } => inspect_doc(&doc, &sig, height, miner_info_form),
        Commands::ParseMessage { file } => parse_message(&file),
    }
}

async fn serve(addr: SocketAddr) {
    let miner_store = Arc::new(MemoryKvStore::new());
    let miner_db = Arc::new(MinerIdDb::new(miner_store, MinerIdConfig::default()));
    let miner_ctx = Arc::new(MinerIdContext::new(miner_db, MinerIdConfig::default()));
    let dataref_db = Arc::new(DataRefDb::new(Arc::new(MemoryKvStore::new())));
    let dataref_ctx = Arc::new(DataRefContext::new(dataref_db));

    match midcore_rpc::run_server(addr, miner_ctx, dataref_ctx).await {
        Ok(handle) => {
            log::info!("administration RPC listening on {addr}");
            handle.stopped().await;
        }
        Err(e) => {
            log::error!("failed to start RPC server: {e}");
            std::process::exit(1);
        }
    }
}

fn inspect_doc(doc_path: &str, sig_hex: &str, height: i32, miner_info_form: bool) {
    let canonical_json = match fs::read(doc_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("failed to read {doc_path}: {e}");
            std::process::exit(1);
        }
    };
    let sig = match hex::decode(sig_hex) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("signature is not valid hex: {e}");
            std::process::exit(1);
        }
    };

    match miner_id::parse_and_validate(&canonical_json, &sig, height, miner_info_form) {
        Ok(parsed) => {
            println!("valid document");
            println!("  version:       {:?}", parsed.version);
            println!("  height:        {}", parsed.height);
            println!("  minerId:       {}", hex::encode(parsed.miner_id));
            println!("  prevMinerId:   {}", hex::encode(parsed.prev_miner_id));
            println!("  dataRefs:      {}", parsed.data_refs.len());
            println!("  revocationMsg: {}", parsed.revocation_message.is_some());
        }
        Err(e) => {
            println!("rejected: {e}");
            std::process::exit(2);
        }
    }
}

fn parse_message(file_path: &str) {
    let bytes = match fs::read(file_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("failed to read {file_path}: {e}");
            std::process::exit(1);
        }
    };

    let mut reader = MessageReader::new();
    let mut offset = 0usize;
    let mut feeds = 0u32;
    while offset < bytes.len() {
        let (consumed, _needed) = match reader.try_feed(&bytes[offset..]) {
            Ok(result) => result,
            Err(MessageError::Overflow) => {
                eprintln!("protocol overflow at byte {offset}; peer would be banned");
                std::process::exit(2);
            }
            Err(MessageError::MalformedCommand) => {
                eprintln!("malformed command string at byte {offset}; peer would be banned");
                std::process::exit(2);
            }
        };
        feeds += 1;
        offset += consumed;
        if reader.is_complete() {
            break;
        }
        if consumed == 0 {
            // needs more bytes than this file has left
            break;
        }
    }

    match reader.header() {
        Some(header) => println!("command: {}", header.command_str()),
        None => {
            println!("incomplete header after {feeds} feed calls ({offset}/{} bytes)", bytes.len());
            return;
        }
    }
    println!("complete: {}", reader.is_complete());
    println!("feed calls: {feeds}");
    println!("bytes consumed: {offset}/{}", bytes.len());
}
