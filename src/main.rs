//! SimChain node — entry point.
//!
//! Parses CLI arguments, initializes logging, loads persisted state (or
//! synthesizes genesis), and starts the HTTP server.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use simchain_consensus::ConsensusParams;
use simchain_exchange::Exchange;
use simchain_ledger::Ledger;
use simchain_mempool::Mempool;
use simchain_network::{NetworkConfig, NetworkService};
use simchain_rpc::{Node, RpcConfig, RpcServer};
use simchain_storage::{DocumentStore, JsonDocumentStore};

#[derive(Parser)]
#[clap(name = "simchain")]
#[clap(about = "A UTXO blockchain simulator with a built-in spot exchange")]
struct Cli {
    /// Sets a custom config file (TOML; overrides the built-in defaults)
    #[clap(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Network profile: mainnet or regtest
    #[clap(long, default_value = "regtest")]
    network: String,

    /// HTTP bind address
    #[clap(long, default_value = "127.0.0.1:8332")]
    rpc_bind: String,

    /// Data directory holding the JSON document store
    #[clap(long, default_value = "./data")]
    datadir: PathBuf,

    /// Maximum number of mempool transactions pulled into a mined block
    #[clap(long, default_value = "1000")]
    max_mempool_drain: usize,

    /// Verbosity level (0-4: error, warn, info, debug, trace)
    #[clap(short, long, default_value = "2")]
    verbosity: u8,
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();
}

fn consensus_params(network: &str) -> ConsensusParams {
    match network {
        "mainnet" => ConsensusParams::mainnet(),
        "regtest" => ConsensusParams::regtest(),
        other => {
            warn!("unknown network profile '{other}', falling back to regtest");
            ConsensusParams::regtest()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    info!("starting simchain node (network: {})", cli.network);
    if let Some(config_path) = &cli.config {
        info!("config override file: {} (layered over built-in defaults)", config_path.display());
    }

    let params = consensus_params(&cli.network);

    let store: Arc<dyn DocumentStore> = match JsonDocumentStore::new(&cli.datadir).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to open data directory {}: {e}", cli.datadir.display());
            process::exit(1);
        }
    };

    let persisted_blocks = store.load_blocks().await.unwrap_or_default();
    let persisted_utxos = store.load_utxos().await.unwrap_or_default();
    let persisted_mempool = store.load_mempool().await.unwrap_or_default();
    let persisted_books = store.load_order_books().await.unwrap_or_default();
    let persisted_histories = store.load_trade_histories().await.unwrap_or_default();
    let persisted_balances = store.load_user_balances().await.unwrap_or_default();

    let genesis_timestamp = simchain_util::current_timestamp();
    let ledger = if persisted_blocks.is_empty() {
        info!("no persisted chain found, synthesizing genesis block");
        Ledger::new(params, genesis_timestamp)
    } else {
        info!("restored chain at height {}", persisted_blocks.len() - 1);
        Ledger::restore(params, persisted_blocks, persisted_utxos)
    };

    let mut mempool = Mempool::new();
    for tx in persisted_mempool {
        if let Err(e) = mempool.submit(tx) {
            warn!("dropping duplicate mempool entry on restore: {e}");
        }
    }

    let exchange = Exchange::restore(persisted_books, persisted_balances, persisted_histories);

    let network = NetworkService::new(NetworkConfig::default());

    let node = Arc::new(Node::new(
        ledger,
        mempool,
        exchange,
        network,
        store,
        cli.max_mempool_drain,
    ));

    let rpc_bind = match cli.rpc_bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid --rpc-bind address '{}': {e}", cli.rpc_bind);
            process::exit(1);
        }
    };
    let server = RpcServer::new(RpcConfig { bind_addr: rpc_bind }, node);

    info!("simchain node ready, serving HTTP on {}", cli.rpc_bind);
    if let Err(e) = server.start().await {
        error!("HTTP server exited with an error: {e}");
        process::exit(1);
    }
}
