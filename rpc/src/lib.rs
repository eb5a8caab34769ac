//! HTTP surface for SimChain.
//!
//! A thin axum layer over the ledger, mempool and exchange: handlers parse a
//! request, take the locks they need, call into the domain crates, and map
//! the result onto a REST response. No validation or consensus logic lives
//! here — `RpcError`'s `From` impls translate each crate's error taxonomy
//! into the client/server split of spec.md §7.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use simchain_exchange::Exchange;
use simchain_ledger::Ledger;
use simchain_mempool::Mempool;
use simchain_network::NetworkService;
use simchain_storage::DocumentStore;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors surfaced at the HTTP boundary, collapsing every domain crate's
/// error taxonomy into the client/server split of spec.md §7.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = match &self {
            RpcError::Validation(_) => StatusCode::BAD_REQUEST,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<simchain_ledger::ValidationError> for RpcError {
    fn from(error: simchain_ledger::ValidationError) -> Self {
        RpcError::Validation(error.to_string())
    }
}

impl From<simchain_ledger::LedgerError> for RpcError {
    fn from(error: simchain_ledger::LedgerError) -> Self {
        RpcError::Validation(error.to_string())
    }
}

impl From<simchain_mempool::MempoolError> for RpcError {
    fn from(error: simchain_mempool::MempoolError) -> Self {
        RpcError::Validation(error.to_string())
    }
}

impl From<simchain_exchange::ExchangeError> for RpcError {
    fn from(error: simchain_exchange::ExchangeError) -> Self {
        match error {
            simchain_exchange::ExchangeError::MarketNotFound(_) => {
                RpcError::NotFound(error.to_string())
            }
            other => RpcError::Validation(other.to_string()),
        }
    }
}

impl From<simchain_mining::MiningError> for RpcError {
    fn from(error: simchain_mining::MiningError) -> Self {
        RpcError::BackendUnavailable(error.to_string())
    }
}

impl From<simchain_storage::StorageError> for RpcError {
    fn from(error: simchain_storage::StorageError) -> Self {
        RpcError::BackendUnavailable(error.to_string())
    }
}

/// The node's shared, lock-protected state. One exclusive-writer lock per
/// subsystem, following the workspace's concurrency notes: a handler never
/// holds more than one write lock at a time, and never performs I/O while
/// holding one.
pub struct Node {
    pub ledger: RwLock<Ledger>,
    pub mempool: RwLock<Mempool>,
    pub exchange: RwLock<Exchange>,
    pub network: NetworkService,
    pub store: Arc<dyn DocumentStore>,
    pub max_mempool_drain: usize,
}

impl Node {
    pub fn new(
        ledger: Ledger,
        mempool: Mempool,
        exchange: Exchange,
        network: NetworkService,
        store: Arc<dyn DocumentStore>,
        max_mempool_drain: usize,
    ) -> Self {
        Node {
            ledger: RwLock::new(ledger),
            mempool: RwLock::new(mempool),
            exchange: RwLock::new(exchange),
            network,
            store,
            max_mempool_drain,
        }
    }
}

pub type RpcContext = Arc<Node>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcConfig {
    pub bind_addr: SocketAddr,
}

impl Default for RpcConfig {
    fn default() -> Self {
        RpcConfig {
            bind_addr: "127.0.0.1:8332".parse().unwrap(),
        }
    }
}

pub struct RpcServer {
    config: RpcConfig,
    context: RpcContext,
}

impl RpcServer {
    pub fn new(config: RpcConfig, context: RpcContext) -> Self {
        RpcServer { config, context }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/transactions", post(handlers::submit_transaction))
            .route("/mine", post(handlers::mine))
            .route("/blocks/:height", get(handlers::get_block_by_height))
            .route("/balance/:address", get(handlers::get_balance))
            .route("/orders/:base/:quote", get(handlers::get_order_book))
            .route("/orders", post(handlers::place_order))
            .route("/deposits", post(handlers::deposit))
            .route("/balances/:user_id", get(handlers::get_balances))
            .layer(Extension(self.context.clone()))
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!("starting HTTP server on {}", self.config.bind_addr);
        axum::Server::bind(&self.config.bind_addr)
            .serve(self.router().into_make_service())
            .await?;
        Ok(())
    }
}
