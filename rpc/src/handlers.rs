//! Route handlers for the eight RPC operations of spec.md §6.

use std::collections::HashMap;

use axum::extract::{Extension, Path};
use axum::Json;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use simchain_core::{Amount, Block, Transaction, TxId};
use simchain_exchange::{Order, Side, Trade};
use simchain_ledger::validate_transaction;
use simchain_mining::mine_block;
use simchain_storage::WriteBatch;

use crate::{RpcContext, RpcError};

#[derive(Debug, Deserialize)]
pub struct SubmitTransactionRequest {
    pub transaction: Transaction,
}

#[derive(Debug, Serialize)]
pub struct SubmitTransactionResponse {
    pub tx_id: TxId,
}

/// `submit_transaction(tx) -> tx_id | error`. Validates against the UTXO
/// set as of the next block's height and, on success, admits the
/// transaction to the mempool and fans it out to simulated peers.
pub async fn submit_transaction(
    Extension(ctx): Extension<RpcContext>,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<Json<SubmitTransactionResponse>, RpcError> {
    let tx = req.transaction;
    {
        let ledger = ctx.ledger.read().await;
        let next_height = ledger.height() + 1;
        validate_transaction(&tx, ledger.utxos(), next_height)?;
    }
    {
        let mut mempool = ctx.mempool.write().await;
        mempool.submit(tx.clone())?;
    }
    ctx.network.broadcast_transaction(tx.clone());
    info!("accepted transaction {} into the mempool", tx.id);
    Ok(Json(SubmitTransactionResponse { tx_id: tx.id }))
}

#[derive(Debug, Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Debug, Serialize)]
pub struct MineResponse {
    pub block: Block,
}

/// `mine(miner_address) -> block`. Assembles and mines a block on top of
/// the current tip, commits it to the ledger, evicts its transactions from
/// the mempool, persists the new state, and announces the block.
pub async fn mine(
    Extension(ctx): Extension<RpcContext>,
    Json(req): Json<MineRequest>,
) -> Result<Json<MineResponse>, RpcError> {
    let cancel = std::sync::atomic::AtomicBool::new(false);
    let timestamp = simchain_util::current_timestamp();

    let block = {
        let ledger = ctx.ledger.read().await;
        let mempool = ctx.mempool.read().await;
        mine_block(
            &ledger,
            &mempool,
            &req.miner_address,
            timestamp,
            ctx.max_mempool_drain,
            &cancel,
        )?
    };

    let mined_ids = {
        let mut ledger = ctx.ledger.write().await;
        ledger.accept_block(block.clone())?
    };
    {
        let mut mempool = ctx.mempool.write().await;
        mempool.remove_many(&mined_ids);
    }

    let (blocks_snapshot, utxos_snapshot, mempool_snapshot) = {
        let ledger = ctx.ledger.read().await;
        let mempool = ctx.mempool.read().await;
        (
            ledger.blocks().to_vec(),
            ledger.utxos().clone(),
            mempool.drain(usize::MAX),
        )
    };
    ctx.store
        .atomic_write(WriteBatch {
            blocks: Some(blocks_snapshot),
            utxos: Some(utxos_snapshot),
            mempool: Some(mempool_snapshot),
            ..Default::default()
        })
        .await?;

    let reached = ctx.network.broadcast_block(block.clone());
    info!("mined block at height {} ({} peers reached)", block.height(), reached);
    Ok(Json(MineResponse { block }))
}

/// `get_block_by_height(h) -> block | not_found`.
pub async fn get_block_by_height(
    Extension(ctx): Extension<RpcContext>,
    Path(height): Path<u64>,
) -> Result<Json<Block>, RpcError> {
    let ledger = ctx.ledger.read().await;
    ledger
        .block_at(height)
        .cloned()
        .map(Json)
        .ok_or_else(|| RpcError::NotFound(format!("no block at height {height}")))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub amount: Amount,
}

/// `get_balance(address) -> amount`: the sum of live UTXOs whose locking
/// script pays `address`.
pub async fn get_balance(
    Extension(ctx): Extension<RpcContext>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let ledger = ctx.ledger.read().await;
    let amount = ledger
        .utxos()
        .value_for_script(&simchain_crypto::locking_script(&address));
    Json(BalanceResponse { address, amount })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderKind {
    Limit { price: Amount },
    Market,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub pair: String,
    pub user_id: String,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: Option<u64>,
    pub trades: Vec<Trade>,
}

/// `place_order(order) -> {order_id, trades}`. `order_id` is the book
/// sequence number assigned to a limit order at placement time; market
/// orders never rest in the book, so they report `order_id: null`.
pub async fn place_order(
    Extension(ctx): Extension<RpcContext>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, RpcError> {
    let mut exchange = ctx.exchange.write().await;
    let (order_id, trades) = match req.kind {
        OrderKind::Limit { price } => {
            let order_id = exchange.next_order_sequence();
            let trades = exchange.place_limit(&req.pair, &req.user_id, req.side, price, req.amount)?;
            (Some(order_id), trades)
        }
        OrderKind::Market => {
            let trades = exchange.place_market(&req.pair, &req.user_id, req.side, req.amount)?;
            (None, trades)
        }
    };
    Ok(Json(PlaceOrderResponse { order_id, trades }))
}

#[derive(Debug, Serialize)]
pub struct OrderBookResponse {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

/// `get_order_book(pair) -> {bids, asks}`.
pub async fn get_order_book(
    Extension(ctx): Extension<RpcContext>,
    Path((base, quote)): Path<(String, String)>,
) -> Result<Json<OrderBookResponse>, RpcError> {
    let pair = format!("{base}/{quote}");
    let exchange = ctx.exchange.read().await;
    let book = exchange.order_book(&pair)?;
    Ok(Json(OrderBookResponse {
        bids: book.bids().to_vec(),
        asks: book.asks().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub user_id: String,
    pub asset: String,
    pub amount: Amount,
}

/// `deposit(user, asset, amount)`.
pub async fn deposit(
    Extension(ctx): Extension<RpcContext>,
    Json(req): Json<DepositRequest>,
) -> Json<Value> {
    let mut exchange = ctx.exchange.write().await;
    exchange.deposit(&req.user_id, &req.asset, req.amount);
    Json(json!({ "balance": exchange.get_balance(&req.user_id, &req.asset) }))
}

#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub balances: HashMap<String, Amount>,
}

/// `get_balances(user) -> {asset: amount}`.
pub async fn get_balances(
    Extension(ctx): Extension<RpcContext>,
    Path(user_id): Path<String>,
) -> Json<BalancesResponse> {
    let exchange = ctx.exchange.read().await;
    Json(BalancesResponse {
        balances: exchange.balances_for_user(&user_id),
    })
}
