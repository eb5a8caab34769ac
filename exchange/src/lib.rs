//! In-memory spot exchange: price-time-priority matching, multi-asset
//! per-user balances, and an append-only trade journal.

pub mod balance;
pub mod book;
pub mod engine;
pub mod order;

pub use balance::BalanceSheet;
pub use book::OrderBook;
pub use engine::{Exchange, ExchangeError};
pub use order::{Order, Side, Trade};
