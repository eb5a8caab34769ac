//! Order and trade types for the matching engine.

use serde::{Deserialize, Serialize};
use simchain_core::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// A resting or market order. `sequence` is assigned at placement time and
/// breaks ties between orders that share a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub sequence: u64,
    pub user_id: String,
    pub side: Side,
    pub price: Amount,
    pub amount: Amount,
}

/// A single matched fill, always priced at the resting (ask) side's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub price: Amount,
    pub amount: Amount,
    pub timestamp: u64,
    pub buyer_id: String,
    pub seller_id: String,
}
