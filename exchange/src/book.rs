//! A single trading pair's resting orders.
//!
//! Bids are kept sorted by price descending, asks by price ascending; within
//! a price level, orders are kept in insertion-sequence order (FIFO).

use serde::{Deserialize, Serialize};

use crate::order::{Order, Side};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub(crate) bids: Vec<Order>,
    pub(crate) asks: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook {
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn insert(&mut self, order: Order) {
        match order.side {
            Side::Bid => {
                self.bids.push(order);
                self.bids
                    .sort_by(|a, b| b.price.cmp(&a.price).then(a.sequence.cmp(&b.sequence)));
            }
            Side::Ask => {
                self.asks.push(order);
                self.asks
                    .sort_by(|a, b| a.price.cmp(&b.price).then(a.sequence.cmp(&b.sequence)));
            }
        }
    }

    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.first()
    }

    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    pub fn asks(&self) -> &[Order] {
        &self.asks
    }
}
