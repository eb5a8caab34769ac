//! The matching engine: order placement, matching and settlement across
//! multiple trading pairs.

use std::collections::HashMap;

use simchain_core::Amount;
use thiserror::Error;

use crate::balance::BalanceSheet;
use crate::book::OrderBook;
use crate::order::{Order, Side, Trade};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("market {0} does not exist")]
    MarketNotFound(String),
    #[error("insufficient {0} balance")]
    InsufficientFunds(String),
    #[error("order could not be filled")]
    Unfillable,
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

/// `"BASE/QUOTE"` trading pairs, a balance sheet shared across pairs, and an
/// append-only trade journal per pair.
#[derive(Debug, Default)]
pub struct Exchange {
    books: HashMap<String, OrderBook>,
    balances: BalanceSheet,
    journals: HashMap<String, Vec<Trade>>,
    next_sequence: u64,
    now: u64,
}

impl Exchange {
    pub fn new() -> Self {
        Exchange {
            books: HashMap::new(),
            balances: BalanceSheet::new(),
            journals: HashMap::new(),
            next_sequence: 0,
            now: 0,
        }
    }

    /// Advances the clock used to timestamp trades. Callers own wall-clock
    /// reads (via `simchain-util`); the engine itself never calls the clock
    /// so that matching stays deterministic under test.
    pub fn set_clock(&mut self, now: u64) {
        self.now = now;
    }

    pub fn create_market(&mut self, base: &str, quote: &str) -> String {
        let pair = format!("{base}/{quote}");
        self.books.entry(pair.clone()).or_insert_with(OrderBook::new);
        self.journals.entry(pair.clone()).or_insert_with(Vec::new);
        pair
    }

    pub fn deposit(&mut self, user_id: &str, asset: &str, amount: Amount) {
        self.balances.deposit(user_id, asset, amount);
    }

    pub fn withdraw(&mut self, user_id: &str, asset: &str, amount: Amount) -> Result<(), ExchangeError> {
        if self.balances.withdraw(user_id, asset, amount) {
            Ok(())
        } else {
            Err(ExchangeError::InsufficientFunds(asset.to_string()))
        }
    }

    pub fn get_balance(&self, user_id: &str, asset: &str) -> Amount {
        self.balances.get(user_id, asset)
    }

    /// Every asset balance held by `user_id` (the RPC `get_balances` operation).
    pub fn balances_for_user(&self, user_id: &str) -> HashMap<String, Amount> {
        self.balances.all_for_user(user_id)
    }

    /// The sequence number the next placed order will be assigned — read
    /// before calling `place_limit` to report an `order_id` at the RPC
    /// boundary.
    pub fn next_order_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// The full state needed to persist and later restore this exchange:
    /// every order book, the balance sheet and every trade journal.
    pub fn snapshot(&self) -> (HashMap<String, OrderBook>, HashMap<String, HashMap<String, Amount>>, HashMap<String, Vec<Trade>>) {
        (self.books.clone(), self.balances.snapshot(), self.journals.clone())
    }

    pub fn restore(
        books: HashMap<String, OrderBook>,
        balances: HashMap<String, HashMap<String, Amount>>,
        journals: HashMap<String, Vec<Trade>>,
    ) -> Self {
        let next_sequence = books
            .values()
            .flat_map(|b| b.bids().iter().chain(b.asks().iter()))
            .map(|o| o.sequence + 1)
            .max()
            .unwrap_or(0);
        Exchange {
            books,
            balances: BalanceSheet::restore(balances),
            journals,
            next_sequence,
            now: 0,
        }
    }

    pub fn order_book(&self, pair: &str) -> Result<&OrderBook, ExchangeError> {
        self.books
            .get(pair)
            .ok_or_else(|| ExchangeError::MarketNotFound(pair.to_string()))
    }

    pub fn trade_history(&self, pair: &str) -> Result<&[Trade], ExchangeError> {
        self.journals
            .get(pair)
            .map(|t| t.as_slice())
            .ok_or_else(|| ExchangeError::MarketNotFound(pair.to_string()))
    }

    fn split_pair<'a>(pair: &'a str) -> Result<(&'a str, &'a str), ExchangeError> {
        pair.split_once('/')
            .ok_or_else(|| ExchangeError::InvalidOrder(format!("malformed pair {pair}")))
    }

    /// Places a limit order: reserves the user's funds logically (the
    /// balance check happens up front, matching the original reference's
    /// pre-trade check), adds it to the book, then runs the matching loop.
    pub fn place_limit(
        &mut self,
        pair: &str,
        user_id: &str,
        side: Side,
        price: Amount,
        amount: Amount,
    ) -> Result<Vec<Trade>, ExchangeError> {
        if price == 0 || amount == 0 {
            return Err(ExchangeError::InvalidOrder(
                "price and amount must be positive".into(),
            ));
        }
        if !self.books.contains_key(pair) {
            return Err(ExchangeError::MarketNotFound(pair.to_string()));
        }
        let (base, quote) = Self::split_pair(pair)?;

        match side {
            Side::Bid => {
                let required = amount
                    .checked_mul(price)
                    .ok_or_else(|| ExchangeError::InvalidOrder("order value overflows".into()))?;
                if self.balances.get(user_id, quote) < required {
                    return Err(ExchangeError::InsufficientFunds(quote.to_string()));
                }
            }
            Side::Ask => {
                if self.balances.get(user_id, base) < amount {
                    return Err(ExchangeError::InsufficientFunds(base.to_string()));
                }
            }
        }

        let order = Order {
            sequence: self.next_sequence,
            user_id: user_id.to_string(),
            side,
            price,
            amount,
        };
        self.next_sequence += 1;

        self.books.get_mut(pair).unwrap().insert(order);
        self.match_limit(pair)
    }

    /// Matches the resting book for `pair` until the spread no longer
    /// crosses. Always settles at the resting ask's price.
    pub fn match_limit(&mut self, pair: &str) -> Result<Vec<Trade>, ExchangeError> {
        let mut trades = Vec::new();
        loop {
            let book = match self.books.get_mut(pair) {
                Some(book) => book,
                None => break,
            };
            let (bid, ask) = match (book.best_bid(), book.best_ask()) {
                (Some(bid), Some(ask)) => (bid.clone(), ask.clone()),
                _ => break,
            };
            if bid.price < ask.price {
                break;
            }
            let fill_amount = bid.amount.min(ask.amount);
            let trade = self.settle(pair, &bid.user_id, &ask.user_id, ask.price, fill_amount)?;
            trades.push(trade);

            let book = self.books.get_mut(pair).unwrap();
            book.bids[0].amount -= fill_amount;
            book.asks[0].amount -= fill_amount;
            if book.bids[0].amount == 0 {
                book.bids.remove(0);
            }
            if book.asks[0].amount == 0 {
                book.asks.remove(0);
            }
        }
        Ok(trades)
    }

    /// Places and immediately fills (partially or fully) a market order
    /// against the resting book. Fails with `Unfillable` if nothing could be
    /// matched, matching the reference's "no trades executed" rejection.
    pub fn place_market(
        &mut self,
        pair: &str,
        user_id: &str,
        side: Side,
        amount: Amount,
    ) -> Result<Vec<Trade>, ExchangeError> {
        if amount == 0 {
            return Err(ExchangeError::InvalidOrder("amount must be positive".into()));
        }
        if !self.books.contains_key(pair) {
            return Err(ExchangeError::MarketNotFound(pair.to_string()));
        }
        let (base, _quote) = Self::split_pair(pair)?;

        if side == Side::Ask && self.balances.get(user_id, base) < amount {
            return Err(ExchangeError::InsufficientFunds(base.to_string()));
        }

        let mut remaining = amount;
        let mut trades = Vec::new();

        loop {
            if remaining == 0 {
                break;
            }
            let book = self.books.get(pair).unwrap();
            let counterparty = match side {
                Side::Bid => book.best_ask().cloned(),
                Side::Ask => book.best_bid().cloned(),
            };
            let Some(resting) = counterparty else {
                break;
            };
            let fill_amount = remaining.min(resting.amount);

            if side == Side::Bid {
                let required = fill_amount
                    .checked_mul(resting.price)
                    .ok_or_else(|| ExchangeError::InvalidOrder("trade value overflows".into()))?;
                let (_, quote) = Self::split_pair(pair)?;
                if self.balances.get(user_id, quote) < required {
                    break;
                }
            }

            let (buyer, seller) = match side {
                Side::Bid => (user_id.to_string(), resting.user_id.clone()),
                Side::Ask => (resting.user_id.clone(), user_id.to_string()),
            };
            let trade = self.settle(pair, &buyer, &seller, resting.price, fill_amount)?;
            trades.push(trade);
            remaining -= fill_amount;

            let book = self.books.get_mut(pair).unwrap();
            let resting_side = match side {
                Side::Bid => &mut book.asks,
                Side::Ask => &mut book.bids,
            };
            resting_side[0].amount -= fill_amount;
            if resting_side[0].amount == 0 {
                resting_side.remove(0);
            }
        }

        if trades.is_empty() {
            return Err(ExchangeError::Unfillable);
        }
        Ok(trades)
    }

    /// Moves funds between the two counterparties and journals the trade.
    /// `price` is always the resting order's price per this engine's
    /// documented settlement rule.
    fn settle(
        &mut self,
        pair: &str,
        buyer_id: &str,
        seller_id: &str,
        price: Amount,
        amount: Amount,
    ) -> Result<Trade, ExchangeError> {
        let (base, quote) = pair.split_once('/').expect("pair already validated");
        let quote_value = amount
            .checked_mul(price)
            .ok_or_else(|| ExchangeError::InvalidOrder("trade value overflows".into()))?;

        if !self.balances.withdraw(buyer_id, quote, quote_value) {
            return Err(ExchangeError::InsufficientFunds(quote.to_string()));
        }
        if !self.balances.withdraw(seller_id, base, amount) {
            return Err(ExchangeError::InsufficientFunds(base.to_string()));
        }
        self.balances.deposit(buyer_id, base, amount);
        self.balances.deposit(seller_id, quote, quote_value);

        let trade = Trade {
            price,
            amount,
            timestamp: self.now,
            buyer_id: buyer_id.to_string(),
            seller_id: seller_id.to_string(),
        };
        self.journals.entry(pair.to_string()).or_default().push(trade.clone());
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_exchange() -> Exchange {
        let mut ex = Exchange::new();
        ex.create_market("SIM", "USD");
        ex.deposit("alice", "USD", 10_000);
        ex.deposit("bob", "SIM", 100);
        ex
    }

    #[test]
    fn crossing_limit_orders_trade_at_the_resting_ask_price() {
        let mut ex = seeded_exchange();
        ex.place_limit("SIM/USD", "bob", Side::Ask, 10, 5).unwrap();
        let trades = ex.place_limit("SIM/USD", "alice", Side::Bid, 12, 5).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 10);
        assert_eq!(ex.get_balance("alice", "SIM"), 5);
        assert_eq!(ex.get_balance("bob", "USD"), 50);
    }

    #[test]
    fn market_order_partially_fills_and_reports_only_filled_amount() {
        let mut ex = seeded_exchange();
        ex.place_limit("SIM/USD", "bob", Side::Ask, 10, 3).unwrap();
        let trades = ex.place_market("SIM/USD", "alice", Side::Bid, 10).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].amount, 3);
        assert_eq!(ex.get_balance("alice", "SIM"), 3);
    }

    #[test]
    fn market_order_with_no_counterparty_is_unfillable() {
        let mut ex = seeded_exchange();
        let err = ex.place_market("SIM/USD", "alice", Side::Bid, 1).unwrap_err();
        assert_eq!(err, ExchangeError::Unfillable);
    }

    #[test]
    fn limit_bid_rejected_when_quote_balance_is_insufficient() {
        let mut ex = seeded_exchange();
        let err = ex
            .place_limit("SIM/USD", "alice", Side::Bid, 1_000_000, 1)
            .unwrap_err();
        assert_eq!(err, ExchangeError::InsufficientFunds("USD".to_string()));
    }

    #[test]
    fn unknown_market_is_rejected() {
        let mut ex = seeded_exchange();
        let err = ex
            .place_limit("DOES/NOTEXIST", "alice", Side::Bid, 1, 1)
            .unwrap_err();
        assert_eq!(err, ExchangeError::MarketNotFound("DOES/NOTEXIST".to_string()));
    }
}
