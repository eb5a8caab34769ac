//! Simulated peer fan-out.
//!
//! Real networking is an external collaborator of this crate's scope
//! (see the workspace's design notes); what remains here is the in-process
//! broadcast interface a node uses to announce new blocks and transactions,
//! played by a `tokio::sync::broadcast` channel standing in for a peer set.

use serde::{Deserialize, Serialize};
use simchain_core::{Block, Transaction};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub simulated_peer_count: usize,
    pub broadcast_buffer: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            simulated_peer_count: 8,
            broadcast_buffer: 256,
        }
    }
}

/// An announcement fanned out to every subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Announcement {
    NewBlock(Block),
    NewTransaction(Transaction),
}

/// Best-effort broadcast fan-out: a slow or absent subscriber never blocks
/// the publisher, matching a real gossip network's lack of delivery
/// guarantees.
pub struct NetworkService {
    config: NetworkConfig,
    sender: broadcast::Sender<Announcement>,
}

impl NetworkService {
    pub fn new(config: NetworkConfig) -> Self {
        let (sender, _receiver) = broadcast::channel(config.broadcast_buffer);
        NetworkService { config, sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.sender.subscribe()
    }

    /// Publishes `announcement`. Returns the number of subscribers it
    /// reached (zero is not an error: nothing is listening yet).
    pub fn broadcast(&self, announcement: Announcement) -> usize {
        self.sender.send(announcement).unwrap_or(0)
    }

    pub fn broadcast_block(&self, block: Block) -> usize {
        self.broadcast(Announcement::NewBlock(block))
    }

    pub fn broadcast_transaction(&self, tx: Transaction) -> usize {
        self.broadcast(Announcement::NewTransaction(tx))
    }

    /// The configured simulated peer count — this adapter does not dial
    /// real connections, so this is a fixed reporting value rather than a
    /// live count.
    pub fn peer_count(&self) -> usize {
        self.config.simulated_peer_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_core::{Transaction, TransactionOutput};

    #[tokio::test]
    async fn subscriber_receives_broadcast_transaction() {
        let service = NetworkService::new(NetworkConfig::default());
        let mut rx = service.subscribe();
        let tx = Transaction::new(vec![], vec![TransactionOutput::new(1, "P2PKH addr".into(), None)], 0).unwrap();
        service.broadcast_transaction(tx.clone());
        match rx.recv().await.unwrap() {
            Announcement::NewTransaction(received) => assert_eq!(received.id, tx.id),
            _ => panic!("expected a transaction announcement"),
        }
    }

    #[test]
    fn broadcast_with_no_subscribers_reports_zero_reached() {
        let service = NetworkService::new(NetworkConfig::default());
        let tx = Transaction::new(vec![], vec![TransactionOutput::new(1, "P2PKH addr".into(), None)], 0).unwrap();
        assert_eq!(service.broadcast_transaction(tx), 0);
    }
}
