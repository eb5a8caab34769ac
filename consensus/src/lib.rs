//! Consensus rules shared by the miner and the ledger controller: the
//! reward schedule, difficulty retargeting and the Merkle root function.
//!
//! These are pure functions over `simchain-core` types; this crate holds no
//! state of its own.

pub mod difficulty;
pub mod merkle;
pub mod reward;

pub use difficulty::next_difficulty_target;
pub use merkle::merkle_root;
pub use reward::block_reward;

use serde::{Deserialize, Serialize};

/// Tunable consensus parameters for a given network profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub target_block_time_secs: u64,
    pub difficulty_adjustment_interval: u64,
    pub initial_difficulty: u32,
    pub halving_interval: u64,
    pub initial_reward: u64,
}

impl ConsensusParams {
    /// The default network profile: a few seconds per block and a short
    /// halving interval, tuned for running a simulated chain interactively
    /// rather than for security against real hashpower.
    pub fn mainnet() -> Self {
        ConsensusParams {
            target_block_time_secs: 15,
            difficulty_adjustment_interval: 10,
            initial_difficulty: 2,
            halving_interval: 210_000,
            initial_reward: 50 * simchain_core::COIN,
        }
    }

    /// A faster-halving profile for exercising the reward schedule in tests
    /// and demos without mining hundreds of thousands of blocks.
    pub fn regtest() -> Self {
        ConsensusParams {
            target_block_time_secs: 1,
            difficulty_adjustment_interval: 4,
            initial_difficulty: 1,
            halving_interval: 150,
            initial_reward: 50 * simchain_core::COIN,
        }
    }

    pub fn block_reward(&self, height: u64) -> u64 {
        reward::block_reward(self.initial_reward, self.halving_interval, height)
    }
}
