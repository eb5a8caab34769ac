//! End-to-end scenarios spanning the mempool, validator, miner-shaped block
//! assembly and the ledger controller.

use simchain_consensus::{merkle_root, ConsensusParams};
use simchain_core::{Block, BlockHeader, Transaction, TransactionInput, TransactionOutput};
use simchain_crypto::KeyPair;
use simchain_ledger::Ledger;
use simchain_mempool::Mempool;

fn mine(header: &mut BlockHeader) -> String {
    loop {
        let hash = header.compute_hash();
        if simchain_consensus::difficulty::meets_target(&hash, header.difficulty_target) {
            return hash;
        }
        header.nonce += 1;
    }
}

fn mine_block(ledger: &Ledger, transactions: Vec<Transaction>, timestamp: u64) -> Block {
    let tip = ledger.tip();
    let mut header = BlockHeader {
        version: 1,
        previous_block_hash: tip.hash.clone(),
        merkle_root: merkle_root(&transactions),
        timestamp,
        difficulty_target: ledger.params().initial_difficulty,
        nonce: 0,
        height: tip.height() + 1,
    };
    let hash = mine(&mut header);
    Block {
        hash,
        header,
        transactions,
    }
}

fn coinbase(height: u64, reward: u64, address: &str) -> Transaction {
    Transaction {
        id: format!("coinbase_{height}"),
        inputs: vec![],
        outputs: vec![TransactionOutput::new(
            reward,
            simchain_crypto::locking_script(address),
            None,
        )],
        locktime: 0,
    }
}

#[test]
fn mines_two_empty_blocks_on_top_of_genesis() {
    let mut ledger = Ledger::new(ConsensusParams::regtest(), 0);
    let miner_key = KeyPair::generate();
    let miner_address = miner_key.address();

    for height in 1..=2u64 {
        let reward = ledger.params().block_reward(height);
        let block = mine_block(&ledger, vec![coinbase(height, reward, &miner_address)], height);
        ledger.accept_block(block).unwrap();
    }

    assert_eq!(ledger.height(), 2);
}

#[test]
fn wallet_transfer_with_fee_is_spendable_and_conserves_supply() {
    let mut ledger = Ledger::new(ConsensusParams::regtest(), 0);
    let miner_key = KeyPair::generate();
    let miner_address = miner_key.address();

    let reward = ledger.params().block_reward(1);
    let block1 = mine_block(&ledger, vec![coinbase(1, reward, &miner_address)], 1);
    ledger.accept_block(block1).unwrap();

    let recipient_key = KeyPair::generate();
    let recipient_address = recipient_key.address();

    let unsigned = Transaction::new(
        vec![TransactionInput::new("coinbase_1".into(), 0, String::new())],
        vec![
            TransactionOutput::new(reward - 1_000, simchain_crypto::locking_script(&recipient_address), None),
        ],
        0,
    )
    .unwrap();
    let digest = unsigned.signing_digest().unwrap();
    let signature = simchain_crypto::sign_digest(&miner_key.secret_key, &digest).unwrap();
    let unlocking = simchain_crypto::unlocking_script(&signature, &miner_key.public_key_base64());
    let spend = Transaction::new(
        vec![TransactionInput::new("coinbase_1".into(), 0, unlocking)],
        vec![TransactionOutput::new(
            reward - 1_000,
            simchain_crypto::locking_script(&recipient_address),
            None,
        )],
        0,
    )
    .unwrap();

    let mut mempool = Mempool::new();
    mempool.submit(spend.clone()).unwrap();

    let reward2 = ledger.params().block_reward(2);
    let mut block2_txs = vec![coinbase(2, reward2 + 1_000, &miner_address)];
    block2_txs.extend(mempool.drain(10));
    let block2 = mine_block(&ledger, block2_txs, 2);
    let mined_ids = ledger.accept_block(block2).unwrap();
    mempool.remove_many(&mined_ids);

    assert!(mempool.is_empty());
    assert_eq!(
        ledger.utxos().value_for_script(&simchain_crypto::locking_script(&recipient_address)),
        reward - 1_000
    );
    assert_eq!(
        ledger.utxos().total_value(),
        ledger.params().initial_reward
            + ledger.params().block_reward(1)
            + ledger.params().block_reward(2)
    );
}

#[test]
fn mempool_rejects_resubmission_of_the_same_transaction() {
    let tx = Transaction::new(
        vec![],
        vec![TransactionOutput::new(1, "P2PKH addr".into(), None)],
        0,
    )
    .unwrap();
    let mut mempool = Mempool::new();
    mempool.submit(tx.clone()).unwrap();
    assert!(mempool.submit(tx).is_err());
}
