//! Fixtures for tests: low-difficulty header mining and synthetic deposits.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::serialize;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::header::BlockHeader;
use crate::merkle::{merkle_root, MerkleProof};
use crate::proof::DepositProof;
use crate::scan::ExpectedOutput;
use crate::script::p2pkh;
use crate::target::{CompactBits, Target, REGTEST_BITS};

/// Regtest difficulty floor, met by roughly every other nonce.
pub fn regtest_target() -> Target {
    CompactBits::from_consensus(REGTEST_BITS)
        .to_target()
        .expect("regtest bits have a valid exponent")
}

/// Grind the nonce until the header meets the regtest target.
pub fn mine(mut header: BlockHeader) -> BlockHeader {
    let target = regtest_target();
    while !header.is_valid(&target) {
        header.nonce = header.nonce.wrapping_add(1);
    }
    header
}

/// Mine `K` linked headers. The first one commits to `merkle_root`, the
/// others to arbitrary roots.
pub fn mine_chain<const K: usize>(prev_block_hash: [u8; 32], merkle_root: [u8; 32]) -> [BlockHeader; K] {
    let mut prev = prev_block_hash;
    std::array::from_fn(|index| {
        let header = mine(BlockHeader {
            version: 0x2000_0000u32.to_le_bytes(),
            prev_block_hash: prev,
            merkle_root: if index == 0 {
                merkle_root
            } else {
                [index as u8; 32]
            },
            time: 1_700_000_000 + 600 * index as u32,
            bits: CompactBits::from_consensus(REGTEST_BITS),
            nonce: 0,
        });
        prev = header.hash();
        header
    })
}

/// Legacy transaction with `inputs` dummy inputs, `expected` as its first
/// output and a P2PKH change output after it.
pub fn legacy_tx(inputs: usize, expected: &ExpectedOutput) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: (0..inputs)
            .map(|i| TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([i as u8 + 1; 32]), i as u32),
                script_sig: ScriptBuf::from_bytes(vec![0x51; 10 + i]),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            })
            .collect(),
        output: vec![
            TxOut {
                value: Amount::from_sat(expected.amount),
                script_pubkey: ScriptBuf::from_bytes(expected.script.clone()),
            },
            TxOut {
                value: Amount::from_sat(4_321),
                script_pubkey: ScriptBuf::from_bytes(p2pkh(&[0xcc; 20])),
            },
        ],
    }
}

/// Minimal coinbase carrying a BIP-34 height push.
pub fn coinbase_tx(height: u32) -> Vec<u8> {
    let mut script = vec![0x04];
    script.extend_from_slice(&height.to_le_bytes());
    script.extend_from_slice(b"xspv");

    let mut raw = vec![0x01, 0x00, 0x00, 0x00, 0x01];
    raw.extend_from_slice(&[0u8; 32]);
    raw.extend_from_slice(&[0xff; 4]);
    raw.push(script.len() as u8);
    raw.extend_from_slice(&script);
    raw.extend_from_slice(&[0xff; 4]);
    raw.push(0x01);
    raw.extend_from_slice(&5_000_000_000u64.to_le_bytes());
    let payout = p2pkh(&[0xdd; 20]);
    raw.push(payout.len() as u8);
    raw.extend_from_slice(&payout);
    raw.extend_from_slice(&[0u8; 4]);
    raw
}

/// Place `raw_tx` at `index` in a block of `tx_count` transactions and bury
/// it under `K - 1` mined headers.
pub fn deposit_proof<const K: usize>(raw_tx: Vec<u8>, index: usize, tx_count: usize) -> DepositProof<K> {
    let txid = sha256d::Hash::hash(&raw_tx).to_byte_array();
    let txids: Vec<[u8; 32]> = (0..tx_count)
        .map(|i| {
            if i == index {
                txid
            } else {
                sha256d::Hash::hash(&(i as u64).to_le_bytes()).to_byte_array()
            }
        })
        .collect();

    let root = merkle_root(&txids).expect("block has at least one transaction");
    DepositProof {
        raw_transaction: raw_tx,
        merkle_proof: MerkleProof::build(&txids, index).expect("index is within the block"),
        headers: mine_chain([0x5e; 32], root),
    }
}
