//! Synthetic regtest chain for proof assembly tests.

use bitcoin::block::{Header, Version};
use bitcoin::hashes::Hash;
use bitcoin::{Block, BlockHash, CompactTarget, OutPoint, Transaction, Witness};
use xspv_verify::script::{p2pkh, p2wpkh};
use xspv_verify::target::REGTEST_BITS;
use xspv_verify::test_utils::{legacy_tx, regtest_target};
use xspv_verify::{BlockHeader, ExpectedOutput};

pub struct TestChain {
    /// Segwit deposit, second transaction of the first block
    pub deposit: Transaction,
    pub expected: ExpectedOutput,
    pub blocks: Vec<Block>,
}

impl TestChain {
    pub fn new(length: usize) -> Self {
        let expected = ExpectedOutput {
            amount: 75_000,
            script: p2wpkh(&[0x4d; 20]),
        };
        let mut deposit = legacy_tx(1, &expected);
        deposit.input[0].witness = Witness::from_slice(&[vec![0x30; 71], vec![0x02; 33]]);

        let mut blocks = Vec::with_capacity(length);
        let mut prev = BlockHash::all_zeros();
        for height in 0..length {
            let coinbase = coinbase(height);
            let txdata = if height == 0 {
                let other = legacy_tx(
                    2,
                    &ExpectedOutput {
                        amount: 1,
                        script: p2pkh(&[0x01; 20]),
                    },
                );
                vec![coinbase, deposit.clone(), other]
            } else {
                vec![coinbase]
            };
            let block = mine(prev, height as u32, txdata);
            prev = block.block_hash();
            blocks.push(block);
        }

        Self {
            deposit,
            expected,
            blocks,
        }
    }
}

fn coinbase(height: usize) -> Transaction {
    let mut tx = legacy_tx(
        1,
        &ExpectedOutput {
            amount: 50 * 100_000_000,
            script: p2pkh(&[height as u8; 20]),
        },
    );
    tx.input[0].previous_output = OutPoint::null();
    tx
}

fn mine(prev_blockhash: BlockHash, height: u32, txdata: Vec<Transaction>) -> Block {
    let mut block = Block {
        header: Header {
            version: Version::from_consensus(0x2000_0000),
            prev_blockhash,
            merkle_root: bitcoin::TxMerkleNode::all_zeros(),
            time: 1_700_000_000 + 600 * height,
            bits: CompactTarget::from_consensus(REGTEST_BITS),
            nonce: 0,
        },
        txdata,
    };
    block.header.merkle_root = block
        .compute_merkle_root()
        .expect("block has transactions");

    let target = regtest_target();
    while !BlockHeader::from(&block.header).is_valid(&target) {
        block.header.nonce += 1;
    }
    block
}
