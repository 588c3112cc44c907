//! Verification of a cross-chain deposit: the claimed transaction pays the
//! expected output, is included in a block, and that block is buried under a
//! valid header chain.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{BlockHash, Txid};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::{verify_header_chain, ChainSummary};
use crate::error::SpvError;
use crate::header::BlockHeader;
use crate::merkle::{verify_inclusion, MerkleProof};
use crate::proof::DepositProof;
use crate::scan::{check_first_output, read_block_height, ExpectedOutput, MAX_TX_INPUTS};
use crate::target::Target;

/// Configuration parameters controlling verification policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Easiest target any header of the proof may use (big-endian hex)
    pub max_target: Target,
    /// Largest input count the transaction scanner will skip
    pub max_inputs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            // Difficulty 1, the expansion of 0x1d00ffff
            max_target: Target::new(BigUint::from(0xffffu32) << 208usize),
            max_inputs: MAX_TX_INPUTS,
        }
    }
}

/// Facts established by a successful deposit verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositVerdict {
    pub txid: Txid,
    /// Block containing the transaction
    pub block_hash: BlockHash,
    /// Position of the transaction within its block
    pub leaf_index: u64,
    pub chain: ChainSummary,
}

/// Verify a deposit proof end-to-end.
///
/// Checks run in a fixed order and the first failure is returned: first
/// output of the transaction, Merkle inclusion in `headers[0]`, then the
/// header chain against `config.max_target`.
pub fn verify_deposit<const K: usize>(
    proof: &DepositProof<K>,
    expected: &ExpectedOutput,
    config: &VerifierConfig,
) -> Result<DepositVerdict, SpvError> {
    let block_header = proof
        .headers
        .first()
        .ok_or_else(|| SpvError::MalformedProof("proof carries no headers".into()))?;

    info!("Checking first transaction output ...");
    check_first_output(&proof.raw_transaction, expected, config.max_inputs)?;

    info!("Verifying transaction inclusion proof ...");
    let tx_hash = proof.tx_hash();
    verify_inclusion(&tx_hash, block_header, &proof.merkle_proof)?;

    info!("Verifying {} block headers ...", K);
    let chain = verify_header_chain(&proof.headers, &config.max_target)?;

    let verdict = DepositVerdict {
        txid: Txid::from_byte_array(tx_hash),
        block_hash: block_header.block_hash(),
        leaf_index: proof.merkle_proof.leaf_index(),
        chain,
    };
    info!(
        "Deposit {} verified in block {} at index {}",
        verdict.txid, verdict.block_hash, verdict.leaf_index
    );
    Ok(verdict)
}

/// Height of the block committed to by `header`, read from its coinbase.
///
/// The coinbase must be included in `header` and sit at leaf 0.
pub fn block_height(
    header: &BlockHeader,
    coinbase_tx: &[u8],
    proof: &MerkleProof,
) -> Result<u64, SpvError> {
    let txid = sha256d::Hash::hash(coinbase_tx).to_byte_array();
    verify_inclusion(&txid, header, proof)?;
    if !proof.is_first_leaf() {
        return Err(SpvError::NotCoinbase);
    }
    read_block_height(coinbase_tx)
}
