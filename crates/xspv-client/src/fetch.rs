//! Assemble a deposit proof for a mined transaction from a Bitcoin node.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use bitcoin::hashes::Hash;
use bitcoin::{consensus, BlockHash, Txid};
use tracing::info;
use xspv_bitcoin_client::{BitcoinClient, ProofSource};
use xspv_verify::{BlockHeader, DepositProof, MerkleProof};

use crate::Proof;

/// CLI arguments for the `fetch` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct FetchArgs {
    /// Transaction ID
    #[arg(long)]
    txid: Txid,
    /// Block containing the transaction, needed when the node has no txindex
    #[arg(long)]
    block_hash: Option<BlockHash>,
    /// Path to save the proof
    #[arg(long)]
    output: PathBuf,
    /// Bitcoin RPC URL
    #[arg(long, env = "BITCOIN_RPC")]
    bitcoin_rpc_url: String,
    /// Bitcoin RPC user:password (optional)
    #[arg(long, env = "USERPWD")]
    bitcoin_rpc_userpwd: Option<String>,
}

/// Run the `fetch` subcommand: build a deposit proof and write it to disk
pub async fn run(args: FetchArgs) -> Result<(), anyhow::Error> {
    let client = BitcoinClient::new(args.bitcoin_rpc_url, args.bitcoin_rpc_userpwd)?;
    let proof: Proof = build_proof(&client, args.txid, args.block_hash).await?;
    save_proof(&proof, &args.output)?;
    Ok(())
}

/// Build the proof that `txid` is buried under `K` headers.
///
/// The transaction is stored without witness data so that its hash is the txid
/// committed to by the block.
pub async fn build_proof<const K: usize>(
    source: &impl ProofSource,
    txid: Txid,
    block_hash: Option<BlockHash>,
) -> Result<DepositProof<K>, anyhow::Error> {
    info!("Fetching transaction {} ...", txid);
    let (mut transaction, block_hash) = source.transaction(txid, block_hash).await?;

    info!("Fetching block {} ...", block_hash);
    let block = source.block(block_hash).await?;
    let txids: Vec<[u8; 32]> = block
        .txdata
        .iter()
        .map(|tx| tx.compute_txid().to_byte_array())
        .collect();
    let index = txids
        .iter()
        .position(|id| *id == txid.to_byte_array())
        .ok_or_else(|| anyhow!("Transaction {} not found in block {}", txid, block_hash))?;
    let merkle_proof = MerkleProof::build(&txids, index)?;
    info!(
        "Transaction is #{} of {}, proof depth {}",
        index,
        txids.len(),
        merkle_proof.depth()
    );

    let mut headers = Vec::with_capacity(K);
    headers.push(BlockHeader::from(&block.header));
    let mut tip = block_hash;
    while headers.len() < K {
        let Some(next) = source.next_block_hash(tip).await? else {
            bail!(
                "insufficient confirmations: block {} has {} of {} required headers",
                block_hash,
                headers.len(),
                K
            );
        };
        headers.push(BlockHeader::from(&source.block_header(next).await?));
        tip = next;
    }
    let headers: [BlockHeader; K] = headers
        .try_into()
        .map_err(|_| anyhow!("Expected exactly {} headers", K))?;

    for input in &mut transaction.input {
        input.witness.clear();
    }

    Ok(DepositProof {
        raw_transaction: consensus::serialize(&transaction),
        merkle_proof,
        headers,
    })
}

/// Save a proof to disk as pretty-printed JSON
pub fn save_proof<const K: usize>(
    proof: &DepositProof<K>,
    proof_path: &Path,
) -> Result<(), anyhow::Error> {
    // Create parent directories if they don't exist
    if let Some(proof_dir) = proof_path.parent() {
        std::fs::create_dir_all(proof_dir)?;
    }
    let file = std::fs::File::create(proof_path)?;
    serde_json::to_writer_pretty(file, proof)?;
    info!("Proof written to {}", proof_path.display());
    Ok(())
}

pub fn load_proof<const K: usize>(proof_path: &Path) -> Result<DepositProof<K>, anyhow::Error> {
    info!("Loading proof from {}", proof_path.display());
    let file = std::fs::File::open(proof_path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
