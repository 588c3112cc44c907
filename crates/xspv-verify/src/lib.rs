//! SPV verification primitives for cross-chain deposits
//!
//! This crate decodes the pieces of a foreign Bitcoin chain a contract needs to
//! trust a deposit: variable-length integers, compact difficulty targets,
//! block headers, Merkle inclusion proofs and the first output of a legacy
//! transaction. All routines are pure and work on fixed-capacity inputs.

pub mod chain;
pub mod error;
pub mod header;
pub mod merkle;
pub mod proof;
pub mod scan;
pub mod script;
pub mod target;
pub mod varint;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use chain::{verify_header_chain, ChainSummary};
pub use error::SpvError;
pub use header::{BlockHeader, HEADER_SIZE};
pub use merkle::{
    merkle_root, verify_inclusion, MerkleProof, MerkleProofNode, NodePosition, MERKLE_PROOF_DEPTH,
};
pub use proof::DepositProof;
pub use scan::{check_first_output, scan_first_output, ExpectedOutput, FirstOutput, MAX_TX_INPUTS};
pub use target::{CompactBits, Target};
pub use varint::{decode_varint, encode_varint, VarInt};
pub use verify::{block_height, verify_deposit, DepositVerdict, VerifierConfig};
