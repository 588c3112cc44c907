//! SPV client library
//!
//! Builds deposit proofs from a Bitcoin node and checks proof files with the
//! same verifier contracts run.

pub mod fetch;
pub mod format;
pub mod verify;

#[cfg(test)]
mod test_chain;

use xspv_verify::DepositProof;

/// Headers a proof carries: the deposit block and two descendants
pub const CONFIRMATIONS: usize = 3;

/// Proof shape produced by `fetch` and accepted by `verify`
pub type Proof = DepositProof<CONFIRMATIONS>;

pub use fetch::build_proof;
