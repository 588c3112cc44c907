//! Contracts that accept Bitcoin deposits proven with SPV
//!
//! Contract methods are pure functions of the prior state, the caller's
//! arguments and the spending context. They return the next state only once
//! the outputs they build match the outputs of the spending transaction.

pub mod error;
pub mod mint;
pub mod outputs;
pub mod signature;
pub mod swap;

pub use error::ContractError;
pub use mint::LockToMint;
pub use outputs::{
    build_output, hash_outputs, verify_outputs_commitment, ChangeOutput, SpendContext,
};
pub use signature::{EcdsaChecker, SignatureChecker};
pub use swap::CrossChainSwap;
