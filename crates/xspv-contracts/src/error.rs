use thiserror::Error;
use xspv_verify::SpvError;

/// Reasons a contract method aborts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error(transparent)]
    Spv(#[from] SpvError),
    /// Outputs built by the contract differ from those of the spending transaction
    #[error("hashOutputs mismatch")]
    OutputsMismatch,
    #[error("{0} wrong pub key")]
    WrongPubKey(&'static str),
    #[error("signature check failed")]
    InvalidSignature,
    #[error("input sequence should less than UINT_MAX")]
    FinalSequence,
    #[error("locktime should be less than 500000000")]
    LocktimeNotHeight,
    #[error("locktime has not yet expired")]
    LocktimeNotExpired,
    #[error("lock pub key already used")]
    LockKeyUsed,
    #[error("token supply exhausted")]
    SupplyExhausted,
    #[error("amount overflow")]
    AmountOverflow,
    #[error("inscription encoding failed: {0}")]
    Inscription(String),
}
