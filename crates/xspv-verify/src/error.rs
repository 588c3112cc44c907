//! Abort reasons produced by the verification primitives.

use thiserror::Error;

/// A failed check. The `Display` output is the short abort label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpvError {
    /// A read ran past the end of the supplied bytes
    #[error("unexpected end of data: need {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },
    /// Compact target exponent below 3 cannot be expanded
    #[error("unsupported compact target exponent {0}")]
    UnsupportedExponent(u8),
    /// Header hash is above the target encoded in its own `bits`
    #[error("block hash above target")]
    HashAboveTarget,
    /// Header target is easier than the caller-supplied difficulty floor
    #[error("BH does not meet min target")]
    TargetAboveMax,
    /// Header at `index` failed its individual proof-of-work check
    #[error("{index}-th BH doesn't meet target difficulty: {source}")]
    InvalidHeader {
        index: usize,
        #[source]
        source: Box<SpvError>,
    },
    /// Header at `index` does not reference the hash of its predecessor
    #[error("{0}-th BH wrong prevBlockHash")]
    WrongPrevBlockHash(usize),
    /// Recomputed Merkle root differs from the header commitment
    #[error("invalid Merkle proof")]
    InvalidMerkleProof,
    /// Raw transaction carries the segwit marker and flag
    #[error("witness data present")]
    WitnessDataPresent,
    /// Raw transaction has more inputs than the scanner can walk
    #[error("too many inputs: {count} > {max}")]
    TooManyInputs { count: u64, max: u64 },
    /// First output amount differs from the expected one
    #[error("invalid output amount: expected {expected}, got {actual}")]
    InvalidOutputAmount { expected: u64, actual: u64 },
    /// First output script differs from the expected one
    #[error("invalid locking script")]
    InvalidLockingScript,
    /// A length or count does not fit the platform word size
    #[error("length {0} out of range")]
    LengthOutOfRange(u64),
    /// Transaction is not the coinbase of the block
    #[error("not a coinbase transaction")]
    NotCoinbase,
    /// Target value could not be parsed or exceeds 256 bits
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Merkle proof wire bytes have the wrong size or an unknown position tag
    #[error("malformed Merkle proof: {0}")]
    MalformedProof(String),
}
