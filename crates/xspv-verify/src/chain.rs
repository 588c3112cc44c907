//! Validation of a fixed-length run of consecutive block headers.

use num_bigint::BigUint;
use tracing::debug;

use crate::error::SpvError;
use crate::header::BlockHeader;
use crate::target::Target;

/// Summary of a header chain that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSummary {
    /// Hash of the last header, internal byte order
    pub tip_hash: [u8; 32],
    /// Sum of the work of every header in the chain
    pub total_work: BigUint,
}

/// Validate `K` headers where `headers[0]` is the block carrying the proof and
/// each following header extends its predecessor.
///
/// Every header must meet its own target and `max_target`; any failure aborts
/// the whole chain.
pub fn verify_header_chain<const K: usize>(
    headers: &[BlockHeader; K],
    max_target: &Target,
) -> Result<ChainSummary, SpvError> {
    let mut total_work = BigUint::default();
    let mut prev_hash: Option<[u8; 32]> = None;

    for (index, header) in headers.iter().enumerate() {
        if let Some(prev_hash) = prev_hash {
            if header.prev_block_hash != prev_hash {
                return Err(SpvError::WrongPrevBlockHash(index));
            }
        }
        header
            .validate(max_target)
            .map_err(|source| SpvError::InvalidHeader {
                index,
                source: Box::new(source),
            })?;
        total_work += header.target()?.work();
        prev_hash = Some(header.hash());
    }

    let tip_hash = prev_hash.unwrap_or_default();
    debug!("Validated {} headers, total work {}", K, total_work);

    Ok(ChainSummary {
        tip_hash,
        total_work,
    })
}
