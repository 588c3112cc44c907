//! Minimal walk over a legacy-serialized Bitcoin transaction.
//!
//! Only the fields needed to reach and check the first output are read:
//! inputs are skipped, everything after the first output is ignored.

use serde::{Deserialize, Serialize};

use crate::error::SpvError;
use crate::varint::{decode_varint, take};

/// Default bound on the number of inputs the scanner will skip
pub const MAX_TX_INPUTS: u64 = 3;

/// Segwit marker and flag following the version in witness serialization
const SEGWIT_MARKER_FLAG: [u8; 2] = [0x00, 0x01];

/// prev txid (32) + output index (4)
const OUTPOINT_SIZE: usize = 36;

const SEQUENCE_SIZE: usize = 4;

/// Offset of the height push inside a coinbase script:
/// version (4) + input count (1) + null outpoint (36) + script length (1)
const COINBASE_HEIGHT_OFFSET: usize = 42;

/// The first output of a transaction, borrowed from the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstOutput<'a> {
    pub amount: u64,
    pub script: &'a [u8],
}

/// Output the claimant's transaction must create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    /// Amount in satoshis
    pub amount: u64,
    /// Exact locking script
    #[serde(
        serialize_with = "crate::proof::serialize_bytes",
        deserialize_with = "crate::proof::deserialize_bytes"
    )]
    pub script: Vec<u8>,
}

/// Walk `raw_tx` up to its first output and return it.
pub fn scan_first_output(raw_tx: &[u8], max_inputs: u64) -> Result<FirstOutput<'_>, SpvError> {
    let mut offset = 4;

    if take(raw_tx, offset, 2)? == SEGWIT_MARKER_FLAG {
        return Err(SpvError::WitnessDataPresent);
    }

    let inputs = decode_varint(raw_tx, offset)?;
    if inputs.value > max_inputs {
        return Err(SpvError::TooManyInputs {
            count: inputs.value,
            max: max_inputs,
        });
    }
    offset = inputs.next_offset;

    for _ in 0..inputs.value {
        take(raw_tx, offset, OUTPOINT_SIZE)?;
        offset += OUTPOINT_SIZE;
        let script_len = decode_varint(raw_tx, offset)?;
        offset = script_len
            .next_offset
            .checked_add(script_len.as_len()?)
            .and_then(|end| end.checked_add(SEQUENCE_SIZE))
            .ok_or(SpvError::LengthOutOfRange(script_len.value))?;
    }

    // Output count only positions the reader
    let outputs = decode_varint(raw_tx, offset)?;
    offset = outputs.next_offset;

    let amount_bytes = take(raw_tx, offset, 8)?;
    let mut amount = [0u8; 8];
    amount.copy_from_slice(amount_bytes);
    offset += 8;

    let script_len = decode_varint(raw_tx, offset)?;
    let script = take(raw_tx, script_len.next_offset, script_len.as_len()?)?;

    Ok(FirstOutput {
        amount: u64::from_le_bytes(amount),
        script,
    })
}

/// Check that the first output of `raw_tx` pays exactly `expected`.
pub fn check_first_output(
    raw_tx: &[u8],
    expected: &ExpectedOutput,
    max_inputs: u64,
) -> Result<(), SpvError> {
    let output = scan_first_output(raw_tx, max_inputs)?;
    if output.amount != expected.amount {
        return Err(SpvError::InvalidOutputAmount {
            expected: expected.amount,
            actual: output.amount,
        });
    }
    if output.script != expected.script.as_slice() {
        return Err(SpvError::InvalidLockingScript);
    }
    Ok(())
}

/// Whether `raw_tx` spends the null outpoint with a single input.
pub fn is_coinbase(raw_tx: &[u8]) -> bool {
    let input_count = take(raw_tx, 4, 1);
    let prev_txid = take(raw_tx, 5, 32);
    let prev_index = take(raw_tx, 37, 4);
    matches!(
        (input_count, prev_txid, prev_index),
        (Ok([1]), Ok(txid), Ok(index))
            if txid.iter().all(|b| *b == 0) && index.iter().all(|b| *b == 0xff)
    )
}

/// Read the BIP-34 block height pushed at the start of a coinbase script.
pub fn read_block_height(coinbase_tx: &[u8]) -> Result<u64, SpvError> {
    if !is_coinbase(coinbase_tx) {
        return Err(SpvError::NotCoinbase);
    }
    let push = decode_varint(coinbase_tx, COINBASE_HEIGHT_OFFSET)?;
    let len = push.as_len()?;
    if len > 8 {
        return Err(SpvError::LengthOutOfRange(push.value));
    }
    let data = take(coinbase_tx, push.next_offset, len)?;
    let mut height = [0u8; 8];
    height[..len].copy_from_slice(data);
    Ok(u64::from_le_bytes(height))
}
