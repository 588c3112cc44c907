//! Output-commitment protocol.
//!
//! A contract cannot write state anywhere but into the outputs of the
//! transaction spending it. Each method rebuilds the exact outputs it expects
//! and compares their double SHA-256 with the `hashOutputs` field of the
//! signature preimage, which the execution context supplies.

use bitcoin::hashes::{sha256d, Hash};
use tracing::debug;
use xspv_verify::encode_varint;
use xspv_verify::script::p2pkh;

use crate::error::ContractError;

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_RETURN: u8 = 0x6a;

/// Version byte closing a stateful output script
pub const STATE_VERSION: u8 = 0x00;

/// Change output requested by the caller of a contract method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutput {
    pub amount: u64,
    pub pubkey_hash: [u8; 20],
}

/// Fields of the spending transaction visible to a contract method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendContext {
    /// Double SHA-256 of all serialized outputs of the spending transaction
    pub hash_outputs: [u8; 32],
    pub locktime: u32,
    /// Sequence of the input spending the contract
    pub sequence: u32,
    pub change: Option<ChangeOutput>,
}

impl SpendContext {
    /// Context whose `hash_outputs` commits to exactly `outputs`.
    pub fn committing_to(outputs: &[u8], change: Option<ChangeOutput>) -> Self {
        Self {
            hash_outputs: hash_outputs(outputs),
            locktime: 0,
            sequence: u32::MAX,
            change,
        }
    }

    /// Serialized change output, or nothing when no change is requested.
    pub fn change_output(&self) -> Vec<u8> {
        self.change
            .as_ref()
            .map(|change| build_output(change.amount, &p2pkh(&change.pubkey_hash)))
            .unwrap_or_default()
    }
}

/// `amount (8 LE) || varint(script length) || script`
pub fn build_output(amount: u64, script: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 9 + script.len());
    out.extend_from_slice(&amount.to_le_bytes());
    out.extend_from_slice(&encode_varint(script.len() as u64));
    out.extend_from_slice(script);
    out
}

pub fn hash_outputs(outputs: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(outputs).to_byte_array()
}

/// Check that `outputs` are exactly the outputs of the spending transaction.
pub fn verify_outputs_commitment(outputs: &[u8], ctx: &SpendContext) -> Result<(), ContractError> {
    let actual = hash_outputs(outputs);
    if actual != ctx.hash_outputs {
        debug!(
            "Expected outputs hash {}, context carries {}",
            hex::encode(actual),
            hex::encode(ctx.hash_outputs)
        );
        return Err(ContractError::OutputsMismatch);
    }
    Ok(())
}

/// Minimal push of `data` onto the script stack.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    match len {
        0 => out.push(OP_0),
        1..=0x4b => out.push(len as u8),
        0x4c..=0xff => out.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
        0x100..=0xffff => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            out.push(OP_PUSHDATA4);
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
    out
}

/// `code || OP_RETURN || push(state) || state length (4 LE) || version`
pub fn state_script(code: &[u8], state: &[u8]) -> Vec<u8> {
    let mut script = code.to_vec();
    script.push(OP_RETURN);
    script.extend_from_slice(&push_data(state));
    script.extend_from_slice(&(state.len() as u32).to_le_bytes());
    script.push(STATE_VERSION);
    script
}
