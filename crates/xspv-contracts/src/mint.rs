//! Token minted by proving coins are time-locked on Bitcoin.
//!
//! Each mint presents a Bitcoin transaction locking `amount * hodl_rate`
//! satoshis to a CLTV script under a fresh key. The contract hands out the
//! tokens and carries the remaining supply into its next state.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};
use xspv_verify::script::{cltv_lock_script, p2pkh, p2wsh, PUBKEY_SIZE};
use xspv_verify::{
    encode_varint, verify_deposit, DepositProof, ExpectedOutput, Target, VerifierConfig,
    MAX_TX_INPUTS,
};

use crate::error::ContractError;
use crate::outputs::{
    build_output, push_data, state_script, verify_outputs_commitment, SpendContext,
};

/// Number of Bitcoin headers, the lock block included, a mint must present
pub const MIN_CONF: usize = 3;

/// Satoshis carried by the state and token outputs
const TOKEN_OUTPUT_AMOUNT: u64 = 1;

const OP_FALSE: u8 = 0x00;
const OP_IF: u8 = 0x63;
const OP_1: u8 = 0x51;
const OP_ENDIF: u8 = 0x68;

#[derive(Serialize)]
struct TransferInscription<'a> {
    p: &'static str,
    op: &'static str,
    id: &'a str,
    amt: String,
}

/// Ordinal envelope holding a BSV-20 transfer of `amount` tokens of `token_id`.
pub fn transfer_inscription(token_id: &str, amount: u64) -> Result<Vec<u8>, ContractError> {
    let body = serde_json::to_vec(&TransferInscription {
        p: "bsv-20",
        op: "transfer",
        id: token_id,
        amt: amount.to_string(),
    })
    .map_err(|e| ContractError::Inscription(e.to_string()))?;

    let mut script = vec![OP_FALSE, OP_IF];
    script.extend_from_slice(&push_data(b"ord"));
    script.push(OP_1);
    script.extend_from_slice(&push_data(b"application/bsv-20"));
    script.push(OP_FALSE);
    script.extend_from_slice(&push_data(&body));
    script.push(OP_ENDIF);
    Ok(script)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToMint {
    /// `<deploy txid>_<vout>`
    pub token_id: String,
    /// Tokens not yet minted
    pub supply: u64,
    /// Satoshis to lock per token
    pub hodl_rate: u64,
    /// Lock time the Bitcoin coins must stay locked until
    pub hodl_deadline: u32,
    pub target_difficulty: Target,
    /// Lock keys already used, so one Bitcoin lock mints once
    pub used_lock_pubkeys: BTreeSet<[u8; PUBKEY_SIZE]>,
    /// Contract script preceding the state
    pub code: Vec<u8>,
}

impl LockToMint {
    /// `supply (8 LE) || varint(key count) || keys`
    pub fn state_bytes(&self) -> Vec<u8> {
        let mut state = self.supply.to_le_bytes().to_vec();
        state.extend_from_slice(&encode_varint(self.used_lock_pubkeys.len() as u64));
        for key in &self.used_lock_pubkeys {
            state.extend_from_slice(key);
        }
        state
    }

    /// Continuation output: remaining supply inscribed ahead of the contract.
    pub fn state_output(&self) -> Result<Vec<u8>, ContractError> {
        let mut script = transfer_inscription(&self.token_id, self.supply)?;
        script.extend_from_slice(&state_script(&self.code, &self.state_bytes()));
        Ok(build_output(TOKEN_OUTPUT_AMOUNT, &script))
    }

    /// Tokens paid to a P2PKH recipient.
    pub fn transfer_output(
        &self,
        recipient: &[u8; 20],
        amount: u64,
    ) -> Result<Vec<u8>, ContractError> {
        let mut script = transfer_inscription(&self.token_id, amount)?;
        script.extend_from_slice(&p2pkh(recipient));
        Ok(build_output(TOKEN_OUTPUT_AMOUNT, &script))
    }

    /// Bitcoin output locking enough coins for `transfer_amount` tokens.
    pub fn expected_lock(
        &self,
        lock_pubkey: &[u8; PUBKEY_SIZE],
        transfer_amount: u64,
    ) -> Result<ExpectedOutput, ContractError> {
        let amount = transfer_amount
            .checked_mul(self.hodl_rate)
            .ok_or(ContractError::AmountOverflow)?;
        Ok(ExpectedOutput {
            amount,
            script: p2wsh(&cltv_lock_script(self.hodl_deadline, lock_pubkey)),
        })
    }

    /// Next state and the full output set for minting `amount` tokens.
    ///
    /// When `amount` reaches the remaining supply, everything left is
    /// transferred and no continuation output is created.
    pub fn mint_outputs(
        &self,
        recipient: &[u8; 20],
        lock_pubkey: &[u8; PUBKEY_SIZE],
        amount: u64,
        ctx: &SpendContext,
    ) -> Result<(Self, u64, Vec<u8>), ContractError> {
        if self.used_lock_pubkeys.contains(lock_pubkey) {
            return Err(ContractError::LockKeyUsed);
        }
        if self.supply == 0 {
            return Err(ContractError::SupplyExhausted);
        }

        let mut next = self.clone();
        next.used_lock_pubkeys.insert(*lock_pubkey);

        let mut outputs = Vec::new();
        let transfer_amount = if self.supply > amount {
            next.supply -= amount;
            outputs.extend_from_slice(&next.state_output()?);
            amount
        } else {
            next.supply = 0;
            self.supply
        };

        outputs.extend_from_slice(&next.transfer_output(recipient, transfer_amount)?);
        outputs.extend_from_slice(&ctx.change_output());
        Ok((next, transfer_amount, outputs))
    }

    pub fn mint(
        &self,
        recipient: &[u8; 20],
        lock_pubkey: &[u8; PUBKEY_SIZE],
        amount: u64,
        proof: &DepositProof<MIN_CONF>,
        ctx: &SpendContext,
    ) -> Result<Self, ContractError> {
        let (next, transfer_amount, outputs) =
            self.mint_outputs(recipient, lock_pubkey, amount, ctx)?;
        debug!("Minting {} of {} requested tokens", transfer_amount, amount);

        let config = VerifierConfig {
            max_target: self.target_difficulty.clone(),
            max_inputs: MAX_TX_INPUTS,
        };
        let expected = self.expected_lock(lock_pubkey, transfer_amount)?;
        let verdict = verify_deposit(proof, &expected, &config)?;

        verify_outputs_commitment(&outputs, ctx)?;
        info!(
            "Minted {} {} against lock tx {}, {} left",
            transfer_amount, self.token_id, verdict.txid, next.supply
        );
        Ok(next)
    }
}
