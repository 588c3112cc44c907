//! Cross-chain atomic swap: Bob locks coins on this chain and releases them to
//! Alice once she proves a payment to Bob on Bitcoin, or takes them back after
//! a timeout.

use tracing::info;
use xspv_verify::script::{hash160, p2pkh, p2wpkh};
use xspv_verify::{
    verify_deposit, DepositProof, DepositVerdict, ExpectedOutput, Target, VerifierConfig,
    MAX_TX_INPUTS,
};

use crate::error::ContractError;
use crate::outputs::{build_output, verify_outputs_commitment, SpendContext};
use crate::signature::SignatureChecker;

/// Number of Bitcoin headers, the deposit block included, a swap must present
pub const MIN_CONF: usize = 3;

/// Lock times below this value are block heights, others are timestamps
pub const LOCKTIME_BLOCK_HEIGHT_MARKER: u32 = 500_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChainSwap {
    /// Alice claims the locked coins after paying on Bitcoin
    pub alice_addr: [u8; 20],
    /// Bob can cancel after the timeout
    pub bob_addr: [u8; 20],
    /// Bitcoin P2WPKH key hash Alice must pay
    pub bob_p2wpkh_addr: [u8; 20],
    /// Block height or timestamp
    pub timeout: u32,
    pub target_difficulty: Target,
    pub amount_btc: u64,
    pub amount_bsv: u64,
}

impl CrossChainSwap {
    /// Bitcoin output Alice has to create.
    pub fn expected_deposit(&self) -> ExpectedOutput {
        ExpectedOutput {
            amount: self.amount_btc,
            script: p2wpkh(&self.bob_p2wpkh_addr),
        }
    }

    /// Outputs of a successful swap: the locked amount to Alice, then change.
    pub fn swap_outputs(&self, ctx: &SpendContext) -> Vec<u8> {
        let mut outputs = build_output(self.amount_bsv, &p2pkh(&self.alice_addr));
        outputs.extend_from_slice(&ctx.change_output());
        outputs
    }

    fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            max_target: self.target_difficulty.clone(),
            max_inputs: MAX_TX_INPUTS,
        }
    }

    pub fn swap(
        &self,
        proof: &DepositProof<MIN_CONF>,
        alice_pubkey: &[u8; 33],
        alice_sig: &[u8],
        checker: &impl SignatureChecker,
        ctx: &SpendContext,
    ) -> Result<DepositVerdict, ContractError> {
        let verdict = verify_deposit(proof, &self.expected_deposit(), &self.verifier_config())?;

        if hash160(alice_pubkey) != self.alice_addr {
            return Err(ContractError::WrongPubKey("Alice"));
        }
        if !checker.check_sig(alice_sig, alice_pubkey) {
            return Err(ContractError::InvalidSignature);
        }

        verify_outputs_commitment(&self.swap_outputs(ctx), ctx)?;
        info!("Swap released against Bitcoin tx {}", verdict.txid);
        Ok(verdict)
    }

    pub fn cancel(
        &self,
        bob_pubkey: &[u8; 33],
        bob_sig: &[u8],
        checker: &impl SignatureChecker,
        ctx: &SpendContext,
    ) -> Result<(), ContractError> {
        // A final sequence disables lock time enforcement
        if ctx.sequence == u32::MAX {
            return Err(ContractError::FinalSequence);
        }
        if self.timeout < LOCKTIME_BLOCK_HEIGHT_MARKER
            && ctx.locktime >= LOCKTIME_BLOCK_HEIGHT_MARKER
        {
            return Err(ContractError::LocktimeNotHeight);
        }
        if ctx.locktime < self.timeout {
            return Err(ContractError::LocktimeNotExpired);
        }

        if hash160(bob_pubkey) != self.bob_addr {
            return Err(ContractError::WrongPubKey("Bob"));
        }
        if !checker.check_sig(bob_sig, bob_pubkey) {
            return Err(ContractError::InvalidSignature);
        }
        info!("Swap cancelled at locktime {}", ctx.locktime);
        Ok(())
    }
}
