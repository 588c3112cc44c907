//! Signature checks performed by contract methods.

use bitcoin::secp256k1::{ecdsa, Message, PublicKey, Secp256k1};

/// Verifies a transaction signature against a public key, the way `OP_CHECKSIG`
/// does for the input spending the contract.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureChecker {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8; 33]) -> bool;
}

/// ECDSA checker over a precomputed signature hash.
///
/// Signatures are DER with a trailing sighash type byte.
#[derive(Debug, Clone)]
pub struct EcdsaChecker {
    sighash: [u8; 32],
}

impl EcdsaChecker {
    pub fn new(sighash: [u8; 32]) -> Self {
        Self { sighash }
    }
}

impl SignatureChecker for EcdsaChecker {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8; 33]) -> bool {
        let Some((_sighash_type, der)) = sig.split_last() else {
            return false;
        };
        let (Ok(signature), Ok(pubkey)) = (ecdsa::Signature::from_der(der), PublicKey::from_slice(pubkey))
        else {
            return false;
        };
        let message = Message::from_digest(self.sighash);
        Secp256k1::verification_only()
            .verify_ecdsa(&message, &signature, &pubkey)
            .is_ok()
    }
}
