//! Locking scripts the first output of a deposit is compared against.

use bitcoin::hashes::{hash160, sha256, Hash};

/// Compressed public key size
pub const PUBKEY_SIZE: usize = 33;

/// RIPEMD160(SHA256(data)), the public key hash used by P2PKH and P2WPKH.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// `OP_0 <20-byte pubkey hash>`
pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![0x00, 0x14];
    script.extend_from_slice(pubkey_hash);
    script
}

/// `OP_0 <sha256(witness_script)>`
pub fn p2wsh(witness_script: &[u8]) -> Vec<u8> {
    let mut script = vec![0x00, 0x20];
    script.extend_from_slice(sha256::Hash::hash(witness_script).as_byte_array());
    script
}

/// `OP_DUP OP_HASH160 <20-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

/// `<deadline> OP_CHECKLOCKTIMEVERIFY OP_DROP <pubkey> OP_CHECKSIG`
///
/// The deadline is pushed as 4 little-endian bytes, so it must stay below
/// `2^31` to remain a positive script number.
pub fn cltv_lock_script(deadline: u32, pubkey: &[u8; PUBKEY_SIZE]) -> Vec<u8> {
    let mut script = vec![0x04];
    script.extend_from_slice(&deadline.to_le_bytes());
    script.extend_from_slice(&[0xb1, 0x75, 0x21]);
    script.extend_from_slice(pubkey);
    script.push(0xac);
    script
}
