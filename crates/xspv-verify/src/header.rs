//! Block header codec and single-header proof-of-work validation.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::BlockHash;

use crate::error::SpvError;
use crate::target::{CompactBits, Target};
use crate::varint::take;

/// Size of a serialized block header
pub const HEADER_SIZE: usize = 80;

/// Bitcoin block header with the six consensus fields.
///
/// Hash fields are kept in internal (wire) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHeader {
    pub version: [u8; 4],
    pub prev_block_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub bits: CompactBits,
    pub nonce: u32,
}

impl BlockHeader {
    /// Canonical 80-byte serialization.
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version);
        out[4..36].copy_from_slice(&self.prev_block_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.0);
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Parse exactly 80 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SpvError> {
        let raw = take(bytes, 0, HEADER_SIZE)?;
        if bytes.len() != HEADER_SIZE {
            return Err(SpvError::LengthOutOfRange(bytes.len() as u64));
        }
        let mut header = Self {
            version: [0; 4],
            prev_block_hash: [0; 32],
            merkle_root: [0; 32],
            time: 0,
            bits: CompactBits([0; 4]),
            nonce: 0,
        };
        header.version.copy_from_slice(&raw[0..4]);
        header.prev_block_hash.copy_from_slice(&raw[4..36]);
        header.merkle_root.copy_from_slice(&raw[36..68]);
        header.time = u32::from_le_bytes([raw[68], raw[69], raw[70], raw[71]]);
        header.bits = CompactBits([raw[72], raw[73], raw[74], raw[75]]);
        header.nonce = u32::from_le_bytes([raw[76], raw[77], raw[78], raw[79]]);
        Ok(header)
    }

    /// Double SHA-256 of the serialization, internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        sha256d::Hash::hash(&self.serialize()).to_byte_array()
    }

    /// Hash as a `BlockHash`, for display in the usual reversed hex form.
    pub fn block_hash(&self) -> BlockHash {
        BlockHash::from_byte_array(self.hash())
    }

    pub fn target(&self) -> Result<Target, SpvError> {
        self.bits.to_target()
    }

    /// Check that the hash meets the header's own target and that this target
    /// is not easier than `max_target`.
    pub fn validate(&self, max_target: &Target) -> Result<(), SpvError> {
        let target = self.target()?;
        if !target.is_met_by(&self.hash()) {
            return Err(SpvError::HashAboveTarget);
        }
        if &target > max_target {
            return Err(SpvError::TargetAboveMax);
        }
        Ok(())
    }

    pub fn is_valid(&self, max_target: &Target) -> bool {
        self.validate(max_target).is_ok()
    }
}

impl From<&bitcoin::block::Header> for BlockHeader {
    fn from(header: &bitcoin::block::Header) -> Self {
        Self {
            version: header.version.to_consensus().to_le_bytes(),
            prev_block_hash: header.prev_blockhash.to_byte_array(),
            merkle_root: header.merkle_root.to_byte_array(),
            time: header.time,
            bits: CompactBits::from_consensus(header.bits.to_consensus()),
            nonce: header.nonce,
        }
    }
}
