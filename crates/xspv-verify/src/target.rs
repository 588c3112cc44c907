//! Compact difficulty ("bits") decoding, proof-of-work targets and work computation.

use std::fmt;

use num_bigint::BigUint;
use num_traits::One;
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SpvError;

/// Difficulty-1 bits of Bitcoin mainnet (genesis block)
pub const MAINNET_GENESIS_BITS: u32 = 0x1d00ffff;

/// Minimum difficulty bits of Bitcoin regtest
pub const REGTEST_BITS: u32 = 0x207fffff;

/// Compact target exactly as it appears in the 80-byte header.
///
/// Wire byte 3 (the most significant byte of the consensus `u32`) is the
/// exponent, wire bytes 0..3 are the little-endian coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactBits(pub [u8; 4]);

impl CompactBits {
    /// Build from the consensus `u32` value, e.g. `0x1d00ffff`.
    pub fn from_consensus(bits: u32) -> Self {
        Self(bits.to_le_bytes())
    }

    pub fn to_consensus(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn exponent(&self) -> u8 {
        self.0[3]
    }

    pub fn coefficient(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 0])
    }

    /// Expand to a full-width target: `coefficient << 8 * (exponent - 3)`.
    ///
    /// Exponents below 3 would need a right shift and are rejected.
    pub fn to_target(&self) -> Result<Target, SpvError> {
        let exponent = self.exponent();
        if exponent < 3 {
            return Err(SpvError::UnsupportedExponent(exponent));
        }
        let shift = 8 * (exponent as usize - 3);
        Ok(Target(BigUint::from(self.coefficient()) << shift))
    }
}

impl fmt::Display for CompactBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.to_consensus())
    }
}

/// Interpret a 32-byte digest as a little-endian unsigned integer.
pub fn hash_to_int(hash: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_le(hash)
}

/// Proof-of-work threshold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target(BigUint);

impl Target {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Parse a big-endian hex string of at most 32 bytes, with or without `0x`.
    pub fn from_hex(hex: &str) -> Result<Self, SpvError> {
        let digits = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(digits).map_err(|e| SpvError::InvalidTarget(e.to_string()))?;
        if bytes.len() > 32 {
            return Err(SpvError::InvalidTarget(format!(
                "{} bytes, expected at most 32",
                bytes.len()
            )));
        }
        Ok(Self(BigUint::from_bytes_be(&bytes)))
    }

    /// Zero-padded big-endian hex without prefix.
    pub fn to_hex(&self) -> String {
        format!("{:064x}", self.0)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Whether a header hash, read as a little-endian integer, does not exceed the target.
    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        hash_to_int(hash) <= self.0
    }

    /// Expected number of hashes to find a block at this target: `2^256 / (target + 1)`.
    pub fn work(&self) -> BigUint {
        let max_work = BigUint::one() << 256usize;
        max_work / (&self.0 + BigUint::one())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Target::from_hex(&hex).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_genesis_bits_to_target() {
        let target = CompactBits::from_consensus(MAINNET_GENESIS_BITS)
            .to_target()
            .unwrap();
        assert_eq!(
            target.to_hex(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_wire_layout() {
        let bits = CompactBits::from_consensus(MAINNET_GENESIS_BITS);
        assert_eq!(bits.0, [0xff, 0xff, 0x00, 0x1d]);
        assert_eq!(bits.exponent(), 0x1d);
        assert_eq!(bits.coefficient(), 0x00ffff);
        assert_eq!(bits.to_string(), "0x1d00ffff");
    }

    #[test]
    fn test_exponent_step_multiplies_by_256() {
        for bits in [0x1b0404cbu32, 0x1d00ffff, 0x207fffff, 0x03123456] {
            let lower = CompactBits::from_consensus(bits).to_target().unwrap();
            let higher = CompactBits::from_consensus(bits + 0x0100_0000)
                .to_target()
                .unwrap();
            assert_eq!(
                higher.as_biguint(),
                &(lower.as_biguint() * BigUint::from(256u32))
            );
        }
    }

    #[test]
    fn test_exponent_three_is_coefficient() {
        let target = CompactBits::from_consensus(0x03123456).to_target().unwrap();
        assert_eq!(target.as_biguint(), &BigUint::from(0x123456u32));
    }

    #[test]
    fn test_small_exponent_rejected() {
        for bits in [0x02008000u32, 0x01003456, 0x00000000] {
            let exponent = (bits >> 24) as u8;
            assert_eq!(
                CompactBits::from_consensus(bits).to_target(),
                Err(SpvError::UnsupportedExponent(exponent))
            );
        }
    }

    #[test]
    fn test_hash_compared_little_endian() {
        let target = Target::new(BigUint::from(0x0100u32));
        let mut hash = [0u8; 32];
        hash[1] = 0x01;
        assert!(target.is_met_by(&hash));
        hash[0] = 0x01;
        assert!(!target.is_met_by(&hash));
    }

    #[test]
    fn test_genesis_work() {
        let target = CompactBits::from_consensus(MAINNET_GENESIS_BITS)
            .to_target()
            .unwrap();
        assert_eq!(target.work(), BigUint::from_str("4295032833").unwrap());
    }

    #[test]
    fn test_hex_round_trip() {
        let target = CompactBits::from_consensus(REGTEST_BITS).to_target().unwrap();
        let parsed = Target::from_hex(&format!("0x{}", target.to_hex())).unwrap();
        assert_eq!(parsed, target);
        assert!(Target::from_hex(&"00".repeat(33)).is_err());
        assert!(Target::from_hex("zz").is_err());
    }
}
