//! Deposit proof supplied by a claimant, plus hex serde helpers for its fields.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::Txid;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::header::BlockHeader;
use crate::merkle::MerkleProof;

/// Everything needed to show that a foreign transaction is buried under `K`
/// headers. Built off-chain, checked once, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositProof<const K: usize> {
    /// Transaction in legacy (non-witness) serialization
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub raw_transaction: Vec<u8>,
    /// Path from the transaction to `headers[0].merkle_root`
    pub merkle_proof: MerkleProof,
    /// Block containing the transaction followed by `K - 1` descendants
    #[serde(
        serialize_with = "serialize_headers",
        deserialize_with = "deserialize_headers"
    )]
    pub headers: [BlockHeader; K],
}

impl<const K: usize> DepositProof<K> {
    /// Double SHA-256 of the raw transaction, internal byte order.
    pub fn tx_hash(&self) -> [u8; 32] {
        sha256d::Hash::hash(&self.raw_transaction).to_byte_array()
    }

    pub fn txid(&self) -> Txid {
        Txid::from_byte_array(self.tx_hash())
    }
}

pub fn serialize_bytes<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let hex_string = String::deserialize(deserializer)?;
    hex::decode(&hex_string).map_err(SerdeError::custom)
}

pub fn serialize_hash<S>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serialize_bytes(hash, serializer)
}

pub fn deserialize_hash<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
where
    D: Deserializer<'de>,
{
    let bytes = deserialize_bytes(deserializer)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| SerdeError::custom(format!("expected 32 bytes, got {}", b.len())))
}

pub fn serialize_headers<S, const K: usize>(
    headers: &[BlockHeader; K],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(headers.iter().map(|h| hex::encode(h.serialize())))
}

pub fn deserialize_headers<'de, D, const K: usize>(
    deserializer: D,
) -> Result<[BlockHeader; K], D::Error>
where
    D: Deserializer<'de>,
{
    let hex_strings = Vec::<String>::deserialize(deserializer)?;
    let headers = hex_strings
        .iter()
        .map(|s| {
            let bytes = hex::decode(s).map_err(SerdeError::custom)?;
            BlockHeader::deserialize(&bytes).map_err(SerdeError::custom)
        })
        .collect::<Result<Vec<_>, D::Error>>()?;
    headers.try_into().map_err(|h: Vec<BlockHeader>| {
        SerdeError::custom(format!("expected {} headers, got {}", K, h.len()))
    })
}
