//! Fixed-capacity Merkle inclusion proofs for transactions in a block.
//!
//! A proof is an ordered list of sibling hashes from the leaf level upwards,
//! padded with [`NodePosition::Invalid`] entries up to [`MERKLE_PROOF_DEPTH`].
//! Real entries must precede the padding.

use bitcoin::hashes::{sha256d, Hash};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::SpvError;
use crate::header::BlockHeader;

/// Maximum supported tree depth
pub const MERKLE_PROOF_DEPTH: usize = 32;

/// Size of one node on the wire: 32-byte hash plus 1-byte position tag
pub const NODE_WIRE_SIZE: usize = 33;

/// Side on which the sibling hash sits relative to the running root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum NodePosition {
    /// Padding past the real depth; never hashed
    #[default]
    Invalid = 0,
    /// Sibling is the left child: `parent = H(sibling || root)`
    Left = 1,
    /// Sibling is the right child: `parent = H(root || sibling)`
    Right = 2,
}

impl TryFrom<u8> for NodePosition {
    type Error = SpvError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Invalid),
            1 => Ok(Self::Left),
            2 => Ok(Self::Right),
            other => Err(SpvError::MalformedProof(format!(
                "unknown position tag {other}"
            ))),
        }
    }
}

/// One level of a Merkle path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MerkleProofNode {
    #[serde(
        serialize_with = "crate::proof::serialize_hash",
        deserialize_with = "crate::proof::deserialize_hash"
    )]
    pub hash: [u8; 32],
    pub position: NodePosition,
}

impl MerkleProofNode {
    pub fn left(hash: [u8; 32]) -> Self {
        Self {
            hash,
            position: NodePosition::Left,
        }
    }

    pub fn right(hash: [u8; 32]) -> Self {
        Self {
            hash,
            position: NodePosition::Right,
        }
    }

    pub fn is_real(&self) -> bool {
        self.position != NodePosition::Invalid
    }
}

/// Double SHA-256 of `left || right`.
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left);
    data[32..].copy_from_slice(right);
    sha256d::Hash::hash(&data).to_byte_array()
}

/// Merkle path with a fixed number of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MerkleProof(pub [MerkleProofNode; MERKLE_PROOF_DEPTH]);

impl Default for MerkleProof {
    fn default() -> Self {
        Self([MerkleProofNode::default(); MERKLE_PROOF_DEPTH])
    }
}

impl MerkleProof {
    /// Place `nodes` in the leading slots and pad the rest.
    pub fn from_nodes(nodes: &[MerkleProofNode]) -> Result<Self, SpvError> {
        if nodes.len() > MERKLE_PROOF_DEPTH {
            return Err(SpvError::MalformedProof(format!(
                "depth {} exceeds capacity {}",
                nodes.len(),
                MERKLE_PROOF_DEPTH
            )));
        }
        let mut proof = Self::default();
        proof.0[..nodes.len()].copy_from_slice(nodes);
        Ok(proof)
    }

    /// Number of non-padding entries.
    pub fn depth(&self) -> usize {
        self.real_nodes().count()
    }

    fn real_nodes(&self) -> impl Iterator<Item = &MerkleProofNode> {
        self.0.iter().filter(|node| node.is_real())
    }

    /// Fold the path over `leaf` and return the implied root.
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        self.0.iter().fold(*leaf, |root, node| match node.position {
            NodePosition::Invalid => root,
            NodePosition::Left => hash_pair(&node.hash, &root),
            NodePosition::Right => hash_pair(&root, &node.hash),
        })
    }

    /// Position of the leaf in its block. The deepest real entry is the least
    /// significant bit; a left sibling means the leaf side is a right child (bit 1).
    pub fn leaf_index(&self) -> u64 {
        self.real_nodes()
            .enumerate()
            .filter(|(_, node)| node.position == NodePosition::Left)
            .fold(0u64, |index, (level, _)| index | (1u64 << level))
    }

    /// Whether the leaf is the first transaction of the block (the coinbase).
    pub fn is_first_leaf(&self) -> bool {
        self.leaf_index() == 0
    }

    /// Whether `leaf` is the last transaction of the block committed to by
    /// `header`.
    ///
    /// The last leaf never has a genuine right sibling; a right sibling equal to
    /// the running root is the duplicate Bitcoin inserts on odd-length levels.
    pub fn is_last_leaf(&self, leaf: &[u8; 32], header: &BlockHeader) -> bool {
        let mut root = *leaf;
        let mut last = true;
        for node in self.real_nodes() {
            if node.position == NodePosition::Right && node.hash != root {
                last = false;
            }
            root = match node.position {
                NodePosition::Left => hash_pair(&node.hash, &root),
                _ => hash_pair(&root, &node.hash),
            };
        }
        last && root == header.merkle_root
    }

    /// Wire form: every slot as `hash || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MERKLE_PROOF_DEPTH * NODE_WIRE_SIZE);
        for node in &self.0 {
            out.extend_from_slice(&node.hash);
            out.push(node.position as u8);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        if bytes.len() != MERKLE_PROOF_DEPTH * NODE_WIRE_SIZE {
            return Err(SpvError::MalformedProof(format!(
                "expected {} bytes, got {}",
                MERKLE_PROOF_DEPTH * NODE_WIRE_SIZE,
                bytes.len()
            )));
        }
        let mut proof = Self::default();
        for (slot, chunk) in proof.0.iter_mut().zip(bytes.chunks_exact(NODE_WIRE_SIZE)) {
            slot.hash.copy_from_slice(&chunk[..32]);
            slot.position = NodePosition::try_from(chunk[32])?;
        }
        Ok(proof)
    }

    /// Build the path for `txids[index]` from the block's ordered txids.
    pub fn build(txids: &[[u8; 32]], index: usize) -> Result<Self, SpvError> {
        if index >= txids.len() {
            return Err(SpvError::MalformedProof(format!(
                "transaction index {} out of bounds for {} transactions",
                index,
                txids.len()
            )));
        }

        let mut nodes = Vec::new();
        let mut layer = txids.to_vec();
        let mut current = index;

        while layer.len() > 1 {
            let node = if current % 2 == 1 {
                MerkleProofNode::left(layer[current - 1])
            } else {
                // Odd-length layer: the last node is paired with itself
                MerkleProofNode::right(layer[(current + 1).min(layer.len() - 1)])
            };
            nodes.push(node);

            layer = layer
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            current /= 2;
        }

        Self::from_nodes(&nodes)
    }
}

/// Root of a block's transaction tree from its ordered txids.
pub fn merkle_root(txids: &[[u8; 32]]) -> Option<[u8; 32]> {
    let mut layer = txids.to_vec();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    layer.first().copied()
}

/// Check that `txid` is committed to by `header` through `proof`.
pub fn verify_inclusion(
    txid: &[u8; 32],
    header: &BlockHeader,
    proof: &MerkleProof,
) -> Result<(), SpvError> {
    let root = proof.compute_root(txid);
    debug!(
        "Recomputed Merkle root {} over {} levels",
        hex::encode(root),
        proof.depth()
    );
    if root != header.merkle_root {
        return Err(SpvError::InvalidMerkleProof);
    }
    Ok(())
}

impl Serialize for MerkleProof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for MerkleProof {
    /// Accepts up to [`MERKLE_PROOF_DEPTH`] nodes and pads the remainder.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nodes = Vec::<MerkleProofNode>::deserialize(deserializer)?;
        MerkleProof::from_nodes(&nodes).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txids(n: u8) -> Vec<[u8; 32]> {
        (0..n).map(|i| [i.wrapping_mul(37).wrapping_add(1); 32]).collect()
    }

    fn header_with_root(merkle_root: [u8; 32]) -> BlockHeader {
        BlockHeader {
            version: [0, 0, 0, 0x20],
            prev_block_hash: [0; 32],
            merkle_root,
            time: 0,
            bits: crate::target::CompactBits::from_consensus(crate::target::REGTEST_BITS),
            nonce: 0,
        }
    }

    #[test]
    fn test_every_leaf_proves_against_root() {
        for n in 1..=9u8 {
            let ids = txids(n);
            let root = merkle_root(&ids).unwrap();
            let header = header_with_root(root);
            for (index, txid) in ids.iter().enumerate() {
                let proof = MerkleProof::build(&ids, index).unwrap();
                assert_eq!(proof.compute_root(txid), root, "n={n} index={index}");
                assert_eq!(proof.leaf_index(), index as u64);
                assert_eq!(proof.is_first_leaf(), index == 0);
                assert_eq!(proof.is_last_leaf(txid, &header), index == ids.len() - 1);
            }
        }
    }

    #[test]
    fn test_compute_root_is_deterministic() {
        let ids = txids(6);
        let proof = MerkleProof::build(&ids, 3).unwrap();
        assert_eq!(proof.compute_root(&ids[3]), proof.compute_root(&ids[3]));
    }

    #[test]
    fn test_flipping_a_position_tag_changes_root() {
        let ids = txids(8);
        let proof = MerkleProof::build(&ids, 5).unwrap();
        let root = proof.compute_root(&ids[5]);
        for level in 0..proof.depth() {
            let mut flipped = proof;
            flipped.0[level].position = match flipped.0[level].position {
                NodePosition::Left => NodePosition::Right,
                _ => NodePosition::Left,
            };
            assert_ne!(flipped.compute_root(&ids[5]), root, "level={level}");
        }
    }

    #[test]
    fn test_swapping_two_real_entries_changes_root() {
        let ids = txids(8);
        let proof = MerkleProof::build(&ids, 2).unwrap();
        let root = proof.compute_root(&ids[2]);
        let mut swapped = proof;
        swapped.0.swap(0, 2);
        assert_ne!(swapped.compute_root(&ids[2]), root);
    }

    #[test]
    fn test_padding_is_skipped() {
        let leaf = [0x42; 32];
        let mut proof = MerkleProof::from_nodes(&[MerkleProofNode::right([0x01; 32])]).unwrap();
        let root = proof.compute_root(&leaf);
        proof.0[5].hash = [0xff; 32];
        assert_eq!(proof.compute_root(&leaf), root);
        assert_eq!(root, hash_pair(&leaf, &[0x01; 32]));
    }

    #[test]
    fn test_single_transaction_block() {
        let ids = txids(1);
        let proof = MerkleProof::build(&ids, 0).unwrap();
        assert_eq!(proof.depth(), 0);
        assert_eq!(proof.compute_root(&ids[0]), ids[0]);
        assert!(proof.is_first_leaf());
    }

    #[test]
    fn test_left_entries_set_index_bits() {
        let proof = MerkleProof::from_nodes(&[
            MerkleProofNode::left([1; 32]),
            MerkleProofNode::right([2; 32]),
            MerkleProofNode::left([3; 32]),
        ])
        .unwrap();
        assert_eq!(proof.leaf_index(), 0b101);
        assert!(!proof.is_first_leaf());
    }

    #[test]
    fn test_wire_round_trip_and_bad_tag() {
        let ids = txids(5);
        let proof = MerkleProof::build(&ids, 4).unwrap();
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), MERKLE_PROOF_DEPTH * NODE_WIRE_SIZE);
        assert_eq!(MerkleProof::from_bytes(&bytes).unwrap(), proof);

        let mut bad = bytes.clone();
        bad[32] = 3;
        assert!(matches!(
            MerkleProof::from_bytes(&bad),
            Err(SpvError::MalformedProof(_))
        ));
        assert!(MerkleProof::from_bytes(&bytes[1..]).is_err());
    }

    #[test]
    fn test_too_deep_rejected() {
        let nodes = vec![MerkleProofNode::right([0; 32]); MERKLE_PROOF_DEPTH + 1];
        assert!(MerkleProof::from_nodes(&nodes).is_err());
    }

    #[test]
    fn test_last_leaf_requires_matching_header() {
        // A path of duplicated siblings looks like the last leaf of any block
        let leaf = [0x42; 32];
        let level1 = hash_pair(&leaf, &leaf);
        let proof = MerkleProof::from_nodes(&[
            MerkleProofNode::right(leaf),
            MerkleProofNode::right(level1),
        ])
        .unwrap();
        let root = proof.compute_root(&leaf);
        assert!(proof.is_last_leaf(&leaf, &header_with_root(root)));

        let ids = txids(5);
        let other = header_with_root(merkle_root(&ids).unwrap());
        assert!(!proof.is_last_leaf(&leaf, &other));
    }

    #[test]
    fn test_verify_inclusion_against_header() {
        let ids = txids(4);
        let header = header_with_root(merkle_root(&ids).unwrap());
        let proof = MerkleProof::build(&ids, 1).unwrap();
        assert_eq!(verify_inclusion(&ids[1], &header, &proof), Ok(()));
        assert_eq!(
            verify_inclusion(&ids[2], &header, &proof),
            Err(SpvError::InvalidMerkleProof)
        );
    }
}
