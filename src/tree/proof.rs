//! Proof Extraction
//!
//! Walks from a leaf to the root collecting one sibling per level. Levels
//! where the path node was promoted (no right neighbour) contribute nothing.

use serde::{Deserialize, Serialize};

use super::MerkleError;
use crate::core::hash::{Digest, DIGEST_LEN};

/// Which side of the path node the sibling occupied when the tree was built.
///
/// Informational only: pairs are sorted before hashing, so verification
/// never looks at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling was the left child.
    Left,
    /// Sibling was the right child.
    Right,
}

impl Side {
    /// Wire byte: 0x00 = left, 0x01 = right.
    pub fn to_byte(self) -> u8 {
        match self {
            Side::Left => 0x00,
            Side::Right => 0x01,
        }
    }

    /// Inverse of [`Side::to_byte`].
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Side::Left),
            0x01 => Some(Side::Right),
            _ => None,
        }
    }
}

/// One step of a proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofEntry {
    /// Sibling digest at this level.
    pub sibling: Digest,
    /// Sibling position at construction time.
    pub side: Side,
}

/// Merkle inclusion proof, ordered from leaf to root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proof {
    /// Index of the leaf this proof is for.
    pub leaf_index: usize,
    /// Sibling entries, leaf level first.
    pub entries: Vec<ProofEntry>,
}

impl Proof {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sibling digests without side information.
    pub fn siblings(&self) -> impl Iterator<Item = &Digest> + '_ {
        self.entries.iter().map(|e| &e.sibling)
    }

    /// Encoded size in bytes (count byte + 33 per entry).
    pub fn size(&self) -> usize {
        1 + self.entries.len() * (DIGEST_LEN + 1)
    }
}

/// Extract the proof for `leaf_index` from retained levels.
pub fn prove_leaf(levels: &[Vec<Digest>], leaf_index: usize) -> Result<Proof, MerkleError> {
    let leaf_count = levels.first().map_or(0, Vec::len);
    if leaf_index >= leaf_count {
        return Err(MerkleError::IndexOutOfRange {
            index: leaf_index,
            leaf_count,
        });
    }

    let mut entries = Vec::with_capacity(levels.len().saturating_sub(1));
    let mut index = leaf_index;

    // The root level has no sibling.
    for (depth, level) in levels[..levels.len() - 1].iter().enumerate() {
        if index >= level.len() {
            return Err(MerkleError::MalformedLevel {
                level: depth,
                index,
                len: level.len(),
            });
        }

        let sibling = if index % 2 == 1 {
            level.get(index - 1).map(|d| (*d, Side::Left))
        } else {
            level.get(index + 1).map(|d| (*d, Side::Right))
        };

        if let Some((sibling, side)) = sibling {
            entries.push(ProofEntry { sibling, side });
        }

        index /= 2;
    }

    Ok(Proof {
        leaf_index,
        entries,
    })
}
