//! Level Cache Snapshot
//!
//! Persists a built tree's levels (bincode) so proofs can be extracted later
//! without the recipient list. Loading re-derives every parent, so a
//! tampered or truncated snapshot is rejected rather than trusted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::{reject_duplicates, MerkleTree};
use super::MerkleError;
use crate::core::hash::{Digest, HashAlgorithm, MerkleHasher};

/// Current snapshot version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Serializable copy of a tree's levels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Format version.
    pub version: u8,
    /// Hash family used to build the tree.
    pub algorithm: HashAlgorithm,
    /// Levels, leaves first.
    pub levels: Vec<Vec<Digest>>,
}

impl TreeSnapshot {
    /// Capture a built tree.
    pub fn from_tree(tree: &MerkleTree) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            algorithm: tree.algorithm(),
            levels: tree.levels().to_vec(),
        }
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary and validate into a tree.
    pub fn from_bytes(data: &[u8]) -> Result<MerkleTree, MerkleError> {
        let snapshot: TreeSnapshot =
            bincode::deserialize(data).map_err(|e| MerkleError::InvalidSnapshot {
                reason: e.to_string(),
            })?;
        snapshot.into_tree()
    }

    /// Validate shape, reject duplicate leaves and recompute every parent.
    pub fn into_tree(self) -> Result<MerkleTree, MerkleError> {
        let invalid = |reason: String| MerkleError::InvalidSnapshot { reason };

        if self.version != SNAPSHOT_VERSION {
            return Err(invalid(format!("unsupported version {}", self.version)));
        }
        match self.levels.last() {
            Some(top) if top.len() == 1 => {}
            Some(top) => return Err(invalid(format!("top level has {} nodes", top.len()))),
            None => return Err(invalid("no levels".to_string())),
        }
        reject_duplicates(&self.levels[0])?;

        for (k, pair) in self.levels.windows(2).enumerate() {
            let (below, above) = (&pair[0], &pair[1]);
            if above.len() != below.len().div_ceil(2) || below.len() < 2 {
                return Err(invalid(format!(
                    "level {} has {} nodes, expected {}",
                    k + 1,
                    above.len(),
                    below.len().div_ceil(2)
                )));
            }
            for (i, parent) in above.iter().enumerate() {
                let expected = match &below[2 * i..(2 * i + 2).min(below.len())] {
                    [a, b] => self.algorithm.hash_pair(a, b),
                    [single] => *single,
                    _ => {
                        return Err(invalid(format!("level {} node {} has no children", k + 1, i)))
                    }
                };
                if expected != *parent {
                    return Err(invalid(format!(
                        "level {} node {} does not match its children",
                        k + 1,
                        i
                    )));
                }
            }
        }

        debug!(levels = self.levels.len(), "loaded tree snapshot");
        Ok(MerkleTree::from_levels(self.levels, self.algorithm))
    }
}
