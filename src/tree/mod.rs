//! Distribution Merkle Tree
//!
//! Binary hash tree stored as an arena of levels.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      DISTRIBUTION TREE                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  builder.rs  - Bottom-up construction, odd-node promotion    │
//! │  proof.rs    - Sibling path extraction                       │
//! │  verify.rs   - Stateless root recomputation                  │
//! │  snapshot.rs - Persisted level cache                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Level 0 holds the leaves, each following level holds `ceil(n / 2)`
//! nodes, and the last level holds the root alone. A parent is
//! `H(0x01 ‖ min(a, b) ‖ max(a, b))`; an unpaired last node is carried to the
//! next level as-is.

pub mod builder;
pub mod proof;
pub mod snapshot;
pub mod verify;

use thiserror::Error;

use crate::core::hash::Digest;

pub use builder::{build, CancelToken, MerkleTree, TreeBuilder};
pub use proof::{prove_leaf, Proof, ProofEntry, Side};
pub use snapshot::TreeSnapshot;
pub use verify::{verify, verify_with};

/// Errors raised by tree construction and proof extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// No leaves supplied.
    #[error("no leaves supplied")]
    EmptyInput,

    /// Two leaves are bit-identical.
    #[error("duplicate leaf {leaf} at indices {first} and {second}")]
    DuplicateLeaf {
        /// The repeated digest.
        leaf: Digest,
        /// Index of its first occurrence.
        first: usize,
        /// Index of the repeat.
        second: usize,
    },

    /// Requested leaf does not exist.
    #[error("leaf index {index} out of range for tree with {leaf_count} leaves")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Leaves in the tree.
        leaf_count: usize,
    },

    /// Construction was cancelled before the root was computed.
    #[error("tree construction cancelled at level {level}")]
    Cancelled {
        /// Level that was about to be hashed.
        level: usize,
    },

    /// Retained levels are too short for the requested path.
    #[error("level {level} has {len} nodes, path needs index {index}")]
    MalformedLevel {
        /// Level where the path left the tree.
        level: usize,
        /// Path index at that level.
        index: usize,
        /// Nodes in that level.
        len: usize,
    },

    /// A persisted level cache failed validation.
    #[error("invalid tree snapshot: {reason}")]
    InvalidSnapshot {
        /// What failed.
        reason: String,
    },
}
