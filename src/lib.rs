//! # Airdrop Merkle
//!
//! Eligibility engine for token airdrops: commits a recipient list to a
//! single Merkle root and issues compact inclusion proofs that any verifier
//! host can check against that root.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AIRDROP MERKLE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── hash.rs     - Digests, domain-separated hashers        │
//! │  ├── encoding.rs - Fixed-width leaf schemas                 │
//! │  └── recipient.rs- Identity, entitlement, leaf encoding     │
//! │                                                             │
//! │  tree/           - Merkle tree                              │
//! │  ├── builder.rs  - Level-by-level construction              │
//! │  ├── proof.rs    - Proof extraction                         │
//! │  ├── verify.rs   - Stateless verification                   │
//! │  └── snapshot.rs - Level cache persistence                  │
//! │                                                             │
//! │  distribution/   - Epoch distributions                      │
//! │  ├── eligibility.rs - CSV recipient source                  │
//! │  ├── claims.rs   - Claim lookup and JSON export             │
//! │  └── manifest.rs - Versioned binary manifest                │
//! │                                                             │
//! │  config.rs       - Build configuration                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The root is a pure function of the recipient set and the hash family:
//! - Recipients are sorted by identity before leaves are encoded
//! - Leaves and internal nodes use distinct domain tags
//! - Pairs are sorted before hashing, so proofs carry no direction bits
//! - An odd node is promoted, never duplicated
//!
//! Parallel and sequential builds produce identical trees.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod distribution;
pub mod tree;

// Re-export commonly used types
pub use crate::config::BuildConfig;
pub use crate::core::hash::{Digest, HashAlgorithm, Keccak256Hasher, MerkleHasher, Sha256Hasher};
pub use crate::core::recipient::{encode_leaf, Entitlement, Identity, Recipient};
pub use crate::distribution::{Claim, ClaimsExport, Distribution, DistributionError};
pub use crate::tree::{verify, verify_with, MerkleError, MerkleTree, Proof, TreeBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
