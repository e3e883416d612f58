//! Proof Verification
//!
//! Stateless: needs only the leaf, the proof and the claimed root. A verifier
//! host (contract or service) re-implementing this fold must reach the same
//! digest bit for bit.

use super::proof::Proof;
use crate::core::hash::{Digest, MerkleHasher, Sha256Hasher};

/// Verify with SHA-256.
///
/// A mismatch is a normal `false`, never an error.
pub fn verify(leaf: &Digest, proof: &Proof, expected_root: &Digest) -> bool {
    verify_with(&Sha256Hasher, leaf, proof, expected_root)
}

/// Verify with an explicit hasher.
///
/// Folds `current = H(0x01 ‖ min(current, sibling) ‖ max(current, sibling))`
/// over the entries; recorded sides are ignored.
pub fn verify_with<H: MerkleHasher + ?Sized>(
    hasher: &H,
    leaf: &Digest,
    proof: &Proof,
    expected_root: &Digest,
) -> bool {
    let computed = proof
        .siblings()
        .fold(*leaf, |current, sibling| hasher.hash_pair(&current, sibling));
    computed == *expected_root
}
