//! Core deterministic primitives.
//!
//! Everything here is a pure function of its inputs, so a verifier host that
//! re-implements it produces bit-identical digests.

pub mod encoding;
pub mod hash;
pub mod recipient;

pub use encoding::{EncodingError, FieldSpec, LeafSchema};
pub use hash::{
    Digest, HashAlgorithm, Keccak256Hasher, MerkleHasher, Sha256Hasher, LEAF_DOMAIN_TAG,
    NODE_DOMAIN_TAG,
};
pub use recipient::{encode_leaf, encode_record, Entitlement, Identity, Recipient};
