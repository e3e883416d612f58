//! Digests and Domain-Separated Hashing
//!
//! Every node in a distribution tree is a 32-byte [`Digest`]. Leaves and
//! internal nodes are hashed under different single-byte domain tags so an
//! internal node can never be replayed as a leaf.
//!
//! Two hash families are supported:
//! - SHA-256 (default)
//! - Keccak-256 (for EVM-native verifier hosts)

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use sha3::Keccak256;
use std::fmt;
use std::str::FromStr;

/// Digest width in bytes.
pub const DIGEST_LEN: usize = 32;

/// Domain tag prefixed to every leaf payload.
pub const LEAF_DOMAIN_TAG: u8 = 0x00;

/// Domain tag prefixed to every internal node.
pub const NODE_DOMAIN_TAG: u8 = 0x01;

/// Fixed-width 32-byte digest.
///
/// Ordering is byte-lexicographic, which is the order used when sorting a
/// sibling pair before combining it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// The all-zero digest.
    pub const ZERO: Digest = Digest([0u8; DIGEST_LEN]);

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
impl Digest {
    /// Copy with a single bit flipped.
    pub(crate) fn with_bit_flipped(&self, bit: usize) -> Self {
        let mut bytes = self.0;
        bytes[(bit / 8) % DIGEST_LEN] ^= 1 << (bit % 8);
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error parsing a hex digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDigestError {
    /// Wrong number of hex characters.
    #[error("expected 64 hex chars, got {0}")]
    Length(usize),
    /// Not valid hex.
    #[error("invalid hex: {0}")]
    Hex(String),
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if cleaned.len() != DIGEST_LEN * 2 {
            return Err(ParseDigestError::Length(cleaned.len()));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(cleaned, &mut bytes)
            .map_err(|e| ParseDigestError::Hex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

// Hex strings for human-readable formats (JSON), raw bytes for bincode.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            struct HexVisitor;

            impl Visitor<'_> for HexVisitor {
                type Value = Digest;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a 0x-prefixed 32-byte hex string")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Digest, E> {
                    v.parse().map_err(E::custom)
                }
            }

            deserializer.deserialize_str(HexVisitor)
        } else {
            <[u8; DIGEST_LEN]>::deserialize(deserializer).map(Digest)
        }
    }
}

/// Selectable hash family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// Keccak-256 (pre-standard SHA-3 padding, as used by the EVM).
    Keccak256,
}

impl HashAlgorithm {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Keccak256 => "keccak256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "keccak256" | "keccak-256" | "keccak" => Ok(Self::Keccak256),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

/// Hash abstraction shared by the builder and the verifier.
///
/// Implementations must be pure: identical inputs give identical digests on
/// every platform, which is what lets an independent verifier reproduce the
/// builder's root bit for bit.
pub trait MerkleHasher: Send + Sync {
    /// Hash a domain tag followed by the given parts.
    fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest;

    /// The family this hasher implements.
    fn algorithm(&self) -> HashAlgorithm;

    /// Hash an encoded leaf payload under the leaf tag.
    #[inline]
    fn hash_leaf(&self, payload: &[u8]) -> Digest {
        self.hash_tagged(LEAF_DOMAIN_TAG, &[payload])
    }

    /// Combine two siblings. The pair is sorted first, so the result does
    /// not depend on which side each child sits on.
    #[inline]
    fn hash_pair(&self, a: &Digest, b: &Digest) -> Digest {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.hash_tagged(NODE_DOMAIN_TAG, &[lo.as_bytes(), hi.as_bytes()])
    }
}

/// SHA-256 hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update([tag]);
        for part in parts {
            hasher.update(part);
        }
        Digest(hasher.finalize().into())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Keccak-256 hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct Keccak256Hasher;

impl MerkleHasher for Keccak256Hasher {
    fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest {
        let mut hasher = Keccak256::new();
        hasher.update([tag]);
        for part in parts {
            hasher.update(part);
        }
        Digest(hasher.finalize().into())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Keccak256
    }
}

impl MerkleHasher for HashAlgorithm {
    fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest {
        match self {
            Self::Sha256 => Sha256Hasher.hash_tagged(tag, parts),
            Self::Keccak256 => Keccak256Hasher.hash_tagged(tag, parts),
        }
    }

    fn algorithm(&self) -> HashAlgorithm {
        *self
    }
}

/// Plain SHA-256 of arbitrary bytes, no domain tag. Used for checksums.
pub fn sha256(data: &[u8]) -> Digest {
    Digest(Sha256::digest(data).into())
}
