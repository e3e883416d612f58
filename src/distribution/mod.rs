//! Airdrop Distributions
//!
//! One immutable (recipient set, root) pairing per epoch.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DISTRIBUTION                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  eligibility.rs - CSV recipient source                       │
//! │  mod.rs         - Validation, canonical order, build         │
//! │  claims.rs      - Per-recipient claims, JSON export          │
//! │  manifest.rs    - Byte-exact versioned manifest              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recipients are sorted by identity before their leaves are encoded, so a
//! recipient set has exactly one root no matter what order it arrived in.

pub mod claims;
pub mod eligibility;
pub mod manifest;

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::core::encoding::EncodingError;
use crate::core::hash::{Digest, HashAlgorithm};
use crate::core::recipient::{encode_leaf, Identity, Recipient};
use crate::tree::{verify_with, MerkleError, MerkleTree, Proof, TreeBuilder};

pub use claims::{Claim, ClaimsExport};
pub use eligibility::{read_recipients, read_recipients_from_path, EligibilityError};
pub use manifest::{deserialize, serialize, ManifestError, MANIFEST_VERSION};

/// Errors raised while building or querying a distribution.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// A single record failed validation.
    #[error("recipient {index}: {source}")]
    InvalidRecipient {
        /// Position in the input.
        index: usize,
        /// Cause.
        #[source]
        source: EncodingError,
    },

    /// Two records share an identity.
    #[error("duplicate recipient {identity} at input positions {first} and {second}")]
    DuplicateRecipient {
        /// Repeated identity.
        identity: Identity,
        /// First input position.
        first: usize,
        /// Repeat input position.
        second: usize,
    },

    /// Tree construction or proof extraction failed.
    #[error(transparent)]
    Tree(#[from] MerkleError),

    /// Manifest encoding or decoding failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Recipient source could not be read.
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    /// Identity is not part of the distribution.
    #[error("recipient {0} is not in this distribution")]
    UnknownRecipient(Identity),

    /// Proof list does not line up with the recipients.
    #[error("expected {expected} proofs, got {got}")]
    ProofCountMismatch {
        /// Recipients in the distribution.
        expected: usize,
        /// Proofs supplied.
        got: usize,
    },

    /// The tree was not built from this distribution.
    #[error("tree (root {root}, {leaves} leaves) does not belong to this distribution")]
    TreeMismatch {
        /// Root of the supplied tree.
        root: Digest,
        /// Leaves in the supplied tree.
        leaves: usize,
    },

    /// A stored proof no longer verifies against the root.
    #[error("proof for recipient {identity} (index {index}) does not verify")]
    ProofMismatch {
        /// Leaf index.
        index: usize,
        /// Recipient identity.
        identity: Identity,
    },
}

/// Immutable recipient set committed to by a root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    root: Digest,
    algorithm: HashAlgorithm,
    recipients: Vec<Recipient>,
    leaf_index: BTreeMap<Identity, usize>,
}

impl Distribution {
    /// Validate, order and commit to `recipients`.
    ///
    /// Returns the distribution and the tree it was built from; the tree is
    /// what proofs are extracted from.
    pub fn build(
        recipients: Vec<Recipient>,
        config: &BuildConfig,
    ) -> Result<(Self, MerkleTree), DistributionError> {
        Self::build_with(recipients, &TreeBuilder::from_config(config))
    }

    /// Like [`Distribution::build`] with an explicit builder (e.g. one
    /// carrying a cancellation token).
    pub fn build_with(
        recipients: Vec<Recipient>,
        builder: &TreeBuilder<HashAlgorithm>,
    ) -> Result<(Self, MerkleTree), DistributionError> {
        let recipients = canonical_order(recipients)?;
        let algorithm = *builder.hasher();

        let leaves: Vec<Digest> = recipients
            .iter()
            .map(|r| encode_leaf(&algorithm, r))
            .collect();
        let tree = builder.build(leaves)?;

        let leaf_index = index_by_identity(&recipients);
        let distribution = Self {
            root: tree.root(),
            algorithm,
            recipients,
            leaf_index,
        };
        info!(
            recipients = distribution.len(),
            root = %distribution.root,
            hash = %algorithm,
            "distribution built"
        );
        Ok((distribution, tree))
    }

    /// Reassemble from already-ordered parts (manifest decoding).
    ///
    /// `recipients` must be strictly ascending by identity.
    pub(crate) fn from_parts(
        root: Digest,
        algorithm: HashAlgorithm,
        recipients: Vec<Recipient>,
    ) -> Self {
        let leaf_index = index_by_identity(&recipients);
        Self {
            root,
            algorithm,
            recipients,
            leaf_index,
        }
    }

    /// The published commitment.
    pub fn root(&self) -> Digest {
        self.root
    }

    /// Hash family of the tree.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Recipients in leaf order.
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    /// Always false for a built distribution.
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Leaf index of `identity`.
    pub fn index_of(&self, identity: &Identity) -> Option<usize> {
        self.leaf_index.get(identity).copied()
    }

    /// Re-derive the leaf for the recipient at `index`.
    pub fn leaf(&self, index: usize) -> Option<Digest> {
        self.recipients
            .get(index)
            .map(|r| encode_leaf(&self.algorithm, r))
    }

    /// Extract a proof for every recipient, in leaf order.
    pub fn proofs(&self, tree: &MerkleTree) -> Result<Vec<Proof>, DistributionError> {
        if tree.root() != self.root || tree.leaf_count() != self.len() {
            return Err(DistributionError::TreeMismatch {
                root: tree.root(),
                leaves: tree.leaf_count(),
            });
        }
        (0..self.len())
            .map(|i| tree.prove(i).map_err(DistributionError::from))
            .collect()
    }

    /// The claim for `identity`, using proofs in leaf order.
    pub fn claim(&self, identity: &Identity, proofs: &[Proof]) -> Result<Claim, DistributionError> {
        self.check_proof_count(proofs)?;
        let index = self
            .index_of(identity)
            .ok_or(DistributionError::UnknownRecipient(*identity))?;
        Ok(Claim::new(
            self.recipients[index],
            index,
            encode_leaf(&self.algorithm, &self.recipients[index]),
            &proofs[index],
        ))
    }

    /// Check a claim against this distribution's root, the way a verifier
    /// host would: re-derive the leaf from the recipient data, then fold.
    pub fn verify_claim(&self, claim: &Claim) -> bool {
        let leaf = encode_leaf(&self.algorithm, &claim.recipient);
        verify_with(&self.algorithm, &leaf, &claim.to_proof(), &self.root)
    }

    /// Re-check the lifetime invariant: every recipient's proof verifies.
    pub fn verify_all(&self, proofs: &[Proof]) -> Result<(), DistributionError> {
        self.check_proof_count(proofs)?;
        for (index, (recipient, proof)) in self.recipients.iter().zip(proofs).enumerate() {
            let leaf = encode_leaf(&self.algorithm, recipient);
            if !verify_with(&self.algorithm, &leaf, proof, &self.root) {
                warn!(index, identity = %recipient.identity, "stored proof does not verify");
                return Err(DistributionError::ProofMismatch {
                    index,
                    identity: recipient.identity,
                });
            }
        }
        Ok(())
    }

    fn check_proof_count(&self, proofs: &[Proof]) -> Result<(), DistributionError> {
        if proofs.len() != self.len() {
            return Err(DistributionError::ProofCountMismatch {
                expected: self.len(),
                got: proofs.len(),
            });
        }
        Ok(())
    }
}

/// Reject zero identities and duplicates, then sort by identity.
fn canonical_order(recipients: Vec<Recipient>) -> Result<Vec<Recipient>, DistributionError> {
    if let Some(index) = recipients.iter().position(|r| r.identity.is_zero()) {
        return Err(DistributionError::InvalidRecipient {
            index,
            source: EncodingError::ZeroIdentity,
        });
    }

    let mut indexed: Vec<(usize, Recipient)> = recipients.into_iter().enumerate().collect();
    indexed.sort_by_key(|(_, r)| r.identity);

    for pair in indexed.windows(2) {
        let ((a_pos, a), (b_pos, b)) = (&pair[0], &pair[1]);
        if a.identity == b.identity {
            return Err(DistributionError::DuplicateRecipient {
                identity: a.identity,
                first: (*a_pos).min(*b_pos),
                second: (*a_pos).max(*b_pos),
            });
        }
    }

    Ok(indexed.into_iter().map(|(_, r)| r).collect())
}

fn index_by_identity(recipients: &[Recipient]) -> BTreeMap<Identity, usize> {
    recipients
        .iter()
        .enumerate()
        .map(|(i, r)| (r.identity, i))
        .collect()
}
