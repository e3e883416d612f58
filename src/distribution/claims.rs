//! Claim Export
//!
//! Everything a recipient needs to claim, in one JSON document:
//! their record, leaf index, leaf digest and sibling path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Distribution, DistributionError};
use crate::core::hash::{Digest, HashAlgorithm};
use crate::core::recipient::{encode_leaf, Recipient};
use crate::tree::{Proof, ProofEntry};

/// One recipient's claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Recipient record (`address`, `amount`).
    #[serde(flatten)]
    pub recipient: Recipient,
    /// Leaf index in the tree.
    pub index: usize,
    /// Leaf digest.
    pub leaf: Digest,
    /// Sibling path, leaf level first.
    pub proof: Vec<ProofEntry>,
}

impl Claim {
    /// Assemble a claim from its parts.
    pub fn new(recipient: Recipient, index: usize, leaf: Digest, proof: &Proof) -> Self {
        Self {
            recipient,
            index,
            leaf,
            proof: proof.entries.clone(),
        }
    }

    /// The proof this claim carries.
    pub fn to_proof(&self) -> Proof {
        Proof {
            leaf_index: self.index,
            entries: self.proof.clone(),
        }
    }
}

/// Claims for a whole distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsExport {
    /// Published root.
    pub root: Digest,
    /// Hash family.
    pub hash: HashAlgorithm,
    /// Number of claims.
    pub recipient_count: usize,
    /// Export time.
    pub generated_at: DateTime<Utc>,
    /// Claims in leaf order.
    pub claims: Vec<Claim>,
}

impl ClaimsExport {
    /// Build the export from a distribution and its proofs (leaf order).
    pub fn new(distribution: &Distribution, proofs: &[Proof]) -> Result<Self, DistributionError> {
        if proofs.len() != distribution.len() {
            return Err(DistributionError::ProofCountMismatch {
                expected: distribution.len(),
                got: proofs.len(),
            });
        }

        let claims = distribution
            .recipients()
            .iter()
            .zip(proofs)
            .enumerate()
            .map(|(index, (recipient, proof))| {
                let leaf = encode_leaf(&distribution.algorithm(), recipient);
                Claim::new(*recipient, index, leaf, proof)
            })
            .collect();

        Ok(Self {
            root: distribution.root(),
            hash: distribution.algorithm(),
            recipient_count: distribution.len(),
            generated_at: Utc::now(),
            claims,
        })
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a JSON export.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Claim for the leaf at `index`.
    pub fn get(&self, index: usize) -> Option<&Claim> {
        self.claims.get(index)
    }
}
