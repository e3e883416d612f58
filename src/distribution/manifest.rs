//! Distribution Manifest
//!
//! Byte-exact, versioned archive of a distribution and all of its proofs.
//!
//! ```text
//! [version:1][count:4 BE][root:32]
//! [recipients: count × (identity:20 ‖ entitlement:32)]
//! [proofs: count × ([n:1] n × (sibling:32 ‖ side:1))]
//! [checksum:32 = SHA-256 of everything above]
//! ```
//!
//! The hash family is not recorded; the reader supplies it.

use thiserror::Error;
use tracing::{debug, info};

use super::Distribution;
use crate::core::hash::{sha256, Digest, HashAlgorithm, DIGEST_LEN};
use crate::core::recipient::{Recipient, RECIPIENT_LEN};
use crate::tree::{Proof, ProofEntry, Side};

/// Current manifest version.
pub const MANIFEST_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + 4 + DIGEST_LEN;
const ENTRY_LEN: usize = DIGEST_LEN + 1;

/// Errors raised while writing or reading a manifest.
///
/// Every read-side variant means the manifest is corrupt; nothing is
/// recovered from a corrupt manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Input ended inside a field.
    #[error("corrupt manifest: unexpected end of input reading {field} at offset {offset}")]
    UnexpectedEnd {
        /// Field being read.
        field: &'static str,
        /// Byte offset of the field.
        offset: usize,
    },

    /// Unknown version byte.
    #[error("corrupt manifest: unsupported version {0}")]
    UnsupportedVersion(u8),

    /// Stored checksum does not match the content.
    #[error("corrupt manifest: checksum mismatch (stored {stored}, computed {computed})")]
    ChecksumMismatch {
        /// Checksum found in the manifest.
        stored: Digest,
        /// Checksum of the content.
        computed: Digest,
    },

    /// Side byte other than 0x00 or 0x01.
    #[error("corrupt manifest: invalid side byte {byte:#04x} at offset {offset}")]
    InvalidSide {
        /// Offending byte.
        byte: u8,
        /// Its offset.
        offset: usize,
    },

    /// Bytes after the checksum.
    #[error("corrupt manifest: {0} trailing bytes after checksum")]
    TrailingBytes(usize),

    /// Recipient count of zero.
    #[error("corrupt manifest: no recipients")]
    Empty,

    /// Recipients not strictly ascending by identity, or a zero identity.
    #[error("corrupt manifest: recipient {index} is out of order or invalid")]
    InvalidRecipient {
        /// Leaf index.
        index: usize,
    },

    /// Too many recipients for the 4-byte count.
    #[error("cannot write manifest: {0} recipients exceeds the u32 count field")]
    TooManyRecipients(usize),

    /// A proof does not fit the 1-byte entry count.
    #[error("cannot write manifest: proof {index} has {len} entries (max 255)")]
    ProofTooLong {
        /// Leaf index.
        index: usize,
        /// Entries in the proof.
        len: usize,
    },

    /// Proof list does not line up with the recipients.
    #[error("cannot write manifest: expected {expected} proofs, got {got}")]
    ProofCountMismatch {
        /// Recipients.
        expected: usize,
        /// Proofs supplied.
        got: usize,
    },
}

/// Serialize a distribution and its proofs (leaf order).
pub fn serialize(distribution: &Distribution, proofs: &[Proof]) -> Result<Vec<u8>, ManifestError> {
    let count = distribution.len();
    if proofs.len() != count {
        return Err(ManifestError::ProofCountMismatch {
            expected: count,
            got: proofs.len(),
        });
    }
    let count_field = u32::try_from(count).map_err(|_| ManifestError::TooManyRecipients(count))?;

    let proof_bytes: usize = proofs.iter().map(|p| 1 + p.len() * ENTRY_LEN).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + count * RECIPIENT_LEN + proof_bytes + DIGEST_LEN);

    out.push(MANIFEST_VERSION);
    out.extend_from_slice(&count_field.to_be_bytes());
    out.extend_from_slice(distribution.root().as_bytes());

    for recipient in distribution.recipients() {
        out.extend_from_slice(&recipient.encode());
    }

    for (index, proof) in proofs.iter().enumerate() {
        let len = u8::try_from(proof.len())
            .map_err(|_| ManifestError::ProofTooLong { index, len: proof.len() })?;
        out.push(len);
        for entry in &proof.entries {
            out.extend_from_slice(entry.sibling.as_bytes());
            out.push(entry.side.to_byte());
        }
    }

    let checksum = sha256(&out);
    out.extend_from_slice(checksum.as_bytes());

    info!(
        recipients = count,
        bytes = out.len(),
        root = %distribution.root(),
        "manifest serialized"
    );
    Ok(out)
}

/// Deserialize a manifest written by [`serialize`].
///
/// `algorithm` must be the hash family the distribution was built with.
pub fn deserialize(
    bytes: &[u8],
    algorithm: HashAlgorithm,
) -> Result<(Distribution, Vec<Proof>), ManifestError> {
    let mut reader = ByteReader::new(bytes);

    let [version] = reader.read_array::<1>("version")?;
    if version != MANIFEST_VERSION {
        return Err(ManifestError::UnsupportedVersion(version));
    }
    let count = u32::from_be_bytes(reader.read_array("recipient count")?) as usize;
    if count == 0 {
        return Err(ManifestError::Empty);
    }
    let root = Digest(reader.read_array("root")?);

    let capacity = count.min(reader.remaining() / RECIPIENT_LEN);
    let mut recipients: Vec<Recipient> = Vec::with_capacity(capacity);
    for index in 0..count {
        let recipient = Recipient::decode(&reader.read_array("recipient")?);
        let ordered = recipients
            .last()
            .map_or(true, |prev| prev.identity < recipient.identity);
        if recipient.identity.is_zero() || !ordered {
            return Err(ManifestError::InvalidRecipient { index });
        }
        recipients.push(recipient);
    }

    let mut proofs = Vec::with_capacity(count);
    for leaf_index in 0..count {
        let [len] = reader.read_array::<1>("proof length")?;
        let mut entries = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let sibling = Digest(reader.read_array("proof sibling")?);
            let offset = reader.position();
            let [byte] = reader.read_array::<1>("proof side")?;
            let side = Side::from_byte(byte).ok_or(ManifestError::InvalidSide { byte, offset })?;
            entries.push(ProofEntry { sibling, side });
        }
        proofs.push(Proof { leaf_index, entries });
    }

    let body_len = reader.position();
    let stored = Digest(reader.read_array("checksum")?);
    if reader.remaining() != 0 {
        return Err(ManifestError::TrailingBytes(reader.remaining()));
    }
    let computed = sha256(&bytes[..body_len]);
    if stored != computed {
        return Err(ManifestError::ChecksumMismatch { stored, computed });
    }

    debug!(recipients = count, bytes = bytes.len(), root = %root, "manifest deserialized");
    Ok((Distribution::from_parts(root, algorithm, recipients), proofs))
}

/// Cursor over the manifest bytes; reports the field and offset on underrun.
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn position(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn read_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], ManifestError> {
        if N > self.remaining() {
            return Err(ManifestError::UnexpectedEnd {
                field,
                offset: self.offset,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }
}
